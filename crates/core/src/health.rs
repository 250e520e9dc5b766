use serde::Serialize;

/// Liveness signals for the collaborators the pipeline depends on.
///
/// Field names on the wire follow the deployed dashboard contract: `opa` is
/// the policy engine (a rule snapshot is loaded) and `redis` the shared
/// state store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    #[serde(rename = "opa")]
    pub policy_engine: bool,
    #[serde(rename = "redis")]
    pub state_store: bool,
    pub rules_version: Option<u64>,
    pub paused: bool,
}

impl HealthReport {
    pub fn new(policy_engine: bool, state_store: bool, rules_version: Option<u64>, paused: bool) -> Self {
        let status = if policy_engine && state_store {
            "healthy"
        } else {
            "degraded"
        };
        Self {
            status,
            policy_engine,
            state_store,
            rules_version,
            paused,
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.policy_engine && self.state_store
    }
}
