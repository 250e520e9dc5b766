use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use toolgate_infra::{
    EvidenceEntry, EvidenceRecorder, PauseController, RateLimitConfig, RateLimiter, SessionRegistry,
};
use toolgate_policy::{decide, PolicyAction, PolicyDecision, RuleStore};
use toolgate_tools::{ExecutionContext, ToolError, ToolExecutor};
use tracing::{info, warn};

use crate::error::GatewayError;
use crate::health::HealthReport;
use crate::metrics::GatewayMetrics;
use crate::request::{is_valid_tool_name, ToolCallRequest};

pub const RULE_INVALID_TOOL_NAME: &str = "invalid_tool_name";
pub const RULE_GLOBAL_PAUSE: &str = "global_pause";
pub const RULE_SESSION_KILLED: &str = "session_killed";
pub const RULE_RATE_LIMIT: &str = "rate_limit";
pub const RULE_POLICY_UNAVAILABLE: &str = "policy_unavailable";

const DEFAULT_TOOL_TIMEOUT_MS: u64 = 30_000;
const SUMMARY_LIMIT: usize = 256;

/// What the caller gets back for a call that entered the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub decision: PolicyDecision,
    pub executed: bool,
}

impl CallOutcome {
    fn refused(decision: PolicyDecision, error: String) -> Self {
        Self {
            success: false,
            result: None,
            error: Some(error),
            decision,
            executed: false,
        }
    }
}

pub struct GatewayBuilder {
    rules: Arc<RuleStore>,
    executor: Arc<dyn ToolExecutor>,
    sessions: Option<Arc<SessionRegistry>>,
    pause: Option<Arc<PauseController>>,
    rate_limit: RateLimitConfig,
    evidence: Option<Arc<EvidenceRecorder>>,
    tool_timeout_ms: u64,
}

impl GatewayBuilder {
    pub fn sessions(mut self, sessions: Arc<SessionRegistry>) -> Self {
        self.sessions = Some(sessions);
        self
    }

    pub fn pause(mut self, pause: Arc<PauseController>) -> Self {
        self.pause = Some(pause);
        self
    }

    pub fn rate_limit(mut self, config: RateLimitConfig) -> Self {
        self.rate_limit = config;
        self
    }

    pub fn evidence(mut self, evidence: Arc<EvidenceRecorder>) -> Self {
        self.evidence = Some(evidence);
        self
    }

    pub fn tool_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.tool_timeout_ms = timeout_ms;
        self
    }

    pub fn build(self) -> Gateway {
        Gateway {
            rules: self.rules,
            executor: self.executor,
            sessions: self.sessions.unwrap_or_default(),
            pause: self.pause.unwrap_or_default(),
            limiter: Arc::new(RateLimiter::new(self.rate_limit)),
            evidence: self.evidence.unwrap_or_default(),
            metrics: Arc::new(GatewayMetrics::new()),
            tool_timeout_ms: self.tool_timeout_ms,
        }
    }
}

/// Authorizes tool calls and dispatches the ones that pass.
///
/// Checks run in a fixed order and the first failing one decides:
/// tool name, global pause, session kill, rate limit, policy rules.
/// Every call that gets past request validation leaves exactly one
/// evidence entry.
pub struct Gateway {
    rules: Arc<RuleStore>,
    executor: Arc<dyn ToolExecutor>,
    sessions: Arc<SessionRegistry>,
    pause: Arc<PauseController>,
    limiter: Arc<RateLimiter>,
    evidence: Arc<EvidenceRecorder>,
    metrics: Arc<GatewayMetrics>,
    tool_timeout_ms: u64,
}

impl Gateway {
    pub fn builder(rules: Arc<RuleStore>, executor: Arc<dyn ToolExecutor>) -> GatewayBuilder {
        GatewayBuilder {
            rules,
            executor,
            sessions: None,
            pause: None,
            rate_limit: RateLimitConfig::default(),
            evidence: None,
            tool_timeout_ms: DEFAULT_TOOL_TIMEOUT_MS,
        }
    }

    pub fn rules(&self) -> &Arc<RuleStore> {
        &self.rules
    }

    pub fn sessions(&self) -> &Arc<SessionRegistry> {
        &self.sessions
    }

    pub fn pause_controller(&self) -> &Arc<PauseController> {
        &self.pause
    }

    pub fn rate_limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    pub fn evidence(&self) -> &Arc<EvidenceRecorder> {
        &self.evidence
    }

    pub fn metrics(&self) -> &Arc<GatewayMetrics> {
        &self.metrics
    }

    pub async fn call(&self, request: ToolCallRequest) -> Result<CallOutcome, GatewayError> {
        if let Err(e) = request.validate() {
            self.metrics.inc_rejected();
            warn!(error = %e, "Rejected malformed tool call");
            return Err(e);
        }
        self.metrics.inc_calls();

        let session_id = request.session_id.as_str();
        let tool_name = request.tool_name.as_str();
        self.sessions.record_call(session_id);

        let outcome = match self.authorize(&request) {
            Ok(decision) => self.dispatch(&request, decision).await,
            Err(refusal) => refusal,
        };

        if outcome.decision.is_allow() {
            self.metrics.inc_allowed();
            info!(
                session_id,
                tool = tool_name,
                matched_rule = outcome.decision.matched_rule.as_deref().unwrap_or(""),
                executed = outcome.executed,
                success = outcome.success,
                "Tool call allowed"
            );
        } else {
            self.metrics.inc_refused();
            warn!(
                session_id,
                tool = tool_name,
                action = %outcome.decision.action,
                matched_rule = outcome.decision.matched_rule.as_deref().unwrap_or(""),
                reason = %outcome.decision.reason,
                "Tool call refused"
            );
        }

        let summary = if outcome.success {
            outcome.result.as_ref().map(summarize)
        } else {
            outcome.error.clone()
        };
        self.evidence.record(EvidenceEntry::new(
            session_id,
            tool_name,
            outcome.decision.clone(),
            outcome.executed,
            summary,
        ));

        Ok(outcome)
    }

    /// Run every pre-dispatch check. `Ok` carries an ALLOW decision.
    fn authorize(&self, request: &ToolCallRequest) -> Result<PolicyDecision, CallOutcome> {
        let session_id = request.session_id.as_str();
        let tool_name = request.tool_name.as_str();

        if !is_valid_tool_name(tool_name) {
            let decision = PolicyDecision::deny(Some(RULE_INVALID_TOOL_NAME), "Invalid tool name");
            return Err(CallOutcome::refused(decision, "Invalid tool name".into()));
        }

        let pause = self.pause.state();
        if pause.paused {
            let reason = match pause.reason.as_deref() {
                Some(r) if !r.is_empty() => format!("Kill switch active: gateway paused ({})", r),
                _ => "Kill switch active: gateway paused".to_string(),
            };
            let decision = PolicyDecision::deny(Some(RULE_GLOBAL_PAUSE), reason.clone());
            return Err(CallOutcome::refused(decision, reason));
        }

        if let Some(session) = self.sessions.get(session_id).filter(|s| s.killed) {
            let reason = match session.killed_reason.as_deref() {
                Some(r) if !r.is_empty() => format!("Kill switch active: session killed ({})", r),
                _ => "Kill switch active: session killed".to_string(),
            };
            let decision = PolicyDecision::deny(Some(RULE_SESSION_KILLED), reason.clone());
            return Err(CallOutcome::refused(decision, reason));
        }

        if !self.limiter.check_and_increment(session_id, tool_name) {
            let decision = PolicyDecision::deny(Some(RULE_RATE_LIMIT), "Rate limit exceeded");
            let error = format!("Rate limit exceeded for tool '{}'", tool_name);
            return Err(CallOutcome::refused(decision, error));
        }

        let Some(rules) = self.rules.snapshot() else {
            let decision = PolicyDecision::deny(Some(RULE_POLICY_UNAVAILABLE), "Policy engine unavailable");
            return Err(CallOutcome::refused(decision, "Policy engine unavailable".into()));
        };

        let decision = decide(tool_name, request.has_approval_token(), &rules);
        match decision.action {
            PolicyAction::Allow => Ok(decision),
            PolicyAction::Deny | PolicyAction::RequireApproval => {
                let error = refusal_message(tool_name, &decision);
                Err(CallOutcome::refused(decision, error))
            }
        }
    }

    async fn dispatch(&self, request: &ToolCallRequest, decision: PolicyDecision) -> CallOutcome {
        let ctx = ExecutionContext::new(request.session_id.clone(), self.tool_timeout_ms);
        let result = self
            .executor
            .execute(ctx, &request.tool_name, request.arguments.clone())
            .await;

        match result {
            Ok(result) => {
                self.metrics.inc_executions();
                if !result.success {
                    self.metrics.inc_execution_failures();
                }
                CallOutcome {
                    success: result.success,
                    result: result.output,
                    error: result.error,
                    decision,
                    executed: true,
                }
            }
            Err(ToolError::NotFound(_)) => CallOutcome {
                success: false,
                result: None,
                error: Some("Tool not implemented".into()),
                decision,
                executed: false,
            },
            Err(e) => {
                self.metrics.inc_executions();
                self.metrics.inc_execution_failures();
                CallOutcome {
                    success: false,
                    result: None,
                    error: Some(e.to_string()),
                    decision,
                    executed: true,
                }
            }
        }
    }

    /// Tools the session may currently reach: the classified tools of the
    /// active snapshot, or nothing while paused, killed or without rules.
    pub fn allowed_tools(&self, session_id: Option<&str>) -> Vec<String> {
        if self.pause.is_paused() {
            return Vec::new();
        }
        if session_id.is_some_and(|id| self.sessions.is_killed(id)) {
            return Vec::new();
        }
        self.rules
            .snapshot()
            .map(|rules| rules.classified_tools())
            .unwrap_or_default()
    }

    pub fn health(&self) -> HealthReport {
        HealthReport::new(
            self.rules.is_available(),
            true,
            self.rules.version(),
            self.pause.is_paused(),
        )
    }
}

fn refusal_message(tool_name: &str, decision: &PolicyDecision) -> String {
    match decision.matched_rule.as_deref() {
        Some(toolgate_policy::engine::RULE_UNKNOWN_TOOL) => {
            format!("Unknown tool: '{}' is not in the allowlist", tool_name)
        }
        _ => decision.reason.clone(),
    }
}

fn summarize(value: &Value) -> String {
    let text = value.to_string();
    if text.len() <= SUMMARY_LIMIT {
        return text;
    }
    let mut end = SUMMARY_LIMIT;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_summarize_truncates_on_char_boundary() {
        let long = json!("é".repeat(300));
        let summary = summarize(&long);
        assert!(summary.ends_with("..."));
        assert!(summary.len() <= SUMMARY_LIMIT + 3);

        assert_eq!(summarize(&json!({"a": 1})), r#"{"a":1}"#);
    }

    #[test]
    fn test_unknown_tool_message_mentions_allowlist() {
        let decision = PolicyDecision::deny(Some("unknown_tool"), "Unknown tool");
        assert!(refusal_message("x", &decision).contains("allowlist"));

        let decision = PolicyDecision::require_approval("write_requires_approval", "Approval required");
        assert_eq!(refusal_message("x", &decision), "Approval required");
    }
}
