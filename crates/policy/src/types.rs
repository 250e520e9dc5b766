use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Outcome class of a policy evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PolicyAction {
    Allow,
    Deny,
    RequireApproval,
}

impl PolicyAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyAction::Allow => "ALLOW",
            PolicyAction::Deny => "DENY",
            PolicyAction::RequireApproval => "REQUIRE_APPROVAL",
        }
    }
}

impl std::fmt::Display for PolicyAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single, immutable policy verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyDecision {
    pub action: PolicyAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched_rule: Option<String>,
    pub reason: String,
}

impl PolicyDecision {
    pub fn allow(matched_rule: &str, reason: impl Into<String>) -> Self {
        Self {
            action: PolicyAction::Allow,
            matched_rule: Some(matched_rule.to_string()),
            reason: reason.into(),
        }
    }

    pub fn deny(matched_rule: Option<&str>, reason: impl Into<String>) -> Self {
        Self {
            action: PolicyAction::Deny,
            matched_rule: matched_rule.map(str::to_string),
            reason: reason.into(),
        }
    }

    pub fn require_approval(matched_rule: &str, reason: impl Into<String>) -> Self {
        Self {
            action: PolicyAction::RequireApproval,
            matched_rule: Some(matched_rule.to_string()),
            reason: reason.into(),
        }
    }

    pub fn is_allow(&self) -> bool {
        self.action == PolicyAction::Allow
    }
}

/// The three tool sets a policy decision is made against.
///
/// `read_only_tools` and `write_tools` are expected to be disjoint subsets of
/// `all_known_tools`. The engine does not rely on it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSnapshot {
    #[serde(default)]
    pub read_only_tools: BTreeSet<String>,
    #[serde(default)]
    pub write_tools: BTreeSet<String>,
    #[serde(default)]
    pub all_known_tools: BTreeSet<String>,
}

impl RuleSnapshot {
    pub fn new<R, W, K, S>(read_only: R, write: W, known: K) -> Self
    where
        R: IntoIterator<Item = S>,
        W: IntoIterator<Item = S>,
        K: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            read_only_tools: read_only.into_iter().map(Into::into).collect(),
            write_tools: write.into_iter().map(Into::into).collect(),
            all_known_tools: known.into_iter().map(Into::into).collect(),
        }
    }

    /// Tools that are classified at all, in sorted order.
    pub fn classified_tools(&self) -> Vec<String> {
        self.read_only_tools
            .union(&self.write_tools)
            .cloned()
            .collect()
    }

    /// Tools present in both the read-only and the write set.
    pub fn overlapping_tools(&self) -> Vec<String> {
        self.read_only_tools
            .intersection(&self.write_tools)
            .cloned()
            .collect()
    }
}
