use crate::types::{PolicyDecision, RuleSnapshot};

pub const RULE_UNKNOWN_TOOL: &str = "unknown_tool";
pub const RULE_READ_ONLY: &str = "read_only_tools";
pub const RULE_WRITE_WITH_APPROVAL: &str = "write_with_approval";
pub const RULE_WRITE_REQUIRES_APPROVAL: &str = "write_requires_approval";

/// Evaluate a tool call against a rule snapshot.
///
/// First match wins: unknown tool, read-only, write (token-gated), then the
/// default deny for known tools that carry no classification.
pub fn decide(tool_name: &str, has_approval_token: bool, rules: &RuleSnapshot) -> PolicyDecision {
    if !rules.all_known_tools.contains(tool_name) {
        return PolicyDecision::deny(Some(RULE_UNKNOWN_TOOL), "Unknown tool");
    }

    if rules.read_only_tools.contains(tool_name) {
        return PolicyDecision::allow(RULE_READ_ONLY, "Read-only tool");
    }

    if rules.write_tools.contains(tool_name) {
        return if has_approval_token {
            PolicyDecision::allow(RULE_WRITE_WITH_APPROVAL, "Write approved by token")
        } else {
            PolicyDecision::require_approval(RULE_WRITE_REQUIRES_APPROVAL, "Approval required")
        };
    }

    PolicyDecision::deny(None, "No matching rule")
}
