use proptest::prelude::*;
use toolgate_policy::{decide, PolicyAction, RuleSnapshot};

fn tool_name() -> impl Strategy<Value = String> {
    "[a-z_]{1,16}"
}

fn snapshot() -> impl Strategy<Value = RuleSnapshot> {
    (
        prop::collection::btree_set(tool_name(), 0..8),
        prop::collection::btree_set(tool_name(), 0..8),
        prop::collection::btree_set(tool_name(), 0..8),
    )
        .prop_map(|(read_only, write, extra)| {
            let mut known = extra;
            known.extend(read_only.iter().cloned());
            known.extend(write.iter().cloned());
            RuleSnapshot {
                read_only_tools: read_only,
                write_tools: write,
                all_known_tools: known,
            }
        })
}

proptest! {
    #[test]
    fn unknown_tools_always_denied(rules in snapshot(), tool in tool_name(), token in any::<bool>()) {
        prop_assume!(!rules.all_known_tools.contains(&tool));
        let decision = decide(&tool, token, &rules);
        prop_assert_eq!(decision.action, PolicyAction::Deny);
        prop_assert_eq!(decision.matched_rule.as_deref(), Some("unknown_tool"));
    }

    #[test]
    fn read_only_tools_allowed_regardless_of_token(rules in snapshot(), token in any::<bool>()) {
        for tool in &rules.read_only_tools {
            let decision = decide(tool, token, &rules);
            prop_assert_eq!(decision.action, PolicyAction::Allow);
            prop_assert_eq!(decision.matched_rule.as_deref(), Some("read_only_tools"));
        }
    }

    #[test]
    fn write_tools_gated_by_token(rules in snapshot()) {
        for tool in rules.write_tools.difference(&rules.read_only_tools) {
            let without = decide(tool, false, &rules);
            prop_assert_eq!(without.action, PolicyAction::RequireApproval);
            prop_assert_eq!(without.matched_rule.as_deref(), Some("write_requires_approval"));

            let with = decide(tool, true, &rules);
            prop_assert_eq!(with.action, PolicyAction::Allow);
            prop_assert_eq!(with.matched_rule.as_deref(), Some("write_with_approval"));
        }
    }

    #[test]
    fn unclassified_known_tools_denied(rules in snapshot(), token in any::<bool>()) {
        for tool in &rules.all_known_tools {
            if rules.read_only_tools.contains(tool) || rules.write_tools.contains(tool) {
                continue;
            }
            let decision = decide(tool, token, &rules);
            prop_assert_eq!(decision.action, PolicyAction::Deny);
            prop_assert_eq!(decision.matched_rule, None);
            prop_assert_eq!(decision.reason.as_str(), "No matching rule");
        }
    }

    #[test]
    fn decide_is_deterministic(rules in snapshot(), tool in tool_name(), token in any::<bool>()) {
        prop_assert_eq!(decide(&tool, token, &rules), decide(&tool, token, &rules));
    }
}
