//! Rule snapshots and the tool-call policy decision engine.

pub mod engine;
pub mod store;
pub mod types;

pub use engine::decide;
pub use store::{RuleSource, RuleStore, RuleStoreError, YamlRuleSource};
pub use types::{PolicyAction, PolicyDecision, RuleSnapshot};
