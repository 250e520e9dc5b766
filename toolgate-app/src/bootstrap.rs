use anyhow::{Context, Result};
use std::sync::Arc;
use toolgate_core::Gateway;
use toolgate_infra::{ChainedEvidenceLog, EvidenceRecorder};
use toolgate_policy::{RuleSource, RuleStore, YamlRuleSource};
use toolgate_tools::builtin::{default_registry, InMemoryDatabase};
use toolgate_tools::ToolRunner;
use tracing::{info, warn};

use crate::config::Config;
use crate::server::AppState;

/// Wire every component from configuration.
///
/// A rules file that cannot be loaded is not fatal: the gateway starts with
/// no snapshot and refuses every call until a reload succeeds. A corrupt
/// evidence log is fatal.
pub async fn build_state(config: &Config) -> Result<AppState> {
    let rule_source: Arc<dyn RuleSource> = Arc::new(YamlRuleSource::new(&config.rules_path));
    let rules = Arc::new(RuleStore::empty());
    if let Err(e) = rules.reload_from(rule_source.as_ref()).await {
        warn!(
            path = %config.rules_path.display(),
            error = %e,
            "Rules not loaded; all tool calls will be denied until reload"
        );
    }

    let evidence = match &config.evidence_log {
        Some(path) => {
            let log = Arc::new(
                ChainedEvidenceLog::open(path)
                    .with_context(|| format!("Failed to open evidence log {}", path.display()))?,
            );
            let restored = log.load_entries()?;
            info!(path = %path.display(), entries = restored.len(), "Evidence log verified");
            let recorder = EvidenceRecorder::with_sink(log);
            recorder.restore(restored);
            recorder
        }
        None => EvidenceRecorder::new(),
    };

    let registry = default_registry(Arc::new(InMemoryDatabase::new()));
    info!(tools = ?registry.list(), "Tool registry ready");
    let runner = Arc::new(ToolRunner::new(Arc::new(registry)));

    let gateway = Gateway::builder(rules, runner)
        .rate_limit(config.rate_limit.to_config())
        .evidence(Arc::new(evidence))
        .tool_timeout_ms(config.tool_timeout_ms)
        .build();

    Ok(AppState::new(
        Arc::new(gateway),
        rule_source,
        config.admin_api_key.clone(),
    ))
}
