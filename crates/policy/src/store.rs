use crate::types::RuleSnapshot;
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum RuleStoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid rules: {0}")]
    Invalid(String),
}

/// Where rule snapshots come from.
#[async_trait]
pub trait RuleSource: Send + Sync {
    async fn fetch(&self) -> Result<RuleSnapshot, RuleStoreError>;
}

#[derive(Debug, Deserialize)]
struct RuleFile {
    #[serde(default)]
    read_only_tools: Vec<String>,
    #[serde(default)]
    write_tools: Vec<String>,
    #[serde(default)]
    all_known_tools: Option<Vec<String>>,
}

fn collect_names(field: &str, names: Vec<String>) -> Result<BTreeSet<String>, RuleStoreError> {
    names
        .into_iter()
        .map(|name| {
            let name = name.trim().to_string();
            if name.is_empty() {
                Err(RuleStoreError::Invalid(format!("empty tool name in {}", field)))
            } else {
                Ok(name)
            }
        })
        .collect()
}

/// Parse a YAML rule document. A missing `all_known_tools` defaults to the
/// union of the classified sets.
pub fn parse_rules(content: &str) -> Result<RuleSnapshot, RuleStoreError> {
    let file: RuleFile = serde_yaml::from_str(content)?;

    let read_only_tools = collect_names("read_only_tools", file.read_only_tools)?;
    let write_tools = collect_names("write_tools", file.write_tools)?;
    let all_known_tools = match file.all_known_tools {
        Some(known) => collect_names("all_known_tools", known)?,
        None => read_only_tools.union(&write_tools).cloned().collect(),
    };

    let snapshot = RuleSnapshot {
        read_only_tools,
        write_tools,
        all_known_tools,
    };

    let overlap = snapshot.overlapping_tools();
    if !overlap.is_empty() {
        warn!(tools = ?overlap, "Tools classified as both read-only and write; read-only wins");
    }

    Ok(snapshot)
}

/// Rules read from a YAML file on every fetch.
pub struct YamlRuleSource {
    path: PathBuf,
}

impl YamlRuleSource {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl RuleSource for YamlRuleSource {
    async fn fetch(&self) -> Result<RuleSnapshot, RuleStoreError> {
        let content = tokio::fs::read_to_string(&self.path).await?;
        parse_rules(&content)
    }
}

/// Holds the active rule snapshot. Readers get an `Arc` to a complete
/// snapshot; installs replace it wholesale.
#[derive(Default)]
pub struct RuleStore {
    current: RwLock<Option<(u64, Arc<RuleSnapshot>)>>,
}

impl RuleStore {
    /// A store with nothing loaded. Policy evaluation against it fails closed.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_snapshot(snapshot: RuleSnapshot) -> Self {
        let store = Self::empty();
        store.install(snapshot);
        store
    }

    /// Swap in a new snapshot and return its version.
    pub fn install(&self, snapshot: RuleSnapshot) -> u64 {
        let mut current = self.current.write();
        let version = current.as_ref().map_or(1, |(v, _)| v + 1);
        *current = Some((version, Arc::new(snapshot)));
        version
    }

    pub fn current(&self) -> Option<(u64, Arc<RuleSnapshot>)> {
        self.current.read().clone()
    }

    pub fn snapshot(&self) -> Option<Arc<RuleSnapshot>> {
        self.current.read().as_ref().map(|(_, s)| Arc::clone(s))
    }

    pub fn version(&self) -> Option<u64> {
        self.current.read().as_ref().map(|(v, _)| *v)
    }

    pub fn is_available(&self) -> bool {
        self.current.read().is_some()
    }

    /// Fetch from `source` and install. On failure the active snapshot is kept.
    pub async fn reload_from(&self, source: &dyn RuleSource) -> Result<u64, RuleStoreError> {
        let snapshot = source.fetch().await?;
        let known = snapshot.all_known_tools.len();
        let version = self.install(snapshot);
        info!(version, known_tools = known, "Rule snapshot installed");
        Ok(version)
    }
}
