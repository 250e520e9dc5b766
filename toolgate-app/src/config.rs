use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use toolgate_infra::RateLimitConfig;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitSettings {
    pub max_calls: usize,
    pub window_secs: u64,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            max_calls: 10,
            window_secs: 60,
        }
    }
}

impl RateLimitSettings {
    pub fn to_config(&self) -> RateLimitConfig {
        RateLimitConfig::new(self.max_calls, Duration::from_secs(self.window_secs))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub bind_addr: String,
    pub rules_path: PathBuf,
    pub admin_api_key: Option<String>,
    pub rate_limit: RateLimitSettings,
    pub tool_timeout_ms: u64,
    pub max_body_bytes: usize,
    pub evidence_log: Option<PathBuf>,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            rules_path: PathBuf::from("rules.yaml"),
            admin_api_key: None,
            rate_limit: RateLimitSettings::default(),
            tool_timeout_ms: 30_000,
            max_body_bytes: 1024 * 1024,
            evidence_log: None,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load from `path` (defaults when the file does not exist), then apply
    /// `TOOLGATE_*` environment overrides and validate.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            Self::from_yaml(&content)
                .with_context(|| format!("Failed to parse {}", path.display()))?
        } else {
            info!(path = %path.display(), "Config file not found, using defaults");
            Self::default()
        };

        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = lookup("TOOLGATE_BIND_ADDR") {
            self.bind_addr = addr;
        }
        if let Some(path) = lookup("TOOLGATE_RULES_PATH") {
            self.rules_path = PathBuf::from(path);
        }
        if let Some(key) = lookup("TOOLGATE_ADMIN_API_KEY") {
            self.admin_api_key = Some(key);
        }
        if let Some(level) = lookup("TOOLGATE_LOG_LEVEL") {
            self.log_level = level;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.rate_limit.max_calls == 0 {
            anyhow::bail!("rate_limit.max_calls must be greater than zero");
        }
        if self.rate_limit.window_secs == 0 {
            anyhow::bail!("rate_limit.window_secs must be greater than zero");
        }
        if self.tool_timeout_ms == 0 {
            anyhow::bail!("tool_timeout_ms must be greater than zero");
        }
        if self.max_body_bytes == 0 {
            anyhow::bail!("max_body_bytes must be greater than zero");
        }
        if self.admin_api_key.as_deref().is_some_and(|k| k.trim().is_empty()) {
            anyhow::bail!("admin_api_key must not be blank");
        }
        Ok(())
    }
}
