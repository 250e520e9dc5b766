use anyhow::Result;
use tracing::info;

use crate::bootstrap::build_state;
use crate::config::Config;
use crate::server;

pub async fn run(config: Config) -> Result<()> {
    info!(
        bind = %config.bind_addr,
        rules = %config.rules_path.display(),
        max_calls = config.rate_limit.max_calls,
        window_secs = config.rate_limit.window_secs,
        "Starting tool-call gateway"
    );
    if config.admin_api_key.is_none() {
        info!("No admin API key configured; admin endpoints are closed");
    }

    let state = build_state(&config).await?;
    server::run(state, &config.bind_addr, config.max_body_bytes).await
}
