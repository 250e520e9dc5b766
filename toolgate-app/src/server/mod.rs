//! HTTP surface of the gateway.

mod auth;
mod error;
mod handlers;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::{middleware, Router};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use toolgate_core::Gateway;
use toolgate_policy::RuleSource;
use tower_http::trace::TraceLayer;
use tracing::info;

pub use error::ApiError;

#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<Gateway>,
    pub rule_source: Arc<dyn RuleSource>,
    pub admin_api_key: Option<Arc<str>>,
}

impl AppState {
    pub fn new(
        gateway: Arc<Gateway>,
        rule_source: Arc<dyn RuleSource>,
        admin_api_key: Option<String>,
    ) -> Self {
        Self {
            gateway,
            rule_source,
            admin_api_key: admin_api_key.map(Arc::from),
        }
    }
}

/// Build the router. Bodies above `max_body_bytes` are answered with 413.
pub fn router(state: AppState, max_body_bytes: usize) -> Router {
    let admin = Router::new()
        .route("/admin/policies/reload", post(handlers::reload_policies))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_api_key,
        ));

    Router::new()
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        .route("/tools/list", get(handlers::list_tools))
        .route("/tools/call", post(handlers::call_tool))
        .route("/sessions", get(handlers::list_sessions))
        .route("/sessions/:id", get(handlers::get_session))
        .route("/sessions/:id/kill", post(handlers::kill_session))
        .route("/sessions/:id/evidence", get(handlers::export_evidence))
        .route("/system/pause", post(handlers::pause))
        .route("/system/resume", post(handlers::resume))
        .route("/system/status", get(handlers::system_status))
        .merge(admin)
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve until ctrl-c.
pub async fn run(state: AppState, bind_addr: &str, max_body_bytes: usize) -> anyhow::Result<()> {
    spawn_rate_window_sweeper(Arc::clone(&state.gateway));

    let listener = TcpListener::bind(bind_addr).await?;
    info!(addr = %bind_addr, "Gateway listening");

    axum::serve(listener, router(state, max_body_bytes))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Gateway shutting down");
        })
        .await?;

    Ok(())
}

fn spawn_rate_window_sweeper(gateway: Arc<Gateway>) {
    let period = gateway
        .rate_limiter()
        .config()
        .window
        .max(Duration::from_secs(1));

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            let purged = gateway.rate_limiter().purge_expired();
            if purged > 0 {
                tracing::debug!(purged, "Expired rate windows removed");
            }
        }
    });
}
