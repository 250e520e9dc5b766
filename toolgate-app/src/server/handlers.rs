use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use toolgate_core::request::is_valid_session_id;
use toolgate_core::{CallOutcome, ToolCallRequest};
use tracing::{error, info};

use super::{ApiError, AppState};

const DEFAULT_KILL_REASON: &str = "Killed via API";

#[derive(Debug, Default, Deserialize)]
pub struct ReasonBody {
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ToolListQuery {
    pub session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EvidenceQuery {
    pub format: Option<String>,
}

fn check_session_id(session_id: &str) -> Result<(), ApiError> {
    if is_valid_session_id(session_id) {
        Ok(())
    } else {
        Err(ApiError::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            "session_id contains invalid characters",
        ))
    }
}

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.gateway.health())
}

pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.gateway.metrics().snapshot())
}

pub async fn list_tools(
    State(state): State<AppState>,
    Query(query): Query<ToolListQuery>,
) -> Result<Json<Value>, ApiError> {
    let session_id = query.session_id.filter(|s| !s.is_empty());
    if let Some(id) = &session_id {
        check_session_id(id)?;
    }
    let tools = state.gateway.allowed_tools(session_id.as_deref());
    Ok(Json(json!({ "tools": tools })))
}

pub async fn call_tool(
    State(state): State<AppState>,
    body: Result<Json<ToolCallRequest>, JsonRejection>,
) -> Result<Json<CallOutcome>, ApiError> {
    // Keep axum's status (413 oversize, 422 missing fields, 400 bad JSON).
    let Json(request) = body.map_err(|rejection| ApiError::new(rejection.status(), rejection.body_text()))?;
    let outcome = state.gateway.call(request).await?;
    Ok(Json(outcome))
}

pub async fn list_sessions(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({ "sessions": state.gateway.sessions().list() }))
}

pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    check_session_id(&session_id)?;
    state
        .gateway
        .sessions()
        .get(&session_id)
        .map(Json)
        .ok_or_else(|| ApiError::new(StatusCode::NOT_FOUND, "Session not found"))
}

pub async fn kill_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    body: Option<Json<ReasonBody>>,
) -> Result<impl IntoResponse, ApiError> {
    check_session_id(&session_id)?;
    let reason = body
        .and_then(|Json(b)| b.reason)
        .filter(|r| !r.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_KILL_REASON.to_string());

    let session = state.gateway.sessions().kill(&session_id, &reason);
    Ok(Json(json!({ "success": true, "session": session })))
}

pub async fn export_evidence(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Query(query): Query<EvidenceQuery>,
) -> Result<Response, ApiError> {
    check_session_id(&session_id)?;
    let format = query.format.as_deref().unwrap_or("json");
    let export = state.gateway.evidence().export_pack(&session_id, format)?;
    let body = export.render()?;

    Ok(([(header::CONTENT_TYPE, export.format.content_type())], body).into_response())
}

pub async fn pause(
    State(state): State<AppState>,
    body: Option<Json<ReasonBody>>,
) -> impl IntoResponse {
    let reason = body.and_then(|Json(b)| b.reason);
    let controller = state.gateway.pause_controller();
    controller.pause(reason);
    Json(json!({ "success": true, "state": controller.state() }))
}

pub async fn resume(State(state): State<AppState>) -> impl IntoResponse {
    let controller = state.gateway.pause_controller();
    controller.resume();
    Json(json!({ "success": true, "state": controller.state() }))
}

pub async fn system_status(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.gateway.pause_controller().state())
}

pub async fn reload_policies(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    match state.gateway.rules().reload_from(state.rule_source.as_ref()).await {
        Ok(version) => {
            info!(version, "Policies reloaded via admin API");
            Ok(Json(json!({ "success": true, "version": version })))
        }
        Err(e) => {
            error!(error = %e, "Policy reload failed; keeping previous rules");
            Err(ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Policy reload failed: {}", e),
            ))
        }
    }
}
