use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::warn;

use super::{ApiError, AppState};

pub const API_KEY_HEADER: &str = "x-api-key";

/// Admin routes need the configured key. With no key configured they are
/// closed to everyone.
pub async fn require_api_key(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let provided = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok());

    let authorized = matches!(
        (state.admin_api_key.as_deref(), provided),
        (Some(expected), Some(provided)) if constant_time_eq(expected.as_bytes(), provided.as_bytes())
    );

    if !authorized {
        warn!(path = %request.uri().path(), "Admin request rejected");
        return ApiError::new(StatusCode::FORBIDDEN, "Invalid API key").into_response();
    }

    next.run(request).await
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::constant_time_eq;

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"secret", b"secret"));
        assert!(!constant_time_eq(b"secret", b"secreT"));
        assert!(!constant_time_eq(b"secret", b"secret2"));
    }
}
