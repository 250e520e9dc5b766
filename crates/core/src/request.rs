use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::GatewayError;

const MAX_IDENTIFIER_LEN: usize = 128;

/// An agent's request to run a tool. Never modified after it is received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    pub session_id: String,
    pub tool_name: String,
    #[serde(default)]
    pub arguments: Value,
    #[serde(default)]
    pub approval_token: Option<String>,
}

impl ToolCallRequest {
    pub fn new(session_id: impl Into<String>, tool_name: impl Into<String>, arguments: Value) -> Self {
        Self {
            session_id: session_id.into(),
            tool_name: tool_name.into(),
            arguments,
            approval_token: None,
        }
    }

    pub fn with_approval_token(mut self, token: impl Into<String>) -> Self {
        self.approval_token = Some(token.into());
        self
    }

    /// A blank token counts as no token.
    pub fn has_approval_token(&self) -> bool {
        self.approval_token
            .as_deref()
            .is_some_and(|t| !t.trim().is_empty())
    }

    /// Structural checks that run before any policy logic. Only an empty or
    /// malformed session id, or an empty tool name, rejects the request; a
    /// tool name with forbidden characters is a policy refusal instead.
    pub fn validate(&self) -> Result<(), GatewayError> {
        if self.session_id.is_empty() {
            return Err(GatewayError::RequestMalformed("session_id is required".into()));
        }
        if !is_valid_session_id(&self.session_id) {
            return Err(GatewayError::RequestMalformed(
                "session_id contains invalid characters".into(),
            ));
        }
        if self.tool_name.is_empty() {
            return Err(GatewayError::RequestMalformed("tool_name is required".into()));
        }
        Ok(())
    }
}

fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | ':')
}

pub fn is_valid_session_id(session_id: &str) -> bool {
    !session_id.is_empty()
        && session_id.len() <= MAX_IDENTIFIER_LEN
        && session_id.chars().all(is_identifier_char)
}

/// Tool names are plain identifiers: no path separators, whitespace or
/// traversal sequences.
pub fn is_valid_tool_name(tool_name: &str) -> bool {
    !tool_name.is_empty()
        && tool_name.len() <= MAX_IDENTIFIER_LEN
        && !tool_name.contains("..")
        && tool_name.chars().all(is_identifier_char)
}
