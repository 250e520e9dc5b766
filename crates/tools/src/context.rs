use serde::{Deserialize, Serialize};

/// Per-dispatch context handed to a tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionContext {
    pub session_id: String,
    pub timeout_ms: u64,
    pub call_id: String,
}

impl ExecutionContext {
    pub fn new(session_id: impl Into<String>, timeout_ms: u64) -> Self {
        Self {
            session_id: session_id.into(),
            timeout_ms,
            call_id: uuid::Uuid::new_v4().to_string(),
        }
    }
}
