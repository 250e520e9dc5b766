use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::context::ExecutionContext;
use crate::error::ToolError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub success: bool,
    pub output: Option<Value>,
    pub error: Option<String>,
}

impl ToolResult {
    pub fn ok(output: Value) -> Self {
        Self {
            success: true,
            output: Some(output),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            output: None,
            error: Some(error.into()),
        }
    }
}

/// A callable capability behind the gateway.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn schema(&self) -> Value;

    async fn execute(&self, ctx: ExecutionContext, args: Value) -> Result<ToolResult, ToolError>;
}

/// Runs an already-authorized tool call.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    async fn execute(
        &self,
        ctx: ExecutionContext,
        tool_name: &str,
        args: Value,
    ) -> Result<ToolResult, ToolError>;
}
