use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tokio::time::{timeout, Duration};
use tracing::{debug, error, warn};

use crate::context::ExecutionContext;
use crate::error::ToolError;
use crate::registry::ToolRegistry;
use crate::traits::{Tool, ToolExecutor, ToolResult};

/// Executes registered tools on their own task with a deadline, so a panic or
/// a hung tool cannot take the gateway down with it.
pub struct ToolRunner {
    registry: Arc<ToolRegistry>,
}

impl ToolRunner {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    async fn execute_with_protection(
        &self,
        tool: Arc<dyn Tool>,
        ctx: ExecutionContext,
        args: Value,
    ) -> Result<ToolResult, ToolError> {
        let timeout_ms = ctx.timeout_ms;
        let mut handle = tokio::spawn(async move { tool.execute(ctx, args).await });

        match timeout(Duration::from_millis(timeout_ms), &mut handle).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => {
                if join_err.is_panic() {
                    error!("Tool execution panicked");
                } else {
                    error!("Tool execution cancelled");
                }
                Err(ToolError::Internal)
            }
            Err(_) => {
                // A timed-out call is reported as not done, so it must not finish later.
                handle.abort();
                warn!("Tool execution timed out after {}ms", timeout_ms);
                Err(ToolError::Timeout)
            }
        }
    }
}

#[async_trait]
impl ToolExecutor for ToolRunner {
    async fn execute(
        &self,
        ctx: ExecutionContext,
        tool_name: &str,
        args: Value,
    ) -> Result<ToolResult, ToolError> {
        let tool = self
            .registry
            .get(tool_name)
            .ok_or_else(|| ToolError::NotFound(tool_name.to_string()))?;

        debug!(tool = tool_name, call_id = %ctx.call_id, "Executing tool");
        self.execute_with_protection(tool, ctx, args).await
    }
}
