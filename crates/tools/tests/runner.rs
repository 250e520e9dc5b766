use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::time::{sleep, Duration};
use toolgate_tools::builtin::{default_registry, InMemoryDatabase};
use toolgate_tools::*;

struct SlowTool;
struct PanickingTool;

/// Writes a row after a delay.
struct SlowWriteTool {
    db: Arc<InMemoryDatabase>,
}

#[async_trait]
impl Tool for SlowTool {
    fn name(&self) -> &str {
        "slow"
    }
    fn description(&self) -> &str {
        "Sleeps"
    }
    fn schema(&self) -> Value {
        json!({"type": "object"})
    }
    async fn execute(&self, _ctx: ExecutionContext, _args: Value) -> Result<ToolResult, ToolError> {
        sleep(Duration::from_secs(5)).await;
        Ok(ToolResult::ok(json!(null)))
    }
}

#[async_trait]
impl Tool for PanickingTool {
    fn name(&self) -> &str {
        "boom"
    }
    fn description(&self) -> &str {
        "Panics"
    }
    fn schema(&self) -> Value {
        json!({"type": "object"})
    }
    async fn execute(&self, _ctx: ExecutionContext, _args: Value) -> Result<ToolResult, ToolError> {
        panic!("tool exploded");
    }
}

#[async_trait]
impl Tool for SlowWriteTool {
    fn name(&self) -> &str {
        "slow_write"
    }
    fn description(&self) -> &str {
        "Sleeps, then writes t/k"
    }
    fn schema(&self) -> Value {
        json!({"type": "object"})
    }
    async fn execute(&self, _ctx: ExecutionContext, _args: Value) -> Result<ToolResult, ToolError> {
        sleep(Duration::from_millis(200)).await;
        self.db.upsert("t", "k", json!(1));
        Ok(ToolResult::ok(json!({"written": true})))
    }
}

fn runner() -> ToolRunner {
    let mut registry = default_registry(Arc::new(InMemoryDatabase::new()));
    registry.register(Arc::new(SlowTool)).register(Arc::new(PanickingTool));
    ToolRunner::new(Arc::new(registry))
}

#[tokio::test]
async fn test_runs_registered_tool() {
    let result = runner()
        .execute(ExecutionContext::new("s", 1000), "echo", json!({"message": "hi"}))
        .await
        .unwrap();
    assert!(result.success);
    assert_eq!(result.output.unwrap()["message"], "hi");
}

#[tokio::test]
async fn test_unregistered_tool_not_found() {
    let result = runner()
        .execute(ExecutionContext::new("s", 1000), "missing", json!({}))
        .await;
    assert!(matches!(result, Err(ToolError::NotFound(name)) if name == "missing"));
}

#[tokio::test]
async fn test_timeout_enforced() {
    let result = runner()
        .execute(ExecutionContext::new("s", 50), "slow", json!({}))
        .await;
    assert!(matches!(result, Err(ToolError::Timeout)));
}

#[tokio::test]
async fn test_panic_isolated() {
    let result = runner()
        .execute(ExecutionContext::new("s", 1000), "boom", json!({}))
        .await;
    assert!(matches!(result, Err(ToolError::Internal)));
}

#[test]
fn test_default_registry_contents() {
    let registry = default_registry(Arc::new(InMemoryDatabase::new()));
    assert_eq!(registry.list(), vec!["db_delete", "db_query", "db_update", "echo"]);
    assert_eq!(registry.schemas().len(), 4);
}

#[tokio::test]
async fn test_timed_out_tool_leaves_no_side_effect() {
    let db = Arc::new(InMemoryDatabase::new());
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(SlowWriteTool { db: Arc::clone(&db) }));
    let runner = ToolRunner::new(Arc::new(registry));

    let result = runner
        .execute(ExecutionContext::new("s", 50), "slow_write", json!({}))
        .await;
    assert!(matches!(result, Err(ToolError::Timeout)));

    sleep(Duration::from_millis(400)).await;
    assert_eq!(db.get("t", "k"), None);
}
