use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::context::ExecutionContext;
use crate::error::ToolError;
use crate::traits::{Tool, ToolResult};

type Table = BTreeMap<String, Value>;

/// Table/key/value store backing the `db_*` tools.
#[derive(Default)]
pub struct InMemoryDatabase {
    tables: RwLock<BTreeMap<String, Table>>,
}

impl InMemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, table: &str, key: &str) -> Option<Value> {
        self.tables.read().get(table).and_then(|t| t.get(key).cloned())
    }

    pub fn rows(&self, table: &str) -> Table {
        self.tables.read().get(table).cloned().unwrap_or_default()
    }

    pub fn upsert(&self, table: &str, key: &str, value: Value) -> Option<Value> {
        self.tables
            .write()
            .entry(table.to_string())
            .or_default()
            .insert(key.to_string(), value)
    }

    pub fn delete(&self, table: &str, key: &str) -> Option<Value> {
        let mut tables = self.tables.write();
        let removed = tables.get_mut(table).and_then(|t| t.remove(key));
        if tables.get(table).is_some_and(|t| t.is_empty()) {
            tables.remove(table);
        }
        removed
    }
}

fn required_str<'a>(args: &'a Value, field: &str) -> Result<&'a str, ToolError> {
    args.get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ToolError::ValidationError(format!("Missing '{}' field", field)))
}

pub struct DbQueryTool {
    db: Arc<InMemoryDatabase>,
}

impl DbQueryTool {
    pub fn new(db: Arc<InMemoryDatabase>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl Tool for DbQueryTool {
    fn name(&self) -> &str {
        "db_query"
    }

    fn description(&self) -> &str {
        "Read one row, or every row of a table"
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "table": {"type": "string"},
                "key": {"type": "string"}
            },
            "required": ["table"]
        })
    }

    async fn execute(&self, _ctx: ExecutionContext, args: Value) -> Result<ToolResult, ToolError> {
        let table = required_str(&args, "table")?;

        match args.get("key").and_then(Value::as_str) {
            Some(key) => Ok(ToolResult::ok(json!({
                "table": table,
                "key": key,
                "value": self.db.get(table, key),
            }))),
            None => {
                let rows: Map<String, Value> = self.db.rows(table).into_iter().collect();
                Ok(ToolResult::ok(json!({
                    "table": table,
                    "count": rows.len(),
                    "rows": rows,
                })))
            }
        }
    }
}

pub struct DbUpdateTool {
    db: Arc<InMemoryDatabase>,
}

impl DbUpdateTool {
    pub fn new(db: Arc<InMemoryDatabase>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl Tool for DbUpdateTool {
    fn name(&self) -> &str {
        "db_update"
    }

    fn description(&self) -> &str {
        "Insert or replace a row"
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "table": {"type": "string"},
                "key": {"type": "string"},
                "value": {}
            },
            "required": ["table", "key", "value"]
        })
    }

    async fn execute(&self, _ctx: ExecutionContext, args: Value) -> Result<ToolResult, ToolError> {
        let table = required_str(&args, "table")?;
        let key = required_str(&args, "key")?;
        let value = args
            .get("value")
            .cloned()
            .ok_or_else(|| ToolError::ValidationError("Missing 'value' field".to_string()))?;

        let previous = self.db.upsert(table, key, value);
        Ok(ToolResult::ok(json!({
            "table": table,
            "key": key,
            "previous": previous,
        })))
    }
}

pub struct DbDeleteTool {
    db: Arc<InMemoryDatabase>,
}

impl DbDeleteTool {
    pub fn new(db: Arc<InMemoryDatabase>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl Tool for DbDeleteTool {
    fn name(&self) -> &str {
        "db_delete"
    }

    fn description(&self) -> &str {
        "Delete a row"
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "table": {"type": "string"},
                "key": {"type": "string"}
            },
            "required": ["table", "key"]
        })
    }

    async fn execute(&self, _ctx: ExecutionContext, args: Value) -> Result<ToolResult, ToolError> {
        let table = required_str(&args, "table")?;
        let key = required_str(&args, "key")?;
        let removed = self.db.delete(table, key);
        Ok(ToolResult::ok(json!({
            "table": table,
            "key": key,
            "deleted": removed.is_some(),
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> ExecutionContext {
        ExecutionContext::new("session", 5000)
    }

    #[tokio::test]
    async fn test_update_then_query() {
        let db = Arc::new(InMemoryDatabase::new());
        let update = DbUpdateTool::new(Arc::clone(&db));
        let query = DbQueryTool::new(Arc::clone(&db));

        let result = update
            .execute(ctx(), json!({"table": "users", "key": "alice", "value": {"age": 30}}))
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.output.unwrap()["previous"], Value::Null);

        let result = query
            .execute(ctx(), json!({"table": "users", "key": "alice"}))
            .await
            .unwrap();
        assert_eq!(result.output.unwrap()["value"]["age"], 30);
    }

    #[tokio::test]
    async fn test_query_whole_table() {
        let db = Arc::new(InMemoryDatabase::new());
        db.upsert("users", "a", json!(1));
        db.upsert("users", "b", json!(2));

        let result = DbQueryTool::new(db)
            .execute(ctx(), json!({"table": "users"}))
            .await
            .unwrap();
        let output = result.output.unwrap();
        assert_eq!(output["count"], 2);
        assert_eq!(output["rows"]["b"], 2);
    }

    #[tokio::test]
    async fn test_delete() {
        let db = Arc::new(InMemoryDatabase::new());
        db.upsert("users", "a", json!(1));
        let tool = DbDeleteTool::new(Arc::clone(&db));

        let first = tool.execute(ctx(), json!({"table": "users", "key": "a"})).await.unwrap();
        assert_eq!(first.output.unwrap()["deleted"], true);
        let second = tool.execute(ctx(), json!({"table": "users", "key": "a"})).await.unwrap();
        assert_eq!(second.output.unwrap()["deleted"], false);
        assert!(db.rows("users").is_empty());
    }

    #[tokio::test]
    async fn test_missing_fields_rejected() {
        let db = Arc::new(InMemoryDatabase::new());
        let result = DbUpdateTool::new(db).execute(ctx(), json!({"table": "users"})).await;
        assert!(matches!(result, Err(ToolError::ValidationError(_))));
    }
}
