//! Tools shipped with the gateway binary.

pub mod db;
pub mod echo;

pub use db::{DbDeleteTool, DbQueryTool, DbUpdateTool, InMemoryDatabase};
pub use echo::EchoTool;

use crate::registry::ToolRegistry;
use std::sync::Arc;

/// Registry holding every built-in tool over one shared database.
pub fn default_registry(db: Arc<InMemoryDatabase>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry
        .register(Arc::new(EchoTool))
        .register(Arc::new(DbQueryTool::new(Arc::clone(&db))))
        .register(Arc::new(DbUpdateTool::new(Arc::clone(&db))))
        .register(Arc::new(DbDeleteTool::new(db)));
    registry
}
