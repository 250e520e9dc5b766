pub mod builtin;
pub mod context;
pub mod error;
pub mod registry;
pub mod runner;
pub mod traits;

pub use context::ExecutionContext;
pub use error::ToolError;
pub use registry::ToolRegistry;
pub use runner::ToolRunner;
pub use traits::{Tool, ToolExecutor, ToolResult};
