use thiserror::Error;

#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Tool not implemented: {0}")]
    NotFound(String),

    #[error("Operation timed out")]
    Timeout,

    #[error("Internal error")]
    Internal,
}
