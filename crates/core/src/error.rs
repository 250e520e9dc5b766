use thiserror::Error;

/// Failures that stop a request before it enters the pipeline. Policy
/// refusals are not errors; they come back as a [`crate::CallOutcome`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("Malformed request: {0}")]
    RequestMalformed(String),
}
