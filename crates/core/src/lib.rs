//! The authorize-and-dispatch pipeline in front of the tool runner.

pub mod error;
pub mod gateway;
pub mod health;
pub mod metrics;
pub mod request;

pub use error::GatewayError;
pub use gateway::{CallOutcome, Gateway, GatewayBuilder};
pub use health::HealthReport;
pub use metrics::{GatewayMetrics, MetricsSnapshot};
pub use request::ToolCallRequest;
