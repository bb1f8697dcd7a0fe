pub mod api;
pub mod config;
pub mod envelope;
pub mod error;
pub mod handler;
pub mod image;
pub mod logging;
pub mod metrics;
pub mod prompt;
pub mod signal;
pub mod vision;

pub use envelope::{RequestEnvelope, ResponseEnvelope};
pub use handler::{AnalyzerConfig, SignalRequestHandler};
