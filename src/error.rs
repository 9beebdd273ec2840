//! Error types for Mudra Flow
//!
//! Only boundary operations return errors (decoding frames and configuration,
//! validating landmark sets, talking to external sources). The per-frame core
//! handles absent or malformed input locally and never fails.

use thiserror::Error;

/// Errors that can occur at the engine's boundaries
#[derive(Debug, Error)]
pub enum FlowError {
    #[error("Failed to parse input: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid landmark set: {0}")]
    InvalidLandmarks(String),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("Source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("Telemetry link is closed")]
    TelemetryClosed,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
