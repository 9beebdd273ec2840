//! Physiological sensor telemetry
//!
//! - `parser`: the `KEY:VALUE` line grammar
//! - `estimator`: smoothing, beat intervals, variability, dosha mix, insights
//! - `link`: threaded input channel with explicit close

pub mod estimator;
pub mod link;
pub mod parser;

pub use estimator::{dosha_balance, interpret, rmssd, synthetic_spo2, BiometricEstimator};
pub use link::{TelemetryLink, TelemetryUpdate};
pub use parser::{parse_line, TelemetryLine};
