//! Mudra Flow - Real-time biofeedback core for webcam meditation sessions
//!
//! Flow turns per-frame hand and face landmarks, plus an optional stream of
//! physiological telemetry, into a session state through a deterministic
//! pipeline: perception → debouncing → energy dynamics → progression.
//!
//! ## Modules
//!
//! - **Perception**: hand posture classification and face state (eye openness, gaze)
//! - **Telemetry**: sensor line parsing and biometric estimation on its own thread
//! - **Session**: per-frame orchestration, coaching events and the session report
//! - **Frame loop**: drives a session against detector, speech and render collaborators

pub mod coach;
pub mod config;
pub mod debounce;
pub mod energy;
pub mod error;
pub mod events;
pub mod face;
pub mod frame_loop;
pub mod landmarks;
pub mod posture;
pub mod progression;
pub mod render;
pub mod session;
pub mod telemetry;
pub mod types;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use config::EngineConfig;
pub use error::FlowError;
pub use events::Event;
pub use frame_loop::{FrameLoop, LandmarkSource, RenderSink, SpeechSink, StopHandle};
pub use landmarks::{Detection, FaceLandmarks, HandLandmarks, LandmarkPoint};
pub use session::{SessionEngine, SessionReport};
pub use telemetry::{parse_line, BiometricEstimator, TelemetryLink, TelemetryUpdate};
pub use types::{
    BiometricSnapshot, ConfirmedState, FrameOutput, Posture, ProgressWarning, SessionSnapshot,
};

/// Library version embedded in session reports
pub const MUDRA_FLOW_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for session reports
pub const PRODUCER_NAME: &str = "mudra-flow";
