//! Core types for the Mudra Flow engine
//!
//! Closed enumerations drive control flow; display strings are derived from
//! them and never compared against.

use crate::events::Event;
use serde::{Deserialize, Serialize};

/// Number of chakra energy channels, ordered root to crown
pub const CHAKRA_COUNT: usize = 7;

/// Recognized hand postures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Posture {
    Gyan,
    Prana,
    Apana,
    Surya,
    Varun,
    Namaste,
}

impl Posture {
    /// Single-hand postures in classifier priority order
    pub const SINGLE_HAND: [Posture; 5] = [
        Posture::Gyan,
        Posture::Prana,
        Posture::Apana,
        Posture::Surya,
        Posture::Varun,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Posture::Gyan => "gyan",
            Posture::Prana => "prana",
            Posture::Apana => "apana",
            Posture::Surya => "surya",
            Posture::Varun => "varun",
            Posture::Namaste => "namaste",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Posture::Gyan => "Gyan Mudra",
            Posture::Prana => "Prana Mudra",
            Posture::Apana => "Apana Mudra",
            Posture::Surya => "Surya Mudra",
            Posture::Varun => "Varun Mudra",
            Posture::Namaste => "Namaste / Anjali Mudra",
        }
    }
}

/// The stable, user-facing state of the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "posture", rename_all = "snake_case")]
pub enum ConfirmedState {
    Idle,
    Posture(Posture),
    Meditation,
    Balanced,
}

impl ConfirmedState {
    pub fn display_name(&self) -> &'static str {
        match self {
            ConfirmedState::Idle => "None",
            ConfirmedState::Posture(posture) => posture.display_name(),
            ConfirmedState::Meditation => "Meditation",
            ConfirmedState::Balanced => "Balanced",
        }
    }
}

/// Normalized three-way dosha weighting (sums to 1)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DoshaBalance {
    pub vata: f64,
    pub pitta: f64,
    pub kapha: f64,
}

impl DoshaBalance {
    /// Equal weighting used before enough beats have been observed
    pub fn neutral() -> Self {
        Self {
            vata: 1.0 / 3.0,
            pitta: 1.0 / 3.0,
            kapha: 1.0 / 3.0,
        }
    }
}

impl Default for DoshaBalance {
    fn default() -> Self {
        Self::neutral()
    }
}

/// Latest physiological readings published by the telemetry estimator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiometricSnapshot {
    /// Smoothed heart rate (bpm), 0 when no signal
    pub heart_rate: u32,
    /// Displayed SpO2 percentage, 0 when no signal
    pub spo2: u32,
    /// A beat was registered by the line that produced this snapshot
    pub beat_detected: bool,
    pub is_connected: bool,
    /// RMSSD-style variability index (ms)
    pub hrv_index: u32,
    pub doshas: DoshaBalance,
    pub insight: String,
    pub finding: String,
}

impl Default for BiometricSnapshot {
    fn default() -> Self {
        Self {
            heart_rate: 0,
            spo2: 0,
            beat_detected: false,
            is_connected: false,
            hrv_index: 50,
            doshas: DoshaBalance::neutral(),
            insight: "Scanning bio-rhythms...".to_string(),
            finding: "Scanning...".to_string(),
        }
    }
}

/// Transient progression warning, recomputed every frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressWarning {
    MudraRequired,
    CloseEyes,
}

impl ProgressWarning {
    pub fn message(&self) -> &'static str {
        match self {
            ProgressWarning::MudraRequired => "MUDRA REQUIRED TO PROGRESS!",
            ProgressWarning::CloseEyes => "CLOSE EYES TO PROGRESS!",
        }
    }
}

/// Read-only view of session state after a frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub timestamp_ms: u64,
    pub energies: [f64; CHAKRA_COUNT],
    pub confirmed: ConfirmedState,
    /// Confirmed posture on the gesture axis, independent of meditation
    pub posture: Option<Posture>,
    pub is_meditating: bool,
    pub face_present: bool,
    pub aura_intensity: f64,
    pub xp: f64,
    pub level: u32,
    /// Fraction of the way to the next level (1.0 at max level)
    pub level_progress: f64,
    pub warning: Option<ProgressWarning>,
    pub feedback: String,
    pub biometrics: BiometricSnapshot,
}

/// Result of processing one frame
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameOutput {
    pub snapshot: SessionSnapshot,
    pub events: Vec<Event>,
}
