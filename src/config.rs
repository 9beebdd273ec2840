//! Engine configuration
//!
//! Every tunable constant of the engine lives here with its default value.
//! All structs accept partial JSON: missing fields fall back to defaults.

use crate::error::FlowError;
use serde::{Deserialize, Serialize};

/// Hand posture classifier thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostureConfig {
    /// Tip-to-tip proximity threshold, relative to hand scale
    pub proximity_threshold: f64,
    /// Wrist-to-wrist distance for Namaste, in raw normalized frame units
    pub namaste_threshold: f64,
}

impl Default for PostureConfig {
    fn default() -> Self {
        Self {
            proximity_threshold: 0.35,
            namaste_threshold: 0.20,
        }
    }
}

/// Face analyzer thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FaceConfig {
    /// Eyes are closed when the average EAR falls below this value
    pub ear_threshold: f64,
    /// Multiplier applied to the normalized iris offset
    pub gaze_sensitivity: f64,
}

impl Default for FaceConfig {
    fn default() -> Self {
        Self {
            ear_threshold: 0.30,
            gaze_sensitivity: 4.0,
        }
    }
}

/// Debounce and hysteresis windows (milliseconds)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebounceConfig {
    /// Time a raw posture must persist before it is confirmed
    pub gesture_stability_ms: u64,
    /// Continuous eyes-closed time before meditation starts
    pub meditation_enter_ms: u64,
    /// Continuous eyes-open (or face lost) time before meditation ends
    pub meditation_exit_ms: u64,
    /// Identical speech text is suppressed within this window
    pub speech_cooldown_ms: u64,
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self {
            gesture_stability_ms: 500,
            meditation_enter_ms: 1000,
            meditation_exit_ms: 2000,
            speech_cooldown_ms: 10_000,
        }
    }
}

/// Ceiling and per-frame rates of one energy mode
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModeRates {
    pub ceiling: f64,
    pub rise: f64,
    pub decay: f64,
}

/// Energy dynamics parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnergyConfig {
    pub meditating_with_gesture: ModeRates,
    pub meditating: ModeRates,
    pub gesture: ModeRates,
    pub present: ModeRates,
    pub idle: ModeRates,
    /// Extra per-frame rise on root and crown while Gyan is confirmed
    pub gyan_boost: f64,
    /// Aura intensity step per frame
    pub aura_rate: f64,
    /// Every energy must exceed this for the balanced event
    pub balanced_threshold: f64,
    /// Root energy above this counts as deep meditation
    pub deep_meditation_threshold: f64,
    /// Minimum time between two deep meditation announcements
    pub deep_meditation_interval_ms: u64,
}

impl Default for EnergyConfig {
    fn default() -> Self {
        Self {
            meditating_with_gesture: ModeRates {
                ceiling: 1.0,
                rise: 0.05,
                decay: 0.05,
            },
            meditating: ModeRates {
                ceiling: 1.0,
                rise: 0.02,
                decay: 0.0,
            },
            gesture: ModeRates {
                ceiling: 0.6,
                rise: 0.01,
                decay: 0.05,
            },
            present: ModeRates {
                ceiling: 0.3,
                rise: 0.005,
                decay: 0.05,
            },
            idle: ModeRates {
                ceiling: 0.1,
                rise: 0.0,
                decay: 0.05,
            },
            gyan_boost: 0.01,
            aura_rate: 0.08,
            balanced_threshold: 0.95,
            deep_meditation_threshold: 0.95,
            deep_meditation_interval_ms: 15_000,
        }
    }
}

/// XP and level parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressionConfig {
    pub base_reward: f64,
    pub gesture_reward: f64,
    pub meditation_reward: f64,
    pub xp_per_level: f64,
    pub max_level: u32,
    /// From this level on a confirmed gesture is required to earn XP
    pub gesture_gate_level: u32,
    /// From this level on meditation is required to earn XP
    pub meditation_gate_level: u32,
}

impl Default for ProgressionConfig {
    fn default() -> Self {
        Self {
            base_reward: 1.0,
            gesture_reward: 1.0,
            meditation_reward: 2.0,
            xp_per_level: 150.0,
            max_level: 20,
            gesture_gate_level: 3,
            meditation_gate_level: 10,
        }
    }
}

/// Where the displayed SpO2 value comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Spo2Source {
    /// Cosmetic 97-100 oscillation whenever a heart rate is present
    Synthetic,
    /// Use the sensor's SpO2 token when present, otherwise fall back to synthetic
    Sensor,
}

/// Telemetry estimator parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Heart-rate moving average window (samples)
    pub hr_window: usize,
    /// Inter-beat interval history (samples)
    pub ibi_window: usize,
    pub ibi_min_ms: f64,
    pub ibi_max_ms: f64,
    /// Minimum IBI count before RMSSD is computed
    pub hrv_min_samples: usize,
    /// Reported HRV when there are too few samples
    pub hrv_default: f64,
    pub stale_timeout_ms: u64,
    pub insight_interval_ms: u64,
    pub spo2_source: Spo2Source,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            hr_window: 10,
            ibi_window: 20,
            ibi_min_ms: 300.0,
            ibi_max_ms: 1500.0,
            hrv_min_samples: 5,
            hrv_default: 50.0,
            stale_timeout_ms: 3000,
            insight_interval_ms: 15_000,
            spo2_source: Spo2Source::Synthetic,
        }
    }
}

/// Complete engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub posture: PostureConfig,
    pub face: FaceConfig,
    pub debounce: DebounceConfig,
    pub energy: EnergyConfig,
    pub progression: ProgressionConfig,
    pub telemetry: TelemetryConfig,
}

impl EngineConfig {
    /// Load configuration from JSON and validate it
    pub fn from_json(json: &str) -> Result<Self, FlowError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to pretty JSON
    pub fn to_json(&self) -> Result<String, FlowError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject values the engine cannot run with
    pub fn validate(&self) -> Result<(), FlowError> {
        let stability = self.debounce.gesture_stability_ms;
        if !(300..=500).contains(&stability) {
            return Err(FlowError::ConfigError(format!(
                "gesture_stability_ms must be within 300-500, got {stability}"
            )));
        }
        if self.progression.xp_per_level <= 0.0 {
            return Err(FlowError::ConfigError(
                "xp_per_level must be positive".to_string(),
            ));
        }
        if self.progression.max_level == 0 {
            return Err(FlowError::ConfigError(
                "max_level must be at least 1".to_string(),
            ));
        }
        if self.telemetry.hr_window == 0 || self.telemetry.ibi_window < 2 {
            return Err(FlowError::ConfigError(
                "telemetry windows are too small".to_string(),
            ));
        }
        let modes = [
            ("meditating_with_gesture", &self.energy.meditating_with_gesture),
            ("meditating", &self.energy.meditating),
            ("gesture", &self.energy.gesture),
            ("present", &self.energy.present),
            ("idle", &self.energy.idle),
        ];
        for (name, mode) in modes {
            if !(0.0..=1.0).contains(&mode.ceiling) || mode.rise < 0.0 || mode.decay < 0.0 {
                return Err(FlowError::ConfigError(format!(
                    "energy mode {name} has out-of-range values"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config =
            EngineConfig::from_json(r#"{"debounce": {"gesture_stability_ms": 300}}"#).unwrap();
        assert_eq!(config.debounce.gesture_stability_ms, 300);
        assert_eq!(config.debounce.meditation_exit_ms, 2000);
        assert_eq!(config.progression.max_level, 20);
    }

    #[test]
    fn test_round_trip() {
        let config = EngineConfig::default();
        let json = config.to_json().unwrap();
        assert_eq!(EngineConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn test_rejects_stability_outside_band() {
        let result = EngineConfig::from_json(r#"{"debounce": {"gesture_stability_ms": 50}}"#);
        assert!(matches!(result, Err(FlowError::ConfigError(_))));
    }

    #[test]
    fn test_spo2_source_snake_case() {
        let config =
            EngineConfig::from_json(r#"{"telemetry": {"spo2_source": "sensor"}}"#).unwrap();
        assert_eq!(config.telemetry.spo2_source, Spo2Source::Sensor);
    }
}
