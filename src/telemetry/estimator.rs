//! Biometric estimation from telemetry lines
//!
//! Holds the rolling state of the sensor channel: a heart-rate moving average,
//! an inter-beat interval (IBI) history, and the last published snapshot. Every
//! accepted line produces a fresh snapshot; `tick` resets the displayed values
//! once the sensor has been silent for the stale timeout.

use super::parser::TelemetryLine;
use crate::config::{Spo2Source, TelemetryConfig};
use crate::types::{BiometricSnapshot, DoshaBalance};
use std::collections::VecDeque;
use tracing::debug;

/// Weight each dosha starts from before its boost
const DOSHA_SEED: f64 = 0.3;
/// Weight added when a dosha's condition holds
const DOSHA_BOOST: f64 = 0.4;
/// A dosha above this weight is reported as dominant
const DOSHA_DOMINANT: f64 = 0.4;

/// Stateful estimator for one sensor channel
#[derive(Debug, Clone)]
pub struct BiometricEstimator {
    config: TelemetryConfig,
    /// Recent non-zero heart-rate samples (bpm)
    hr_samples: VecDeque<f64>,
    /// Accepted inter-beat intervals (ms)
    ibis: VecDeque<f64>,
    last_beat_ms: Option<u64>,
    last_data_ms: Option<u64>,
    last_insight_ms: Option<u64>,
    stale: bool,
    snapshot: BiometricSnapshot,
}

impl Default for BiometricEstimator {
    fn default() -> Self {
        Self::new(TelemetryConfig::default())
    }
}

impl BiometricEstimator {
    pub fn new(config: TelemetryConfig) -> Self {
        Self {
            hr_samples: VecDeque::with_capacity(config.hr_window),
            ibis: VecDeque::with_capacity(config.ibi_window),
            config,
            last_beat_ms: None,
            last_data_ms: None,
            last_insight_ms: None,
            stale: false,
            snapshot: BiometricSnapshot::default(),
        }
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> &BiometricSnapshot {
        &self.snapshot
    }

    /// Mark the channel open or closed without touching readings
    pub fn set_connected(&mut self, connected: bool) {
        self.snapshot.is_connected = connected;
    }

    /// Fold one parsed line into the estimate.
    ///
    /// Lines without a heart-rate or SpO2 reading are ignored and return `None`.
    pub fn ingest(&mut self, line: &TelemetryLine, now_ms: u64) -> Option<BiometricSnapshot> {
        if !line.has_vitals() {
            return None;
        }

        self.last_data_ms = Some(now_ms);
        self.stale = false;
        self.snapshot.is_connected = true;

        if let Some(raw) = line.heart_rate {
            self.push_heart_rate(raw);
        }

        let beat = self.register_beat(line.beat, line.heart_rate, now_ms);
        let ibis = self.ibis.make_contiguous();
        let hrv = rmssd(ibis, self.config.hrv_min_samples, self.config.hrv_default);
        let doshas = dosha_balance(ibis, hrv, self.config.hrv_min_samples);

        self.snapshot.beat_detected = beat;
        self.snapshot.hrv_index = hrv.round() as u32;
        self.snapshot.doshas = doshas;
        self.snapshot.spo2 = self.spo2_reading(line.spo2, now_ms);

        let interval = self.config.insight_interval_ms;
        let due = self
            .last_insight_ms
            .map_or(true, |last| now_ms.saturating_sub(last) >= interval);
        if due {
            let (finding, insight) =
                interpret(self.snapshot.heart_rate, self.snapshot.hrv_index, &doshas);
            self.snapshot.finding = finding.to_string();
            self.snapshot.insight = insight.to_string();
            self.last_insight_ms = Some(now_ms);
        }

        Some(self.snapshot.clone())
    }

    /// The stream ended: zero the live readings and mark the channel closed
    pub fn disconnect(&mut self) -> BiometricSnapshot {
        debug!("telemetry disconnected, clearing readings");
        self.hr_samples.clear();
        self.snapshot.is_connected = false;
        self.snapshot.heart_rate = 0;
        self.snapshot.spo2 = 0;
        self.snapshot.beat_detected = false;
        self.snapshot.clone()
    }

    /// Check for sensor silence. Returns the reset snapshot on the tick that
    /// first detects staleness, `None` otherwise.
    pub fn tick(&mut self, now_ms: u64) -> Option<BiometricSnapshot> {
        let last = self.last_data_ms?;
        if self.stale || now_ms.saturating_sub(last) < self.config.stale_timeout_ms {
            return None;
        }

        debug!(silent_ms = now_ms - last, "telemetry stale, resetting readings");
        self.stale = true;
        self.hr_samples.clear();
        self.snapshot.heart_rate = 0;
        self.snapshot.spo2 = 0;
        self.snapshot.hrv_index = 0;
        self.snapshot.beat_detected = false;
        Some(self.snapshot.clone())
    }

    fn push_heart_rate(&mut self, raw: f64) {
        if raw <= 0.0 {
            // Signal lost
            self.hr_samples.clear();
            self.snapshot.heart_rate = 0;
            return;
        }

        self.hr_samples.push_back(raw);
        while self.hr_samples.len() > self.config.hr_window {
            self.hr_samples.pop_front();
        }
        let mean = self.hr_samples.iter().sum::<f64>() / self.hr_samples.len() as f64;
        self.snapshot.heart_rate = mean.round() as u32;
    }

    /// Decide whether this line is a beat and record the interval if so.
    ///
    /// Without a `BEAT` token a beat is inferred only from the line's own raw
    /// heart rate.
    fn register_beat(&mut self, explicit: Option<bool>, raw_hr: Option<f64>, now_ms: u64) -> bool {
        let beat = match (explicit, raw_hr) {
            (Some(flag), _) => flag,
            (None, Some(hr)) if hr > 0.0 => self
                .last_beat_ms
                .map_or(true, |last| now_ms.saturating_sub(last) as f64 > 60_000.0 / hr),
            (None, _) => false,
        };
        if !beat {
            return false;
        }

        if let Some(last) = self.last_beat_ms {
            let ibi = now_ms.saturating_sub(last) as f64;
            if ibi > self.config.ibi_min_ms && ibi < self.config.ibi_max_ms {
                self.ibis.push_back(ibi);
                while self.ibis.len() > self.config.ibi_window {
                    self.ibis.pop_front();
                }
            }
        }
        self.last_beat_ms = Some(now_ms);
        true
    }

    fn spo2_reading(&self, sensor: Option<f64>, now_ms: u64) -> u32 {
        if self.config.spo2_source == Spo2Source::Sensor {
            if let Some(value) = sensor.filter(|v| *v > 0.0) {
                return value.clamp(0.0, 100.0).round() as u32;
            }
        }
        if self.snapshot.heart_rate == 0 {
            return 0;
        }
        synthetic_spo2(now_ms)
    }
}

/// Cosmetic SpO2 display value: a slow oscillation around 98, clamped to 97-100
pub fn synthetic_spo2(now_ms: u64) -> u32 {
    let wave = 98.0 + (now_ms as f64 / 1000.0).sin() * 1.5;
    wave.clamp(97.0, 100.0).round() as u32
}

/// Root mean square of successive IBI differences (ms)
///
/// Returns `default` when fewer than `min_samples` intervals are available.
pub fn rmssd(ibis: &[f64], min_samples: usize, default: f64) -> f64 {
    if ibis.len() < min_samples.max(2) {
        return default;
    }
    let sum_sq: f64 = ibis.windows(2).map(|w| (w[1] - w[0]).powi(2)).sum();
    (sum_sq / (ibis.len() - 1) as f64).sqrt()
}

/// Dosha weighting from variability and average heart rate
///
/// Vata rises with high variability, Pitta with a fast heart, Kapha with a
/// slow and steady one. Neutral thirds until enough intervals exist.
pub fn dosha_balance(ibis: &[f64], rmssd: f64, min_samples: usize) -> DoshaBalance {
    if ibis.len() < min_samples.max(1) {
        return DoshaBalance::neutral();
    }

    let avg_ibi = ibis.iter().sum::<f64>() / ibis.len() as f64;
    let bpm = 60_000.0 / avg_ibi;

    let mut vata = DOSHA_SEED;
    let mut pitta = DOSHA_SEED;
    let mut kapha = DOSHA_SEED;
    if rmssd > 50.0 {
        vata += DOSHA_BOOST;
    }
    if bpm > 80.0 {
        pitta += DOSHA_BOOST;
    }
    if bpm < 65.0 && rmssd < 30.0 {
        kapha += DOSHA_BOOST;
    }

    let total = vata + pitta + kapha;
    DoshaBalance {
        vata: vata / total,
        pitta: pitta / total,
        kapha: kapha / total,
    }
}

/// Finding and insight text for the current readings
pub fn interpret(heart_rate: u32, hrv: u32, doshas: &DoshaBalance) -> (&'static str, &'static str) {
    let finding = if doshas.vata > DOSHA_DOMINANT {
        "Dominant: Vata (High Movement)"
    } else if doshas.pitta > DOSHA_DOMINANT {
        "Dominant: Pitta (High Energy)"
    } else if doshas.kapha > DOSHA_DOMINANT {
        "Dominant: Kapha (Stability)"
    } else {
        "Finding: Tridosha Balanced"
    };

    let insight = if heart_rate > 90 {
        "High arousal. Focus on slow exhalations."
    } else if heart_rate > 75 {
        "Slight tension. Soften your shoulders."
    } else if hrv > 60 {
        "Deep state of relaxation detected."
    } else if hrv > 40 {
        "Heart rhythm is steady and calm."
    } else {
        "Excellent physiological coherence."
    };

    (finding, insight)
}
