//! Energy dynamics
//!
//! Seven leaky integrators, root (0) to crown (6), owned exclusively by
//! `EnergyEngine`. Each frame selects one mode from the confirmed gesture,
//! meditation and face presence; every energy then steps toward that mode's
//! ceiling, rising by the mode's rise rate when below it and falling by its
//! decay rate when above it. A value never crosses the active ceiling.

use crate::config::{EnergyConfig, ModeRates};
use crate::types::{ConfirmedState, Posture, CHAKRA_COUNT};
use serde::{Deserialize, Serialize};
use tracing::debug;

const ROOT: usize = 0;
const CROWN: usize = CHAKRA_COUNT - 1;

/// Active energy mode, highest reward first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnergyMode {
    MeditatingWithGesture,
    Meditating,
    Gesture,
    Present,
    Idle,
}

impl EnergyMode {
    pub fn select(posture: Option<Posture>, meditating: bool, face_present: bool) -> Self {
        match (meditating, posture.is_some(), face_present) {
            (true, true, _) => EnergyMode::MeditatingWithGesture,
            (true, false, _) => EnergyMode::Meditating,
            (false, true, _) => EnergyMode::Gesture,
            (false, false, true) => EnergyMode::Present,
            (false, false, false) => EnergyMode::Idle,
        }
    }

    fn rates(&self, config: &EnergyConfig) -> ModeRates {
        match self {
            EnergyMode::MeditatingWithGesture => config.meditating_with_gesture,
            EnergyMode::Meditating => config.meditating,
            EnergyMode::Gesture => config.gesture,
            EnergyMode::Present => config.present,
            EnergyMode::Idle => config.idle,
        }
    }
}

/// Inputs to one energy step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnergyInput {
    pub posture: Option<Posture>,
    pub meditating: bool,
    pub face_present: bool,
    /// Confirmed state before any balanced override
    pub base_state: ConfirmedState,
}

/// What happened during one energy step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnergyOutcome {
    pub mode: EnergyMode,
    /// All energies crossed the balanced threshold and the latch was free
    pub balanced: bool,
    /// Deep meditation announcement is due
    pub deep_meditation: bool,
}

/// Owner of the energy bank and aura intensity
#[derive(Debug, Clone)]
pub struct EnergyEngine {
    config: EnergyConfig,
    energies: [f64; CHAKRA_COUNT],
    aura: f64,
    /// Base state at which the balanced event last fired
    balanced_latch: Option<ConfirmedState>,
    last_deep_meditation_ms: Option<u64>,
}

impl Default for EnergyEngine {
    fn default() -> Self {
        Self::new(EnergyConfig::default())
    }
}

impl EnergyEngine {
    pub fn new(config: EnergyConfig) -> Self {
        Self {
            config,
            energies: [0.0; CHAKRA_COUNT],
            aura: 0.0,
            balanced_latch: None,
            last_deep_meditation_ms: None,
        }
    }

    /// Start from a given energy bank, clamped to [0, 1]
    pub fn with_energies(mut self, energies: [f64; CHAKRA_COUNT]) -> Self {
        self.energies = energies.map(|e| e.clamp(0.0, 1.0));
        self
    }

    /// Copy of the current energies
    pub fn energies(&self) -> [f64; CHAKRA_COUNT] {
        self.energies
    }

    pub fn aura_intensity(&self) -> f64 {
        self.aura
    }

    /// Whether the balanced latch is holding
    pub fn is_balanced(&self) -> bool {
        self.balanced_latch.is_some()
    }

    /// Advance every integrator by one frame
    pub fn step(&mut self, input: &EnergyInput, now_ms: u64) -> EnergyOutcome {
        let mode = EnergyMode::select(input.posture, input.meditating, input.face_present);
        let rates = mode.rates(&self.config);

        for (index, energy) in self.energies.iter_mut().enumerate() {
            let mut rise = rates.rise;
            if mode == EnergyMode::Gesture
                && input.posture == Some(Posture::Gyan)
                && (index == ROOT || index == CROWN)
            {
                rise += self.config.gyan_boost;
            }
            *energy = approach(*energy, rates.ceiling, rise, rates.decay);
        }

        let yoga = input.posture.is_some() || input.meditating;
        self.aura = if yoga {
            (self.aura + self.config.aura_rate).min(1.0)
        } else {
            (self.aura - self.config.aura_rate).max(0.0)
        };

        EnergyOutcome {
            mode,
            balanced: self.update_balanced_latch(input.base_state),
            deep_meditation: self.deep_meditation_due(mode, now_ms),
        }
    }

    fn update_balanced_latch(&mut self, base_state: ConfirmedState) -> bool {
        if self.balanced_latch.is_some_and(|latched| latched != base_state) {
            debug!("balanced latch released");
            self.balanced_latch = None;
        }

        let threshold = self.config.balanced_threshold;
        if self.balanced_latch.is_none() && self.energies.iter().all(|e| *e > threshold) {
            self.balanced_latch = Some(base_state);
            return true;
        }
        false
    }

    fn deep_meditation_due(&mut self, mode: EnergyMode, now_ms: u64) -> bool {
        if mode != EnergyMode::MeditatingWithGesture
            || self.energies[ROOT] <= self.config.deep_meditation_threshold
        {
            return false;
        }

        let interval = self.config.deep_meditation_interval_ms;
        let due = self
            .last_deep_meditation_ms
            .map_or(true, |last| now_ms.saturating_sub(last) >= interval);
        if due {
            self.last_deep_meditation_ms = Some(now_ms);
        }
        due
    }
}

/// Step `value` toward `ceiling` without crossing it
fn approach(value: f64, ceiling: f64, rise: f64, decay: f64) -> f64 {
    let next = if value < ceiling {
        (value + rise).min(ceiling)
    } else if value > ceiling {
        (value - decay).max(ceiling)
    } else {
        value
    };
    next.clamp(0.0, 1.0)
}
