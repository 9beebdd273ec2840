//! Debounce state machines
//!
//! Two independent axes turn noisy per-frame signals into stable state:
//!
//! - `GestureDebouncer`: a raw posture must persist for the stability window
//!   before it is confirmed. `Idle → Pending → Confirmed`, back to `Idle`
//!   whenever no posture is seen.
//! - `MeditationDetector`: eyes closed for the enter window starts meditation,
//!   eyes open (or no face) for the longer exit window ends it.
//!   `Awake → FallingAsleep → Meditating → Waking`.
//!
//! The stability and exit guards use `>=`: a window of W ms is met by a frame
//! exactly W ms after it opened. Meditation entry is strict: the eyes must stay
//! closed for more than the enter window.

use crate::config::DebounceConfig;
use crate::types::Posture;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Gesture axis state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum GestureState {
    Idle,
    /// A new raw posture is waiting out the stability window. `held` is the
    /// posture confirmed before it, which stays confirmed meanwhile.
    Pending {
        posture: Posture,
        since_ms: u64,
        held: Option<Posture>,
    },
    Confirmed { posture: Posture },
}

/// Debounces per-frame raw postures into confirmed ones
#[derive(Debug, Clone)]
pub struct GestureDebouncer {
    stability_ms: u64,
    state: GestureState,
}

impl Default for GestureDebouncer {
    fn default() -> Self {
        Self::new(&DebounceConfig::default())
    }
}

impl GestureDebouncer {
    pub fn new(config: &DebounceConfig) -> Self {
        Self {
            stability_ms: config.gesture_stability_ms,
            state: GestureState::Idle,
        }
    }

    pub fn state(&self) -> GestureState {
        self.state
    }

    /// Currently confirmed posture
    pub fn confirmed(&self) -> Option<Posture> {
        match self.state {
            GestureState::Idle => None,
            GestureState::Pending { held, .. } => held,
            GestureState::Confirmed { posture } => Some(posture),
        }
    }

    /// Feed one frame's raw posture. Returns the posture on the frame it
    /// becomes newly confirmed.
    pub fn update(&mut self, raw: Option<Posture>, now_ms: u64) -> Option<Posture> {
        let Some(raw) = raw else {
            if self.state != GestureState::Idle {
                debug!("gesture released");
            }
            self.state = GestureState::Idle;
            return None;
        };

        match self.state {
            GestureState::Confirmed { posture } if posture == raw => None,
            GestureState::Pending {
                posture, since_ms, ..
            } if posture == raw => {
                if now_ms.saturating_sub(since_ms) >= self.stability_ms {
                    debug!(posture = raw.as_str(), "gesture confirmed");
                    self.state = GestureState::Confirmed { posture: raw };
                    return Some(raw);
                }
                None
            }
            _ => {
                let held = self.confirmed();
                if held == Some(raw) {
                    // Flicker back to the posture that never lost confirmation
                    self.state = GestureState::Confirmed { posture: raw };
                    return None;
                }
                if self.stability_ms == 0 {
                    self.state = GestureState::Confirmed { posture: raw };
                    return Some(raw);
                }
                self.state = GestureState::Pending {
                    posture: raw,
                    since_ms: now_ms,
                    held,
                };
                None
            }
        }
    }
}

/// Meditation axis state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum MeditationState {
    Awake,
    FallingAsleep { since_ms: u64 },
    Meditating,
    Waking { since_ms: u64 },
}

/// Edge reported by the meditation detector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeditationTransition {
    Started,
    Ended,
}

/// Asymmetric hysteresis over the eyes-closed signal
#[derive(Debug, Clone)]
pub struct MeditationDetector {
    enter_ms: u64,
    exit_ms: u64,
    state: MeditationState,
}

impl Default for MeditationDetector {
    fn default() -> Self {
        Self::new(&DebounceConfig::default())
    }
}

impl MeditationDetector {
    pub fn new(config: &DebounceConfig) -> Self {
        Self {
            enter_ms: config.meditation_enter_ms,
            exit_ms: config.meditation_exit_ms,
            state: MeditationState::Awake,
        }
    }

    pub fn state(&self) -> MeditationState {
        self.state
    }

    /// Meditating, including the grace period while waking
    pub fn is_meditating(&self) -> bool {
        matches!(
            self.state,
            MeditationState::Meditating | MeditationState::Waking { .. }
        )
    }

    /// Feed one frame. `eyes_closed` must be false when no face was detected.
    pub fn update(&mut self, eyes_closed: bool, now_ms: u64) -> Option<MeditationTransition> {
        let (next, transition) = match (self.state, eyes_closed) {
            (MeditationState::Awake, true) => (
                MeditationState::FallingAsleep { since_ms: now_ms },
                None,
            ),
            (MeditationState::Awake, false) => (MeditationState::Awake, None),
            (MeditationState::FallingAsleep { since_ms }, true) => {
                if now_ms.saturating_sub(since_ms) > self.enter_ms {
                    (MeditationState::Meditating, Some(MeditationTransition::Started))
                } else {
                    (self.state, None)
                }
            }
            (MeditationState::FallingAsleep { .. }, false) => (MeditationState::Awake, None),
            (MeditationState::Meditating, true) => (MeditationState::Meditating, None),
            (MeditationState::Meditating, false) => {
                (MeditationState::Waking { since_ms: now_ms }, None)
            }
            (MeditationState::Waking { .. }, true) => (MeditationState::Meditating, None),
            (MeditationState::Waking { since_ms }, false) => {
                if now_ms.saturating_sub(since_ms) >= self.exit_ms {
                    (MeditationState::Awake, Some(MeditationTransition::Ended))
                } else {
                    (self.state, None)
                }
            }
        };

        if let Some(transition) = transition {
            debug!(?transition, "meditation edge");
        }
        self.state = next;
        transition
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confirm_after_stability_window() {
        let mut debouncer = GestureDebouncer::default();
        assert_eq!(debouncer.update(Some(Posture::Gyan), 0), None);
        assert_eq!(debouncer.update(Some(Posture::Gyan), 250), None);
        assert_eq!(debouncer.confirmed(), None);
        assert_eq!(debouncer.update(Some(Posture::Gyan), 500), Some(Posture::Gyan));
        assert_eq!(debouncer.confirmed(), Some(Posture::Gyan));
    }

    #[test]
    fn test_short_hold_never_confirms() {
        let mut debouncer = GestureDebouncer::default();
        let mut confirmations = Vec::new();
        for t in 0..500 {
            confirmations.extend(debouncer.update(Some(Posture::Surya), t));
        }
        // Switch at 499 ms of Surya
        for t in 500..2000 {
            confirmations.extend(debouncer.update(Some(Posture::Varun), t));
        }
        assert_eq!(confirmations, vec![Posture::Varun]);
    }

    #[test]
    fn test_confirms_exactly_once() {
        let mut debouncer = GestureDebouncer::default();
        let confirmations: Vec<_> = (0..3000)
            .step_by(16)
            .filter_map(|t| debouncer.update(Some(Posture::Prana), t))
            .collect();
        assert_eq!(confirmations, vec![Posture::Prana]);
    }

    #[test]
    fn test_absent_posture_resets() {
        let mut debouncer = GestureDebouncer::default();
        debouncer.update(Some(Posture::Gyan), 0);
        debouncer.update(Some(Posture::Gyan), 400);
        debouncer.update(None, 450);
        assert_eq!(debouncer.state(), GestureState::Idle);
        // Window restarts from the next sighting
        assert_eq!(debouncer.update(Some(Posture::Gyan), 500), None);
        assert_eq!(debouncer.update(Some(Posture::Gyan), 999), None);
        assert_eq!(debouncer.update(Some(Posture::Gyan), 1000), Some(Posture::Gyan));
    }

    #[test]
    fn test_switch_keeps_previous_until_new_confirmed() {
        let mut debouncer = GestureDebouncer::default();
        debouncer.update(Some(Posture::Gyan), 0);
        debouncer.update(Some(Posture::Gyan), 500);

        assert_eq!(debouncer.update(Some(Posture::Apana), 600), None);
        assert_eq!(debouncer.confirmed(), Some(Posture::Gyan));
        assert_eq!(debouncer.update(Some(Posture::Apana), 1100), Some(Posture::Apana));
        assert_eq!(debouncer.confirmed(), Some(Posture::Apana));
    }

    #[test]
    fn test_flicker_back_to_held_posture_is_silent() {
        let mut debouncer = GestureDebouncer::default();
        debouncer.update(Some(Posture::Gyan), 0);
        debouncer.update(Some(Posture::Gyan), 500);

        debouncer.update(Some(Posture::Varun), 520);
        assert_eq!(debouncer.update(Some(Posture::Gyan), 540), None);
        assert_eq!(
            debouncer.state(),
            GestureState::Confirmed {
                posture: Posture::Gyan
            }
        );
    }

    #[test]
    fn test_meditation_enter_after_window() {
        let mut detector = MeditationDetector::default();
        assert_eq!(detector.update(true, 0), None);
        assert_eq!(detector.update(true, 999), None);
        assert_eq!(detector.update(true, 1000), None);
        assert!(!detector.is_meditating());
        assert_eq!(detector.update(true, 1001), Some(MeditationTransition::Started));
        assert!(detector.is_meditating());
        assert_eq!(detector.update(true, 1100), None);
    }

    #[test]
    fn test_meditation_blink_before_entry_restarts() {
        let mut detector = MeditationDetector::default();
        detector.update(true, 0);
        detector.update(false, 900);
        detector.update(true, 950);
        assert_eq!(detector.update(true, 1500), None);
        assert_eq!(detector.update(true, 1950), None);
        assert_eq!(detector.update(true, 1951), Some(MeditationTransition::Started));
    }

    #[test]
    fn test_meditation_hysteresis() {
        let mut detector = MeditationDetector::default();
        detector.update(true, 0);
        detector.update(true, 1001);
        assert!(detector.is_meditating());

        // Open-closed toggles shorter than the exit window
        let mut t = 1000;
        for _ in 0..5 {
            t += 1900;
            assert_eq!(detector.update(false, t - 1900 + 1), None);
            assert_eq!(detector.update(false, t), None);
            assert_eq!(detector.update(true, t + 1), None);
            assert!(detector.is_meditating());
        }

        // Uninterrupted open period
        let start = t + 100;
        assert_eq!(detector.update(false, start), None);
        assert_eq!(detector.update(false, start + 1999), None);
        assert_eq!(
            detector.update(false, start + 2000),
            Some(MeditationTransition::Ended)
        );
        assert!(!detector.is_meditating());
    }

    #[test]
    fn test_exit_window_longer_than_enter() {
        let config = DebounceConfig::default();
        assert!(config.meditation_exit_ms > config.meditation_enter_ms);
    }
}
