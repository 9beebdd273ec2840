//! XP and level progression
//!
//! Rewards are additive per frame: a base reward for face presence, plus a
//! gesture bonus and a larger meditation bonus on top of it. Two gating bands
//! zero the reward unless the frame shows the behavior the band demands. The
//! resulting warning is recomputed every frame and never debounced.

use crate::config::ProgressionConfig;
use crate::types::ProgressWarning;
use tracing::info;

/// Behavior observed in one frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameActivity {
    pub face_present: bool,
    pub gesture_confirmed: bool,
    pub meditating: bool,
}

/// Result of one progression step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressOutcome {
    /// XP actually added this frame
    pub reward: f64,
    pub warning: Option<ProgressWarning>,
    /// New level when a boundary was crossed
    pub level_up: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct ProgressionEngine {
    config: ProgressionConfig,
    xp: f64,
    level: u32,
}

impl Default for ProgressionEngine {
    fn default() -> Self {
        Self::new(ProgressionConfig::default())
    }
}

impl ProgressionEngine {
    pub fn new(config: ProgressionConfig) -> Self {
        Self {
            config,
            xp: 0.0,
            level: 1,
        }
    }

    /// Resume from a given XP total
    pub fn with_xp(mut self, xp: f64) -> Self {
        self.xp = xp.max(0.0);
        self.level = self.level_for(self.xp);
        self
    }

    pub fn xp(&self) -> f64 {
        self.xp
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    /// Fraction of the current level completed, 1.0 at the maximum level
    pub fn level_progress(&self) -> f64 {
        if self.level >= self.config.max_level {
            return 1.0;
        }
        let start = (self.level - 1) as f64 * self.config.xp_per_level;
        ((self.xp - start) / self.config.xp_per_level).clamp(0.0, 1.0)
    }

    pub fn step(&mut self, activity: FrameActivity) -> ProgressOutcome {
        let mut reward = 0.0;
        if activity.face_present {
            reward += self.config.base_reward;
            if activity.gesture_confirmed {
                reward += self.config.gesture_reward;
            }
            if activity.meditating {
                reward += self.config.meditation_reward;
            }
        }

        let mut warning = None;
        if self.level >= self.config.meditation_gate_level {
            if !activity.meditating {
                reward = 0.0;
                warning = Some(ProgressWarning::CloseEyes);
            }
        } else if self.level >= self.config.gesture_gate_level && !activity.gesture_confirmed {
            reward = 0.0;
            warning = Some(ProgressWarning::MudraRequired);
        }

        if self.level >= self.config.max_level {
            return ProgressOutcome {
                reward: 0.0,
                warning,
                level_up: None,
            };
        }

        self.xp += reward;
        let level = self.level_for(self.xp);
        let level_up = (level > self.level).then(|| {
            info!(level, xp = self.xp, "level up");
            level
        });
        self.level = level;

        ProgressOutcome {
            reward,
            warning,
            level_up,
        }
    }

    fn level_for(&self, xp: f64) -> u32 {
        let level = (xp / self.config.xp_per_level).floor() as u32 + 1;
        level.min(self.config.max_level)
    }
}

/// Announcement spoken on reaching a level
pub fn level_up_message(level: u32) -> String {
    format!("Level {level} Reached!")
}

#[cfg(test)]
mod tests {
    use super::*;

    const FACE_ONLY: FrameActivity = FrameActivity {
        face_present: true,
        gesture_confirmed: false,
        meditating: false,
    };

    #[test]
    fn test_rewards_are_additive() {
        let mut engine = ProgressionEngine::default();
        let outcome = engine.step(FrameActivity {
            face_present: true,
            gesture_confirmed: true,
            meditating: true,
        });
        assert_eq!(outcome.reward, 4.0);
        assert_eq!(engine.xp(), 4.0);
    }

    #[test]
    fn test_no_face_no_reward() {
        let mut engine = ProgressionEngine::default();
        let outcome = engine.step(FrameActivity {
            face_present: false,
            gesture_confirmed: true,
            meditating: false,
        });
        assert_eq!(outcome.reward, 0.0);
    }

    #[test]
    fn test_ungated_at_level_two() {
        let mut engine = ProgressionEngine::default().with_xp(200.0);
        assert_eq!(engine.level(), 2);
        let outcome = engine.step(FACE_ONLY);
        assert_eq!(outcome.reward, 1.0);
        assert_eq!(outcome.warning, None);
        assert_eq!(engine.xp(), 201.0);
    }

    #[test]
    fn test_mudra_required_band() {
        let mut engine = ProgressionEngine::default().with_xp(650.0);
        assert_eq!(engine.level(), 5);
        let outcome = engine.step(FACE_ONLY);
        assert_eq!(outcome.reward, 0.0);
        assert_eq!(outcome.warning, Some(ProgressWarning::MudraRequired));
        assert_eq!(engine.xp(), 650.0);

        // Warning clears as soon as the condition holds
        let outcome = engine.step(FrameActivity {
            gesture_confirmed: true,
            ..FACE_ONLY
        });
        assert_eq!(outcome.reward, 2.0);
        assert_eq!(outcome.warning, None);
    }

    #[test]
    fn test_close_eyes_band() {
        let mut engine = ProgressionEngine::default().with_xp(1400.0);
        assert_eq!(engine.level(), 10);
        let outcome = engine.step(FrameActivity {
            gesture_confirmed: true,
            ..FACE_ONLY
        });
        assert_eq!(outcome.reward, 0.0);
        assert_eq!(outcome.warning, Some(ProgressWarning::CloseEyes));

        let outcome = engine.step(FrameActivity {
            meditating: true,
            ..FACE_ONLY
        });
        assert_eq!(outcome.reward, 3.0);
        assert_eq!(outcome.warning, None);
    }

    #[test]
    fn test_level_up_fires_once() {
        let mut engine = ProgressionEngine::default().with_xp(148.0);
        assert_eq!(engine.step(FACE_ONLY).level_up, None);
        assert_eq!(engine.step(FACE_ONLY).level_up, Some(2));
        assert_eq!(engine.step(FACE_ONLY).level_up, None);
        assert_eq!(level_up_message(2), "Level 2 Reached!");
    }

    #[test]
    fn test_max_level_stops_accumulation() {
        let mut engine = ProgressionEngine::default().with_xp(10_000.0);
        assert_eq!(engine.level(), 20);
        assert_eq!(engine.level_progress(), 1.0);
        let outcome = engine.step(FrameActivity {
            meditating: true,
            ..FACE_ONLY
        });
        assert_eq!(outcome.reward, 0.0);
        assert_eq!(engine.xp(), 10_000.0);
    }

    #[test]
    fn test_level_progress() {
        let engine = ProgressionEngine::default().with_xp(225.0);
        assert_eq!(engine.level(), 2);
        assert!((engine.level_progress() - 0.5).abs() < 1e-12);
    }
}
