//! Coaching text
//!
//! Messages are built from a read-only copy of the energies. `SpeechGate`
//! holds back a repeat of the last spoken text within the cooldown window.

use crate::types::CHAKRA_COUNT;

pub const CHAKRA_NAMES: [&str; CHAKRA_COUNT] = [
    "Root",
    "Sacral",
    "Solar Plexus",
    "Heart",
    "Throat",
    "Third Eye",
    "Crown",
];

/// Display color of each chakra (RGB)
pub const CHAKRA_COLORS: [(u8, u8, u8); CHAKRA_COUNT] = [
    (255, 0, 0),
    (255, 140, 0),
    (255, 255, 0),
    (0, 255, 0),
    (0, 0, 255),
    (255, 0, 255),
    (255, 255, 255),
];

pub const MEDITATION_STARTED: &str = "Deep meditation detected. Your energy is rising rapidly.";
pub const MEDITATION_STOPPED: &str = "Yoga band ho gaya hai. Meditation stopped.";
pub const MEDITATION_ENDED_POSE_HELD: &str = "Meditation ended. Maintaining Yoga pose.";
pub const BALANCED: &str = "All Chakras are perfectly balanced. You are in harmony.";
pub const DEEP_MEDITATION: &str = "Deep meditation achieved. Rest in this stillness.";

/// Index of the lowest energy (first on ties)
pub fn weakest_index(energies: &[f64; CHAKRA_COUNT]) -> usize {
    energies
        .iter()
        .enumerate()
        .fold(0, |best, (i, e)| if *e < energies[best] { i } else { best })
}

/// Index of the highest energy (first on ties)
pub fn strongest_index(energies: &[f64; CHAKRA_COUNT]) -> usize {
    energies
        .iter()
        .enumerate()
        .fold(0, |best, (i, e)| if *e > energies[best] { i } else { best })
}

/// Mood label from smoothed heart rate
pub fn mood_label(heart_rate: u32) -> &'static str {
    match heart_rate {
        0 => "Calm",
        1..=64 => "Deeply Relaxed",
        65..=84 => "Calm & Balanced",
        85..=109 => "Active / Focused",
        _ => "High Energy",
    }
}

/// Coaching message for a newly confirmed posture
///
/// `alignment` is true while meditating; `gyan` when the posture is Gyan.
pub fn coach_message(
    energies: &[f64; CHAKRA_COUNT],
    mood: &str,
    alignment: bool,
    gyan: bool,
) -> String {
    if gyan {
        return "Gyan Mudra detected — Deep Meditation Mode.".to_string();
    }
    if alignment {
        return "✨ Alignment Mode: All chakras are being gently balanced...".to_string();
    }

    let weakest = CHAKRA_NAMES[weakest_index(energies)];
    let strongest = CHAKRA_NAMES[strongest_index(energies)];

    if energies.iter().any(|e| *e < 0.3) {
        format!("Tip: {weakest} is low. Try its gesture to recharge. ({mood})")
    } else if energies.iter().all(|e| *e > 0.7) {
        format!("Beautiful! Your energy looks balanced. Stay with your breath. ({mood})")
    } else {
        format!("Focus on breath. {strongest} is strong, {weakest} needs love. ({mood})")
    }
}

/// Calmness score: mean of heart and crown energies, as a percentage
pub fn calmness(energies: &[f64; CHAKRA_COUNT]) -> f64 {
    (energies[3] + energies[6]) / 2.0 * 100.0
}

/// Suppresses repeating the last spoken text within a cooldown
#[derive(Debug, Clone)]
pub struct SpeechGate {
    cooldown_ms: u64,
    last: Option<(String, u64)>,
}

impl SpeechGate {
    pub fn new(cooldown_ms: u64) -> Self {
        Self {
            cooldown_ms,
            last: None,
        }
    }

    /// Returns true and records the text when it may be spoken now
    pub fn admit(&mut self, text: &str, now_ms: u64) -> bool {
        let allowed = match &self.last {
            Some((last_text, last_ms)) => {
                last_text != text || now_ms.saturating_sub(*last_ms) >= self.cooldown_ms
            }
            None => true,
        };
        if allowed {
            self.last = Some((text.to_string(), now_ms));
        }
        allowed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weakest_and_strongest() {
        let energies = [0.5, 0.2, 0.9, 0.2, 0.4, 0.9, 0.6];
        assert_eq!(weakest_index(&energies), 1);
        assert_eq!(strongest_index(&energies), 2);
        assert_eq!(weakest_index(&[1.0; 7]), 0);
    }

    #[test]
    fn test_mood_labels() {
        assert_eq!(mood_label(0), "Calm");
        assert_eq!(mood_label(60), "Deeply Relaxed");
        assert_eq!(mood_label(65), "Calm & Balanced");
        assert_eq!(mood_label(100), "Active / Focused");
        assert_eq!(mood_label(110), "High Energy");
    }

    #[test]
    fn test_coach_message_rules() {
        let low = [0.5, 0.1, 0.5, 0.5, 0.5, 0.8, 0.5];
        assert_eq!(
            coach_message(&low, "Calm", false, false),
            "Tip: Sacral is low. Try its gesture to recharge. (Calm)"
        );

        let high = [0.8; 7];
        assert_eq!(
            coach_message(&high, "Calm & Balanced", false, false),
            "Beautiful! Your energy looks balanced. Stay with your breath. (Calm & Balanced)"
        );

        let mixed = [0.4, 0.5, 0.9, 0.5, 0.5, 0.5, 0.5];
        assert_eq!(
            coach_message(&mixed, "Calm", false, false),
            "Focus on breath. Solar Plexus is strong, Root needs love. (Calm)"
        );
    }

    #[test]
    fn test_gyan_and_alignment_take_precedence() {
        let low = [0.0; 7];
        assert!(coach_message(&low, "Calm", true, true).starts_with("Gyan Mudra detected"));
        assert!(coach_message(&low, "Calm", true, false).contains("Alignment Mode"));
    }

    #[test]
    fn test_speech_gate() {
        let mut gate = SpeechGate::new(10_000);
        assert!(gate.admit("hello", 0));
        assert!(!gate.admit("hello", 5_000));
        assert!(gate.admit("other", 6_000));
        assert!(gate.admit("hello", 7_000));
        assert!(!gate.admit("hello", 16_999));
        assert!(gate.admit("hello", 17_000));
    }

    #[test]
    fn test_calmness() {
        let energies = [0.0, 0.0, 0.0, 0.6, 0.0, 0.0, 0.8];
        assert!((calmness(&energies) - 70.0).abs() < 1e-9);
    }
}
