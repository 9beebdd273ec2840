//! Session orchestration
//!
//! `SessionEngine` owns every piece of per-session state and runs the frame
//! pipeline:
//!
//! 1. Posture classification and face analysis
//! 2. Meditation hysteresis and gesture debounce
//! 3. Energy dynamics
//! 4. XP progression
//!
//! Each call returns a read-only snapshot plus the events to dispatch. Nothing
//! here talks to a speech, display or sensor backend.

use crate::coach::{self, SpeechGate, CHAKRA_NAMES};
use crate::config::EngineConfig;
use crate::debounce::{GestureDebouncer, MeditationDetector, MeditationState, MeditationTransition};
use crate::energy::{EnergyEngine, EnergyInput};
use crate::error::FlowError;
use crate::events::Event;
use crate::face::FaceAnalyzer;
use crate::landmarks::Detection;
use crate::posture::PostureClassifier;
use crate::progression::{level_up_message, FrameActivity, ProgressionEngine};
use crate::types::{
    BiometricSnapshot, ConfirmedState, FrameOutput, Posture, ProgressWarning, SessionSnapshot,
    CHAKRA_COUNT,
};
use crate::{MUDRA_FLOW_VERSION, PRODUCER_NAME};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};
use uuid::Uuid;

/// End-of-session summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionReport {
    pub session_id: String,
    pub started_at: DateTime<Utc>,
    pub producer: String,
    pub version: String,
    /// Time between the first and last processed frame
    pub duration_ms: u64,
    pub frames: u64,
    /// Number of confirmations per posture
    pub posture_counts: BTreeMap<Posture, u32>,
    pub meditation_entries: u32,
    pub meditation_ms: u64,
    pub final_energies: [f64; CHAKRA_COUNT],
    pub strongest_chakra: String,
    pub weakest_chakra: String,
    /// Mean of heart and crown energies as a percentage
    pub calmness: f64,
    pub level: u32,
    pub xp: f64,
    pub peak_heart_rate: u32,
}

impl SessionReport {
    pub fn to_json(&self) -> Result<String, FlowError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[derive(Debug, Clone, Default)]
struct SessionStats {
    first_frame_ms: Option<u64>,
    last_frame_ms: Option<u64>,
    frames: u64,
    posture_counts: BTreeMap<Posture, u32>,
    meditation_entries: u32,
    meditation_ms: u64,
    was_meditating: bool,
    peak_heart_rate: u32,
}

/// Per-session engine state, advanced once per frame
pub struct SessionEngine {
    session_id: String,
    started_at: DateTime<Utc>,
    classifier: PostureClassifier,
    face: FaceAnalyzer,
    gesture: GestureDebouncer,
    meditation: MeditationDetector,
    energy: EnergyEngine,
    progression: ProgressionEngine,
    speech: SpeechGate,
    biometrics: BiometricSnapshot,
    confirmed: ConfirmedState,
    face_present: bool,
    warning: Option<ProgressWarning>,
    feedback: String,
    stats: SessionStats,
}

impl Default for SessionEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl SessionEngine {
    /// Create a session with a fresh id
    pub fn new(config: EngineConfig) -> Self {
        let session_id = Uuid::new_v4().to_string();
        info!(%session_id, "session started");
        Self {
            session_id,
            started_at: Utc::now(),
            classifier: PostureClassifier::new(config.posture.clone()),
            face: FaceAnalyzer::new(config.face.clone()),
            gesture: GestureDebouncer::new(&config.debounce),
            meditation: MeditationDetector::new(&config.debounce),
            energy: EnergyEngine::new(config.energy.clone()),
            progression: ProgressionEngine::new(config.progression.clone()),
            speech: SpeechGate::new(config.debounce.speech_cooldown_ms),
            biometrics: BiometricSnapshot::default(),
            confirmed: ConfirmedState::Idle,
            face_present: false,
            warning: None,
            feedback: String::new(),
            stats: SessionStats::default(),
        }
    }

    /// Create a session from JSON configuration
    pub fn from_config_json(json: &str) -> Result<Self, FlowError> {
        Ok(Self::new(EngineConfig::from_json(json)?))
    }

    /// Use a specific session id
    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = session_id.into();
        self
    }

    /// Start from a given XP total
    pub fn with_xp(mut self, xp: f64) -> Self {
        self.progression = self.progression.with_xp(xp);
        self
    }

    /// Start from a given energy bank
    pub fn with_energies(mut self, energies: [f64; CHAKRA_COUNT]) -> Self {
        self.energy = self.energy.with_energies(energies);
        self
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn confirmed_state(&self) -> ConfirmedState {
        self.confirmed
    }

    pub fn biometrics(&self) -> &BiometricSnapshot {
        &self.biometrics
    }

    /// Run one frame of detector output through the pipeline.
    ///
    /// Repeated (stale) detections are processed like any other frame; the
    /// debounce windows only depend on `now_ms`.
    pub fn process_frame(&mut self, detection: &Detection, now_ms: u64) -> FrameOutput {
        let mut events = Vec::new();
        let energies_before = self.energy.energies();

        // Stage 1: per-frame perception
        let raw_posture = self.classifier.classify_frame(&detection.hands);
        let face_state = detection.face.as_ref().map(|face| self.face.analyze(face));
        self.face_present = face_state.is_some();
        let eyes_closed = face_state.is_some_and(|state| state.eyes_closed);

        // Stage 2: debounce both axes
        let meditation_edge = self.meditation.update(eyes_closed, now_ms);
        let newly_confirmed = self.gesture.update(raw_posture, now_ms);
        let posture = self.gesture.confirmed();
        let meditating = self.meditation.is_meditating();

        if meditation_edge == Some(MeditationTransition::Ended) {
            events.push(Event::MeditationEnded {
                posture_held: posture.is_some(),
            });
            if posture.is_none() {
                self.say_ungated(coach::MEDITATION_STOPPED, &mut events);
            } else {
                self.set_feedback(coach::MEDITATION_ENDED_POSE_HELD, &mut events);
            }
        }

        if let Some(confirmed) = newly_confirmed {
            *self.stats.posture_counts.entry(confirmed).or_insert(0) += 1;
            events.push(Event::PostureConfirmed { posture: confirmed });
            let message = coach::coach_message(
                &energies_before,
                coach::mood_label(self.biometrics.heart_rate),
                meditating,
                confirmed == Posture::Gyan,
            );
            self.say(&message, now_ms, &mut events);
        }

        if meditation_edge == Some(MeditationTransition::Started) {
            self.stats.meditation_entries += 1;
            events.push(Event::MeditationStarted);
            self.say(coach::MEDITATION_STARTED, now_ms, &mut events);
        }

        // Stage 3: energy dynamics
        let base_state = if meditating {
            ConfirmedState::Meditation
        } else if let Some(posture) = posture {
            ConfirmedState::Posture(posture)
        } else {
            ConfirmedState::Idle
        };
        let outcome = self.energy.step(
            &EnergyInput {
                posture,
                meditating,
                face_present: self.face_present,
                base_state,
            },
            now_ms,
        );
        if outcome.balanced {
            events.push(Event::Balanced);
            self.say_ungated(coach::BALANCED, &mut events);
        }
        if outcome.deep_meditation {
            events.push(Event::DeepMeditation);
            self.say(coach::DEEP_MEDITATION, now_ms, &mut events);
        }

        let confirmed = if self.energy.is_balanced() {
            ConfirmedState::Balanced
        } else {
            base_state
        };
        if confirmed != self.confirmed {
            debug!(
                from = self.confirmed.display_name(),
                to = confirmed.display_name(),
                "confirmed state changed"
            );
            events.push(Event::StateChanged {
                from: self.confirmed,
                to: confirmed,
            });
            self.confirmed = confirmed;
        }

        // Stage 4: progression
        let progress = self.progression.step(FrameActivity {
            face_present: self.face_present,
            gesture_confirmed: posture.is_some(),
            meditating,
        });
        self.warning = progress.warning;
        if let Some(level) = progress.level_up {
            events.push(Event::LevelUp { level });
            events.push(Event::speak(level_up_message(level)));
        }

        let settled = matches!(self.meditation.state(), MeditationState::Meditating);
        self.record_frame(now_ms, settled);

        FrameOutput {
            snapshot: self.snapshot(now_ms),
            events,
        }
    }

    /// Adopt a biometric snapshot published by the telemetry channel
    pub fn apply_biometrics(&mut self, snapshot: BiometricSnapshot) -> Vec<Event> {
        let mut events = Vec::new();
        self.stats.peak_heart_rate = self.stats.peak_heart_rate.max(snapshot.heart_rate);
        if snapshot.insight != self.biometrics.insight {
            self.set_feedback(&snapshot.insight, &mut events);
        }
        self.biometrics = snapshot;
        events
    }

    /// Read-only view of the session state
    pub fn snapshot(&self, now_ms: u64) -> SessionSnapshot {
        SessionSnapshot {
            timestamp_ms: now_ms,
            energies: self.energy.energies(),
            confirmed: self.confirmed,
            posture: self.gesture.confirmed(),
            is_meditating: self.meditation.is_meditating(),
            face_present: self.face_present,
            aura_intensity: self.energy.aura_intensity(),
            xp: self.progression.xp(),
            level: self.progression.level(),
            level_progress: self.progression.level_progress(),
            warning: self.warning,
            feedback: self.feedback.clone(),
            biometrics: self.biometrics.clone(),
        }
    }

    /// Summarize the session so far
    pub fn report(&self) -> SessionReport {
        let energies = self.energy.energies();
        let duration_ms = match (self.stats.first_frame_ms, self.stats.last_frame_ms) {
            (Some(first), Some(last)) => last.saturating_sub(first),
            _ => 0,
        };

        SessionReport {
            session_id: self.session_id.clone(),
            started_at: self.started_at,
            producer: PRODUCER_NAME.to_string(),
            version: MUDRA_FLOW_VERSION.to_string(),
            duration_ms,
            frames: self.stats.frames,
            posture_counts: self.stats.posture_counts.clone(),
            meditation_entries: self.stats.meditation_entries,
            meditation_ms: self.stats.meditation_ms,
            final_energies: energies,
            strongest_chakra: CHAKRA_NAMES[coach::strongest_index(&energies)].to_string(),
            weakest_chakra: CHAKRA_NAMES[coach::weakest_index(&energies)].to_string(),
            calmness: coach::calmness(&energies),
            level: self.progression.level(),
            xp: self.progression.xp(),
            peak_heart_rate: self.stats.peak_heart_rate,
        }
    }

    /// Meditation time counts frame intervals that start and end in `Meditating`
    fn record_frame(&mut self, now_ms: u64, meditating: bool) {
        if meditating && self.stats.was_meditating {
            if let Some(last) = self.stats.last_frame_ms {
                self.stats.meditation_ms += now_ms.saturating_sub(last);
            }
        }
        self.stats.was_meditating = meditating;
        self.stats.first_frame_ms.get_or_insert(now_ms);
        self.stats.last_frame_ms = Some(now_ms);
        self.stats.frames += 1;
    }

    fn set_feedback(&mut self, text: &str, events: &mut Vec<Event>) {
        self.feedback = text.to_string();
        events.push(Event::feedback(text));
    }

    /// Show and speak, unless the same text was spoken within the cooldown
    fn say(&mut self, text: &str, now_ms: u64, events: &mut Vec<Event>) {
        if self.speech.admit(text, now_ms) {
            self.set_feedback(text, events);
            events.push(Event::speak(text));
        }
    }

    fn say_ungated(&mut self, text: &str, events: &mut Vec<Event>) {
        self.set_feedback(text, events);
        events.push(Event::speak(text));
    }
}
