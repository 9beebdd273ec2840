//! Side-effect events
//!
//! Update functions never call a speech or display backend. They return the
//! events to emit, and the frame loop dispatches them to the sinks.

use crate::types::{ConfirmedState, Posture};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Text for the speech sink; supersedes any utterance in flight
    Speak { text: String },
    /// Coaching text shown verbatim
    Feedback { text: String },
    StateChanged {
        from: ConfirmedState,
        to: ConfirmedState,
    },
    PostureConfirmed { posture: Posture },
    MeditationStarted,
    MeditationEnded { posture_held: bool },
    Balanced,
    DeepMeditation,
    LevelUp { level: u32 },
    /// Descriptive status for an external collaborator failure or recovery
    Status { message: String },
}

impl Event {
    pub fn speak(text: impl Into<String>) -> Self {
        Event::Speak { text: text.into() }
    }

    pub fn feedback(text: impl Into<String>) -> Self {
        Event::Feedback { text: text.into() }
    }

    pub fn status(message: impl Into<String>) -> Self {
        Event::Status {
            message: message.into(),
        }
    }

    /// Text carried by a speech event
    pub fn speech_text(&self) -> Option<&str> {
        match self {
            Event::Speak { text } => Some(text),
            _ => None,
        }
    }
}
