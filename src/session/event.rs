//! Events emitted to the UI layer.
//!
//! Display-only: no control flow returns from the consumer. Senders use
//! `try_send`, so a stalled consumer drops events instead of backing up
//! the pipeline.

use crate::session::turn::TurnState;
use serde::{Deserialize, Serialize};

/// One event on the session's outbound stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// A turn (or the session's listening state) changed state.
    StateChanged { turn_id: u64, state: TurnState },
    /// An accepted transcript, ready for display.
    Transcript { turn_id: u64, text: String },
    /// The backend's reply text, ready for display.
    Reply { turn_id: u64, text: String },
    /// Live playback amplitude for a speaking indicator; a final 0.0
    /// tick marks the end of playback.
    Amplitude { value: f32 },
    /// A turn failed; `message` is user-visible.
    TurnFailed { turn_id: u64, message: String },
    /// The session stopped; no further events follow.
    Stopped,
}

impl SessionEvent {
    /// Serialize to JSON for transport to an embedding UI.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_changed_json_roundtrip() {
        let event = SessionEvent::StateChanged {
            turn_id: 7,
            state: TurnState::Playing,
        };
        let json = event.to_json().expect("should serialize");
        let deserialized = SessionEvent::from_json(&json).expect("should deserialize");
        assert_eq!(event, deserialized);
    }

    #[test]
    fn test_json_format_is_snake_case() {
        let event = SessionEvent::StateChanged {
            turn_id: 0,
            state: TurnState::AwaitingReply,
        };
        let json = event.to_json().expect("should serialize");
        assert!(
            json.contains(r#""type":"state_changed""#),
            "JSON should use snake_case. Got: {}",
            json
        );
        assert!(json.contains(r#""state":"awaiting_reply""#));
    }

    #[test]
    fn test_all_variants_roundtrip() {
        let events = vec![
            SessionEvent::StateChanged {
                turn_id: 1,
                state: TurnState::Listening,
            },
            SessionEvent::Transcript {
                turn_id: 1,
                text: "hello there".to_string(),
            },
            SessionEvent::Reply {
                turn_id: 1,
                text: "hi!".to_string(),
            },
            SessionEvent::Amplitude { value: 0.25 },
            SessionEvent::TurnFailed {
                turn_id: 1,
                message: "Error contacting assistant".to_string(),
            },
            SessionEvent::Stopped,
        ];

        for event in events {
            let json = event.to_json().expect("should serialize");
            let deserialized =
                SessionEvent::from_json(&json).expect("should deserialize");
            assert_eq!(event, deserialized, "roundtrip failed for {:?}", event);
        }
    }
}
