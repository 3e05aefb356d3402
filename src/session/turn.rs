//! Conversation turn lifecycle.

use serde::{Deserialize, Serialize};

/// State of a conversation turn.
///
/// A turn walks `Listening → Capturing → Sealed → Transcribing →
/// AwaitingReply → Synthesizing → Playing → Done`; `Failed` is reachable
/// from any non-terminal state. `Synthesizing → Done` covers skipped or
/// failed voice output (the reply stays visible, only audio is lost).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnState {
    /// No speech in progress; the pipeline is waiting.
    Listening,
    /// The segmenter has an open utterance buffer.
    Capturing,
    /// The utterance is sealed and queued for transcription.
    Sealed,
    /// An STT request is in flight.
    Transcribing,
    /// The chat backend is producing a reply.
    AwaitingReply,
    /// A synthesis request is in flight.
    Synthesizing,
    /// Synthesized speech is playing.
    Playing,
    /// The turn completed.
    Done,
    /// The turn failed; the session surfaces a message and returns to
    /// listening.
    Failed,
}

impl TurnState {
    /// True for states a turn cannot leave.
    pub fn is_terminal(self) -> bool {
        matches!(self, TurnState::Done | TurnState::Failed)
    }

    /// Whether `next` is a legal successor of `self`.
    pub fn can_transition(self, next: TurnState) -> bool {
        use TurnState::*;

        // Any non-terminal state can fail
        if next == Failed {
            return !self.is_terminal();
        }

        matches!(
            (self, next),
            (Listening, Capturing)
                | (Capturing, Sealed)
                // Floor-dropped or gated-away capture
                | (Capturing, Listening)
                | (Sealed, Transcribing)
                | (Transcribing, AwaitingReply)
                // Filtered/empty transcript: no turn, back to listening
                | (Transcribing, Listening)
                | (AwaitingReply, Synthesizing)
                | (Synthesizing, Playing)
                // Cooldown-skipped, muted, or soft-failed voice output
                | (Synthesizing, Done)
                | (Playing, Done)
                | (Done, Listening)
                | (Failed, Listening)
        )
    }
}

/// One full cycle of user speech → transcript → reply → synthesized
/// speech.
#[derive(Debug, Clone)]
pub struct ConversationTurn {
    pub turn_id: u64,
    pub transcript: String,
    pub reply: Option<String>,
    pub state: TurnState,
}

impl ConversationTurn {
    /// Creates a turn for an accepted transcript.
    pub fn new(turn_id: u64, transcript: String) -> Self {
        Self {
            turn_id,
            transcript,
            reply: None,
            state: TurnState::Transcribing,
        }
    }

    /// Advances to `next`, rejecting illegal transitions.
    pub fn advance(&mut self, next: TurnState) -> Result<(), String> {
        if !self.state.can_transition(next) {
            return Err(format!(
                "illegal turn transition: {:?} -> {:?}",
                self.state, next
            ));
        }
        self.state = next;
        Ok(())
    }
}
