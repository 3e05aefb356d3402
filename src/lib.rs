//! voxloop - real-time voice conversation pipeline.
//!
//! Continuous microphone capture → energy VAD → utterance segmentation →
//! speech-to-text → chat backend → speech synthesis → playback, with a
//! single-active-turn state machine in the middle. The library is the
//! pipeline; UIs consume it through a session handle and an event stream.

#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod audio;
pub mod chat;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod defaults;
pub mod error;
pub mod pipeline;
pub mod session;
pub mod stt;
pub mod tts;

// L4 composition root - needs hardware and CLI surfaces
#[cfg(all(feature = "cpal-audio", feature = "cli"))]
pub mod app;

// Core traits (source → pipeline → providers → sink)
pub use audio::playback::{AudioSink, PlaybackHandle};
pub use audio::recorder::AudioSource;
pub use chat::ResponseClient;
pub use stt::{Transcript, TranscriptionClient};
pub use tts::{SpeechSynthesizer, VoiceSettings};

// Session surface
pub use session::{BargeInPolicy, Session, SessionConfig, SessionEvent, TurnState};

// Error handling
pub use error::{Result, VoxloopError};

// Config
pub use config::Config;
