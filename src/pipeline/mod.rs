//! Continuous audio pipeline.
//!
//! Capture thread → VAD station → utterance segmenter, connected by
//! bounded tokio channels. Each station is an async task that owns its
//! own state; frames flow one way and nothing on this path ever awaits
//! network I/O.

pub mod frame;
pub mod ring_buffer;
pub mod segmenter;
pub mod vad_station;

pub use frame::{AudioFrame, Utterance, VadFrame};
pub use ring_buffer::{RingBuffer, RingBufferConfig, RingBufferHandle};
pub use segmenter::{InputGate, SegmenterConfig, SegmenterEvent, UtteranceSegmenter};
pub use vad_station::VadStation;
