//! Audio primitives: capture sources, playback sinks, VAD, WAV codec.

#[cfg(feature = "cpal-audio")]
pub mod capture;
pub mod playback;
pub mod recorder;
pub mod vad;
pub mod wav;
