//! Default configuration constants for voxloop.
//!
//! Shared constants used across configuration types to keep the tuning
//! surface in one place.

/// Default audio sample rate in Hz.
///
/// 16kHz is the standard for speech recognition and keeps request payloads
/// to the transcription provider small.
pub const SAMPLE_RATE: u32 = 16000;

/// Default Voice Activity Detection (VAD) threshold.
///
/// RMS-based threshold (0.0 to 1.0) above which a frame counts as speech.
/// 0.02 suits typical microphone gain staging; quiet rooms can go as low
/// as 0.015, noisy ones up to 0.03.
pub const VAD_THRESHOLD: f32 = 0.02;

/// Consecutive speech frames required to open an utterance.
///
/// At the usual ~20ms per frame this is roughly 0.6s of sustained energy,
/// enough to reject keyboard taps and chair creaks.
pub const ENTRY_SPEECH_FRAMES: u32 = 30;

/// Consecutive silence frames required to seal an open utterance.
///
/// Roughly 1–1.2s of silence at the usual frame cadence, long enough to
/// ride out natural mid-sentence pauses.
pub const EXIT_SILENCE_FRAMES: u32 = 30;

/// Minimum utterance duration in milliseconds.
///
/// Sealed utterances shorter than this are dropped without reaching the
/// transcription provider (coughs, clicks, mic bumps).
pub const MIN_UTTERANCE_MS: u32 = 300;

/// Number of recent frames kept while idle and prepended when an
/// utterance opens. Captures soft onsets (plosives, fricatives) that occur
/// before energy crosses the VAD threshold.
pub const PRE_SPEECH_FRAMES: usize = 8;

/// Request timeout for the transcription provider in milliseconds.
pub const STT_TIMEOUT_MS: u64 = 12_000;

/// Minimum number of alphabetic words for a transcript to be accepted.
pub const MIN_TRANSCRIPT_WORDS: usize = 2;

/// Minimum interval between speech synthesis requests in milliseconds.
///
/// Calls inside the window are skipped, not queued, so rapid re-entry can
/// never stack overlapping synthesis requests.
pub const TTS_COOLDOWN_MS: u64 = 2_000;

/// Interval between amplitude ticks emitted during playback, in
/// milliseconds. ~20 ticks per second is enough for a smooth speaking
/// indicator without flooding the event channel.
pub const AMPLITUDE_TICK_MS: u64 = 50;

/// Default language code sent to the transcription and synthesis
/// providers.
pub const DEFAULT_LANGUAGE: &str = "en-US";

/// Default speaking rate passed to the synthesis provider.
pub const SPEAKING_RATE: f64 = 1.0;

/// Polling interval for the capture thread when no samples are available,
/// in milliseconds.
pub const POLL_INTERVAL_MS: u64 = 10;

/// Frame channel depth between the capture thread and the VAD station.
pub const FRAME_BUFFER: usize = 1024;

/// Sealed-utterance channel depth between the segmenter and the
/// controller. Doubles as the turn queue: utterances sealed while a turn
/// is in flight wait here in sealing order.
pub const UTTERANCE_BUFFER: usize = 16;

/// Event channel depth toward the UI consumer.
pub const EVENT_BUFFER: usize = 256;
