//! Speech synthesis player.
//!
//! Owns the one piece of state the synthesis path needs: the timestamp of
//! the last synthesis request. A `speak` call inside the cooldown window
//! is skipped outright — no provider request, no playback — which keeps
//! rapid VAD or UI re-entry from stacking overlapping speech.

use crate::audio::playback::{AudioSink, PlaybackHandle};
use crate::audio::vad::{Clock, SystemClock};
use crate::audio::wav::decode_wav;
use crate::defaults;
use crate::error::{Result, VoxloopError};
use crate::tts::{SpeechSynthesizer, VoiceSettings};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Configuration for the player.
#[derive(Debug, Clone)]
pub struct PlayerConfig {
    /// Minimum interval between synthesis requests.
    pub cooldown: Duration,
    /// Sample rate playback is decoded to.
    pub sample_rate: u32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            cooldown: Duration::from_millis(defaults::TTS_COOLDOWN_MS),
            sample_rate: defaults::SAMPLE_RATE,
        }
    }
}

/// Outcome of a `speak` call.
#[derive(Debug)]
pub enum SpeakOutcome {
    /// Synthesis was requested and playback started; watch the handle
    /// for completion and amplitude.
    Playing(PlaybackHandle),
    /// The call was a no-op: inside the cooldown window or output muted.
    Skipped,
}

impl SpeakOutcome {
    /// True when the call did not produce playback.
    pub fn is_skipped(&self) -> bool {
        matches!(self, SpeakOutcome::Skipped)
    }
}

/// Synthesizes reply text and plays it back, enforcing the cooldown.
pub struct SpeechPlayer {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    sink: Box<dyn AudioSink>,
    voice: VoiceSettings,
    config: PlayerConfig,
    clock: Arc<dyn Clock>,
    last_request: Option<Instant>,
    muted: Arc<AtomicBool>,
}

impl SpeechPlayer {
    /// Creates a new player with the system clock.
    pub fn new(
        synthesizer: Arc<dyn SpeechSynthesizer>,
        sink: Box<dyn AudioSink>,
        voice: VoiceSettings,
        config: PlayerConfig,
    ) -> Self {
        Self::with_clock(synthesizer, sink, voice, config, Arc::new(SystemClock))
    }

    /// Creates a new player with an injectable clock.
    pub fn with_clock(
        synthesizer: Arc<dyn SpeechSynthesizer>,
        sink: Box<dyn AudioSink>,
        voice: VoiceSettings,
        config: PlayerConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            synthesizer,
            sink,
            voice,
            config,
            clock,
            last_request: None,
            muted: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Shared mute flag; when set, `speak` is a no-op.
    pub fn mute_flag(&self) -> Arc<AtomicBool> {
        self.muted.clone()
    }

    /// True when a synthesis request issued now would be inside the
    /// cooldown window.
    pub fn in_cooldown(&self) -> bool {
        match self.last_request {
            Some(last) => self.clock.now().duration_since(last) < self.config.cooldown,
            None => false,
        }
    }

    /// Synthesize and play `text`.
    ///
    /// Skips without touching the provider when muted or inside the
    /// cooldown window. Synthesis and playback failures propagate as
    /// `Tts`/`Playback` errors; callers treat them as soft — the reply
    /// text has already been surfaced, only voice output is lost.
    pub async fn speak(&mut self, text: &str) -> Result<SpeakOutcome> {
        if self.muted.load(Ordering::SeqCst) {
            return Ok(SpeakOutcome::Skipped);
        }

        if self.in_cooldown() {
            return Ok(SpeakOutcome::Skipped);
        }

        // The window opens at request time, success or not: a failing
        // provider must not be hammered by re-entry either.
        self.last_request = Some(self.clock.now());

        let bytes = self.synthesizer.synthesize(text, &self.voice).await?;

        let samples =
            decode_wav(&bytes, self.config.sample_rate).map_err(|e| VoxloopError::Tts {
                message: format!("undecodable synthesis payload: {e}"),
            })?;

        let handle = self.sink.play(samples, self.config.sample_rate)?;
        Ok(SpeakOutcome::Playing(handle))
    }
}
