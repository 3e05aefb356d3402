//! Utterance segmentation over the VAD decision stream.
//!
//! Two counters drive the state machine: `consecutive_speech` opens an
//! utterance once the entry threshold is reached, `consecutive_silence`
//! seals it at the exit threshold. Sealing swaps in a fresh buffer
//! immediately, so capture never pauses between utterances — the
//! hardware keeps recording while the previous segment is transcribed.
//!
//! The segmenter is the only writer of its own state; it consumes
//! annotated frames from one channel and emits events into another.

use crate::defaults;
use crate::pipeline::frame::{Utterance, VadFrame};
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tokio::sync::mpsc;

/// Configuration for utterance segmentation.
#[derive(Debug, Clone)]
pub struct SegmenterConfig {
    /// Consecutive speech frames required to open an utterance.
    pub entry_speech_frames: u32,
    /// Consecutive silence frames required to seal an open utterance.
    pub exit_silence_frames: u32,
    /// Sealed utterances shorter than this are dropped, not forwarded.
    pub min_utterance_ms: u32,
    /// Recent idle frames prepended when an utterance opens, so soft
    /// onsets are not clipped. Zero disables the ring.
    pub pre_speech_frames: usize,
    /// Sample rate for duration calculations.
    pub sample_rate: u32,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            entry_speech_frames: defaults::ENTRY_SPEECH_FRAMES,
            exit_silence_frames: defaults::EXIT_SILENCE_FRAMES,
            min_utterance_ms: defaults::MIN_UTTERANCE_MS,
            pre_speech_frames: defaults::PRE_SPEECH_FRAMES,
            sample_rate: defaults::SAMPLE_RATE,
        }
    }
}

/// Shared gate in front of the segmenter.
///
/// While gated, incoming frames are discarded and all hysteresis state is
/// reset — used to keep the device's own speaker output from triggering
/// VAD during playback, and to implement input mute.
#[derive(Debug, Default)]
pub struct InputGate {
    muted: AtomicBool,
    playback: AtomicBool,
}

impl InputGate {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Set by the session's mute command.
    pub fn set_muted(&self, muted: bool) {
        self.muted.store(muted, Ordering::SeqCst);
    }

    /// Set by the controller while synthesized speech is playing (under
    /// the gate-off barge-in policy).
    pub fn set_playback(&self, playing: bool) {
        self.playback.store(playing, Ordering::SeqCst);
    }

    /// True when frames should be discarded.
    pub fn is_gated(&self) -> bool {
        self.muted.load(Ordering::SeqCst) || self.playback.load(Ordering::SeqCst)
    }
}

/// Events emitted by the segmenter.
#[derive(Debug, Clone)]
pub enum SegmenterEvent {
    /// Entry hysteresis satisfied; a new utterance buffer is open.
    UtteranceOpened { start_sequence: u64 },
    /// Exit hysteresis satisfied; the utterance is sealed and ready for
    /// transcription.
    UtteranceSealed(Utterance),
    /// A sealed segment fell below the minimum-duration floor and was
    /// dropped (click, cough, mic bump).
    UtteranceDiscarded { duration_ms: u32 },
}

/// Segmentation state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SegmenterState {
    /// Waiting for the entry threshold.
    Idle,
    /// An utterance buffer is open and accumulating.
    Capturing,
}

/// State machine that turns VAD frames into sealed utterances.
pub struct UtteranceSegmenter {
    config: SegmenterConfig,
    gate: Arc<InputGate>,
    state: SegmenterState,
    consecutive_speech: u32,
    consecutive_silence: u32,
    /// Idle-time ring of recent frames for onset padding.
    pre_speech: VecDeque<VadFrame>,
    /// Speech frames accumulated while still below the entry threshold.
    pending: Vec<VadFrame>,
    /// Samples of the open utterance.
    buffer: Vec<i16>,
    start_sequence: u64,
    started_at: Option<Instant>,
    next_utterance_id: u64,
}

impl UtteranceSegmenter {
    /// Creates a new segmenter with the given configuration and gate.
    pub fn new(config: SegmenterConfig, gate: Arc<InputGate>) -> Self {
        Self {
            config,
            gate,
            state: SegmenterState::Idle,
            consecutive_speech: 0,
            consecutive_silence: 0,
            pre_speech: VecDeque::new(),
            pending: Vec::new(),
            buffer: Vec::new(),
            start_sequence: 0,
            started_at: None,
            next_utterance_id: 0,
        }
    }

    /// True while an utterance buffer is open.
    pub fn is_capturing(&self) -> bool {
        self.state == SegmenterState::Capturing
    }

    /// Processes one VAD frame, returning at most one event.
    ///
    /// At most one utterance is ever open: `UtteranceSealed` transitions
    /// straight back to Idle with a fresh buffer.
    pub fn process(&mut self, frame: VadFrame) -> Option<SegmenterEvent> {
        if self.gate.is_gated() {
            // Discard everything accumulated so far; speaker echo or muted
            // input must not straddle the gate edge.
            self.reset();
            return None;
        }

        match self.state {
            SegmenterState::Idle => self.process_idle(frame),
            SegmenterState::Capturing => self.process_capturing(frame),
        }
    }

    fn process_idle(&mut self, frame: VadFrame) -> Option<SegmenterEvent> {
        if frame.is_speech {
            self.consecutive_speech += 1;
            self.pending.push(frame);

            if self.consecutive_speech >= self.config.entry_speech_frames {
                return Some(self.open_utterance());
            }
            None
        } else {
            // A single silence frame resets the entry counter; candidate
            // frames roll back into the pre-speech ring.
            self.consecutive_speech = 0;
            for pending in self.pending.drain(..) {
                self.pre_speech.push_back(pending);
            }
            self.pre_speech.push_back(frame);
            while self.pre_speech.len() > self.config.pre_speech_frames {
                self.pre_speech.pop_front();
            }
            None
        }
    }

    fn open_utterance(&mut self) -> SegmenterEvent {
        let first = &self.pending[0];
        self.start_sequence = first.sequence;
        self.started_at = Some(first.timestamp);

        // Onset padding precedes the official start; it widens the audio
        // but not the utterance's timestamps.
        self.buffer.clear();
        for frame in self.pre_speech.drain(..) {
            self.buffer.extend_from_slice(&frame.samples);
        }
        for frame in self.pending.drain(..) {
            self.buffer.extend_from_slice(&frame.samples);
        }

        self.state = SegmenterState::Capturing;
        self.consecutive_silence = 0;

        SegmenterEvent::UtteranceOpened {
            start_sequence: self.start_sequence,
        }
    }

    fn process_capturing(&mut self, frame: VadFrame) -> Option<SegmenterEvent> {
        self.buffer.extend_from_slice(&frame.samples);

        if frame.is_speech {
            self.consecutive_silence = 0;
            return None;
        }

        self.consecutive_silence += 1;
        if self.consecutive_silence >= self.config.exit_silence_frames {
            return Some(self.seal_utterance(frame.sequence));
        }
        None
    }

    /// Seals the open utterance and swaps in a fresh buffer.
    fn seal_utterance(&mut self, end_sequence: u64) -> SegmenterEvent {
        let samples = std::mem::take(&mut self.buffer);
        let started_at = self.started_at.take().unwrap_or_else(Instant::now);

        self.state = SegmenterState::Idle;
        self.consecutive_speech = 0;
        self.consecutive_silence = 0;
        self.pending.clear();
        self.pre_speech.clear();

        let utterance = Utterance {
            id: self.next_utterance_id,
            start_sequence: self.start_sequence,
            end_sequence,
            started_at,
            sealed_at: Instant::now(),
            samples,
            sample_rate: self.config.sample_rate,
        };

        let duration_ms = utterance.duration_ms();
        if duration_ms < self.config.min_utterance_ms {
            return SegmenterEvent::UtteranceDiscarded { duration_ms };
        }

        self.next_utterance_id += 1;
        SegmenterEvent::UtteranceSealed(utterance)
    }

    /// Drops all accumulated state, including an open utterance.
    pub fn reset(&mut self) {
        self.state = SegmenterState::Idle;
        self.consecutive_speech = 0;
        self.consecutive_silence = 0;
        self.pending.clear();
        self.pre_speech.clear();
        self.buffer.clear();
        self.started_at = None;
    }

    /// Runs the segmenter until the input channel closes.
    ///
    /// An utterance still open at shutdown is discarded, never flushed —
    /// a half-captured segment must not reach the transcription provider.
    pub async fn run(
        mut self,
        mut input: mpsc::Receiver<VadFrame>,
        output: mpsc::Sender<SegmenterEvent>,
    ) {
        while let Some(frame) = input.recv().await {
            if let Some(event) = self.process(frame)
                && output.send(event).await.is_err()
            {
                break;
            }
        }
    }
}
