//! Session: the long-lived owner of one conversation pipeline.
//!
//! Wires capture → VAD → segmenter → controller and owns every native
//! resource the pipeline acquires. One microphone lease and one playback
//! sink per session; `stop()` releases both and is idempotent.

use crate::audio::playback::AudioSink;
use crate::audio::recorder::AudioSource;
use crate::audio::vad::VadConfig;
use crate::chat::ResponseClient;
use crate::defaults;
use crate::error::Result;
use crate::pipeline::ring_buffer::{RingBuffer, RingBufferHandle};
use crate::pipeline::segmenter::{InputGate, SegmenterConfig, UtteranceSegmenter};
use crate::pipeline::vad_station::VadStation;
use crate::session::controller::{BargeInPolicy, ControllerConfig, ConversationController};
use crate::session::event::SessionEvent;
use crate::stt::TranscriptionClient;
use crate::tts::player::{PlayerConfig, SpeechPlayer};
use crate::tts::{SpeechSynthesizer, VoiceSettings};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;

/// Everything a session reads at start.
///
/// Comes from the embedding configuration layer; the session does not
/// persist any of it.
#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    pub vad: VadConfig,
    pub segmenter: SegmenterConfig,
    pub voice: VoiceSettings,
    pub player: PlayerConfig,
    pub barge_in: BargeInPolicy,
    pub mute_input: bool,
    pub mute_output: bool,
    /// Draw the live level meter on stderr.
    pub show_levels: bool,
}

/// A running conversation session.
pub struct Session {
    running: Arc<AtomicBool>,
    gate: Arc<InputGate>,
    ring: RingBufferHandle,
    tasks: Vec<tokio::task::JoinHandle<()>>,
    mute_output: Arc<AtomicBool>,
    event_tx: mpsc::Sender<SessionEvent>,
}

impl Session {
    /// Starts a session over the given devices and providers.
    ///
    /// Acquires the microphone lease before returning; a denied or
    /// missing device surfaces as `PermissionDenied`/`DeviceUnavailable`
    /// here, before any task is spawned. Returns the session handle and
    /// the event stream for the UI layer.
    pub fn start(
        source: Box<dyn AudioSource>,
        sink: Box<dyn AudioSink>,
        stt: Arc<dyn TranscriptionClient>,
        chat: Arc<dyn ResponseClient>,
        tts: Arc<dyn SpeechSynthesizer>,
        config: SessionConfig,
    ) -> Result<(Self, mpsc::Receiver<SessionEvent>)> {
        let running = Arc::new(AtomicBool::new(true));
        let gate = InputGate::new();
        gate.set_muted(config.mute_input);

        let (event_tx, event_rx) = mpsc::channel(defaults::EVENT_BUFFER);

        // Capture first: if the microphone is unavailable, fail before
        // anything else is wired up.
        let ring = RingBuffer::new(source);
        let (frame_rx, ring_handle) = ring.start()?;

        let (vad_tx, vad_rx) = mpsc::channel(defaults::FRAME_BUFFER);
        let (segmenter_tx, segmenter_rx) = mpsc::channel(defaults::UTTERANCE_BUFFER);

        let vad_station =
            VadStation::new(config.vad).with_show_levels(config.show_levels);
        let segmenter = UtteranceSegmenter::new(config.segmenter, gate.clone());

        let player = SpeechPlayer::new(tts, sink, config.voice, config.player);
        let mute_output = player.mute_flag();
        mute_output.store(config.mute_output, Ordering::SeqCst);

        let controller = ConversationController::new(
            stt,
            chat,
            player,
            gate.clone(),
            running.clone(),
            ControllerConfig {
                barge_in: config.barge_in,
                amplitude_tick: Duration::from_millis(defaults::AMPLITUDE_TICK_MS),
            },
            event_tx.clone(),
        );

        let tasks = vec![
            tokio::spawn(vad_station.run(frame_rx, vad_tx)),
            tokio::spawn(segmenter.run(vad_rx, segmenter_tx)),
            tokio::spawn(controller.run(segmenter_rx)),
        ];

        Ok((
            Self {
                running,
                gate,
                ring: ring_handle,
                tasks,
                mute_output,
                event_tx,
            },
            event_rx,
        ))
    }

    /// True until `stop()` completes (or the pipeline dies on its own).
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Gate microphone input without releasing the device.
    pub fn set_mute_input(&self, muted: bool) {
        self.gate.set_muted(muted);
    }

    /// Skip voice output; replies remain text-only while set.
    pub fn set_mute_output(&self, muted: bool) {
        self.mute_output.store(muted, Ordering::SeqCst);
    }

    /// Stops the session and releases all native resources. Idempotent.
    ///
    /// The running flag is cleared first, so any in-flight provider call
    /// discards its result instead of creating a turn. Capture stops
    /// immediately; the stations drain and exit as their channels close.
    /// Tasks that outlive the grace period are aborted.
    pub async fn stop(&mut self) {
        let was_running = self.running.swap(false, Ordering::SeqCst);
        self.ring.stop();

        for mut task in self.tasks.drain(..) {
            if tokio::time::timeout(Duration::from_secs(5), &mut task)
                .await
                .is_err()
            {
                task.abort();
                let _ = task.await;
            }
        }

        if was_running {
            let _ = self.event_tx.try_send(SessionEvent::Stopped);
        }
    }
}
