//! The turn-taking state machine.
//!
//! Consumes segmenter events in sealing order and drives each turn
//! through transcription, response, synthesis, and playback. The
//! utterance channel is the turn queue: utterances sealed while a turn is
//! in flight wait there, so utterance N+1 never starts before N's turn
//! resolves, and capture never pauses.

use crate::defaults;
use crate::error::VoxloopError;
use crate::pipeline::frame::Utterance;
use crate::pipeline::segmenter::{InputGate, SegmenterEvent};
use crate::session::event::SessionEvent;
use crate::session::turn::{ConversationTurn, TurnState};
use crate::stt::{TranscriptionClient, filter};
use crate::tts::player::{SpeakOutcome, SpeechPlayer};
use crate::{audio::playback::PlaybackHandle, chat::ResponseClient};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;

/// What happens to user speech while the session is playing its own
/// synthesized audio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BargeInPolicy {
    /// Gate VAD input off entirely during playback. The safe default:
    /// speaker echo into the microphone cannot falsely trigger VAD.
    #[default]
    #[serde(rename = "gate")]
    GateDuringPlayback,
    /// Keep listening during playback; a newly sealed utterance cancels
    /// playback and becomes the next turn immediately.
    #[serde(rename = "interrupt")]
    InterruptToSpeak,
}

/// Configuration for the controller.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    pub barge_in: BargeInPolicy,
    /// Interval between amplitude events during playback.
    pub amplitude_tick: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            barge_in: BargeInPolicy::default(),
            amplitude_tick: Duration::from_millis(defaults::AMPLITUDE_TICK_MS),
        }
    }
}

/// Drives conversation turns; one per session.
pub struct ConversationController {
    stt: Arc<dyn TranscriptionClient>,
    chat: Arc<dyn ResponseClient>,
    player: SpeechPlayer,
    gate: Arc<InputGate>,
    running: Arc<AtomicBool>,
    config: ControllerConfig,
    events: mpsc::Sender<SessionEvent>,
    /// Turn id the next sealed utterance will get; used to label
    /// Capturing events before an id exists.
    next_turn_id: u64,
}

impl ConversationController {
    pub fn new(
        stt: Arc<dyn TranscriptionClient>,
        chat: Arc<dyn ResponseClient>,
        player: SpeechPlayer,
        gate: Arc<InputGate>,
        running: Arc<AtomicBool>,
        config: ControllerConfig,
        events: mpsc::Sender<SessionEvent>,
    ) -> Self {
        Self {
            stt,
            chat,
            player,
            gate,
            running,
            config,
            events,
            next_turn_id: 0,
        }
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Events are display-only; a stalled consumer drops them rather
    /// than backing up the turn loop.
    fn emit(&self, event: SessionEvent) {
        let _ = self.events.try_send(event);
    }

    fn emit_state(&self, turn_id: u64, state: TurnState) {
        self.emit(SessionEvent::StateChanged { turn_id, state });
    }

    /// Runs until the segmenter channel closes or the session stops.
    pub async fn run(mut self, mut input: mpsc::Receiver<SegmenterEvent>) {
        while let Some(event) = input.recv().await {
            if !self.is_running() {
                break;
            }

            match event {
                SegmenterEvent::UtteranceOpened { .. } => {
                    self.emit_state(self.next_turn_id, TurnState::Capturing);
                }
                SegmenterEvent::UtteranceDiscarded { .. } => {
                    self.emit_state(self.next_turn_id, TurnState::Listening);
                }
                SegmenterEvent::UtteranceSealed(utterance) => {
                    // A barge-in hands the interrupting utterance straight
                    // back; chain turns until the queue settles.
                    let mut next = Some(utterance);
                    while let Some(u) = next.take() {
                        if !self.is_running() {
                            return;
                        }
                        next = self.run_turn(u, &mut input).await;
                    }
                }
            }
        }
    }

    /// Drives one sealed utterance through a full turn.
    ///
    /// Returns the interrupting utterance when barge-in cancelled
    /// playback, so the caller starts its turn immediately.
    async fn run_turn(
        &mut self,
        utterance: Utterance,
        input: &mut mpsc::Receiver<SegmenterEvent>,
    ) -> Option<Utterance> {
        let turn_id = utterance.id;
        self.next_turn_id = turn_id + 1;

        self.emit_state(turn_id, TurnState::Sealed);
        self.emit_state(turn_id, TurnState::Transcribing);

        let transcript = match self.stt.transcribe(&utterance).await {
            Ok(t) => t,
            Err(e) => {
                self.fail_turn(turn_id, &e);
                return None;
            }
        };

        // Stale-result discard: a transcript that lands after stop()
        // must not create a turn.
        if !self.is_running() {
            return None;
        }

        let Some(text) = filter::accept_transcript(&transcript.text) else {
            // Non-speech artifact: no turn, straight back to listening
            self.emit_state(turn_id, TurnState::Listening);
            return None;
        };

        let mut turn = ConversationTurn::new(turn_id, text.clone());
        self.emit(SessionEvent::Transcript {
            turn_id,
            text: text.clone(),
        });

        let _ = turn.advance(TurnState::AwaitingReply);
        self.emit_state(turn_id, TurnState::AwaitingReply);

        let reply = match self.chat.respond(&text).await {
            Ok(r) => r,
            Err(e) => {
                self.fail_turn(turn_id, &e);
                return None;
            }
        };

        if !self.is_running() {
            return None;
        }

        turn.reply = Some(reply.clone());
        self.emit(SessionEvent::Reply {
            turn_id,
            text: reply.clone(),
        });

        let _ = turn.advance(TurnState::Synthesizing);
        self.emit_state(turn_id, TurnState::Synthesizing);

        let interrupt = match self.player.speak(&reply).await {
            Ok(SpeakOutcome::Playing(handle)) => {
                let _ = turn.advance(TurnState::Playing);
                self.emit_state(turn_id, TurnState::Playing);

                if self.config.barge_in == BargeInPolicy::GateDuringPlayback {
                    self.gate.set_playback(true);
                }
                let next = self.watch_playback(&handle, input).await;
                self.gate.set_playback(false);
                next
            }
            Ok(SpeakOutcome::Skipped) => None,
            Err(e) => {
                // Soft failure: the reply text is already out, only voice
                // output is lost.
                eprintln!("voxloop: voice output skipped: {e}");
                None
            }
        };

        let _ = turn.advance(TurnState::Done);
        self.emit_state(turn_id, TurnState::Done);
        self.emit_state(turn_id, TurnState::Listening);

        interrupt
    }

    /// Ticks amplitude events until playback ends.
    ///
    /// Under `InterruptToSpeak`, also watches the utterance channel: a
    /// sealed utterance stops playback and is returned to the caller.
    async fn watch_playback(
        &self,
        handle: &PlaybackHandle,
        input: &mut mpsc::Receiver<SegmenterEvent>,
    ) -> Option<Utterance> {
        let tick = self.config.amplitude_tick;

        loop {
            if handle.is_finished() {
                self.emit(SessionEvent::Amplitude { value: 0.0 });
                return None;
            }
            if !self.is_running() {
                handle.stop();
                return None;
            }

            match self.config.barge_in {
                BargeInPolicy::GateDuringPlayback => {
                    tokio::time::sleep(tick).await;
                    self.emit(SessionEvent::Amplitude {
                        value: handle.amplitude(),
                    });
                }
                BargeInPolicy::InterruptToSpeak => {
                    tokio::select! {
                        _ = tokio::time::sleep(tick) => {
                            self.emit(SessionEvent::Amplitude {
                                value: handle.amplitude(),
                            });
                        }
                        event = input.recv() => {
                            match event {
                                Some(SegmenterEvent::UtteranceSealed(utterance)) => {
                                    handle.stop();
                                    self.emit(SessionEvent::Amplitude { value: 0.0 });
                                    return Some(utterance);
                                }
                                Some(SegmenterEvent::UtteranceOpened { .. }) => {
                                    self.emit_state(self.next_turn_id, TurnState::Capturing);
                                }
                                Some(SegmenterEvent::UtteranceDiscarded { .. }) => {}
                                None => {
                                    handle.stop();
                                    return None;
                                }
                            }
                        }
                    }
                }
            }
        }
    }

    /// Surfaces a hard failure and returns the session to listening.
    fn fail_turn(&self, turn_id: u64, error: &VoxloopError) {
        self.emit(SessionEvent::TurnFailed {
            turn_id,
            message: error.to_string(),
        });
        self.emit_state(turn_id, TurnState::Failed);
        self.emit_state(turn_id, TurnState::Listening);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::playback::MockAudioSink;
    use crate::chat::MockResponseClient;
    use crate::stt::MockTranscriptionClient;
    use crate::tts::player::PlayerConfig;
    use crate::tts::{MockSynthesizer, VoiceSettings};
    use std::time::Instant;

    struct Harness {
        input_tx: mpsc::Sender<SegmenterEvent>,
        event_rx: mpsc::Receiver<SessionEvent>,
        running: Arc<AtomicBool>,
        gate: Arc<InputGate>,
        task: tokio::task::JoinHandle<()>,
    }

    fn make_utterance(id: u64) -> Utterance {
        Utterance {
            id,
            start_sequence: id * 100,
            end_sequence: id * 100 + 70,
            started_at: Instant::now(),
            sealed_at: Instant::now(),
            samples: vec![3000i16; 8000],
            sample_rate: 16000,
        }
    }

    fn spawn_controller(
        stt: MockTranscriptionClient,
        chat: MockResponseClient,
        synth: MockSynthesizer,
        sink: MockAudioSink,
        config: ControllerConfig,
    ) -> Harness {
        let (input_tx, input_rx) = mpsc::channel(16);
        let (event_tx, event_rx) = mpsc::channel(256);
        let running = Arc::new(AtomicBool::new(true));
        let gate = InputGate::new();

        let player = SpeechPlayer::new(
            Arc::new(synth),
            Box::new(sink),
            VoiceSettings::default(),
            PlayerConfig::default(),
        );

        let controller = ConversationController::new(
            Arc::new(stt),
            Arc::new(chat),
            player,
            gate.clone(),
            running.clone(),
            config,
            event_tx,
        );

        let task = tokio::spawn(controller.run(input_rx));

        Harness {
            input_tx,
            event_rx,
            running,
            gate,
            task,
        }
    }

    fn states(events: &[SessionEvent]) -> Vec<TurnState> {
        events
            .iter()
            .filter_map(|e| match e {
                SessionEvent::StateChanged { state, .. } => Some(*state),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_full_turn_happy_path() {
        let mut harness = spawn_controller(
            MockTranscriptionClient::new("hello there"),
            MockResponseClient::new("hi, how can I help?"),
            MockSynthesizer::new(),
            MockAudioSink::new(),
            ControllerConfig::default(),
        );

        harness
            .input_tx
            .send(SegmenterEvent::UtteranceSealed(make_utterance(0)))
            .await
            .unwrap();
        drop(harness.input_tx);

        let mut events = Vec::new();
        while let Some(event) = harness.event_rx.recv().await {
            events.push(event);
        }
        harness.task.await.unwrap();

        let turn_states = states(&events);
        assert_eq!(
            turn_states,
            vec![
                TurnState::Sealed,
                TurnState::Transcribing,
                TurnState::AwaitingReply,
                TurnState::Synthesizing,
                TurnState::Playing,
                TurnState::Done,
                TurnState::Listening,
            ]
        );

        assert!(events.contains(&SessionEvent::Transcript {
            turn_id: 0,
            text: "hello there".to_string()
        }));
        assert!(events.contains(&SessionEvent::Reply {
            turn_id: 0,
            text: "hi, how can I help?".to_string()
        }));
        // Final amplitude tick resets the indicator
        assert!(events.contains(&SessionEvent::Amplitude { value: 0.0 }));
    }

    #[tokio::test]
    async fn test_filtered_transcript_creates_no_turn() {
        let stt = MockTranscriptionClient::new("(beeping sound)");
        let chat = MockResponseClient::new("never");
        let chat_probe = chat.clone();
        let mut harness = spawn_controller(
            stt,
            chat,
            MockSynthesizer::new(),
            MockAudioSink::new(),
            ControllerConfig::default(),
        );

        harness
            .input_tx
            .send(SegmenterEvent::UtteranceSealed(make_utterance(0)))
            .await
            .unwrap();
        drop(harness.input_tx);

        let mut events = Vec::new();
        while let Some(event) = harness.event_rx.recv().await {
            events.push(event);
        }
        harness.task.await.unwrap();

        assert_eq!(chat_probe.calls(), 0, "filtered transcript must not reach the backend");
        assert!(
            !events
                .iter()
                .any(|e| matches!(e, SessionEvent::Transcript { .. })),
            "no transcript event for a filtered artifact"
        );
        // Session falls back to listening
        assert_eq!(
            states(&events),
            vec![
                TurnState::Sealed,
                TurnState::Transcribing,
                TurnState::Listening
            ]
        );
    }

    #[tokio::test]
    async fn test_response_failure_fails_turn_but_not_session() {
        let chat = MockResponseClient::new("x").with_failure();
        let mut harness = spawn_controller(
            MockTranscriptionClient::new("hello there"),
            chat,
            MockSynthesizer::new(),
            MockAudioSink::new(),
            ControllerConfig::default(),
        );

        harness
            .input_tx
            .send(SegmenterEvent::UtteranceSealed(make_utterance(0)))
            .await
            .unwrap();
        harness
            .input_tx
            .send(SegmenterEvent::UtteranceSealed(make_utterance(1)))
            .await
            .unwrap();
        drop(harness.input_tx);

        let mut events = Vec::new();
        while let Some(event) = harness.event_rx.recv().await {
            events.push(event);
        }
        harness.task.await.unwrap();

        let failures: Vec<u64> = events
            .iter()
            .filter_map(|e| match e {
                SessionEvent::TurnFailed { turn_id, .. } => Some(*turn_id),
                _ => None,
            })
            .collect();

        // Both turns fail independently; the second is still processed
        assert_eq!(failures, vec![0, 1], "a failed turn must not wedge the loop");
    }

    #[tokio::test]
    async fn test_tts_failure_is_soft() {
        let mut harness = spawn_controller(
            MockTranscriptionClient::new("hello there"),
            MockResponseClient::new("the reply"),
            MockSynthesizer::new().with_failure(),
            MockAudioSink::new(),
            ControllerConfig::default(),
        );

        harness
            .input_tx
            .send(SegmenterEvent::UtteranceSealed(make_utterance(0)))
            .await
            .unwrap();
        drop(harness.input_tx);

        let mut events = Vec::new();
        while let Some(event) = harness.event_rx.recv().await {
            events.push(event);
        }
        harness.task.await.unwrap();

        // Reply is still visible and the turn completes
        assert!(events.contains(&SessionEvent::Reply {
            turn_id: 0,
            text: "the reply".to_string()
        }));
        assert!(states(&events).contains(&TurnState::Done));
        assert!(
            !events
                .iter()
                .any(|e| matches!(e, SessionEvent::TurnFailed { .. })),
            "voice failure must not fail the turn"
        );
    }

    #[tokio::test]
    async fn test_utterances_processed_in_sealing_order() {
        let stt = MockTranscriptionClient::new("x")
            .with_responses(vec!["first utterance", "second utterance"]);
        let mut harness = spawn_controller(
            stt,
            MockResponseClient::new("ok then"),
            MockSynthesizer::new(),
            MockAudioSink::new(),
            ControllerConfig::default(),
        );

        harness
            .input_tx
            .send(SegmenterEvent::UtteranceSealed(make_utterance(0)))
            .await
            .unwrap();
        harness
            .input_tx
            .send(SegmenterEvent::UtteranceSealed(make_utterance(1)))
            .await
            .unwrap();
        drop(harness.input_tx);

        let mut transcripts = Vec::new();
        while let Some(event) = harness.event_rx.recv().await {
            if let SessionEvent::Transcript { text, .. } = event {
                transcripts.push(text);
            }
        }
        harness.task.await.unwrap();

        assert_eq!(transcripts, vec!["first utterance", "second utterance"]);
    }

    #[tokio::test]
    async fn test_gate_policy_gates_playback() {
        let sink = MockAudioSink::new().with_hold();
        let sink_probe = sink.clone();
        let mut harness = spawn_controller(
            MockTranscriptionClient::new("hello there"),
            MockResponseClient::new("a reply"),
            MockSynthesizer::new(),
            sink,
            ControllerConfig::default(),
        );

        harness
            .input_tx
            .send(SegmenterEvent::UtteranceSealed(make_utterance(0)))
            .await
            .unwrap();

        // Wait for playback to begin, then observe the gate
        let mut saw_playing = false;
        while let Some(event) = harness.event_rx.recv().await {
            if matches!(
                event,
                SessionEvent::StateChanged {
                    state: TurnState::Playing,
                    ..
                }
            ) {
                saw_playing = true;
                break;
            }
        }
        assert!(saw_playing);
        // Give the controller a beat to flip the gate
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(harness.gate.is_gated(), "gate must close during playback");

        sink_probe.release();
        drop(harness.input_tx);
        while harness.event_rx.recv().await.is_some() {}
        harness.task.await.unwrap();

        assert!(!harness.gate.is_gated(), "gate must reopen after playback");
    }

    #[tokio::test]
    async fn test_interrupt_policy_cancels_playback() {
        let sink = MockAudioSink::new().with_hold();
        let config = ControllerConfig {
            barge_in: BargeInPolicy::InterruptToSpeak,
            ..Default::default()
        };
        let stt = MockTranscriptionClient::new("x")
            .with_responses(vec!["first utterance", "barge in here"]);
        let mut harness = spawn_controller(
            stt,
            MockResponseClient::new("ok then"),
            MockSynthesizer::new(),
            sink,
            config,
        );

        harness
            .input_tx
            .send(SegmenterEvent::UtteranceSealed(make_utterance(0)))
            .await
            .unwrap();

        // Wait until the first turn is playing
        while let Some(event) = harness.event_rx.recv().await {
            if matches!(
                event,
                SessionEvent::StateChanged {
                    state: TurnState::Playing,
                    ..
                }
            ) {
                break;
            }
        }

        // Second utterance seals mid-playback → barge-in
        harness
            .input_tx
            .send(SegmenterEvent::UtteranceSealed(make_utterance(1)))
            .await
            .unwrap();
        drop(harness.input_tx);

        let mut transcripts = Vec::new();
        while let Some(event) = harness.event_rx.recv().await {
            if let SessionEvent::Transcript { text, .. } = event {
                transcripts.push(text);
            }
        }
        harness.task.await.unwrap();

        assert_eq!(
            transcripts,
            vec!["first utterance", "barge in here"],
            "the interrupting utterance becomes the next turn"
        );
    }

    #[tokio::test]
    async fn test_stale_transcript_discarded_after_stop() {
        let stt = MockTranscriptionClient::new("hello there")
            .with_delay(Duration::from_millis(150));
        let chat = MockResponseClient::new("never sent");
        let chat_probe = chat.clone();
        let mut harness = spawn_controller(
            stt,
            chat,
            MockSynthesizer::new(),
            MockAudioSink::new(),
            ControllerConfig::default(),
        );

        harness
            .input_tx
            .send(SegmenterEvent::UtteranceSealed(make_utterance(0)))
            .await
            .unwrap();

        // Stop while the STT call is in flight
        tokio::time::sleep(Duration::from_millis(30)).await;
        harness.running.store(false, Ordering::SeqCst);
        drop(harness.input_tx);

        let mut events = Vec::new();
        while let Some(event) = harness.event_rx.recv().await {
            events.push(event);
        }
        harness.task.await.unwrap();

        assert_eq!(chat_probe.calls(), 0, "stale transcript must not advance the turn");
        assert!(
            !events
                .iter()
                .any(|e| matches!(e, SessionEvent::Transcript { .. })),
            "no transcript event after stop"
        );
    }

    #[tokio::test]
    async fn test_capturing_event_forwarded() {
        let mut harness = spawn_controller(
            MockTranscriptionClient::new("x"),
            MockResponseClient::new("y"),
            MockSynthesizer::new(),
            MockAudioSink::new(),
            ControllerConfig::default(),
        );

        harness
            .input_tx
            .send(SegmenterEvent::UtteranceOpened { start_sequence: 12 })
            .await
            .unwrap();
        drop(harness.input_tx);

        let mut events = Vec::new();
        while let Some(event) = harness.event_rx.recv().await {
            events.push(event);
        }
        harness.task.await.unwrap();

        assert_eq!(states(&events), vec![TurnState::Capturing]);
    }

    #[test]
    fn test_barge_in_policy_config_names() {
        let gate: BargeInPolicy = serde_json::from_str(r#""gate""#).unwrap();
        assert_eq!(gate, BargeInPolicy::GateDuringPlayback);
        let interrupt: BargeInPolicy = serde_json::from_str(r#""interrupt""#).unwrap();
        assert_eq!(interrupt, BargeInPolicy::InterruptToSpeak);
    }
}
