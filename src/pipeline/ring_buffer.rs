//! Capture bridge: audio-source thread → pipeline channel.
//!
//! Owns the polling thread for an [`AudioSource`] and emits numbered
//! [`AudioFrame`]s into a bounded channel. The thread stops, and the
//! source is released, when the handle is stopped or the receiver is
//! dropped — whichever comes first.

use crate::audio::recorder::AudioSource;
use crate::defaults;
use crate::error::Result;
use crate::pipeline::frame::AudioFrame;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread;
use std::time::Duration;
use tokio::sync::mpsc;

/// Configuration for the capture bridge.
#[derive(Debug, Clone)]
pub struct RingBufferConfig {
    /// Channel buffer size (number of frames to buffer).
    pub channel_buffer_size: usize,
    /// Polling interval when no samples are available (ms).
    pub poll_interval_ms: u64,
}

impl Default for RingBufferConfig {
    fn default() -> Self {
        Self {
            channel_buffer_size: defaults::FRAME_BUFFER,
            poll_interval_ms: defaults::POLL_INTERVAL_MS,
        }
    }
}

/// Continuously captures audio from a source and emits frames.
pub struct RingBuffer {
    audio_source: Box<dyn AudioSource>,
    config: RingBufferConfig,
    sequence: AtomicU64,
    running: Arc<AtomicBool>,
}

impl RingBuffer {
    /// Creates a new ring buffer wrapping the given audio source.
    pub fn new(audio_source: Box<dyn AudioSource>) -> Self {
        Self::with_config(audio_source, RingBufferConfig::default())
    }

    /// Creates a new ring buffer with custom configuration.
    pub fn with_config(audio_source: Box<dyn AudioSource>, config: RingBufferConfig) -> Self {
        Self {
            audio_source,
            config,
            sequence: AtomicU64::new(0),
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Starts continuous audio capture in a background thread.
    ///
    /// Returns a receiver for audio frames and a handle for shutdown. The
    /// capture runs until the handle is stopped, the receiver is dropped,
    /// or a finite source is exhausted.
    pub fn start(mut self) -> Result<(mpsc::Receiver<AudioFrame>, RingBufferHandle)> {
        let (tx, rx) = mpsc::channel(self.config.channel_buffer_size);
        let running = self.running.clone();

        // Acquire the microphone lease before reporting success
        self.audio_source.start()?;
        running.store(true, Ordering::SeqCst);

        let poll_interval = Duration::from_millis(self.config.poll_interval_ms);
        let source_is_finite = self.audio_source.is_finite();

        let thread_running = running.clone();
        thread::spawn(move || {
            let mut consecutive_errors: u32 = 0;
            const MAX_CONSECUTIVE_ERRORS: u32 = 10;

            while thread_running.load(Ordering::SeqCst) {
                let samples = match self.audio_source.read_samples() {
                    Ok(s) => {
                        consecutive_errors = 0;
                        s
                    }
                    Err(e) => {
                        consecutive_errors += 1;
                        if consecutive_errors >= MAX_CONSECUTIVE_ERRORS {
                            eprintln!(
                                "voxloop: audio capture failed {consecutive_errors} times in a row: {e}"
                            );
                            eprintln!("voxloop: check your microphone connection and try again");
                            break;
                        }
                        thread::sleep(poll_interval);
                        continue;
                    }
                };

                if samples.is_empty() {
                    if source_is_finite {
                        // File/scripted source exhausted — exit polling loop.
                        break;
                    }
                    // Live source: empty read is normal at startup while the
                    // device initializes. Keep polling.
                    thread::sleep(poll_interval);
                    continue;
                }

                let seq = self.sequence.fetch_add(1, Ordering::SeqCst);
                let frame = AudioFrame::new(seq, samples);

                // Stop if the receiver was dropped
                if tx.blocking_send(frame).is_err() {
                    break;
                }
            }

            thread_running.store(false, Ordering::SeqCst);

            // Release the microphone lease
            if let Err(e) = self.audio_source.stop() {
                eprintln!("voxloop: failed to stop audio capture: {e}");
            }
        });

        let handle = RingBufferHandle { running };

        Ok((rx, handle))
    }
}

/// Handle to control a running ring buffer.
#[derive(Clone)]
pub struct RingBufferHandle {
    running: Arc<AtomicBool>,
}

impl RingBufferHandle {
    /// Stops the capture thread; idempotent.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Returns true if the capture thread is running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}
