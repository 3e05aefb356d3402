//! Audio playback sink abstraction.
//!
//! Mirrors the `AudioSource` seam on the output side: the controller
//! plays synthesized speech through an `AudioSink` and watches the
//! returned `PlaybackHandle` for completion and live amplitude, so
//! turn-taking is testable without speakers.

use crate::error::Result;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

/// Handle to an in-progress playback.
///
/// Cheap to clone; all clones observe the same playback.
#[derive(Debug, Clone)]
pub struct PlaybackHandle {
    amplitude: Arc<Mutex<f32>>,
    finished: Arc<AtomicBool>,
    stopped: Arc<AtomicBool>,
}

impl PlaybackHandle {
    /// Creates a handle in the playing state.
    pub fn new() -> Self {
        Self {
            amplitude: Arc::new(Mutex::new(0.0)),
            finished: Arc::new(AtomicBool::new(false)),
            stopped: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Creates a handle that is already complete (empty playback).
    pub fn completed() -> Self {
        let handle = Self::new();
        handle.mark_finished();
        handle
    }

    /// Amplitude of the most recent playback window (normalized RMS).
    /// Returns 0.0 once playback ends.
    pub fn amplitude(&self) -> f32 {
        if self.is_finished() {
            return 0.0;
        }
        self.amplitude.lock().map(|a| *a).unwrap_or(0.0)
    }

    /// True once playback has completed or been stopped.
    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst) || self.stopped.load(Ordering::SeqCst)
    }

    /// True if playback was cancelled rather than running to completion.
    pub fn was_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Request cancellation (barge-in). Idempotent.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    /// Producer side: publish the current output window amplitude.
    pub fn set_amplitude(&self, value: f32) {
        if let Ok(mut a) = self.amplitude.lock() {
            *a = value;
        }
    }

    /// Producer side: mark playback complete.
    pub fn mark_finished(&self) {
        self.finished.store(true, Ordering::SeqCst);
        self.set_amplitude(0.0);
    }
}

impl Default for PlaybackHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Trait for audio playback sinks.
///
/// `play` starts playback and returns immediately; completion and
/// amplitude are observed through the handle. One sink holds at most one
/// device lease at a time; implementations release it when the returned
/// handle finishes.
pub trait AudioSink: Send + Sync {
    /// Begin playing 16-bit PCM mono samples at the given rate.
    fn play(&mut self, samples: Vec<i16>, sample_rate: u32) -> Result<PlaybackHandle>;
}

/// Mock audio sink for testing.
///
/// By default playback completes immediately. With `with_hold()`, handles
/// stay in the playing state until the test calls `release()`, which lets
/// tests observe Playing-state behavior (gating, barge-in, amplitude).
#[derive(Debug, Clone)]
pub struct MockAudioSink {
    play_calls: Arc<AtomicU32>,
    played_samples: Arc<AtomicU32>,
    should_fail: bool,
    hold: Option<Arc<AtomicBool>>,
    held_handles: Arc<Mutex<Vec<PlaybackHandle>>>,
}

impl MockAudioSink {
    pub fn new() -> Self {
        Self {
            play_calls: Arc::new(AtomicU32::new(0)),
            played_samples: Arc::new(AtomicU32::new(0)),
            should_fail: false,
            hold: None,
            held_handles: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Keep handles in the playing state until `release()` is called.
    pub fn with_hold(mut self) -> Self {
        self.hold = Some(Arc::new(AtomicBool::new(false)));
        self
    }

    /// Configure the mock to fail on play.
    pub fn with_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }

    /// Finish all held playbacks.
    pub fn release(&self) {
        if let Some(ref hold) = self.hold {
            hold.store(true, Ordering::SeqCst);
        }
        for handle in self.held_handles.lock().unwrap().drain(..) {
            handle.mark_finished();
        }
    }

    /// Number of times `play` was called.
    pub fn play_calls(&self) -> u32 {
        self.play_calls.load(Ordering::SeqCst)
    }

    /// Total samples handed to the sink across all plays.
    pub fn played_samples(&self) -> u32 {
        self.played_samples.load(Ordering::SeqCst)
    }
}

impl Default for MockAudioSink {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioSink for MockAudioSink {
    fn play(&mut self, samples: Vec<i16>, _sample_rate: u32) -> Result<PlaybackHandle> {
        if self.should_fail {
            return Err(crate::error::VoxloopError::Playback {
                message: "mock playback failure".to_string(),
            });
        }

        self.play_calls.fetch_add(1, Ordering::SeqCst);
        self.played_samples
            .fetch_add(samples.len() as u32, Ordering::SeqCst);

        let handle = PlaybackHandle::new();
        handle.set_amplitude(crate::audio::vad::calculate_rms(&samples));

        match self.hold {
            Some(ref hold) if !hold.load(Ordering::SeqCst) => {
                self.held_handles.lock().unwrap().push(handle.clone());
            }
            _ => handle.mark_finished(),
        }

        Ok(handle)
    }
}

/// Real speaker playback using CPAL.
///
/// Each `play` hands the samples to a dedicated thread that owns the
/// output stream for the lifetime of the playback; the handle only holds
/// the shared flags, so it stays `Send` without any unsafe stream
/// wrapping.
#[cfg(feature = "cpal-audio")]
#[derive(Debug, Default)]
pub struct CpalAudioSink;

#[cfg(feature = "cpal-audio")]
impl CpalAudioSink {
    pub fn new() -> Self {
        Self
    }
}

#[cfg(feature = "cpal-audio")]
impl AudioSink for CpalAudioSink {
    fn play(&mut self, samples: Vec<i16>, sample_rate: u32) -> Result<PlaybackHandle> {
        if samples.is_empty() {
            return Ok(PlaybackHandle::completed());
        }

        let handle = PlaybackHandle::new();
        let thread_handle = handle.clone();
        std::thread::spawn(move || {
            if let Err(e) = cpal_play_blocking(samples, sample_rate, &thread_handle) {
                eprintln!("voxloop: playback error: {}", e);
            }
            thread_handle.mark_finished();
        });

        Ok(handle)
    }
}

#[cfg(feature = "cpal-audio")]
fn cpal_play_blocking(
    samples: Vec<i16>,
    source_rate: u32,
    handle: &PlaybackHandle,
) -> Result<()> {
    use crate::error::VoxloopError;
    use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
    use std::time::{Duration, Instant};

    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| VoxloopError::Playback {
            message: "no output device available".to_string(),
        })?;

    let default_config = device
        .default_output_config()
        .map_err(|e| VoxloopError::Playback {
            message: format!("Failed to query output config: {}", e),
        })?;

    let device_rate = default_config.sample_rate();
    let channels = default_config.channels() as usize;
    let stream_config: cpal::StreamConfig = default_config.into();

    let samples = crate::audio::wav::resample(&samples, source_rate, device_rate);
    let total = samples.len();

    let position = Arc::new(Mutex::new(0usize));
    let cb_position = Arc::clone(&position);
    let cb_handle = handle.clone();

    let stream = device
        .build_output_stream(
            &stream_config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                let mut pos = cb_position.lock().unwrap();
                let mut sum_squares = 0.0f64;
                let mut written = 0usize;

                for frame in data.chunks_mut(channels) {
                    let sample = if cb_handle.was_stopped() || *pos >= total {
                        0.0
                    } else {
                        let s = samples[*pos] as f32 / i16::MAX as f32;
                        *pos += 1;
                        written += 1;
                        sum_squares += (s as f64) * (s as f64);
                        s
                    };

                    for out in frame.iter_mut() {
                        *out = sample;
                    }
                }

                if written > 0 {
                    cb_handle.set_amplitude((sum_squares / written as f64).sqrt() as f32);
                }
                if *pos >= total {
                    cb_handle.mark_finished();
                }
            },
            |err| {
                eprintln!("voxloop: audio playback error: {}", err);
            },
            None,
        )
        .map_err(|e| VoxloopError::Playback {
            message: format!("Failed to build output stream: {}", e),
        })?;

    stream.play().map_err(|e| VoxloopError::Playback {
        message: format!("Failed to start playback: {}", e),
    })?;

    // Hold the stream until playback runs out, is stopped, or overruns
    // its expected duration (stuck device).
    let duration_ms = (total as u64 * 1000) / u64::from(device_rate);
    let deadline = Instant::now() + Duration::from_millis(duration_ms + 500);

    while !handle.is_finished() && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(20));
    }

    drop(stream);
    Ok(())
}
