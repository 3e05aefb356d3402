//! Audio source abstraction.
//!
//! The `AudioSource` trait is the seam between the pipeline and the
//! hardware: the real cpal microphone, a WAV file, or a scripted mock all
//! implement it, so segmentation and turn-taking are testable without an
//! audio device.

use crate::defaults;
use crate::error::{Result, VoxloopError};
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

/// Trait for audio source devices.
///
/// Exactly one hardware lease is held between `start()` and `stop()`.
/// Both calls are idempotent: starting an already-started source and
/// stopping an already-stopped one are no-ops.
pub trait AudioSource: Send + Sync {
    /// Start capturing audio from the source.
    fn start(&mut self) -> Result<()>;

    /// Stop capturing audio and release the underlying device.
    fn stop(&mut self) -> Result<()>;

    /// Read audio samples captured since the last call.
    ///
    /// Returns an empty vector when no samples are available yet.
    fn read_samples(&mut self) -> Result<Vec<i16>>;

    /// Whether the source runs out of samples (file/pipe) or produces
    /// them indefinitely (microphone).
    fn is_finite(&self) -> bool {
        false
    }
}

/// Configuration for audio source initialization.
#[derive(Debug, Clone)]
pub struct AudioSourceConfig {
    pub sample_rate: u32,
}

impl Default for AudioSourceConfig {
    fn default() -> Self {
        Self {
            sample_rate: defaults::SAMPLE_RATE,
        }
    }
}

/// Counters exposed by [`MockAudioSource`] so tests can assert that every
/// acquired lease was released.
#[derive(Debug, Clone, Default)]
pub struct LeaseCounters {
    starts: Arc<AtomicU32>,
    stops: Arc<AtomicU32>,
}

impl LeaseCounters {
    /// Number of times the source actually acquired its lease.
    pub fn starts(&self) -> u32 {
        self.starts.load(Ordering::SeqCst)
    }

    /// Number of times the source actually released its lease.
    pub fn stops(&self) -> u32 {
        self.stops.load(Ordering::SeqCst)
    }

    /// True when every acquire has a matching release.
    pub fn balanced(&self) -> bool {
        self.starts() == self.stops()
    }
}

/// Mock audio source for testing.
///
/// Frames are scripted up front; once the script is exhausted the source
/// returns empty reads (and reports itself finite), which lets pipeline
/// tests drive a complete capture session deterministically.
#[derive(Debug, Clone)]
pub struct MockAudioSource {
    is_started: bool,
    frames: Arc<std::sync::Mutex<VecDeque<Vec<i16>>>>,
    should_fail_start: bool,
    should_fail_stop: bool,
    should_fail_read: bool,
    error_message: String,
    counters: LeaseCounters,
}

impl MockAudioSource {
    /// Create a new mock audio source with an empty frame script.
    pub fn new() -> Self {
        Self {
            is_started: false,
            frames: Arc::new(std::sync::Mutex::new(VecDeque::new())),
            should_fail_start: false,
            should_fail_stop: false,
            should_fail_read: false,
            error_message: "mock audio error".to_string(),
            counters: LeaseCounters::default(),
        }
    }

    /// Script the frames this source will produce, in order.
    pub fn with_frames(self, frames: Vec<Vec<i16>>) -> Self {
        *self.frames.lock().unwrap() = frames.into();
        self
    }

    /// Script `count` copies of the same frame.
    pub fn with_repeated_frame(self, frame: Vec<i16>, count: usize) -> Self {
        *self.frames.lock().unwrap() = std::iter::repeat_n(frame, count).collect();
        self
    }

    /// Configure the mock to fail on start.
    pub fn with_start_failure(mut self) -> Self {
        self.should_fail_start = true;
        self
    }

    /// Configure the mock to fail on stop.
    pub fn with_stop_failure(mut self) -> Self {
        self.should_fail_stop = true;
        self
    }

    /// Configure the mock to fail on read.
    pub fn with_read_failure(mut self) -> Self {
        self.should_fail_read = true;
        self
    }

    /// Configure the error message for failures.
    pub fn with_error_message(mut self, message: &str) -> Self {
        self.error_message = message.to_string();
        self
    }

    /// Lease counters shared with this source; clone before moving the
    /// source into a pipeline.
    pub fn counters(&self) -> LeaseCounters {
        self.counters.clone()
    }

    /// Check if the audio source is started.
    pub fn is_started(&self) -> bool {
        self.is_started
    }
}

impl Default for MockAudioSource {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioSource for MockAudioSource {
    fn start(&mut self) -> Result<()> {
        if self.should_fail_start {
            return Err(VoxloopError::AudioCapture {
                message: self.error_message.clone(),
            });
        }
        if !self.is_started {
            self.is_started = true;
            self.counters.starts.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        if self.should_fail_stop {
            return Err(VoxloopError::AudioCapture {
                message: self.error_message.clone(),
            });
        }
        if self.is_started {
            self.is_started = false;
            self.counters.stops.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }

    fn read_samples(&mut self) -> Result<Vec<i16>> {
        if self.should_fail_read {
            return Err(VoxloopError::AudioCapture {
                message: self.error_message.clone(),
            });
        }
        Ok(self.frames.lock().unwrap().pop_front().unwrap_or_default())
    }

    fn is_finite(&self) -> bool {
        true
    }
}
