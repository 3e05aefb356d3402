//! Voice Activity Detection (VAD).
//!
//! Classifies individual audio frames as speech or silence from RMS
//! energy. The classifier is a pure function of the frame: all hysteresis
//! (consecutive-frame counting, utterance boundaries) lives in the
//! segmenter so the same decision stream can be replayed deterministically
//! in tests.

use crate::defaults;
use std::time::Instant;

/// Trait for time operations, allowing mock time in tests.
pub trait Clock: Send + Sync {
    /// Returns the current instant.
    fn now(&self) -> Instant;
}

/// Real system clock using `std::time::Instant::now()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Allow shared clocks (`Arc<dyn Clock>`) wherever a clock is expected.
impl<C: Clock + ?Sized> Clock for std::sync::Arc<C> {
    fn now(&self) -> Instant {
        (**self).now()
    }
}

/// Mock clock for testing that allows manual time advancement.
#[cfg(test)]
#[derive(Debug, Clone)]
pub struct MockClock {
    current: std::sync::Arc<std::sync::Mutex<Instant>>,
}

#[cfg(test)]
impl MockClock {
    /// Creates a new mock clock starting at the current instant.
    pub fn new() -> Self {
        Self {
            current: std::sync::Arc::new(std::sync::Mutex::new(Instant::now())),
        }
    }

    /// Advances the mock clock by the given duration.
    pub fn advance(&self, duration: std::time::Duration) {
        let mut current = self.current.lock().unwrap();
        *current += duration;
    }
}

#[cfg(test)]
impl Clock for MockClock {
    fn now(&self) -> Instant {
        *self.current.lock().unwrap()
    }
}

/// Configuration for Voice Activity Detection.
#[derive(Debug, Clone, Copy)]
pub struct VadConfig {
    /// RMS threshold for detecting speech (0.0 to 1.0).
    ///
    /// Acoustically environment-dependent; see `defaults::VAD_THRESHOLD`.
    pub threshold: f32,
}

impl Default for VadConfig {
    fn default() -> Self {
        Self {
            threshold: defaults::VAD_THRESHOLD,
        }
    }
}

/// Per-frame classification result.
#[derive(Debug, Clone, Copy)]
pub struct VadDecision {
    /// Whether the frame's energy crossed the speech threshold.
    pub is_speech: bool,
    /// Normalized RMS level of the frame (0.0 to 1.0).
    pub level: f32,
    /// Threshold the decision was made against.
    pub threshold: f32,
}

/// Stateless frame classifier.
#[derive(Debug, Clone, Copy)]
pub struct VoiceActivityDetector {
    config: VadConfig,
}

impl VoiceActivityDetector {
    /// Creates a new detector with the given configuration.
    pub fn new(config: VadConfig) -> Self {
        Self { config }
    }

    /// Classifies a single frame of 16-bit PCM samples.
    pub fn classify(&self, samples: &[i16]) -> VadDecision {
        let level = calculate_rms(samples);
        VadDecision {
            is_speech: level > self.config.threshold,
            level,
            threshold: self.config.threshold,
        }
    }

    /// Returns the current speech threshold.
    pub fn threshold(&self) -> f32 {
        self.config.threshold
    }

    /// Updates the speech threshold.
    pub fn set_threshold(&mut self, threshold: f32) {
        self.config.threshold = threshold;
    }
}

/// Calculates the Root Mean Square (RMS) of audio samples.
///
/// # Arguments
/// * `samples` - Audio samples as 16-bit PCM
///
/// # Returns
/// Normalized RMS value (0.0 to 1.0), where:
/// - 0.0 represents silence
/// - ~0.707 represents a full-scale sine wave
/// - 1.0 represents maximum amplitude
pub fn calculate_rms(samples: &[i16]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_squares: f64 = samples
        .iter()
        .map(|&sample| {
            let normalized = sample as f64 / i16::MAX as f64;
            normalized * normalized
        })
        .sum();

    let mean_square = sum_squares / samples.len() as f64;
    mean_square.sqrt() as f32
}
