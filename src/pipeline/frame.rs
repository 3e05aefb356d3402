//! Frame types that flow between pipeline stations.

use std::time::Instant;

/// Raw audio frame with metadata for tracking through the pipeline.
///
/// Never mutated after creation.
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Sequence number for ordering and gap detection.
    pub sequence: u64,
    /// Timestamp when the audio was captured.
    pub timestamp: Instant,
    /// Audio samples as 16-bit PCM.
    pub samples: Vec<i16>,
}

impl AudioFrame {
    /// Creates a new audio frame stamped with the current instant.
    pub fn new(sequence: u64, samples: Vec<i16>) -> Self {
        Self {
            sequence,
            timestamp: Instant::now(),
            samples,
        }
    }

    /// Returns the duration of this frame in milliseconds.
    pub fn duration_ms(&self, sample_rate: u32) -> u32 {
        (self.samples.len() as u32 * 1000) / sample_rate
    }
}

/// An audio frame annotated with its voice-activity decision.
#[derive(Debug, Clone)]
pub struct VadFrame {
    /// Sequence number carried over from the audio frame.
    pub sequence: u64,
    /// Timestamp when the audio was captured.
    pub timestamp: Instant,
    /// Audio samples as 16-bit PCM.
    pub samples: Vec<i16>,
    /// Whether speech was detected in this frame.
    pub is_speech: bool,
    /// Normalized RMS level (0.0 = silence).
    pub level: f32,
}

impl VadFrame {
    /// Annotates an audio frame with a VAD decision.
    pub fn new(frame: AudioFrame, is_speech: bool, level: f32) -> Self {
        Self {
            sequence: frame.sequence,
            timestamp: frame.timestamp,
            samples: frame.samples,
            is_speech,
            level,
        }
    }
}

/// One contiguous speech segment, sealed by silence on both sides.
///
/// Produced by the segmenter, consumed by the transcription client.
#[derive(Debug, Clone)]
pub struct Utterance {
    /// Monotonically increasing per-session identifier.
    pub id: u64,
    /// Sequence of the first speech frame.
    pub start_sequence: u64,
    /// Sequence of the frame that sealed the utterance.
    pub end_sequence: u64,
    /// Capture timestamp of the first speech frame.
    pub started_at: Instant,
    /// Timestamp when the utterance was sealed.
    pub sealed_at: Instant,
    /// Audio samples as 16-bit PCM mono.
    pub samples: Vec<i16>,
    /// Sample rate of `samples`.
    pub sample_rate: u32,
}

impl Utterance {
    /// Duration of the audio in milliseconds.
    pub fn duration_ms(&self) -> u32 {
        (self.samples.len() as u32 * 1000) / self.sample_rate
    }

    /// Size of the raw PCM payload in bytes.
    pub fn byte_len(&self) -> usize {
        self.samples.len() * std::mem::size_of::<i16>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_frame_creation() {
        let frame = AudioFrame::new(42, vec![100, 200, 300]);
        assert_eq!(frame.sequence, 42);
        assert_eq!(frame.samples, vec![100, 200, 300]);
    }

    #[test]
    fn test_audio_frame_duration() {
        let frame = AudioFrame::new(0, vec![0i16; 16000]);
        assert_eq!(frame.duration_ms(16000), 1000);
    }

    #[test]
    fn test_vad_frame_carries_frame_fields() {
        let frame = AudioFrame::new(7, vec![1, 2, 3]);
        let timestamp = frame.timestamp;
        let vad_frame = VadFrame::new(frame, true, 0.8);

        assert_eq!(vad_frame.sequence, 7);
        assert_eq!(vad_frame.timestamp, timestamp);
        assert_eq!(vad_frame.samples, vec![1, 2, 3]);
        assert!(vad_frame.is_speech);
        assert!((vad_frame.level - 0.8).abs() < f32::EPSILON);
    }

    #[test]
    fn test_utterance_duration_and_bytes() {
        let now = Instant::now();
        let utterance = Utterance {
            id: 0,
            start_sequence: 10,
            end_sequence: 20,
            started_at: now,
            sealed_at: now,
            samples: vec![0i16; 8000],
            sample_rate: 16000,
        };

        assert_eq!(utterance.duration_ms(), 500);
        assert_eq!(utterance.byte_len(), 16000);
    }
}
