//! VAD station: annotates audio frames with speech decisions.
//!
//! Every frame passes through — classification here, boundary logic in
//! the segmenter. Optionally draws a live level meter on stderr.

use crate::audio::vad::{VadConfig, VoiceActivityDetector};
use crate::pipeline::frame::{AudioFrame, VadFrame};
use std::io::{self, Write};
use tokio::sync::mpsc;

/// Station that classifies each frame and forwards it annotated.
pub struct VadStation {
    vad: VoiceActivityDetector,
    show_levels: bool,
}

impl VadStation {
    /// Creates a new VAD station with the given configuration.
    pub fn new(config: VadConfig) -> Self {
        Self {
            vad: VoiceActivityDetector::new(config),
            show_levels: false,
        }
    }

    /// Enables or disables the level meter on stderr.
    pub fn with_show_levels(mut self, show: bool) -> Self {
        self.show_levels = show;
        self
    }

    /// Processes a single frame. Empty frames are dropped; everything
    /// else is annotated and forwarded.
    pub fn process(&mut self, frame: AudioFrame) -> Option<VadFrame> {
        if frame.samples.is_empty() {
            return None;
        }

        let decision = self.vad.classify(&frame.samples);

        if self.show_levels {
            self.display_level(decision.level, decision.threshold);
        }

        Some(VadFrame::new(frame, decision.is_speech, decision.level))
    }

    /// Displays a visual level meter to stderr.
    fn display_level(&self, level: f32, threshold: f32) {
        const BAR_WIDTH: usize = 30;

        // Logarithmic scale for visibility at low levels:
        // map 0.001-0.5 onto 0-30 bars
        let log_level = if level > 0.001 {
            ((level.log10() + 3.0) / 2.7 * BAR_WIDTH as f32).clamp(0.0, BAR_WIDTH as f32)
        } else {
            0.0
        };
        let filled = log_level as usize;

        let log_threshold = if threshold > 0.001 {
            ((threshold.log10() + 3.0) / 2.7 * BAR_WIDTH as f32).clamp(0.0, BAR_WIDTH as f32)
        } else {
            0.0
        };
        let threshold_pos = log_threshold as usize;

        let bar: String = (0..BAR_WIDTH)
            .map(|i| {
                if i < filled {
                    if level > threshold { '█' } else { '▓' }
                } else if i == threshold_pos {
                    '│'
                } else {
                    '░'
                }
            })
            .collect();

        eprint!("\r[{}] {:.3}  ", bar, level);
        io::stderr().flush().ok();
    }

    /// Runs the station until the input channel closes.
    pub async fn run(
        mut self,
        mut input: mpsc::Receiver<AudioFrame>,
        output: mpsc::Sender<VadFrame>,
    ) {
        while let Some(frame) = input.recv().await {
            if let Some(vad_frame) = self.process(frame)
                && output.send(vad_frame).await.is_err()
            {
                break;
            }
        }

        if self.show_levels {
            // Clear the level meter line
            eprint!("\r{:60}\r", "");
            io::stderr().flush().ok();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_silence(count: usize) -> Vec<i16> {
        vec![0i16; count]
    }

    fn make_speech(count: usize, amplitude: i16) -> Vec<i16> {
        vec![amplitude; count]
    }

    #[test]
    fn test_vad_station_annotates_silence() {
        let mut station = VadStation::new(VadConfig::default());

        let frame = AudioFrame::new(1, make_silence(1000));
        let vad_frame = station.process(frame).unwrap();

        assert!(!vad_frame.is_speech);
        assert_eq!(vad_frame.level, 0.0);
        assert_eq!(vad_frame.sequence, 1);
    }

    #[test]
    fn test_vad_station_annotates_speech() {
        let mut station = VadStation::new(VadConfig::default());

        // RMS ~0.09, above 0.02 threshold
        let frame = AudioFrame::new(2, make_speech(1000, 3000));
        let vad_frame = station.process(frame).unwrap();

        assert!(vad_frame.is_speech);
        assert!(vad_frame.level > 0.02);
    }

    #[test]
    fn test_vad_station_drops_empty_frames() {
        let mut station = VadStation::new(VadConfig::default());
        assert!(station.process(AudioFrame::new(0, vec![])).is_none());
    }

    #[test]
    fn test_vad_station_never_filters_nonempty() {
        let mut station = VadStation::new(VadConfig::default());

        for i in 0..10 {
            let frame = AudioFrame::new(i, make_silence(1000));
            assert!(
                station.process(frame).is_some(),
                "Frame {} should not be filtered",
                i
            );
        }
    }

    #[tokio::test]
    async fn test_vad_station_run_forwards_annotated_frames() {
        let (input_tx, input_rx) = mpsc::channel(10);
        let (output_tx, mut output_rx) = mpsc::channel(10);

        let station = VadStation::new(VadConfig::default());
        tokio::spawn(async move {
            station.run(input_rx, output_tx).await;
        });

        input_tx
            .send(AudioFrame::new(0, make_speech(160, 3000)))
            .await
            .unwrap();
        input_tx
            .send(AudioFrame::new(1, make_silence(160)))
            .await
            .unwrap();
        drop(input_tx);

        let first = output_rx.recv().await.unwrap();
        assert!(first.is_speech);
        let second = output_rx.recv().await.unwrap();
        assert!(!second.is_speech);
        assert!(output_rx.recv().await.is_none());
    }

    #[test]
    fn test_display_level_does_not_panic() {
        let station = VadStation::new(VadConfig::default()).with_show_levels(true);
        station.display_level(0.0, 0.02);
        station.display_level(0.15, 0.08);
        station.display_level(0.3, 0.05);
    }
}
