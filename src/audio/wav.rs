//! WAV container helpers for the provider boundaries.
//!
//! Utterances leave the pipeline as WAV bytes (transcription request
//! body); synthesized speech arrives as WAV bytes (synthesis response).
//! Arbitrary rates and channel counts are accepted on decode and reduced
//! to mono at the caller's target rate.

use crate::error::{Result, VoxloopError};
use std::io::Cursor;

/// Encode 16-bit PCM mono samples as WAV bytes.
pub fn encode_wav(samples: &[i16], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer =
            hound::WavWriter::new(&mut cursor, spec).map_err(|e| VoxloopError::Other(format!(
                "Failed to create WAV writer: {}",
                e
            )))?;

        for &sample in samples {
            writer
                .write_sample(sample)
                .map_err(|e| VoxloopError::Other(format!("Failed to write WAV sample: {}", e)))?;
        }

        writer
            .finalize()
            .map_err(|e| VoxloopError::Other(format!("Failed to finalize WAV: {}", e)))?;
    }

    Ok(cursor.into_inner())
}

/// Decode WAV bytes to 16-bit PCM mono samples at the target rate.
///
/// Stereo input is averaged to mono; rate mismatches are resampled with
/// linear interpolation.
pub fn decode_wav(bytes: &[u8], target_rate: u32) -> Result<Vec<i16>> {
    let mut reader =
        hound::WavReader::new(Cursor::new(bytes)).map_err(|e| VoxloopError::Playback {
            message: format!("Failed to parse WAV data: {}", e),
        })?;

    let spec = reader.spec();
    let source_rate = spec.sample_rate;
    let source_channels = spec.channels;

    let raw_samples: Vec<i16> = match spec.sample_format {
        hound::SampleFormat::Int => reader
            .samples::<i16>()
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| VoxloopError::Playback {
                message: format!("Failed to read WAV samples: {}", e),
            })?,
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .map(|s| s.map(|v| (v.clamp(-1.0, 1.0) * i16::MAX as f32) as i16))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| VoxloopError::Playback {
                message: format!("Failed to read WAV samples: {}", e),
            })?,
    };

    // Convert to mono if stereo
    let mono_samples = if source_channels == 2 {
        raw_samples
            .chunks_exact(2)
            .map(|chunk| {
                let left = chunk[0] as i32;
                let right = chunk[1] as i32;
                ((left + right) / 2) as i16
            })
            .collect()
    } else {
        raw_samples
    };

    if source_rate != target_rate {
        Ok(resample(&mono_samples, source_rate, target_rate))
    } else {
        Ok(mono_samples)
    }
}

/// Simple linear interpolation resampling.
pub fn resample(samples: &[i16], from_rate: u32, to_rate: u32) -> Vec<i16> {
    if from_rate == to_rate {
        return samples.to_vec();
    }

    let ratio = from_rate as f64 / to_rate as f64;
    let output_len = (samples.len() as f64 / ratio).ceil() as usize;

    (0..output_len)
        .map(|i| {
            let src_pos = i as f64 * ratio;
            let src_idx = src_pos as usize;
            let frac = src_pos - src_idx as f64;

            if src_idx + 1 < samples.len() {
                let a = samples[src_idx] as f64;
                let b = samples[src_idx + 1] as f64;
                (a + (b - a) * frac) as i16
            } else if src_idx < samples.len() {
                samples[src_idx]
            } else {
                0
            }
        })
        .collect()
}
