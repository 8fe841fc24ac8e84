//! Assembler Worker's audio normalization (spec.md §4.2): concatenate chunk
//! files in order and re-encode the result to mono, 16-bit, 16 kHz PCM WAV.
//!
//! The teacher's own `crates/audio-utils` reaches for `rodio` (decode) and
//! `rubato` (high-quality sinc resampling) for this; this worker keeps
//! `rodio` for decoding arbitrary chunk codecs but resamples with a plain
//! linear interpolator, since the only requirement here is a fixed-rate
//! normalization pass over already-captured meeting audio, not real-time
//! streaming quality.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use rodio::{Decoder, Source};
use thiserror::Error;

pub const TARGET_SAMPLE_RATE: u32 = 16_000;

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("no chunks to assemble")]
    NoChunks,
    #[error("failed to decode chunk {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: rodio::decoder::DecoderError,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Wav(#[from] hound::Error),
}

/// Concatenates `chunk_paths` (already sorted by the caller) into one mono
/// 16-bit 16 kHz WAV file at `output_path`.
pub fn assemble_to_wav(chunk_paths: &[PathBuf], output_path: &Path) -> Result<(), AudioError> {
    if chunk_paths.is_empty() {
        return Err(AudioError::NoChunks);
    }

    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: TARGET_SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(output_path, spec)?;

    for path in chunk_paths {
        let file = File::open(path)?;
        let decoder = Decoder::new(BufReader::new(file)).map_err(|source| AudioError::Decode {
            path: path.clone(),
            source,
        })?;

        let channels = decoder.channels().max(1) as usize;
        let source_rate = decoder.sample_rate();
        let samples: Vec<f32> = decoder.convert_samples().collect();

        let mono = downmix_to_mono(&samples, channels);
        let resampled = resample_linear(&mono, source_rate, TARGET_SAMPLE_RATE);

        for sample in resampled {
            let scaled = (sample * i16::MAX as f32).clamp(i16::MIN as f32, i16::MAX as f32);
            writer.write_sample(scaled as i16)?;
        }
    }

    writer.finalize()?;
    Ok(())
}

fn downmix_to_mono(samples: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }
    samples
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

fn resample_linear(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || samples.is_empty() {
        return samples.to_vec();
    }
    let ratio = from_rate as f64 / to_rate as f64;
    let out_len = ((samples.len() as f64) / ratio).round() as usize;
    (0..out_len)
        .map(|i| {
            let src_pos = i as f64 * ratio;
            let idx = src_pos.floor() as usize;
            let frac = (src_pos - idx as f64) as f32;
            let a = samples.get(idx).copied().unwrap_or(0.0);
            let b = samples.get(idx + 1).copied().unwrap_or(a);
            a + (b - a) * frac
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_chunks_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = assemble_to_wav(&[], &dir.path().join("out.wav")).unwrap_err();
        assert!(matches!(err, AudioError::NoChunks));
    }

    #[test]
    fn downmix_averages_interleaved_channels() {
        let stereo = vec![1.0, -1.0, 0.5, 0.5];
        let mono = downmix_to_mono(&stereo, 2);
        assert_eq!(mono, vec![0.0, 0.5]);
    }

    #[test]
    fn resample_identity_when_rates_match() {
        let samples = vec![0.1, 0.2, 0.3];
        assert_eq!(resample_linear(&samples, 16_000, 16_000), samples);
    }

    #[test]
    fn resample_halves_length_when_downsampling_by_two() {
        let samples = vec![0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0];
        let out = resample_linear(&samples, 32_000, 16_000);
        assert_eq!(out.len(), 4);
    }
}
