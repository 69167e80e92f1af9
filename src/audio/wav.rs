use hound::{SampleFormat, WavReader};
use std::path::Path;

use super::processing::{resample, to_mono};
use crate::error::AudioError;

/// Reads any PCM/float WAV as mono f32 at `target_rate`.
pub fn load_wav_mono(path: &Path, target_rate: u32) -> Result<Vec<f32>, AudioError> {
    let mut reader = WavReader::open(path)?;
    let spec = reader.spec();

    let interleaved: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader.samples::<f32>().collect::<Result<_, _>>()?,
        SampleFormat::Int => {
            let full_scale = (1i64 << (spec.bits_per_sample.max(1) - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / full_scale))
                .collect::<Result<_, _>>()?
        }
    };

    resample(to_mono(&interleaved, spec.channels), spec.sample_rate, target_rate)
}
