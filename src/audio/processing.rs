use rubato::{FftFixedIn, Resampler};

use crate::error::AudioError;

const CHUNK: usize = 1024;

/// Averages interleaved channels into one.
pub fn to_mono(interleaved: &[f32], channels: u16) -> Vec<f32> {
    let channels = channels.max(1) as usize;
    if channels == 1 {
        return interleaved.to_vec();
    }
    interleaved
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect()
}

/// Converts a mono signal between sample rates.
pub fn resample(samples: Vec<f32>, from: u32, to: u32) -> Result<Vec<f32>, AudioError> {
    if from == to || samples.is_empty() {
        return Ok(samples);
    }

    let mut resampler = FftFixedIn::<f32>::new(from as usize, to as usize, CHUNK, 2, 1)
        .map_err(|e| AudioError::Resample(e.to_string()))?;

    let expected = samples.len() as u64 * to as u64 / from as u64;
    let mut out = Vec::with_capacity(expected as usize + CHUNK);
    let mut pos = 0;

    loop {
        let needed = resampler.input_frames_next();
        if pos + needed > samples.len() {
            break;
        }
        let block = resampler
            .process(&[&samples[pos..pos + needed]], None)
            .map_err(|e| AudioError::Resample(e.to_string()))?;
        out.extend_from_slice(&block[0]);
        pos += needed;
    }

    if pos < samples.len() {
        let block = resampler
            .process_partial(Some(&[&samples[pos..]]), None)
            .map_err(|e| AudioError::Resample(e.to_string()))?;
        out.extend_from_slice(&block[0]);
    }

    out.truncate(expected as usize);
    Ok(out)
}
