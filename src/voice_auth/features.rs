use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::f32::consts::PI;
use std::sync::Arc;

pub const SAMPLE_RATE: u32 = 16_000;
pub const NUM_CEPSTRA: usize = 20;
/// Per-coefficient mean followed by per-coefficient standard deviation.
pub const FEATURE_DIM: usize = NUM_CEPSTRA * 2;

const FRAME_LEN: usize = 400; // 25 ms
const FRAME_STEP: usize = 160; // 10 ms
const NFFT: usize = 512;
const NUM_BINS: usize = NFFT / 2 + 1;
const NUM_FILTERS: usize = 26;
const PREEMPHASIS: f32 = 0.97;
const CEP_LIFTER: f32 = 22.0;

fn hz_to_mel(hz: f32) -> f32 {
    2595.0 * (1.0 + hz / 700.0).log10()
}

fn mel_to_hz(mel: f32) -> f32 {
    700.0 * (10f32.powf(mel / 2595.0) - 1.0)
}

/// MFCC front end. Construction plans the FFT and the filterbank once.
pub struct MfccExtractor {
    fft: Arc<dyn Fft<f32>>,
    filterbank: Vec<Vec<f32>>,
    dct: Vec<Vec<f32>>,
    lifter: Vec<f32>,
}

impl MfccExtractor {
    pub fn new() -> Self {
        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(NFFT);

        Self {
            fft,
            filterbank: mel_filterbank(),
            dct: dct_matrix(),
            lifter: (0..NUM_CEPSTRA)
                .map(|n| 1.0 + (CEP_LIFTER / 2.0) * (PI * n as f32 / CEP_LIFTER).sin())
                .collect(),
        }
    }

    /// Cepstra per frame. Non-finite samples are read as silence; an empty
    /// signal yields a single silent frame.
    pub fn frames(&self, samples: &[f32]) -> Vec<[f32; NUM_CEPSTRA]> {
        let signal = preemphasize(samples);

        let count = if signal.len() <= FRAME_LEN {
            1
        } else {
            1 + (signal.len() - FRAME_LEN).div_ceil(FRAME_STEP)
        };

        let mut out = Vec::with_capacity(count);
        let mut buffer = vec![Complex::new(0.0f32, 0.0); NFFT];

        for f in 0..count {
            let start = f * FRAME_STEP;
            buffer.iter_mut().for_each(|c| *c = Complex::new(0.0, 0.0));
            for (i, slot) in buffer.iter_mut().take(FRAME_LEN).enumerate() {
                slot.re = signal.get(start + i).copied().unwrap_or(0.0);
            }
            self.fft.process(&mut buffer);

            let power: Vec<f32> = buffer[..NUM_BINS]
                .iter()
                .map(|c| c.norm_sqr() / NFFT as f32)
                .collect();
            let energy = power.iter().sum::<f32>().max(f32::EPSILON);

            let log_mel: Vec<f32> = self
                .filterbank
                .iter()
                .map(|filter| {
                    let e: f32 = filter.iter().zip(&power).map(|(w, p)| w * p).sum();
                    e.max(f32::EPSILON).ln()
                })
                .collect();

            let mut cepstra = [0.0f32; NUM_CEPSTRA];
            for (n, coeff) in cepstra.iter_mut().enumerate() {
                let c: f32 = self.dct[n].iter().zip(&log_mel).map(|(d, m)| d * m).sum();
                *coeff = c * self.lifter[n];
            }
            cepstra[0] = energy.ln();
            out.push(cepstra);
        }

        out
    }

    /// Fixed-length utterance descriptor: mean and standard deviation of
    /// every coefficient across frames.
    pub fn summarize(&self, samples: &[f32]) -> Vec<f32> {
        let frames = self.frames(samples);
        let n = frames.len() as f32;

        let mut mean = [0.0f32; NUM_CEPSTRA];
        for frame in &frames {
            for (m, c) in mean.iter_mut().zip(frame) {
                *m += c / n;
            }
        }

        let mut std = [0.0f32; NUM_CEPSTRA];
        for frame in &frames {
            for ((s, c), m) in std.iter_mut().zip(frame).zip(&mean) {
                *s += (c - m).powi(2) / n;
            }
        }

        mean.iter()
            .copied()
            .chain(std.iter().map(|v| v.sqrt()))
            .collect()
    }
}

impl Default for MfccExtractor {
    fn default() -> Self {
        Self::new()
    }
}

fn preemphasize(samples: &[f32]) -> Vec<f32> {
    let clean = |x: f32| if x.is_finite() { x } else { 0.0 };
    let mut out = Vec::with_capacity(samples.len());
    let mut prev = 0.0f32;
    for (i, &raw) in samples.iter().enumerate() {
        let x = clean(raw);
        out.push(if i == 0 { x } else { x - PREEMPHASIS * prev });
        prev = x;
    }
    out
}

fn mel_filterbank() -> Vec<Vec<f32>> {
    let low = hz_to_mel(0.0);
    let high = hz_to_mel(SAMPLE_RATE as f32 / 2.0);

    let bins: Vec<usize> = (0..NUM_FILTERS + 2)
        .map(|i| {
            let mel = low + (high - low) * i as f32 / (NUM_FILTERS + 1) as f32;
            (((NFFT + 1) as f32 * mel_to_hz(mel) / SAMPLE_RATE as f32).floor() as usize)
                .min(NUM_BINS - 1)
        })
        .collect();

    (0..NUM_FILTERS)
        .map(|m| {
            let (left, center, right) = (bins[m], bins[m + 1], bins[m + 2]);
            let mut filter = vec![0.0f32; NUM_BINS];
            if center > left {
                for (k, w) in filter.iter_mut().enumerate().take(center).skip(left) {
                    *w = (k - left) as f32 / (center - left) as f32;
                }
            }
            if right > center {
                for (k, w) in filter.iter_mut().enumerate().take(right).skip(center) {
                    *w = (right - k) as f32 / (right - center) as f32;
                }
            }
            filter
        })
        .collect()
}

/// Orthonormal DCT-II rows, truncated to the kept cepstra.
fn dct_matrix() -> Vec<Vec<f32>> {
    let n = NUM_FILTERS as f32;
    (0..NUM_CEPSTRA)
        .map(|k| {
            let scale = if k == 0 { (1.0 / n).sqrt() } else { (2.0 / n).sqrt() };
            (0..NUM_FILTERS)
                .map(|m| scale * (PI * k as f32 * (2 * m + 1) as f32 / (2.0 * n)).cos())
                .collect()
        })
        .collect()
}
