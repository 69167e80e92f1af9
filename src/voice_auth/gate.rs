use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f32::consts::TAU;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::features::{MfccExtractor, SAMPLE_RATE};
use super::model::VoiceProfile;
use crate::audio::wav::load_wav_mono;
use crate::config::AuthSettings;
use crate::error::VerifyError;

const NEGATIVES_PER_POSITIVE: usize = 2;
const NEGATIVE_SECONDS: f32 = 2.0;
const NEGATIVE_AMPLITUDES: [f32; 3] = [0.5, 0.1, 0.02];
/// Below this RMS a sample is treated as silence and scores zero.
const SILENCE_RMS: f32 = 1e-3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Verdict {
    pub accepted: bool,
    pub score: f32,
    pub threshold: f32,
}

/// Gaussian noise, two seconds at 16 kHz.
pub fn synthetic_noise<R: Rng>(rng: &mut R, amplitude: f32) -> Vec<f32> {
    let len = (SAMPLE_RATE as f32 * NEGATIVE_SECONDS) as usize;
    (0..len)
        .map(|_| {
            // Box-Muller
            let u1: f32 = rng.gen_range(f32::EPSILON..1.0);
            let u2: f32 = rng.gen();
            amplitude * (-2.0 * u1.ln()).sqrt() * (TAU * u2).cos()
        })
        .collect()
}

/// Trains a profile from positive samples plus generated noise negatives.
pub fn enroll_with_rng<R: Rng>(samples: &[Vec<f32>], rng: &mut R) -> Result<VoiceProfile, VerifyError> {
    if samples.is_empty() {
        return Err(VerifyError::NoSamples);
    }

    let extractor = MfccExtractor::new();
    let mut features = Vec::with_capacity(samples.len() * (1 + NEGATIVES_PER_POSITIVE));
    let mut labels = Vec::with_capacity(features.capacity());

    for sample in samples {
        features.push(extractor.summarize(sample));
        labels.push(true);
    }

    for i in 0..samples.len() * NEGATIVES_PER_POSITIVE {
        let amplitude = NEGATIVE_AMPLITUDES[i % NEGATIVE_AMPLITUDES.len()];
        features.push(extractor.summarize(&synthetic_noise(rng, amplitude)));
        labels.push(false);
    }

    Ok(VoiceProfile::train(&features, &labels))
}

pub fn enroll(samples: &[Vec<f32>]) -> Result<VoiceProfile, VerifyError> {
    enroll_with_rng(samples, &mut StdRng::from_entropy())
}

/// Scores one sample against a profile. Never fails: silence or garbage
/// input just scores low.
pub fn verify(sample: &[f32], profile: &VoiceProfile, threshold: f32) -> Verdict {
    let score = if rms(sample) < SILENCE_RMS {
        0.0
    } else {
        profile.score(&MfccExtractor::new().summarize(sample))
    };
    Verdict {
        accepted: score >= threshold,
        score,
        threshold,
    }
}

fn rms(sample: &[f32]) -> f32 {
    let finite: Vec<f32> = sample.iter().copied().filter(|x| x.is_finite()).collect();
    if finite.is_empty() {
        return 0.0;
    }
    (finite.iter().map(|x| x * x).sum::<f32>() / finite.len() as f32).sqrt()
}

/// Speaker check bound to a persisted profile.
#[derive(Debug, Clone)]
pub struct VerificationGate {
    model_path: PathBuf,
    threshold: f32,
}

impl VerificationGate {
    pub fn new(model_path: impl Into<PathBuf>, threshold: f32) -> Self {
        Self {
            model_path: model_path.into(),
            threshold,
        }
    }

    pub fn from_settings(settings: &AuthSettings) -> Self {
        Self::new(settings.model_path.clone(), settings.verify_threshold)
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn has_profile(&self) -> bool {
        self.model_path.exists()
    }

    pub fn enroll(&self, samples: &[Vec<f32>]) -> Result<VoiceProfile, VerifyError> {
        let profile = enroll(samples)?;
        profile.save(&self.model_path)?;
        info!("Voice profile saved to {} ({} samples)", self.model_path.display(), samples.len());
        Ok(profile)
    }

    pub fn enroll_from_wavs<P: AsRef<Path>>(&self, paths: &[P]) -> Result<VoiceProfile, VerifyError> {
        let mut samples = Vec::with_capacity(paths.len());
        for path in paths {
            match load_wav_mono(path.as_ref(), SAMPLE_RATE) {
                Ok(sample) => samples.push(sample),
                Err(e) => warn!("Skipping enrollment file {}: {}", path.as_ref().display(), e),
            }
        }
        self.enroll(&samples)
    }

    pub fn verify(&self, sample: &[f32]) -> Result<Verdict, VerifyError> {
        let profile = VoiceProfile::load(&self.model_path)?;
        Ok(verify(sample, &profile, self.threshold))
    }
}
