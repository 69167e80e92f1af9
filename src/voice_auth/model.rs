use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::VerifyError;
use super::features::{FEATURE_DIM, SAMPLE_RATE};

pub const PROFILE_VERSION: u32 = 1;

const EPOCHS: usize = 400;
const LEARNING_RATE: f32 = 0.5;
const L2: f32 = 1e-3;

/// Per-dimension standardisation fitted on the enrollment set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureScaler {
    pub mean: Vec<f32>,
    pub scale: Vec<f32>,
}

impl FeatureScaler {
    pub fn fit(rows: &[Vec<f32>]) -> Self {
        let dim = rows.first().map_or(0, Vec::len);
        let n = rows.len().max(1) as f32;

        let mut mean = vec![0.0f32; dim];
        for row in rows {
            for (m, x) in mean.iter_mut().zip(row) {
                *m += x / n;
            }
        }

        let mut scale = vec![0.0f32; dim];
        for row in rows {
            for ((s, x), m) in scale.iter_mut().zip(row).zip(&mean) {
                *s += (x - m).powi(2) / n;
            }
        }
        for s in scale.iter_mut() {
            *s = s.sqrt();
            if !s.is_finite() || *s < 1e-8 {
                *s = 1.0;
            }
        }

        Self { mean, scale }
    }

    pub fn transform(&self, row: &[f32]) -> Vec<f32> {
        row.iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(x, (m, s))| (x - m) / s)
            .collect()
    }
}

/// Binary logistic classifier; the positive class is the enrolled speaker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticModel {
    pub weights: Vec<f32>,
    pub bias: f32,
}

fn sigmoid(z: f32) -> f32 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

impl LogisticModel {
    /// Full-batch gradient descent with class-balanced weights and L2 decay.
    pub fn fit(rows: &[Vec<f32>], labels: &[bool]) -> Self {
        let dim = rows.first().map_or(0, Vec::len);
        let n = rows.len() as f32;
        let positives = labels.iter().filter(|l| **l).count().max(1) as f32;
        let negatives = labels.iter().filter(|l| !**l).count().max(1) as f32;
        let pos_weight = n / (2.0 * positives);
        let neg_weight = n / (2.0 * negatives);

        let mut model = Self { weights: vec![0.0; dim], bias: 0.0 };

        for _ in 0..EPOCHS {
            let mut grad_w = vec![0.0f32; dim];
            let mut grad_b = 0.0f32;

            for (row, &label) in rows.iter().zip(labels) {
                let target = if label { 1.0 } else { 0.0 };
                let weight = if label { pos_weight } else { neg_weight };
                let err = weight * (model.probability(row) - target);
                for (g, x) in grad_w.iter_mut().zip(row) {
                    *g += err * x;
                }
                grad_b += err;
            }

            for (w, g) in model.weights.iter_mut().zip(&grad_w) {
                *w -= LEARNING_RATE * (g / n + L2 * *w);
            }
            model.bias -= LEARNING_RATE * grad_b / n;
        }

        model
    }

    pub fn probability(&self, row: &[f32]) -> f32 {
        let z = self.bias + self.weights.iter().zip(row).map(|(w, x)| w * x).sum::<f32>();
        let p = sigmoid(z);
        if p.is_finite() { p } else { 0.0 }
    }
}

/// The persisted enrollment artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceProfile {
    pub version: u32,
    pub sample_rate: u32,
    pub scaler: FeatureScaler,
    pub classifier: LogisticModel,
}

impl VoiceProfile {
    pub fn train(features: &[Vec<f32>], labels: &[bool]) -> Self {
        let scaler = FeatureScaler::fit(features);
        let scaled: Vec<Vec<f32>> = features.iter().map(|row| scaler.transform(row)).collect();
        let classifier = LogisticModel::fit(&scaled, labels);

        Self {
            version: PROFILE_VERSION,
            sample_rate: SAMPLE_RATE,
            scaler,
            classifier,
        }
    }

    /// Probability that `features` belong to the enrolled speaker.
    pub fn score(&self, features: &[f32]) -> f32 {
        self.classifier.probability(&self.scaler.transform(features)).clamp(0.0, 1.0)
    }

    pub fn load(path: &Path) -> Result<Self, VerifyError> {
        if !path.exists() {
            return Err(VerifyError::ArtifactMissing(path.to_path_buf()));
        }
        let profile: VoiceProfile = serde_json::from_slice(&fs::read(path)?)?;
        profile.check()?;
        Ok(profile)
    }

    /// Writes through a sibling temp file so a crash never leaves a torn profile.
    pub fn save(&self, path: &Path) -> Result<(), VerifyError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(self)?)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }

    fn check(&self) -> Result<(), VerifyError> {
        if self.version != PROFILE_VERSION {
            return Err(VerifyError::Incompatible(format!("version {}", self.version)));
        }
        let dims = [
            self.scaler.mean.len(),
            self.scaler.scale.len(),
            self.classifier.weights.len(),
        ];
        if dims.iter().any(|d| *d != FEATURE_DIM) {
            return Err(VerifyError::Incompatible(format!("feature dimensions {:?}", dims)));
        }
        Ok(())
    }
}
