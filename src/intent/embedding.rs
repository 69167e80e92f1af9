use crate::error::EmbedError;

/// Sentence encoder backend. Implementations may or may not normalise;
/// the index does it regardless.
pub trait Embedder: Send + Sync {
    fn encode(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedError>;
}

/// One unit-length row per example utterance, labels parallel to rows.
#[derive(Debug, Clone)]
pub struct EmbeddingIndex {
    labels: Vec<String>,
    vectors: Vec<Vec<f32>>,
    dimension: usize,
}

pub fn l2_normalize(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 && norm.is_finite() {
        v.iter_mut().for_each(|x| *x /= norm);
    }
}

pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

impl EmbeddingIndex {
    pub fn build(
        embedder: &dyn Embedder,
        labelled: &[(String, String)],
    ) -> Result<Self, EmbedError> {
        if labelled.is_empty() {
            return Err(EmbedError::Empty);
        }

        let texts: Vec<&str> = labelled.iter().map(|(_, text)| text.as_str()).collect();
        let mut vectors = embedder.encode(&texts)?;

        if vectors.len() != texts.len() {
            return Err(EmbedError::Backend(format!(
                "encoded {} of {} examples",
                vectors.len(),
                texts.len()
            )));
        }

        let dimension = vectors[0].len();
        if dimension == 0 {
            return Err(EmbedError::Dimension { expected: 1, found: 0 });
        }
        for row in vectors.iter_mut() {
            if row.len() != dimension {
                return Err(EmbedError::Dimension { expected: dimension, found: row.len() });
            }
            l2_normalize(row);
        }

        Ok(Self {
            labels: labelled.iter().map(|(label, _)| label.clone()).collect(),
            vectors,
            dimension,
        })
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Best row for an already-normalised query: (label, cosine). Rows whose
    /// similarity is not finite never win.
    pub fn nearest(&self, query: &[f32]) -> Result<Option<(&str, f32)>, EmbedError> {
        if query.len() != self.dimension {
            return Err(EmbedError::Dimension { expected: self.dimension, found: query.len() });
        }

        let mut best: Option<(usize, f32)> = None;
        for (i, row) in self.vectors.iter().enumerate() {
            let score = dot(row, query);
            if !score.is_finite() {
                continue;
            }
            if best.map_or(true, |(_, b)| score > b) {
                best = Some((i, score));
            }
        }
        Ok(best.map(|(i, score)| (self.labels[i].as_str(), score)))
    }
}
