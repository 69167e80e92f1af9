use tracing::{info, warn};

use super::embedding::{l2_normalize, Embedder, EmbeddingIndex};
use super::keywords::{anchors_allow, overlap, tokenize};
use super::types::{IntentSpec, RouteMode, RouteResult};
use crate::config::RouterSettings;
use crate::planner::types::Tool;

#[derive(Debug, Clone, Copy)]
pub struct RouterThresholds {
    pub embedding: f32,
    pub keyword: f32,
}

impl Default for RouterThresholds {
    fn default() -> Self {
        Self { embedding: 0.52, keyword: 0.15 }
    }
}

impl From<&RouterSettings> for RouterThresholds {
    fn from(settings: &RouterSettings) -> Self {
        Self {
            embedding: settings.embed_threshold,
            keyword: settings.keyword_min_score,
        }
    }
}

/// Maps utterances to intent labels. Synchronous and read-only once built,
/// so it can be shared behind an `Arc` and called from any task.
pub struct IntentRouter {
    intents: Vec<IntentSpec>,
    thresholds: RouterThresholds,
    embedder: Option<Box<dyn Embedder>>,
    index: Option<EmbeddingIndex>,
}

impl IntentRouter {
    pub fn new(thresholds: RouterThresholds) -> Self {
        Self {
            intents: Vec::new(),
            thresholds,
            embedder: None,
            index: None,
        }
    }

    pub fn with_embedder(mut self, embedder: Box<dyn Embedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    /// Adds an intent, or replaces one with the same label in place.
    pub fn register(&mut self, spec: IntentSpec) {
        match self.intents.iter_mut().find(|i| i.label == spec.label) {
            Some(existing) => *existing = spec,
            None => self.intents.push(spec),
        }
        // Stale until the next build.
        self.index = None;
    }

    pub fn register_all(&mut self, specs: impl IntoIterator<Item = IntentSpec>) {
        for spec in specs {
            self.register(spec);
        }
    }

    /// Encodes every example. Any failure leaves the router in keyword mode.
    pub fn build(&mut self) {
        self.index = None;

        let Some(embedder) = self.embedder.as_deref() else {
            info!("Intent router: no embedding backend, using keyword matching");
            return;
        };

        let labelled: Vec<(String, String)> = self
            .intents
            .iter()
            .flat_map(|i| i.examples.iter().map(move |e| (i.label.clone(), e.clone())))
            .collect();

        if labelled.is_empty() {
            warn!("Intent router: no examples registered, using keyword matching");
            return;
        }

        match EmbeddingIndex::build(embedder, &labelled) {
            Ok(index) => {
                info!(
                    "Intent router: embedding index ready ({} rows, dim {})",
                    index.len(),
                    index.dimension()
                );
                self.index = Some(index);
            }
            Err(e) => {
                warn!("Intent router: embedding build failed ({}), using keyword matching", e);
            }
        }
    }

    pub fn mode(&self) -> RouteMode {
        if self.index.is_some() {
            RouteMode::Embedding
        } else {
            RouteMode::Keyword
        }
    }

    pub fn intents(&self) -> &[IntentSpec] {
        &self.intents
    }

    pub fn handler_for(&self, label: &str) -> Option<Tool> {
        self.intents.iter().find(|i| i.label == label).map(|i| i.handler)
    }

    pub fn route(&self, text: &str) -> RouteResult {
        if text.trim().is_empty() {
            return RouteResult::no_match(0.0);
        }

        match (&self.index, self.embedder.as_deref()) {
            (Some(index), Some(embedder)) => self.route_embedding(index, embedder, text),
            _ => self.route_keywords(text),
        }
    }

    fn route_embedding(&self, index: &EmbeddingIndex, embedder: &dyn Embedder, text: &str) -> RouteResult {
        let mut query = match embedder.encode(&[text]) {
            Ok(mut rows) if !rows.is_empty() => rows.swap_remove(0),
            Ok(_) => {
                warn!("Intent router: encoder returned no vector");
                return RouteResult::no_match(0.0);
            }
            Err(e) => {
                warn!("Intent router: query encoding failed: {}", e);
                return RouteResult::no_match(0.0);
            }
        };
        if query.iter().any(|x| !x.is_finite()) {
            warn!("Intent router: encoder returned a non-finite vector");
            return RouteResult::no_match(0.0);
        }
        l2_normalize(&mut query);

        match index.nearest(&query) {
            Ok(Some((label, score))) => {
                let score = score.clamp(0.0, 1.0);
                if score < self.thresholds.embedding {
                    RouteResult::no_match(score)
                } else {
                    RouteResult { label: Some(label.to_string()), score }
                }
            }
            Ok(None) => RouteResult::no_match(0.0),
            Err(e) => {
                warn!("Intent router: {}", e);
                RouteResult::no_match(0.0)
            }
        }
    }

    fn route_keywords(&self, text: &str) -> RouteResult {
        let lowered = text.to_lowercase();
        let tokens = tokenize(&lowered);

        let mut best: Option<(&str, f64)> = None;
        for intent in &self.intents {
            if !anchors_allow(&intent.anchors, &lowered) {
                continue;
            }

            let score = intent
                .examples
                .iter()
                .map(|example| overlap(&tokens, &tokenize(example)))
                .fold(0.0_f64, f64::max);

            if best.map_or(true, |(_, b)| score > b) {
                best = Some((intent.label.as_str(), score));
            }
        }

        match best {
            Some((label, score)) => {
                let score = (score as f32).clamp(0.0, 1.0);
                if score < self.thresholds.keyword {
                    RouteResult::no_match(score)
                } else {
                    RouteResult { label: Some(label.to_string()), score }
                }
            }
            None => RouteResult::no_match(0.0),
        }
    }
}
