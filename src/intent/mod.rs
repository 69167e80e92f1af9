//! Utterance classification: embedding similarity when a sentence encoder
//! is available, keyword overlap otherwise.

#[cfg(feature = "embeddings")]
pub mod bert;
pub mod catalog;
pub mod embedding;
pub mod keywords;
pub mod router;
pub mod types;

pub use catalog::default_intents;
pub use embedding::{Embedder, EmbeddingIndex};
pub use router::{IntentRouter, RouterThresholds};
pub use types::{IntentSpec, RouteMode, RouteResult};
