//! Local BERT sentence encoder, mean pooled and unit length.

use candle_core::{Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config, DTYPE};
use std::path::Path;
use tokenizers::Tokenizer;
use tracing::info;

use super::embedding::Embedder;
use crate::error::EmbedError;

pub struct BertEmbedder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
}

fn backend<E: std::fmt::Display>(e: E) -> EmbedError {
    EmbedError::Backend(e.to_string())
}

impl BertEmbedder {
    /// Loads `config.json`, `tokenizer.json` and `model.safetensors` from `dir`.
    /// Never touches the network.
    pub fn load(dir: &Path) -> Result<Self, EmbedError> {
        let device = Device::Cpu;

        let config = std::fs::read_to_string(dir.join("config.json")).map_err(backend)?;
        let config: Config = serde_json::from_str(&config).map_err(backend)?;
        let tokenizer = Tokenizer::from_file(dir.join("tokenizer.json")).map_err(backend)?;

        let weights = dir.join("model.safetensors");
        let vb = unsafe { VarBuilder::from_mmaped_safetensors(&[weights], DTYPE, &device) }
            .map_err(backend)?;
        let model = BertModel::load(vb, &config).map_err(backend)?;

        info!("Loaded sentence encoder from {}", dir.display());
        Ok(Self { model, tokenizer, device })
    }

    fn embed_one(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let tokens = self.tokenizer.encode(text, true).map_err(backend)?;
        let token_ids = Tensor::new(tokens.get_ids(), &self.device)
            .and_then(|t| t.unsqueeze(0))
            .map_err(backend)?;
        let token_type_ids = token_ids.zeros_like().map_err(backend)?;

        let hidden = self
            .model
            .forward(&token_ids, &token_type_ids, None)
            .map_err(backend)?;

        let (_batch, n_tokens, _hidden) = hidden.dims3().map_err(backend)?;
        let pooled = hidden
            .sum(1)
            .and_then(|t| t / (n_tokens.max(1) as f64))
            .map_err(backend)?;
        let norm = pooled
            .sqr()
            .and_then(|t| t.sum_keepdim(1))
            .and_then(|t| t.sqrt())
            .map_err(backend)?;
        let unit = pooled
            .broadcast_div(&norm)
            .and_then(|t| t.squeeze(0))
            .map_err(backend)?;

        unit.to_vec1::<f32>().map_err(backend)
    }
}

impl Embedder for BertEmbedder {
    fn encode(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedError> {
        texts.iter().map(|text| self.embed_one(text)).collect()
    }
}
