//! Character-sequence model family
//!
//! For URL-style inputs where word tokenization is useless: a fixed
//! character vocabulary (`char_vocab.json`), an embedding table and a
//! single-logit linear head (`model.safetensors`). The score is a sigmoid
//! over the head applied to the mean of the character embeddings.

use crate::engine::ScoreModel;
use candle_core::{Device, IndexOp, Tensor};
use candle_nn::{Embedding, Linear, Module};
use fraudet_core::{Error, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

#[derive(Debug, Deserialize)]
struct CharVocabArtifact {
    /// Character -> embedding row
    chars: HashMap<char, u32>,
}

#[derive(Debug)]
pub struct CharSequenceModel {
    vocab: HashMap<char, u32>,
    embeddings: Embedding,
    head: Linear,
    device: Device,
    max_length: usize,
}

impl CharSequenceModel {
    pub fn load(bundle_dir: &Path, max_length: usize) -> Result<Self> {
        let vocab_path = bundle_dir.join("char_vocab.json");
        let artifact: CharVocabArtifact = serde_json::from_str(
            &std::fs::read_to_string(&vocab_path)
                .map_err(|e| Error::model_load(format!("char_vocab.json unreadable: {}", e)))?,
        )
        .map_err(|e| Error::model_load(format!("char_vocab.json invalid: {}", e)))?;
        if artifact.chars.is_empty() {
            return Err(Error::model_load("character vocabulary is empty"));
        }

        let device = Device::Cpu;
        let tensors = candle_core::safetensors::load(bundle_dir.join("model.safetensors"), &device)
            .map_err(|e| Error::model_load(format!("weights load failed: {}", e)))?;

        let embedding_weight = tensors
            .get("embeddings.weight")
            .ok_or_else(|| Error::model_load("embeddings.weight missing from weights"))?
            .clone();
        let (vocab_rows, dim) = embedding_weight
            .dims2()
            .map_err(|e| Error::model_load(format!("embeddings.weight malformed: {}", e)))?;
        let max_index = artifact.chars.values().copied().max().unwrap_or(0) as usize;
        if max_index >= vocab_rows {
            return Err(Error::model_load(format!(
                "vocabulary index {} exceeds {} embedding rows",
                max_index, vocab_rows
            )));
        }

        let head_weight = tensors
            .get("classifier.weight")
            .ok_or_else(|| Error::model_load("classifier.weight missing from weights"))?
            .clone();
        let head_bias = tensors
            .get("classifier.bias")
            .ok_or_else(|| Error::model_load("classifier.bias missing from weights"))?
            .clone();

        info!(
            vocabulary_size = artifact.chars.len(),
            embedding_dim = dim,
            "Character-sequence model loaded"
        );

        Ok(Self {
            vocab: artifact.chars,
            embeddings: Embedding::new(embedding_weight, dim),
            head: Linear::new(head_weight, Some(head_bias)),
            device,
            max_length,
        })
    }

    fn forward(&self, indices: &[u32]) -> candle_core::Result<f32> {
        let ids = Tensor::new(indices, &self.device)?;
        let embedded = self.embeddings.forward(&ids)?;
        let pooled = embedded.mean(0)?.unsqueeze(0)?;
        let logit = self.head.forward(&pooled)?;
        let prob = candle_nn::ops::sigmoid(&logit)?;
        prob.i((0, 0))?.to_scalar::<f32>()
    }
}

impl ScoreModel for CharSequenceModel {
    fn positive_probability(&self, text: &str) -> Result<f32> {
        // Characters outside the trained vocabulary carry no signal and
        // are dropped, exactly as at training time.
        let indices: Vec<u32> = text
            .chars()
            .filter_map(|c| self.vocab.get(&c).copied())
            .take(self.max_length)
            .collect();
        if indices.is_empty() {
            return Err(Error::preprocessing(
                "no characters from the trained vocabulary",
            ));
        }

        self.forward(&indices)
            .map_err(|e| Error::internal(format!("inference failed: {}", e)))
    }

    fn family(&self) -> &'static str {
        "char-sequence"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::DType;

    fn write_model(dir: &Path) {
        std::fs::write(
            dir.join("char_vocab.json"),
            r#"{"chars": {"a": 0, "b": 1, "/": 2}}"#,
        )
        .unwrap();

        let device = Device::Cpu;
        // 3 embedding rows of dim 2; head maps dim 2 -> 1 logit.
        let embeddings = Tensor::new(
            &[[1.0f32, 0.0], [0.0, 1.0], [1.0, 1.0]],
            &device,
        )
        .unwrap();
        let head_weight = Tensor::new(&[[2.0f32, -2.0]], &device).unwrap();
        let head_bias = Tensor::zeros(1, DType::F32, &device).unwrap();

        candle_core::safetensors::save(
            &std::collections::HashMap::from([
                ("embeddings.weight".to_string(), embeddings),
                ("classifier.weight".to_string(), head_weight),
                ("classifier.bias".to_string(), head_bias),
            ]),
            dir.join("model.safetensors"),
        )
        .unwrap();
    }

    #[test]
    fn test_scores_known_characters() {
        let dir = tempfile::tempdir().unwrap();
        write_model(dir.path());
        let model = CharSequenceModel::load(dir.path(), 64).unwrap();

        // "aa" -> mean embedding [1, 0] -> logit 2.0 -> sigmoid ~0.88
        let prob_a = model.positive_probability("aa").unwrap();
        assert!((prob_a - 1.0 / (1.0 + (-2.0f32).exp())).abs() < 1e-5);

        // "bb" -> mean embedding [0, 1] -> logit -2.0 -> sigmoid ~0.12
        let prob_b = model.positive_probability("bb").unwrap();
        assert!(prob_b < 0.2);
    }

    #[test]
    fn test_unknown_characters_are_dropped() {
        let dir = tempfile::tempdir().unwrap();
        write_model(dir.path());
        let model = CharSequenceModel::load(dir.path(), 64).unwrap();

        let with_noise = model.positive_probability("xaxax").unwrap();
        let clean = model.positive_probability("aa").unwrap();
        assert!((with_noise - clean).abs() < 1e-6);
    }

    #[test]
    fn test_fully_unknown_text_is_preprocessing_error() {
        let dir = tempfile::tempdir().unwrap();
        write_model(dir.path());
        let model = CharSequenceModel::load(dir.path(), 64).unwrap();

        let err = model.positive_probability("zzz").unwrap_err();
        assert_eq!(err.kind(), "preprocessing");
    }

    #[test]
    fn test_missing_head_tensor_is_model_load_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("char_vocab.json"), r#"{"chars": {"a": 0}}"#).unwrap();

        let device = Device::Cpu;
        let embeddings = Tensor::new(&[[1.0f32, 0.0]], &device).unwrap();
        candle_core::safetensors::save(
            &std::collections::HashMap::from([("embeddings.weight".to_string(), embeddings)]),
            dir.path().join("model.safetensors"),
        )
        .unwrap();

        let err = CharSequenceModel::load(dir.path(), 64).unwrap_err();
        assert_eq!(err.kind(), "model_load");
    }
}
