//! Transformer model family: BERT encoder + classification head
//!
//! Loads a fine-tuned sequence-classification checkpoint the way it was
//! exported: `config.json`, `tokenizer.json` and `model.safetensors` with
//! the encoder under `bert.*`, the pooler under `bert.pooler.dense` and
//! the two-class head under `classifier.*`. The tokenizer is a fixed
//! training-time artifact loaded exactly once.

use crate::engine::ScoreModel;
use candle_core::{DType, Device, IndexOp, Tensor};
use candle_nn::{Linear, Module, VarBuilder};
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use fraudet_core::{Error, Result};
use std::path::Path;
use tokenizers::Tokenizer;
use tracing::info;

pub struct TransformerModel {
    tokenizer: Tokenizer,
    bert: BertModel,
    pooler: Linear,
    classifier: Linear,
    device: Device,
    max_length: usize,
}

impl TransformerModel {
    /// Load the checkpoint from a materialized bundle directory.
    pub fn load(bundle_dir: &Path, max_length: usize) -> Result<Self> {
        let config_path = bundle_dir.join("config.json");
        let config: BertConfig = serde_json::from_str(
            &std::fs::read_to_string(&config_path)
                .map_err(|e| Error::model_load(format!("config.json unreadable: {}", e)))?,
        )
        .map_err(|e| Error::model_load(format!("config.json invalid: {}", e)))?;

        let tokenizer = Tokenizer::from_file(bundle_dir.join("tokenizer.json"))
            .map_err(|e| Error::model_load(format!("tokenizer load failed: {}", e)))?;

        let device = Device::Cpu;
        let weights_path = bundle_dir.join("model.safetensors");
        if !weights_path.is_file() {
            return Err(Error::model_load("model.safetensors missing from bundle"));
        }
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[weights_path], DType::F32, &device)
                .map_err(|e| Error::model_load(format!("weights load failed: {}", e)))?
        };

        let bert = BertModel::load(vb.pp("bert"), &config)
            .map_err(|e| Error::model_load(format!("encoder load failed: {}", e)))?;
        let pooler = candle_nn::linear(
            config.hidden_size,
            config.hidden_size,
            vb.pp("bert.pooler.dense"),
        )
        .map_err(|e| Error::model_load(format!("pooler load failed: {}", e)))?;
        let classifier = candle_nn::linear(config.hidden_size, 2, vb.pp("classifier"))
            .map_err(|e| Error::model_load(format!("classification head load failed: {}", e)))?;

        info!(
            hidden_size = config.hidden_size,
            max_length, "Transformer model loaded"
        );

        Ok(Self {
            tokenizer,
            bert,
            pooler,
            classifier,
            device,
            max_length,
        })
    }

    fn forward(&self, ids: &[u32], type_ids: &[u32]) -> candle_core::Result<f32> {
        let input_ids = Tensor::new(ids, &self.device)?.unsqueeze(0)?;
        let token_type_ids = Tensor::new(type_ids, &self.device)?.unsqueeze(0)?;

        let sequence_output = self.bert.forward(&input_ids, &token_type_ids, None)?;
        // [CLS] representation -> pooler (dense + tanh) -> two-logit head.
        let cls = sequence_output.i((.., 0))?;
        let pooled = self.pooler.forward(&cls)?.tanh()?;
        let logits = self.classifier.forward(&pooled)?;

        let probs = candle_nn::ops::softmax_last_dim(&logits)?;
        probs.i((0, 1))?.to_scalar::<f32>()
    }
}

impl ScoreModel for TransformerModel {
    fn positive_probability(&self, text: &str) -> Result<f32> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| Error::preprocessing(format!("tokenization failed: {}", e)))?;

        let mut ids = encoding.get_ids().to_vec();
        let mut type_ids = encoding.get_type_ids().to_vec();
        if ids.is_empty() {
            return Err(Error::preprocessing(
                "tokenization produced zero tokens",
            ));
        }
        ids.truncate(self.max_length);
        type_ids.truncate(self.max_length);

        self.forward(&ids, &type_ids)
            .map_err(|e| Error::internal(format!("inference failed: {}", e)))
    }

    fn family(&self) -> &'static str {
        "transformer"
    }
}
