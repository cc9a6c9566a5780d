//! Bundle manifest
//!
//! Every bundle carries a `bundle.json` describing which model family the
//! artifacts belong to and how its output maps to labels. Family selection
//! happens once at load time; serving code never branches on it again.

use fraudet_core::{Error, LabelSet, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Model family implemented by a bundle's artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModelFamily {
    /// BERT encoder + classification head (`config.json`,
    /// `tokenizer.json`, `model.safetensors`)
    Transformer,

    /// Fixed vectorizer vocabulary + logistic regression
    /// (`vectorizer.json`)
    Linear,

    /// Character embeddings + linear head for URL-style inputs
    /// (`char_vocab.json`, `model.safetensors`)
    CharSequence,
}

/// Parsed `bundle.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundleManifest {
    /// Which loader to use for the rest of the bundle
    pub family: ModelFamily,

    /// Negative/positive label names
    #[serde(default)]
    pub labels: LabelSet,

    /// Decision threshold on the positive-class probability
    #[serde(default = "default_threshold")]
    pub threshold: f32,

    /// Maximum token sequence length for sequence models
    #[serde(default = "default_max_length")]
    pub max_length: usize,
}

fn default_threshold() -> f32 {
    0.5
}

fn default_max_length() -> usize {
    128
}

impl BundleManifest {
    /// Read and parse `bundle.json` from a materialized bundle directory.
    pub fn from_bundle_dir(dir: &Path) -> Result<Self> {
        let path = dir.join("bundle.json");
        let contents = std::fs::read_to_string(&path)
            .map_err(|e| Error::model_load(format!("bundle.json unreadable: {}", e)))?;
        let manifest: Self = serde_json::from_str(&contents)
            .map_err(|e| Error::model_load(format!("bundle.json invalid: {}", e)))?;

        if !(0.0..=1.0).contains(&manifest.threshold) {
            return Err(Error::model_load(format!(
                "threshold {} outside [0, 1]",
                manifest.threshold
            )));
        }
        if manifest.max_length == 0 {
            return Err(Error::model_load("max_length must be positive"));
        }
        Ok(manifest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_manifest_with_defaults() {
        let json = r#"{"family": "linear"}"#;
        let manifest: BundleManifest = serde_json::from_str(json).unwrap();

        assert_eq!(manifest.family, ModelFamily::Linear);
        assert_eq!(manifest.labels.negative, "not fraud");
        assert_eq!(manifest.labels.positive, "fraud");
        assert_eq!(manifest.threshold, 0.5);
        assert_eq!(manifest.max_length, 128);
    }

    #[test]
    fn test_parse_manifest_full() {
        let json = r#"{
            "family": "char-sequence",
            "labels": {"negative": "not spam", "positive": "spam"},
            "threshold": 0.7,
            "max_length": 256
        }"#;
        let manifest: BundleManifest = serde_json::from_str(json).unwrap();

        assert_eq!(manifest.family, ModelFamily::CharSequence);
        assert_eq!(manifest.labels.positive, "spam");
        assert_eq!(manifest.threshold, 0.7);
        assert_eq!(manifest.max_length, 256);
    }

    #[test]
    fn test_missing_manifest_is_model_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = BundleManifest::from_bundle_dir(dir.path()).unwrap_err();
        assert_eq!(err.kind(), "model_load");
    }

    #[test]
    fn test_out_of_range_threshold_rejected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("bundle.json"),
            r#"{"family": "linear", "threshold": 1.5}"#,
        )
        .unwrap();

        let err = BundleManifest::from_bundle_dir(dir.path()).unwrap_err();
        assert_eq!(err.kind(), "model_load");
    }
}
