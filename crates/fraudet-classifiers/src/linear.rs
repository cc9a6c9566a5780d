//! Linear model family: fixed vectorizer + logistic regression
//!
//! The vocabulary is a training-time artifact loaded once from
//! `vectorizer.json` and never refit from the text being classified;
//! refitting per request would make the feature space depend on the input
//! and bypass the trained vocabulary entirely.

use crate::engine::ScoreModel;
use fraudet_core::{Error, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

/// On-disk `vectorizer.json` layout.
#[derive(Debug, Deserialize)]
struct VectorizerArtifact {
    /// Token -> feature index
    vocabulary: HashMap<String, usize>,

    /// Optional per-feature idf weights (tf-idf vectorizers)
    #[serde(default)]
    idf: Option<Vec<f32>>,

    /// Logistic regression coefficients, one per feature index
    coefficients: Vec<f32>,

    /// Logistic regression intercept
    intercept: f32,
}

/// Logistic regression over token counts from a fixed vocabulary.
#[derive(Debug)]
pub struct LinearModel {
    vocabulary: HashMap<String, usize>,
    idf: Option<Vec<f32>>,
    coefficients: Vec<f32>,
    intercept: f32,
}

impl LinearModel {
    /// Load and validate the vectorizer artifact.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::model_load(format!("vectorizer.json unreadable: {}", e)))?;
        let artifact: VectorizerArtifact = serde_json::from_str(&contents)
            .map_err(|e| Error::model_load(format!("vectorizer.json invalid: {}", e)))?;

        let feature_count = artifact
            .vocabulary
            .values()
            .map(|idx| idx + 1)
            .max()
            .unwrap_or(0);
        if feature_count == 0 {
            return Err(Error::model_load("vectorizer vocabulary is empty"));
        }
        if artifact.coefficients.len() < feature_count {
            return Err(Error::model_load(format!(
                "coefficient count {} does not cover {} vocabulary features",
                artifact.coefficients.len(),
                feature_count
            )));
        }
        if let Some(idf) = &artifact.idf {
            if idf.len() < feature_count {
                return Err(Error::model_load(format!(
                    "idf weight count {} does not cover {} vocabulary features",
                    idf.len(),
                    feature_count
                )));
            }
        }

        info!(
            vocabulary_size = artifact.vocabulary.len(),
            tf_idf = artifact.idf.is_some(),
            "Linear model loaded"
        );

        Ok(Self {
            vocabulary: artifact.vocabulary,
            idf: artifact.idf,
            coefficients: artifact.coefficients,
            intercept: artifact.intercept,
        })
    }

    /// Lowercase and split on non-alphanumeric runs, matching the
    /// vectorizer used at training time.
    fn tokenize(text: &str) -> Vec<String> {
        text.to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(|t| t.to_string())
            .collect()
    }
}

impl ScoreModel for LinearModel {
    fn positive_probability(&self, text: &str) -> Result<f32> {
        let tokens = Self::tokenize(text);
        if tokens.is_empty() {
            return Err(Error::preprocessing(
                "normalization left zero usable tokens",
            ));
        }

        let mut z = self.intercept;
        for token in &tokens {
            if let Some(&idx) = self.vocabulary.get(token) {
                let weight = match &self.idf {
                    Some(idf) => self.coefficients[idx] * idf[idx],
                    None => self.coefficients[idx],
                };
                z += weight;
            }
        }

        Ok(1.0 / (1.0 + (-z).exp()))
    }

    fn family(&self) -> &'static str {
        "linear"
    }
}
