//! Inference engine
//!
//! One uniform classify surface over polymorphic model families. The
//! engine owns validation, thresholding and label mapping; the families
//! only turn preprocessed text into a positive-class probability.

use fraudet_core::{Classification, Error, LabelSet, Result};

/// A scoring backend for one model family.
///
/// Implementations must be deterministic and side-effect-free: the same
/// text always yields the same probability, and no per-request state
/// (vocabularies in particular) is ever refit.
pub trait ScoreModel: Send + Sync {
    /// Probability of the positive ("fraud"/"spam") class for this text.
    ///
    /// The input is already validated non-empty; implementations fail with
    /// `Preprocessing` when normalization leaves zero usable tokens.
    fn positive_probability(&self, text: &str) -> Result<f32>;

    /// Family tag for logging and introspection.
    fn family(&self) -> &'static str;
}

/// Loaded classifier behind the `classify(text) -> (label, confidence)`
/// contract. Immutable after construction; shared across requests without
/// locking.
pub struct InferenceEngine {
    model: Box<dyn ScoreModel>,
    labels: LabelSet,
    threshold: f32,
}

impl std::fmt::Debug for InferenceEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferenceEngine")
            .field("family", &self.model.family())
            .field("labels", &self.labels)
            .field("threshold", &self.threshold)
            .finish()
    }
}

impl InferenceEngine {
    pub fn new(model: Box<dyn ScoreModel>, labels: LabelSet, threshold: f32) -> Self {
        Self {
            model,
            labels,
            threshold,
        }
    }

    /// Classify one text.
    ///
    /// Empty or whitespace-only input is rejected before the model is
    /// invoked. Confidence is the calibrated probability of the returned
    /// label.
    pub async fn classify(&self, text: &str) -> Result<Classification> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(Error::invalid_input("text must be non-empty"));
        }

        let prob = self.model.positive_probability(trimmed)?;
        Ok(Classification::from_positive_probability(
            prob,
            &self.labels,
            self.threshold,
        ))
    }

    /// Classify a batch, index-aligned with the input.
    ///
    /// Batching is a transport convenience, never a semantic change: each
    /// item goes through the exact same path as a single `classify` call.
    pub async fn classify_batch(&self, texts: &[String]) -> Result<Vec<Classification>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.classify(text).await?);
        }
        Ok(results)
    }

    pub fn family(&self) -> &'static str {
        self.model.family()
    }

    pub fn labels(&self) -> &LabelSet {
        &self.labels
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }
}
