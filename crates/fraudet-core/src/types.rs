//! Shared classification types

use serde::{Deserialize, Serialize};

/// Names for the two classes of a binary classifier, in fixed order:
/// index 0 is the negative class, index 1 the positive ("fraud"/"spam")
/// class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelSet {
    pub negative: String,
    pub positive: String,
}

impl LabelSet {
    pub fn new(negative: impl Into<String>, positive: impl Into<String>) -> Self {
        Self {
            negative: negative.into(),
            positive: positive.into(),
        }
    }
}

impl Default for LabelSet {
    fn default() -> Self {
        Self::new("not fraud", "fraud")
    }
}

/// Result of classifying one text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    /// Returned class label
    pub label: String,

    /// Calibrated probability of the returned label (0.0-1.0)
    pub confidence: f32,
}

impl Classification {
    /// Map the model's positive-class probability to a labeled result.
    ///
    /// Confidence is always reported for the label that is returned, so a
    /// positive probability of 0.03 yields the negative label with
    /// confidence 0.97.
    pub fn from_positive_probability(prob: f32, labels: &LabelSet, threshold: f32) -> Self {
        let prob = prob.clamp(0.0, 1.0);
        if prob >= threshold {
            Self {
                label: labels.positive.clone(),
                confidence: prob,
            }
        } else {
            Self {
                label: labels.negative.clone(),
                confidence: 1.0 - prob,
            }
        }
    }
}
