//! Fraudet Classifiers
//!
//! The inference engine and model cache behind the serving layer. A
//! bundle's manifest selects one of three model families at load time:
//!
//! - transformer: BERT encoder + classification head (candle)
//! - linear: fixed vectorizer vocabulary + logistic regression
//! - char-sequence: character embeddings + linear head for URL inputs
//!
//! All families share the `classify(text) -> (label, confidence)` contract
//! and deterministic, fixed-vocabulary preprocessing.

pub mod cache;
pub mod charseq;
pub mod engine;
pub mod linear;
pub mod loader;
pub mod manifest;
pub mod transformer;

pub use cache::{CacheConfig, CacheStatus, CachedModel, ModelCache, RetryPolicy};
pub use charseq::CharSequenceModel;
pub use engine::{InferenceEngine, ScoreModel};
pub use linear::LinearModel;
pub use transformer::TransformerModel;
pub use loader::load_engine;
pub use manifest::{BundleManifest, ModelFamily};
