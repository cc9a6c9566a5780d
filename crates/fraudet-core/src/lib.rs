//! Fraudet Core
//!
//! Shared types and error handling for the Fraudet model-serving layer.

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{Classification, LabelSet};
