//! Fraudet Store
//!
//! Remote artifact store client for Fraudet model bundles: an opaque
//! list+download abstraction over object storage, plus atomic
//! materialization of a bundle prefix into a local scratch directory.

pub mod bundle;
pub mod object_store;

pub use bundle::{BundleFetcher, MaterializedBundle};
pub use object_store::{BundleStore, HuggingFaceStore, LocalBundleStore};
