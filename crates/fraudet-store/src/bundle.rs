//! Bundle materialization
//!
//! A bundle is the set of files (weights + tokenizer/vectorizer artifacts)
//! that together constitute one deployable model version. Materialization
//! downloads every object under the bundle's prefix into a fresh scratch
//! directory, preserving relative paths. The invariant is
//! atomic-or-nothing: callers only ever see a fully materialized bundle;
//! on any failure the scratch directory is dropped, never exposed.

use crate::object_store::BundleStore;
use fraudet_core::{Error, Result};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tracing::{debug, info};

/// A fully materialized bundle on local disk.
///
/// Owns its scratch directory: dropping the bundle removes the files, so
/// anything built from them (e.g. memory-mapped weights) must hold on to
/// this value for as long as it needs the files.
#[derive(Debug)]
pub struct MaterializedBundle {
    bundle_id: String,
    dir: TempDir,
    files: Vec<PathBuf>,
}

impl MaterializedBundle {
    /// Logical identifier the bundle was fetched under.
    pub fn bundle_id(&self) -> &str {
        &self.bundle_id
    }

    /// Root directory containing the bundle files.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Relative paths of the constituent files, in listing order.
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Absolute path of one constituent file.
    pub fn file_path(&self, rel: impl AsRef<Path>) -> PathBuf {
        self.dir.path().join(rel)
    }

    /// SHA-256 over the sorted relative paths and contents of every file.
    ///
    /// Stable across repeated fetches of an unchanged remote bundle;
    /// logged at load time so deployments can tell model versions apart.
    pub fn fingerprint(&self) -> Result<String> {
        let mut sorted: Vec<&PathBuf> = self.files.iter().collect();
        sorted.sort();

        let mut hasher = Sha256::new();
        for rel in sorted {
            hasher.update(rel.to_string_lossy().as_bytes());
            hasher.update([0u8]);
            hasher.update(std::fs::read(self.file_path(rel))?);
        }
        Ok(format!("{:x}", hasher.finalize()))
    }
}

/// Fetches bundles from a remote store into local scratch directories.
#[derive(Clone)]
pub struct BundleFetcher {
    store: Arc<dyn BundleStore>,
}

impl BundleFetcher {
    pub fn new(store: Arc<dyn BundleStore>) -> Self {
        Self { store }
    }

    /// Materialize the bundle under `bundle_id` into a fresh scratch
    /// directory.
    ///
    /// Fails with `ArtifactNotFound` when the prefix lists zero objects
    /// and `ArtifactTransfer` when any individual download fails or
    /// returns an empty object. Each call produces a distinct directory;
    /// scratch space is never reused across fetches.
    pub async fn fetch(&self, bundle_id: &str) -> Result<MaterializedBundle> {
        let bundle_id = bundle_id.trim();
        if bundle_id.is_empty() {
            return Err(Error::invalid_input("bundle id must be non-empty"));
        }
        // A prefix covers whole path segments only: "model" must not match
        // a sibling bundle "model-v2/".
        let bundle_id = if bundle_id.ends_with('/') {
            bundle_id.to_string()
        } else {
            format!("{}/", bundle_id)
        };
        let bundle_id = bundle_id.as_str();

        info!(bundle = %bundle_id, store = %self.store.name(), "Fetching bundle");

        let keys = self.store.list(bundle_id).await?;
        if keys.is_empty() {
            return Err(Error::artifact_not_found(format!(
                "no objects under prefix {:?}",
                bundle_id
            )));
        }

        // On any error below the TempDir is dropped and cleaned up, so a
        // partial bundle is never observable.
        let dir = tempfile::Builder::new().prefix("fraudet-bundle-").tempdir()?;
        let mut files = Vec::with_capacity(keys.len());

        for key in &keys {
            let rel = relative_key(bundle_id, key)?;
            let bytes = self.store.get(key).await?;
            if bytes.is_empty() {
                return Err(Error::artifact_transfer(format!(
                    "object {:?} is empty",
                    key
                )));
            }

            let dest = dir.path().join(&rel);
            if let Some(parent) = dest.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&dest, &bytes)?;

            debug!(bundle = %bundle_id, file = %rel.display(), size = bytes.len(), "Materialized object");
            files.push(rel);
        }

        info!(bundle = %bundle_id, file_count = files.len(), "Bundle materialized");

        Ok(MaterializedBundle {
            bundle_id: bundle_id.to_string(),
            dir,
            files,
        })
    }
}

/// Derive the scratch-relative path for an object key under a prefix.
///
/// Rejects keys that escape the scratch directory; the store is untrusted
/// input as far as the local filesystem is concerned.
fn relative_key(prefix: &str, key: &str) -> Result<PathBuf> {
    let rel = key
        .strip_prefix(prefix)
        .ok_or_else(|| {
            Error::artifact_transfer(format!("listed key {:?} outside prefix {:?}", key, prefix))
        })?
        .trim_start_matches('/');

    if rel.is_empty() {
        return Err(Error::artifact_transfer(format!(
            "listed key {:?} has no path under prefix",
            key
        )));
    }
    if rel.split('/').any(|part| part.is_empty() || part == "." || part == "..") {
        return Err(Error::artifact_transfer(format!(
            "listed key {:?} has an unsafe path",
            key
        )));
    }
    Ok(rel.split('/').collect())
}
