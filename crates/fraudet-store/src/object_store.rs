//! Object store abstraction over remote bundle storage
//!
//! The serving layer treats the remote store as an opaque key-value blob
//! store keyed by relative path under a bundle prefix: list the keys under
//! a prefix, download each object's bytes. Everything else (scratch
//! directories, atomicity, integrity) lives in the fetcher.

use async_trait::async_trait;
use fraudet_core::{Error, Result};
use std::path::{Path, PathBuf};

/// Read-only access to a remote bundle store.
#[async_trait]
pub trait BundleStore: Send + Sync {
    /// List all object keys under the given prefix.
    ///
    /// An unknown prefix is not an error here; it returns an empty list,
    /// which the fetcher turns into `ArtifactNotFound`.
    async fn list(&self, prefix: &str) -> Result<Vec<String>>;

    /// Download one object's bytes by key.
    async fn get(&self, key: &str) -> Result<Vec<u8>>;

    /// Store name for logging.
    fn name(&self) -> &str;
}

/// A filesystem directory treated as the remote store.
///
/// Keys are slash-separated paths relative to the root. Used for local
/// development and tests; mirrors a bucket layout exactly.
pub struct LocalBundleStore {
    root: PathBuf,
}

impl LocalBundleStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn collect_keys(&self, dir: &Path, prefix: &str, keys: &mut Vec<String>) -> Result<()> {
        let entries = std::fs::read_dir(dir)
            .map_err(|e| Error::artifact_transfer(format!("listing failed: {}", e)))?;

        for entry in entries {
            let entry =
                entry.map_err(|e| Error::artifact_transfer(format!("listing failed: {}", e)))?;
            let path = entry.path();
            if path.is_dir() {
                self.collect_keys(&path, prefix, keys)?;
            } else {
                let rel = path
                    .strip_prefix(&self.root)
                    .map_err(|_| Error::internal("listing escaped store root"))?;
                let key = rel
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");
                if key.starts_with(prefix) {
                    keys.push(key);
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl BundleStore for LocalBundleStore {
    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }
        let mut keys = Vec::new();
        let root = self.root.clone();
        self.collect_keys(&root, prefix, &mut keys)?;
        // Deterministic listing order regardless of directory iteration.
        keys.sort();
        Ok(keys)
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        let path = self.root.join(key);
        std::fs::read(&path)
            .map_err(|e| Error::artifact_transfer(format!("download of {:?} failed: {}", key, e)))
    }

    fn name(&self) -> &str {
        "local"
    }
}

/// A Hugging Face Hub model repository treated as the remote store.
///
/// Listing resolves the repo's file index; keys are repo-relative
/// filenames. The hub client's API is synchronous, so calls are bridged
/// onto the blocking pool.
pub struct HuggingFaceStore {
    repo_id: String,
    revision: String,
}

impl HuggingFaceStore {
    pub fn new(repo_id: impl Into<String>, revision: impl Into<String>) -> Self {
        Self {
            repo_id: repo_id.into(),
            revision: revision.into(),
        }
    }

    fn api_repo(repo_id: &str, revision: &str) -> Result<hf_hub::api::sync::ApiRepo> {
        let api = hf_hub::api::sync::Api::new()
            .map_err(|e| Error::artifact_transfer(format!("hub client init failed: {}", e)))?;
        Ok(api.repo(hf_hub::Repo::with_revision(
            repo_id.to_string(),
            hf_hub::RepoType::Model,
            revision.to_string(),
        )))
    }
}

#[async_trait]
impl BundleStore for HuggingFaceStore {
    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let repo_id = self.repo_id.clone();
        let revision = self.revision.clone();
        let prefix = prefix.to_string();

        tokio::task::spawn_blocking(move || {
            let repo = Self::api_repo(&repo_id, &revision)?;
            let info = repo
                .info()
                .map_err(|e| Error::artifact_transfer(format!("hub listing failed: {}", e)))?;

            let mut keys: Vec<String> = info
                .siblings
                .into_iter()
                .map(|s| s.rfilename)
                .filter(|name| name.starts_with(&prefix))
                .collect();
            keys.sort();
            Ok(keys)
        })
        .await
        .map_err(|e| Error::internal(format!("hub listing task failed: {}", e)))?
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        let repo_id = self.repo_id.clone();
        let revision = self.revision.clone();
        let key = key.to_string();

        tokio::task::spawn_blocking(move || {
            let repo = Self::api_repo(&repo_id, &revision)?;
            let path = repo
                .get(&key)
                .map_err(|e| Error::artifact_transfer(format!("download of {:?} failed: {}", key, e)))?;
            std::fs::read(&path).map_err(|e| {
                Error::artifact_transfer(format!("read of downloaded {:?} failed: {}", key, e))
            })
        })
        .await
        .map_err(|e| Error::internal(format!("hub download task failed: {}", e)))?
    }

    fn name(&self) -> &str {
        "huggingface"
    }
}
