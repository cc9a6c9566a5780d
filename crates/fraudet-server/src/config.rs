//! Server configuration

use fraudet_classifiers::{CacheConfig, RetryPolicy};
use fraudet_store::{BundleStore, HuggingFaceStore, LocalBundleStore};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Remote store holding the model bundle
    #[serde(default)]
    pub store: StoreConfig,

    /// Bundle prefix inside the store
    #[serde(default = "default_bundle_id")]
    pub bundle_id: String,

    /// Behavior after a failed model load
    #[serde(default)]
    pub retry: RetryPolicy,

    /// Deadline for the one-time fetch + load
    #[serde(default = "default_load_timeout_secs")]
    pub load_timeout_secs: u64,

    /// Trigger the model load at startup instead of on the first request
    #[serde(default = "default_true")]
    pub warm_up: bool,

    /// Request body size cap
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

/// Remote store location
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StoreConfig {
    /// A filesystem directory laid out like the bucket
    Local { root: PathBuf },

    /// A Hugging Face model repository
    HuggingFace {
        repo: String,
        #[serde(default = "default_revision")]
        revision: String,
    },
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::Local {
            root: PathBuf::from("./models"),
        }
    }
}

fn default_bundle_id() -> String {
    "fraud_detection_model/".to_string()
}

fn default_load_timeout_secs() -> u64 {
    300
}

fn default_true() -> bool {
    true
}

fn default_max_body_bytes() -> usize {
    1024 * 1024
}

fn default_revision() -> String {
    "main".to_string()
}

impl ServerConfig {
    /// Load configuration from file and CLI overrides
    pub fn load(config_path: &str, cli: &crate::cli::Cli) -> anyhow::Result<Self> {
        let mut config: Self = if Path::new(config_path).exists() {
            let contents = std::fs::read_to_string(config_path)?;
            serde_yaml::from_str(&contents)?
        } else {
            Self::default()
        };

        if let Some(bundle) = &cli.bundle {
            config.bundle_id = bundle.clone();
        }
        if let Some(root) = &cli.store_root {
            config.store = StoreConfig::Local { root: root.clone() };
        }

        Ok(config)
    }

    /// Construct the store client this configuration points at.
    pub fn build_store(&self) -> Arc<dyn BundleStore> {
        match &self.store {
            StoreConfig::Local { root } => Arc::new(LocalBundleStore::new(root.clone())),
            StoreConfig::HuggingFace { repo, revision } => {
                Arc::new(HuggingFaceStore::new(repo.clone(), revision.clone()))
            }
        }
    }

    /// Model cache parameters derived from this configuration.
    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig::new(self.bundle_id.clone())
            .with_retry(self.retry)
            .with_load_timeout(Duration::from_secs(self.load_timeout_secs))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            bundle_id: default_bundle_id(),
            retry: RetryPolicy::default(),
            load_timeout_secs: default_load_timeout_secs(),
            warm_up: default_true(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}
