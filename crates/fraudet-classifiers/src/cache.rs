//! Model cache
//!
//! Guarantees at-most-one bundle fetch and at-most-one model load per
//! process, no matter how many requests arrive before the first load
//! completes. The state machine is `Empty -> Loading -> {Ready | Failed}`.
//! The state mutex is held only to transition between states; the load
//! itself runs on a detached task, so `status()` and `invalidate()` never
//! wait behind an in-flight load. Callers that need the model await the
//! load's completion through the watch channel carried in `Loading`.

use crate::engine::InferenceEngine;
use crate::loader::load_engine;
use fraudet_core::{Error, Result};
use fraudet_store::{BundleFetcher, BundleStore, MaterializedBundle};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tracing::{error, info, warn};

/// What a `Failed` cache does on the next call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RetryPolicy {
    /// Surface the captured error to every caller until `invalidate()` or
    /// process restart. Default: a systemic store outage should not be
    /// hammered once per request.
    #[default]
    FailFast,

    /// Allow the next caller to attempt a fresh load.
    RetryNextCall,
}

/// Cache construction parameters.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Bundle prefix in the remote store
    pub bundle_id: String,

    /// Behavior after a failed load
    pub retry: RetryPolicy,

    /// Deadline for fetch + load combined; expiry fails the load instead
    /// of hanging callers
    pub load_timeout: Duration,
}

impl CacheConfig {
    pub fn new(bundle_id: impl Into<String>) -> Self {
        Self {
            bundle_id: bundle_id.into(),
            retry: RetryPolicy::FailFast,
            load_timeout: Duration::from_secs(300),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_load_timeout(mut self, timeout: Duration) -> Self {
        self.load_timeout = timeout;
        self
    }
}

/// The loaded engine together with the bundle it was built from.
///
/// Immutable after construction and shared via `Arc`; inference needs no
/// synchronization. The bundle must live as long as the engine because
/// transformer weights are memory-mapped from its files.
#[derive(Debug)]
pub struct CachedModel {
    engine: InferenceEngine,
    bundle: MaterializedBundle,
    fingerprint: String,
}

impl CachedModel {
    pub fn engine(&self) -> &InferenceEngine {
        &self.engine
    }

    pub fn bundle_id(&self) -> &str {
        self.bundle.bundle_id()
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }
}

/// Captured load failure, replayable to later callers with the same kind
/// and message the original caller saw.
#[derive(Debug, Clone)]
struct LoadFailure {
    kind: &'static str,
    message: String,
}

impl LoadFailure {
    fn capture(err: &Error) -> Self {
        let message = match err {
            Error::InvalidInput(m)
            | Error::ArtifactNotFound(m)
            | Error::ArtifactTransfer(m)
            | Error::ModelLoad(m)
            | Error::Preprocessing(m)
            | Error::Internal(m) => m.clone(),
            Error::Io(e) => e.to_string(),
            Error::Serialization(e) => e.to_string(),
            Error::LoadTimeout => String::new(),
        };
        Self {
            kind: err.kind(),
            message,
        }
    }

    fn to_error(&self) -> Error {
        match self.kind {
            "invalid_input" => Error::InvalidInput(self.message.clone()),
            "artifact_not_found" => Error::ArtifactNotFound(self.message.clone()),
            "artifact_transfer" => Error::ArtifactTransfer(self.message.clone()),
            "model_load" => Error::ModelLoad(self.message.clone()),
            "preprocessing" => Error::Preprocessing(self.message.clone()),
            "io" => Error::Io(std::io::Error::other(self.message.clone())),
            "load_timeout" => Error::LoadTimeout,
            _ => Error::Internal(self.message.clone()),
        }
    }
}

enum CacheState {
    Empty,
    /// The receiver closes when the loading task has recorded a terminal
    /// state.
    Loading(watch::Receiver<()>),
    Ready(Arc<CachedModel>),
    Failed(LoadFailure),
}

/// Observable cache state for readiness probes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheStatus {
    Empty,
    Loading,
    Ready { fingerprint: String },
    Failed { kind: &'static str },
}

/// Lazily loads the model exactly once and keeps it warm for the process
/// lifetime. Constructed explicitly at startup and injected into the
/// serving layer; there is no process-global instance.
pub struct ModelCache {
    fetcher: BundleFetcher,
    config: CacheConfig,
    state: Arc<Mutex<CacheState>>,
}

impl ModelCache {
    pub fn new(store: Arc<dyn BundleStore>, config: CacheConfig) -> Self {
        Self {
            fetcher: BundleFetcher::new(store),
            config,
            state: Arc::new(Mutex::new(CacheState::Empty)),
        }
    }

    /// Get the loaded model, fetching and loading it on the first call.
    ///
    /// Idempotent: after `Ready` this returns synchronously with no I/O.
    /// Callers arriving during the one-time load wait for it rather than
    /// triggering a second fetch.
    pub async fn get(&self) -> Result<Arc<CachedModel>> {
        let mut attempted = false;
        loop {
            let mut done = {
                let mut state = self.state.lock().await;
                match &*state {
                    CacheState::Ready(model) => return Ok(model.clone()),
                    CacheState::Failed(failure) => {
                        if attempted || self.config.retry == RetryPolicy::FailFast {
                            return Err(failure.to_error());
                        }
                        warn!(bundle = %self.config.bundle_id, "Retrying model load after earlier failure");
                        self.begin_load(&mut state)
                    }
                    CacheState::Loading(done) if done.has_changed().is_ok() => done.clone(),
                    // The loading task went away without recording an
                    // outcome; start over.
                    CacheState::Loading(_) => self.begin_load(&mut state),
                    CacheState::Empty => self.begin_load(&mut state),
                }
            };
            attempted = true;
            // Wakes when the loading task drops its end of the channel,
            // after the terminal state has been recorded.
            let _ = done.changed().await;
        }
    }

    /// Transition to `Loading` and run the fetch + load on a detached task,
    /// so a cancelled caller cannot strand the state machine mid-load.
    fn begin_load(&self, state: &mut CacheState) -> watch::Receiver<()> {
        let (done_tx, done_rx) = watch::channel(());
        *state = CacheState::Loading(done_rx.clone());

        let fetcher = self.fetcher.clone();
        let config = self.config.clone();
        let shared = self.state.clone();
        let marker = done_rx.clone();
        tokio::spawn(async move {
            let outcome =
                tokio::time::timeout(config.load_timeout, load(&fetcher, &config.bundle_id)).await;
            let next = match outcome {
                Ok(Ok(model)) => CacheState::Ready(Arc::new(model)),
                Ok(Err(err)) => {
                    error!(bundle = %config.bundle_id, kind = err.kind(), error = %err, "Model load failed");
                    CacheState::Failed(LoadFailure::capture(&err))
                }
                Err(_) => {
                    error!(bundle = %config.bundle_id, timeout = ?config.load_timeout, "Model load timed out");
                    CacheState::Failed(LoadFailure::capture(&Error::LoadTimeout))
                }
            };

            let mut state = shared.lock().await;
            // An invalidation during the load supersedes this result.
            if matches!(&*state, CacheState::Loading(current) if current.same_channel(&marker)) {
                *state = next;
            }
            drop(state);
            drop(done_tx);
        });
        done_rx
    }

    /// Eagerly trigger the one-time load.
    pub async fn warm_up(&self) -> Result<()> {
        self.get().await.map(|_| ())
    }

    /// Reset to `Empty`, discarding a loaded model or captured failure. An
    /// in-flight load keeps running but its outcome is discarded. The next
    /// `get()` performs a fresh fetch.
    pub async fn invalidate(&self) {
        let mut state = self.state.lock().await;
        if matches!(&*state, CacheState::Ready(_)) {
            info!(bundle = %self.config.bundle_id, "Cache invalidated, bundle discarded");
        }
        *state = CacheState::Empty;
    }

    /// Current state without triggering or waiting for a load.
    pub async fn status(&self) -> CacheStatus {
        match &*self.state.lock().await {
            CacheState::Empty => CacheStatus::Empty,
            CacheState::Loading(_) => CacheStatus::Loading,
            CacheState::Ready(model) => CacheStatus::Ready {
                fingerprint: model.fingerprint.clone(),
            },
            CacheState::Failed(failure) => CacheStatus::Failed { kind: failure.kind },
        }
    }
}

async fn load(fetcher: &BundleFetcher, bundle_id: &str) -> Result<CachedModel> {
    let bundle = fetcher.fetch(bundle_id).await?;

    // Deserialization can take a while; keep it off the async workers.
    let model = tokio::task::spawn_blocking(move || -> Result<CachedModel> {
        let fingerprint = bundle.fingerprint()?;
        let engine = load_engine(&bundle)?;
        Ok(CachedModel {
            engine,
            bundle,
            fingerprint,
        })
    })
    .await
    .map_err(|e| Error::internal(format!("model load task failed: {}", e)))??;

    info!(
        bundle = %model.bundle_id(),
        fingerprint = %model.fingerprint,
        family = model.engine.family(),
        "Model cached"
    );
    Ok(model)
}
