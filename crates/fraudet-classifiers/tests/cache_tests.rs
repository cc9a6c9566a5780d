//! Model cache lifecycle and concurrency tests

use async_trait::async_trait;
use fraudet_classifiers::{CacheConfig, CacheStatus, ModelCache, RetryPolicy};
use fraudet_core::{Error, Result};
use fraudet_store::BundleStore;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// In-memory store with call counters, optional initial failures and an
/// optional artificial delay.
struct CountingStore {
    objects: BTreeMap<String, Vec<u8>>,
    list_calls: AtomicU32,
    failing_lists: AtomicU32,
    delay: Option<Duration>,
}

impl CountingStore {
    fn with_linear_bundle() -> Self {
        let mut objects = BTreeMap::new();
        objects.insert(
            "fraud_model/bundle.json".to_string(),
            br#"{"family": "linear"}"#.to_vec(),
        );
        objects.insert(
            "fraud_model/vectorizer.json".to_string(),
            br#"{
                "vocabulary": {"verify": 0, "lunch": 1},
                "coefficients": [4.0, -4.0],
                "intercept": 0.0
            }"#
            .to_vec(),
        );
        Self {
            objects,
            list_calls: AtomicU32::new(0),
            failing_lists: AtomicU32::new(0),
            delay: None,
        }
    }

    fn failing_first(self, n: u32) -> Self {
        self.failing_lists.store(n, Ordering::Relaxed);
        self
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl BundleStore for CountingStore {
    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        self.list_calls.fetch_add(1, Ordering::Relaxed);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing_lists.load(Ordering::Relaxed) > 0 {
            self.failing_lists.fetch_sub(1, Ordering::Relaxed);
            return Err(Error::artifact_transfer("injected outage"));
        }
        Ok(self
            .objects
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        self.objects
            .get(key)
            .cloned()
            .ok_or_else(|| Error::artifact_transfer(format!("missing {:?}", key)))
    }

    fn name(&self) -> &str {
        "counting"
    }
}

fn cache_with(store: Arc<CountingStore>, config: CacheConfig) -> Arc<ModelCache> {
    Arc::new(ModelCache::new(store, config))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_first_calls_share_one_load() {
    let store = Arc::new(CountingStore::with_linear_bundle());
    let cache = cache_with(store.clone(), CacheConfig::new("fraud_model/"));

    let tasks: Vec<_> = (0..16)
        .map(|_| {
            let cache = cache.clone();
            tokio::spawn(async move { cache.get().await })
        })
        .collect();

    let models: Vec<_> = futures::future::join_all(tasks)
        .await
        .into_iter()
        .map(|join| join.unwrap().unwrap())
        .collect();

    // Exactly one artifact fetch, and every caller got the same instance.
    assert_eq!(store.list_calls.load(Ordering::Relaxed), 1);
    for model in &models[1..] {
        assert!(Arc::ptr_eq(&models[0], model));
    }
}

#[tokio::test]
async fn test_ready_cache_returns_without_refetch() {
    let store = Arc::new(CountingStore::with_linear_bundle());
    let cache = cache_with(store.clone(), CacheConfig::new("fraud_model/"));

    let first = cache.get().await.unwrap();
    let second = cache.get().await.unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(store.list_calls.load(Ordering::Relaxed), 1);

    let result = first.engine().classify("verify your account").await.unwrap();
    assert_eq!(result.label, "fraud");
}

#[tokio::test]
async fn test_fail_fast_replays_captured_error() {
    let store = Arc::new(CountingStore::with_linear_bundle().failing_first(10));
    let cache = cache_with(
        store.clone(),
        CacheConfig::new("fraud_model/").with_retry(RetryPolicy::FailFast),
    );

    let err = cache.get().await.unwrap_err();
    assert_eq!(err.kind(), "artifact_transfer");

    // Later callers get the captured failure without touching the store.
    let err = cache.get().await.unwrap_err();
    assert_eq!(err.kind(), "artifact_transfer");
    assert_eq!(store.list_calls.load(Ordering::Relaxed), 1);

    assert_eq!(
        cache.status().await,
        CacheStatus::Failed {
            kind: "artifact_transfer"
        }
    );
}

#[tokio::test]
async fn test_retry_next_call_attempts_fresh_load() {
    let store = Arc::new(CountingStore::with_linear_bundle().failing_first(1));
    let cache = cache_with(
        store.clone(),
        CacheConfig::new("fraud_model/").with_retry(RetryPolicy::RetryNextCall),
    );

    assert!(cache.get().await.is_err());
    let model = cache.get().await.unwrap();
    assert_eq!(model.bundle_id(), "fraud_model/");
    assert_eq!(store.list_calls.load(Ordering::Relaxed), 2);
}

#[tokio::test]
async fn test_invalidate_resets_failed_state() {
    let store = Arc::new(CountingStore::with_linear_bundle().failing_first(1));
    let cache = cache_with(
        store.clone(),
        CacheConfig::new("fraud_model/").with_retry(RetryPolicy::FailFast),
    );

    assert!(cache.get().await.is_err());
    cache.invalidate().await;
    assert_eq!(cache.status().await, CacheStatus::Empty);

    let model = cache.get().await.unwrap();
    assert!(!model.fingerprint().is_empty());
}

#[tokio::test]
async fn test_missing_bundle_is_artifact_not_found() {
    let store = Arc::new(CountingStore::with_linear_bundle());
    let cache = cache_with(store, CacheConfig::new("missing/"));

    let err = cache.get().await.unwrap_err();
    assert_eq!(err.kind(), "artifact_not_found");
}

#[tokio::test]
async fn test_slow_load_times_out_into_failed_state() {
    let store = Arc::new(
        CountingStore::with_linear_bundle().with_delay(Duration::from_millis(200)),
    );
    let cache = cache_with(
        store,
        CacheConfig::new("fraud_model/")
            .with_load_timeout(Duration::from_millis(10))
            .with_retry(RetryPolicy::FailFast),
    );

    let err = cache.get().await.unwrap_err();
    assert_eq!(err.kind(), "load_timeout");
    assert_eq!(
        cache.status().await,
        CacheStatus::Failed {
            kind: "load_timeout"
        }
    );
}

#[tokio::test]
async fn test_status_reports_loading_without_blocking() {
    let store = Arc::new(
        CountingStore::with_linear_bundle().with_delay(Duration::from_millis(200)),
    );
    let cache = cache_with(store, CacheConfig::new("fraud_model/"));

    let loading = {
        let cache = cache.clone();
        tokio::spawn(async move { cache.get().await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    // The probe must answer promptly while the load is still in flight.
    let status = tokio::time::timeout(Duration::from_millis(50), cache.status())
        .await
        .expect("status() blocked on an in-flight load");
    assert_eq!(status, CacheStatus::Loading);

    let model = loading.await.unwrap().unwrap();
    assert_eq!(model.bundle_id(), "fraud_model/");
    match cache.status().await {
        CacheStatus::Ready { .. } => {}
        other => panic!("expected ready cache, got {:?}", other),
    }
}

#[tokio::test]
async fn test_replayed_failure_keeps_original_kind() {
    let store = Arc::new(CountingStore::with_linear_bundle());
    let cache = cache_with(
        store,
        CacheConfig::new("   ").with_retry(RetryPolicy::FailFast),
    );

    let first = cache.get().await.unwrap_err();
    let second = cache.get().await.unwrap_err();

    // The captured failure replays with the same kind and message the
    // first caller saw.
    assert_eq!(first.kind(), "invalid_input");
    assert_eq!(second.kind(), "invalid_input");
    assert_eq!(first.to_string(), second.to_string());
}

#[tokio::test]
async fn test_status_starts_empty_and_reports_ready() {
    let store = Arc::new(CountingStore::with_linear_bundle());
    let cache = cache_with(store, CacheConfig::new("fraud_model/"));

    assert_eq!(cache.status().await, CacheStatus::Empty);
    cache.warm_up().await.unwrap();

    match cache.status().await {
        CacheStatus::Ready { fingerprint } => assert!(!fingerprint.is_empty()),
        other => panic!("expected ready cache, got {:?}", other),
    }
}
