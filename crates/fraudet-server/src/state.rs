//! Shared application state

use crate::config::ServerConfig;
use fraudet_classifiers::ModelCache;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

/// State injected into every handler: the explicit model cache (no global
/// singleton), the configuration and the metrics handle.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub cache: Arc<ModelCache>,
    pub metrics: PrometheusHandle,
}

impl AppState {
    pub fn new(config: ServerConfig, cache: Arc<ModelCache>, metrics: PrometheusHandle) -> Self {
        Self {
            config: Arc::new(config),
            cache,
            metrics,
        }
    }
}
