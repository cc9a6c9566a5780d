use anyhow::Result;
use clap::Parser;
use fraudet_classifiers::ModelCache;
use fraudet_server::{create_router, AppState, Cli, ServerConfig};
use metrics_exporter_prometheus::PrometheusHandle;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    info!("Starting Fraudet server");

    let config = ServerConfig::load(&cli.config, &cli)?;
    info!(bundle = %config.bundle_id, store = ?config.store, "Configuration loaded");

    let metrics_handle = init_metrics()?;

    // The cache is the single owner of the model lifecycle; everything
    // else borrows it through the router state.
    let cache = Arc::new(ModelCache::new(config.build_store(), config.cache_config()));

    if config.warm_up {
        let warm_cache = cache.clone();
        tokio::spawn(async move {
            match warm_cache.warm_up().await {
                Ok(()) => info!("Warm-up load complete"),
                Err(e) => error!(kind = e.kind(), error = %e, "Warm-up load failed"),
            }
        });
    }

    let state = AppState::new(config, cache, metrics_handle);
    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", cli.listen, cli.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on http://{}", addr);

    let shutdown = async {
        shutdown_signal().await;
        warn!("Shutdown signal received, stopping server...");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Listen for shutdown signals (SIGTERM, SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Initialize tracing/logging
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("fraudet=debug,tower_http=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("fraudet=info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Initialize metrics exporter and return handle for rendering
fn init_metrics() -> Result<PrometheusHandle> {
    use metrics_exporter_prometheus::PrometheusBuilder;

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install metrics: {}", e))?;

    metrics::describe_counter!(
        "fraudet_requests_total",
        "Total number of /predict requests received"
    );
    metrics::describe_counter!(
        "fraudet_classifications_total",
        "Total number of texts classified"
    );
    metrics::describe_counter!("fraudet_errors_total", "Total number of errors by kind");
    metrics::describe_histogram!(
        "fraudet_request_latency_us",
        metrics::Unit::Microseconds,
        "End-to-end /predict latency in microseconds"
    );

    Ok(handle)
}
