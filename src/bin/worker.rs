use catalog_workflows::{
    config::EngineConfig,
    db,
    engine::WorkflowEngine,
    services::{
        catalog_lookup::HttpCatalogClient, rates::HttpRateClient,
        translation::HttpTranslationClient,
    },
    store::PgStore,
};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting catalog workflow worker");

    // Load configuration
    let config = EngineConfig::from_env().expect("Failed to load configuration");

    // Install Prometheus metrics exporter with its own scrape listener
    let metrics_addr: SocketAddr = config
        .metrics_addr
        .parse()
        .expect("Invalid metrics bind address");
    PrometheusBuilder::new()
        .with_http_listener(metrics_addr)
        .install()
        .expect("Failed to install Prometheus metrics exporter");

    // Register application metrics
    metrics::describe_histogram!(
        "workflow_job_processing_seconds",
        "Time spent processing one queue job"
    );
    metrics::describe_counter!(
        "workflow_jobs_completed",
        "Total queue jobs that completed successfully"
    );
    metrics::describe_counter!(
        "workflow_jobs_failed",
        "Total queue jobs that failed after exhausting retries"
    );
    metrics::describe_counter!(
        "workflow_jobs_retried",
        "Total queue jobs re-enqueued for retry"
    );
    metrics::describe_gauge!(
        "workflow_queue_depth",
        "Current number of pending jobs in the queue"
    );

    // Initialize database
    tracing::info!("Connecting to PostgreSQL");
    let db_pool = db::init_pool(&config.database_url)
        .await
        .expect("Failed to connect to database");

    tracing::info!("Running database migrations");
    db::run_migrations(&db_pool)
        .await
        .expect("Failed to run database migrations");

    // Initialize capability clients
    tracing::info!("Initializing capability clients");
    let store = Arc::new(PgStore::new(db_pool));
    let products = Arc::new(HttpCatalogClient::new(&config.catalog_api_url));
    let rates = Arc::new(HttpRateClient::new(&config.rates_api_url));
    let translator = Arc::new(HttpTranslationClient::new(
        &config.translation_api_url,
        config.translation_api_key.clone(),
    ));

    let engine = Arc::new(WorkflowEngine::new(store, products, rates, translator));

    // Spawn consumer loops and the maintenance sweep
    let shutdown = CancellationToken::new();
    let mut worker_handles = Vec::with_capacity(config.worker_count);
    for _ in 0..config.worker_count {
        worker_handles.push(engine.spawn_worker(shutdown.clone()));
    }
    let sweep_handle = tokio::spawn(maintenance_sweep(
        engine.clone(),
        shutdown.clone(),
        config.sweep_interval_secs,
        config.stale_workflow_minutes,
    ));

    tracing::info!(
        workers = config.worker_count,
        "Worker ready, processing jobs"
    );

    tokio::signal::ctrl_c()
        .await
        .expect("Failed to listen for shutdown signal");
    tracing::info!("Shutdown signal received, stopping workers");

    shutdown.cancel();
    engine.close_queue();
    for handle in worker_handles {
        let _ = handle.await;
    }
    let _ = sweep_handle.await;

    tracing::info!("Worker stopped");
}

/// Periodic maintenance: export the queue depth gauge and force-complete
/// workflow rows stuck past the staleness threshold.
async fn maintenance_sweep(
    engine: Arc<WorkflowEngine>,
    shutdown: CancellationToken,
    interval_secs: u64,
    stale_minutes: i64,
) {
    let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {}
        }

        metrics::gauge!("workflow_queue_depth").set(engine.queue_depth() as f64);

        match engine.force_complete_stale_workflows(stale_minutes).await {
            Ok(closed) if !closed.is_empty() => {
                tracing::warn!(count = closed.len(), "force-completed stale workflow jobs");
            }
            Ok(_) => {}
            Err(e) => {
                tracing::error!(error = %e, "stale workflow sweep failed");
            }
        }
    }
}
