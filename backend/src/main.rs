use std::sync::Arc;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use csv_profiler::services::cache::CacheStore;
use csv_profiler::services::Orchestrator;
use csv_profiler::{router, AppState, Config};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    init_tracing(&config.logging);

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "csv-profiler starting up");

    let cache = CacheStore::new(config.cache.directory.as_str(), config.cache.ttl_hours);
    match cache.load_existing() {
        Ok(loaded) => tracing::info!(loaded, directory = %config.cache.directory, "cache index warmed from disk"),
        Err(err) => tracing::warn!(error = %err, "failed to warm cache index from disk, starting empty"),
    }

    let orchestrator = Orchestrator::new(cache, config.worker_pool.clone(), config.sampling.default_max_sample_size);
    let state = AppState::new(orchestrator, config.clone());

    spawn_cache_sweeper(Arc::clone(&state));

    let app = router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, workers = config.worker_pool.max_workers, "csv-profiler listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// One background task sweeping expired cache entries hourly — the single
/// shared-mutable-structure maintenance loop the cache's concurrency model
/// calls for.
fn spawn_cache_sweeper(state: Arc<AppState>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(3600));
        interval.tick().await; // first tick fires immediately; skip it
        loop {
            interval.tick().await;
            let evicted = state.orchestrator.cache().sweep();
            if evicted > 0 {
                tracing::info!(evicted, "cache sweeper evicted expired entries");
            }
        }
    });
}

fn init_tracing(logging: &csv_profiler::config::LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::new(&logging.level);
    let registry = tracing_subscriber::registry().with(filter);

    if let Some(log_file) = &logging.file {
        let log_path = std::path::Path::new(log_file);
        if let Some(parent) = log_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let log_dir = log_path.parent().and_then(|p| p.to_str()).unwrap_or("logs");
        let file_name = log_path.file_name().and_then(|n| n.to_str()).unwrap_or("csv-profiler.log");
        let file_prefix = file_name.strip_suffix(".log").unwrap_or(file_name);

        let file_appender = tracing_appender::rolling::daily(log_dir, file_prefix);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        // Leak the guard so the non-blocking writer stays alive for the
        // process lifetime; main() never returns while serving.
        Box::leak(Box::new(guard));
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(non_blocking))
            .with(tracing_subscriber::fmt::layer())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
