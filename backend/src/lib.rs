//! csv-profiler backend library.
//!
//! Holds the profiling engine, its supporting services (sampling, worker
//! pool, cache, comparison), and the thin Axum HTTP surface wired around
//! them. Exposed as a library (as well as the `csv-profiler` binary) so the
//! engine is unit- and integration-testable without spinning up a server.

use std::sync::Arc;
use std::time::Instant;

use axum::middleware as axum_middleware;
use axum::routing::{get, post};
use axum::Router;

pub mod config;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;

#[cfg(test)]
mod tests;

pub use config::Config;
pub use services::Orchestrator;

/// Shared application state handed to every handler via `State<Arc<AppState>>`.
///
/// Holds only what the HTTP surface needs: the orchestrator (which in turn
/// owns the cache) and a process-start timestamp for `/api/health`'s uptime
/// field. Everything below the orchestrator is request-scoped.
pub struct AppState {
    pub orchestrator: Orchestrator,
    pub config: Config,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(orchestrator: Orchestrator, config: Config) -> Arc<Self> {
        Arc::new(Self { orchestrator, config, started_at: Instant::now() })
    }
}

/// Builds the Axum router, shared by `main.rs` and integration tests so the
/// mounted routes and middleware stack never drift between the two.
/// CORS and request tracing are mounted unconditionally — they are ambient
/// HTTP-surface plumbing, not profiling features, so they're not gated by
/// any core option even though their policy (origins, verbosity) is an
/// external-config concern this crate doesn't own.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(handlers::health::health))
        .route("/api/profile", post(handlers::profile::profile).get(handlers::profile::profile_usage))
        .route("/api/compare", post(handlers::profile::compare))
        .with_state(state)
        .layer(axum_middleware::from_fn(middleware::request_id_middleware))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .layer(tower_http::cors::CorsLayer::permissive())
}
