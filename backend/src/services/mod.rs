pub mod cache;
pub mod comparison;
pub mod csv_parser;
pub mod orchestrator;
pub mod profiling;
pub mod record_view;
pub mod rng;
pub mod sampling;
pub mod worker_pool;

pub use orchestrator::{ComparisonOutcome, Orchestrator, OrchestratorError, ProfileOutcome};
