pub mod column_stats;
pub mod correlation;
pub mod engine;
pub mod insights;

pub use engine::{profile, ProfilingResult};
