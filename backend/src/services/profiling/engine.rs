use std::collections::HashMap;

use crate::config::WorkerPoolConfig;
use crate::models::{ColumnStats, ColumnType, CorrelationPartitions, Insight};
use crate::services::profiling::{column_stats, correlation, insights};
use crate::services::record_view::RecordView;
use crate::services::worker_pool::{self, PoolOptions, TaskName};

pub struct ProfilingResult {
    pub column_stats: HashMap<String, ColumnStats>,
    pub correlations: CorrelationPartitions,
    pub insights: Vec<Insight>,
}

/// Runs the full profiling pass: per-column stats, the correlation matrix,
/// and derived insights. Dispatches column profiling and correlation
/// computation through the worker pool once the column/pair count crosses
/// the configured thresholds; falls back to sequential execution (and logs
/// a warning) if the pool run itself fails, since a parallelism failure
/// here is an implementation detail, not a reason to fail the request.
pub async fn profile(view: &RecordView, cfg: &WorkerPoolConfig) -> ProfilingResult {
    let columns = view.column_names().to_vec();

    let column_stats = if columns.len() > cfg.column_threshold && cfg.max_workers > 1 {
        match profile_columns_parallel(view, &columns, cfg).await {
            Ok(map) => map,
            Err(err) => {
                tracing::warn!(error = %err, "parallel column profiling failed, falling back to sequential");
                profile_columns_sequential(view, &columns)
            }
        }
    } else {
        profile_columns_sequential(view, &columns)
    };

    let numeric_columns: Vec<String> = column_stats
        .iter()
        .filter(|(_, stats)| stats.r#type == ColumnType::Numeric)
        .map(|(name, _)| name.clone())
        .collect();

    let pair_count = upper_triangular_count(numeric_columns.len());
    let correlations = if pair_count > cfg.pair_threshold && cfg.max_workers > 1 {
        match correlations_parallel(view, &numeric_columns, cfg).await {
            Ok(partitions) => partitions,
            Err(err) => {
                tracing::warn!(error = %err, "parallel correlation computation failed, falling back to sequential");
                correlation::compute_pairs(view, &numeric_columns)
            }
        }
    } else {
        correlation::compute_pairs(view, &numeric_columns)
    };

    let generated_insights = insights::generate_insights(&column_stats, &correlations);

    ProfilingResult { column_stats, correlations, insights: generated_insights }
}

fn profile_columns_sequential(view: &RecordView, columns: &[String]) -> HashMap<String, ColumnStats> {
    columns.iter().map(|c| (c.clone(), column_stats::profile_column_safe(view, c))).collect()
}

fn upper_triangular_count(n: usize) -> usize {
    n.saturating_sub(1) * n / 2
}

/// `taskName = profileColumns` sharding: split the column list into
/// `max_workers` disjoint groups, profile each group in its own worker, and
/// combine by key union (disjoint by construction, so no collision to
/// resolve).
async fn profile_columns_parallel(
    view: &RecordView,
    columns: &[String],
    cfg: &WorkerPoolConfig,
) -> Result<HashMap<String, ColumnStats>, worker_pool::PoolError> {
    let groups = partition_columns(columns, cfg.max_workers);
    let jobs: Vec<_> = groups
        .into_iter()
        .map(|group| {
            let view = view.clone();
            move || -> Result<HashMap<String, ColumnStats>, String> {
                Ok(group.iter().map(|c| (c.clone(), column_stats::profile_column_safe(&view, c))).collect())
            }
        })
        .collect();

    let opts = PoolOptions {
        max_workers: cfg.max_workers,
        timeout_ms: cfg.default_timeout_ms,
        task_name: TaskName::ProfileColumns,
    };
    let partials = worker_pool::run(jobs, &opts).await?;
    Ok(combine_column_stats(partials))
}

fn combine_column_stats(partials: Vec<HashMap<String, ColumnStats>>) -> HashMap<String, ColumnStats> {
    let mut combined = HashMap::new();
    for partial in partials {
        combined.extend(partial);
    }
    combined
}

fn partition_columns(columns: &[String], group_count: usize) -> Vec<Vec<String>> {
    if columns.is_empty() || group_count == 0 {
        return vec![columns.to_vec()];
    }
    let chunk = (columns.len() as f64 / group_count as f64).ceil() as usize;
    let chunk = chunk.max(1);
    columns.chunks(chunk).map(|c| c.to_vec()).collect()
}

/// `taskName = calculateCorrelations` sharding: divide the numeric-column
/// index space into ranges, compute each range's pairs in its own worker,
/// then concatenate, re-sort by descending strength, and recompute the
/// partitions.
async fn correlations_parallel(
    view: &RecordView,
    numeric_columns: &[String],
    cfg: &WorkerPoolConfig,
) -> Result<CorrelationPartitions, worker_pool::PoolError> {
    let ranges = correlation::column_ranges(numeric_columns.len(), cfg.max_workers);
    let jobs: Vec<_> = ranges
        .into_iter()
        .map(|(start, end)| {
            let view = view.clone();
            let numeric_columns = numeric_columns.to_vec();
            move || -> Result<Vec<crate::models::CorrelationPair>, String> {
                Ok(correlation::pairs_for(&view, &numeric_columns, start, end))
            }
        })
        .collect();

    let opts = PoolOptions {
        max_workers: cfg.max_workers,
        timeout_ms: cfg.default_timeout_ms,
        task_name: TaskName::CalculateCorrelations,
    };
    let partials = worker_pool::run(jobs, &opts).await?;
    let all: Vec<_> = partials.into_iter().flatten().collect();
    Ok(CorrelationPartitions::from_all(all))
}
