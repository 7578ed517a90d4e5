use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::Semaphore;

use crate::services::record_view::RecordView;

/// Selects the combiner the caller intends to apply to partial results.
/// Rust's static typing means the combiner itself can't be chosen at
/// runtime the way the source product's `taskName` string switch does —
/// each combiner lives next to its caller in `services::profiling::engine`
/// and operates on a concretely-typed `Vec<T>` of partials. `TaskName` is
/// kept purely so pool-level logging and metrics can say which logical
/// operation a dispatch belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskName {
    ProfileColumns,
    CalculateCorrelations,
    Other,
}

impl std::fmt::Display for TaskName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskName::ProfileColumns => write!(f, "profileColumns"),
            TaskName::CalculateCorrelations => write!(f, "calculateCorrelations"),
            TaskName::Other => write!(f, "other"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PoolOptions {
    pub max_workers: usize,
    pub timeout_ms: u64,
    pub task_name: TaskName,
}

#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    #[error("chunk failed: {0}")]
    ChunkFailed(String),
    #[error("operation timed out after {0}ms")]
    Timeout(u64),
    #[error("operation cancelled")]
    Cancelled,
}

/// Runs `jobs` with at most `opts.max_workers` running concurrently, under a
/// single deadline covering the whole batch. If any job fails, the others
/// are cancelled: not-yet-started jobs never dispatch, and results from
/// jobs that do complete afterward are discarded. Completion order is
/// unspecified; callers must not depend on it (the profiling engine's
/// combiners are explicitly order-independent).
pub async fn run<T, F>(jobs: Vec<F>, opts: &PoolOptions) -> Result<Vec<T>, PoolError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, String> + Send + 'static,
{
    let semaphore = Arc::new(Semaphore::new(opts.max_workers.max(1)));
    let cancelled = Arc::new(AtomicBool::new(false));
    let task_name = opts.task_name;
    let total = jobs.len();

    tracing::debug!(task = %task_name, jobs = total, max_workers = opts.max_workers, "dispatching worker pool batch");

    let mut handles = Vec::with_capacity(jobs.len());
    for job in jobs {
        let sem = semaphore.clone();
        let cancel_flag = cancelled.clone();
        handles.push(tokio::spawn(async move {
            let _permit = match sem.acquire_owned().await {
                Ok(p) => p,
                Err(_) => return Err("semaphore closed".to_string()),
            };
            if cancel_flag.load(Ordering::SeqCst) {
                tracing::debug!("worker skipped: pool already cancelled");
                return Err("cancelled".to_string());
            }
            let result = tokio::task::spawn_blocking(job).await;
            match result {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(message)) => {
                    cancel_flag.store(true, Ordering::SeqCst);
                    Err(message)
                }
                Err(join_error) => {
                    cancel_flag.store(true, Ordering::SeqCst);
                    Err(format!("worker panicked: {join_error}"))
                }
            }
        }));
    }

    let run_all = async {
        let mut results = Vec::with_capacity(handles.len());
        let mut handles = handles.into_iter();
        let mut failure: Option<String> = None;

        for handle in &mut handles {
            match handle.await {
                Ok(Ok(value)) => results.push(value),
                Ok(Err(message)) => {
                    failure = Some(message);
                    break;
                }
                Err(_) => {
                    failure = Some("worker task aborted".to_string());
                    break;
                }
            }
        }

        if let Some(message) = failure {
            cancelled.store(true, Ordering::SeqCst);
            for remaining in handles {
                remaining.abort();
            }
            return Err(PoolError::ChunkFailed(message));
        }

        Ok(results)
    };

    match tokio::time::timeout(Duration::from_millis(opts.timeout_ms), run_all).await {
        Ok(inner) => inner,
        Err(_) => {
            cancelled.store(true, Ordering::SeqCst);
            tracing::warn!(task = %task_name, timeout_ms = opts.timeout_ms, "worker pool batch timed out");
            Err(PoolError::Timeout(opts.timeout_ms))
        }
    }
}

/// Splits `view` into contiguous chunks of `chunk_size` rows (the last
/// chunk may be smaller).
pub fn chunk_view(view: &RecordView, chunk_size: usize) -> Vec<RecordView> {
    if chunk_size == 0 || view.is_empty() {
        return vec![view.clone()];
    }
    let mut chunks = Vec::new();
    let mut start = 0;
    while start < view.len() {
        let end = (start + chunk_size).min(view.len());
        chunks.push(view.slice(start, end));
        start = end;
    }
    chunks
}

/// The literal `processInParallel(view, chunkFn, opts)` contract: split into
/// row chunks, run each through `chunk_fn` under the pool's concurrency and
/// timeout policy, and return the partials for the caller to combine.
pub async fn process_in_parallel<T, F>(
    view: &RecordView,
    chunk_size: usize,
    chunk_fn: F,
    opts: PoolOptions,
) -> Result<Vec<T>, PoolError>
where
    T: Send + 'static,
    F: Fn(RecordView) -> Result<T, String> + Send + Sync + 'static,
{
    let chunks = chunk_view(view, chunk_size);
    let chunk_fn = Arc::new(chunk_fn);
    let jobs: Vec<_> = chunks
        .into_iter()
        .map(|chunk| {
            let f = chunk_fn.clone();
            move || f(chunk)
        })
        .collect();
    run(jobs, &opts).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use crate::models::Cell;

    fn sample_view(n: usize) -> RecordView {
        let rows: Vec<HashMap<String, Cell>> = (0..n)
            .map(|i| {
                let mut m = HashMap::new();
                m.insert("x".to_string(), Cell::Number(i as f64));
                m
            })
            .collect();
        RecordView::from_rows(rows).unwrap()
    }

    #[tokio::test]
    async fn combines_all_chunk_results() {
        let view = sample_view(10);
        let opts = PoolOptions { max_workers: 4, timeout_ms: 5000, task_name: TaskName::Other };
        let results = process_in_parallel(
            &view,
            3,
            |chunk| Ok::<usize, String>(chunk.len()),
            opts,
        )
        .await
        .unwrap();
        let total: usize = results.iter().sum();
        assert_eq!(total, 10);
        assert_eq!(results.len(), 4); // chunks of 3,3,3,1
    }

    #[tokio::test]
    async fn one_failure_short_circuits() {
        let view = sample_view(6);
        let opts = PoolOptions { max_workers: 2, timeout_ms: 5000, task_name: TaskName::Other };
        let result = process_in_parallel(
            &view,
            2,
            |chunk| {
                if chunk.column("x").unwrap()[0] == Cell::Number(2.0) {
                    Err("boom".to_string())
                } else {
                    Ok::<usize, String>(chunk.len())
                }
            },
            opts,
        )
        .await;
        assert!(matches!(result, Err(PoolError::ChunkFailed(_))));
    }

    #[tokio::test]
    async fn deadline_triggers_timeout_error() {
        let view = sample_view(4);
        let opts = PoolOptions { max_workers: 4, timeout_ms: 20, task_name: TaskName::Other };
        let result = process_in_parallel(
            &view,
            1,
            |_chunk| {
                std::thread::sleep(Duration::from_millis(200));
                Ok::<usize, String>(1)
            },
            opts,
        )
        .await;
        assert!(matches!(result, Err(PoolError::Timeout(_))));
    }
}
