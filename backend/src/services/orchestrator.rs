use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::config::WorkerPoolConfig;
use crate::models::{Cell, ColumnType, ProfileOptions, ProfileReport, SamplingMetadata, Summary};
use crate::services::cache::{fingerprint, CacheStore, CacheableOptions};
use crate::services::comparison::{self, ComparisonReport};
use crate::services::csv_parser;
use crate::services::profiling;
use crate::services::record_view::{RecordView, RecordViewError};
use crate::services::sampling;

const MIN_CSV_LEN: usize = 10;
const MAX_CSV_BYTES: usize = 50 * 1024 * 1024;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Parse(String),
    #[error("request timed out")]
    Timeout,
    #[error("{0}")]
    Internal(String),
}

pub struct ProfileOutcome {
    pub report: ProfileReport,
    pub from_cache: bool,
    pub sampling: SamplingMetadata,
}

pub struct ComparisonOutcome {
    pub comparison: ComparisonReport,
    pub first: ProfileOutcome,
    pub second: ProfileOutcome,
}

/// Wires record view, sampling, profiling engine, and cache together for a
/// single profiling or comparison request.
pub struct Orchestrator {
    cache: CacheStore,
    worker_pool: WorkerPoolConfig,
    default_max_sample_size: usize,
}

impl Orchestrator {
    pub fn new(cache: CacheStore, worker_pool: WorkerPoolConfig, default_max_sample_size: usize) -> Self {
        Self { cache, worker_pool, default_max_sample_size }
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    /// `POST /api/profile` with a raw CSV body: validate size bounds, check
    /// the cache, parse, sample if needed, profile, and store on a miss.
    pub async fn profile_csv(&self, csv_text: &str, options: &ProfileOptions) -> Result<ProfileOutcome, OrchestratorError> {
        if csv_text.len() < MIN_CSV_LEN {
            return Err(OrchestratorError::Validation(format!(
                "csv must be at least {MIN_CSV_LEN} characters"
            )));
        }
        if csv_text.len() > MAX_CSV_BYTES {
            return Err(OrchestratorError::Validation(format!(
                "csv exceeds the {MAX_CSV_BYTES} byte limit"
            )));
        }

        let start = Instant::now();
        let fingerprint_value = options.use_cache.then(|| {
            let cacheable = CacheableOptions::from(options);
            fingerprint::fingerprint(csv_text, &cacheable)
        });

        if let Some(fp) = &fingerprint_value {
            if let Some(report) = self.cache.lookup(fp) {
                return Ok(ProfileOutcome {
                    report,
                    from_cache: true,
                    sampling: SamplingMetadata::unsampled(0),
                });
            }
        }

        let parse_start = Instant::now();
        let rows = csv_parser::parse(csv_text, options.delimiter_char(), options.skip_empty_lines)
            .map_err(|e| OrchestratorError::Validation(e.to_string()))?;
        let parse_ms = elapsed_ms(parse_start);

        self.profile_rows(rows, options, fingerprint_value, parse_ms, start).await
    }

    /// `POST /api/compare` and the record-array side of `/api/profile`
    /// accept already-parsed records — parsing raw text is not this
    /// engine's concern once the caller has records in hand.
    pub async fn profile_records(
        &self,
        rows: Vec<HashMap<String, Cell>>,
        options: &ProfileOptions,
    ) -> Result<ProfileOutcome, OrchestratorError> {
        let start = Instant::now();
        self.profile_rows(rows, options, None, 0.0, start).await
    }

    async fn profile_rows(
        &self,
        rows: Vec<HashMap<String, Cell>>,
        options: &ProfileOptions,
        fingerprint_value: Option<String>,
        parse_ms: f64,
        start: Instant,
    ) -> Result<ProfileOutcome, OrchestratorError> {
        let view = RecordView::from_rows(rows).map_err(|e| match e {
            RecordViewError::Empty => OrchestratorError::Validation("record view is empty".to_string()),
            RecordViewError::InconsistentShape { row } => {
                OrchestratorError::Validation(format!("row {row} has an inconsistent column shape"))
            }
        })?;

        let total_rows = view.len();
        let (sample_view, sampling_metadata) = if options.enable_sampling
            && !options.full_analysis
            && total_rows > options.sample_size
        {
            sampling::create_sample(&view, options.sample_size, options.stratify, options.sample_seed)
        } else {
            (view.clone(), SamplingMetadata::unsampled(total_rows))
        };

        let profile_start = Instant::now();
        let result = tokio::time::timeout(REQUEST_TIMEOUT, profiling::profile(&sample_view, &self.worker_pool))
            .await
            .map_err(|_| OrchestratorError::Timeout)?;
        let profile_ms = elapsed_ms(profile_start);

        let numeric_columns = result.column_stats.values().filter(|s| s.r#type == ColumnType::Numeric).count();
        let categorical_columns =
            result.column_stats.values().filter(|s| s.r#type == ColumnType::Categorical).count();
        let total_missing_values = result.column_stats.values().map(|s| s.missing_count).sum();

        let total_ms = elapsed_ms(start);
        let processing_time =
            crate::models::ProcessingTime::new(total_ms, parse_ms, profile_ms, sample_view.len(), sample_view.num_columns());

        let report = ProfileReport {
            summary: Summary {
                total_rows: sample_view.len(),
                total_columns: sample_view.num_columns(),
                numeric_columns,
                categorical_columns,
                total_missing_values,
                processing_time,
            },
            column_stats: result.column_stats,
            correlations: result.correlations,
            insights: result.insights,
        };

        if options.use_cache && !sampling_metadata.is_sampled {
            if let Some(fp) = &fingerprint_value {
                self.cache.store(fp, &report, chrono::Utc::now().timestamp());
            }
        }

        Ok(ProfileOutcome { report, from_cache: false, sampling: sampling_metadata })
    }

    /// Profiles both datasets independently (in parallel) then diffs them.
    pub async fn compare(
        &self,
        dataset1: Vec<HashMap<String, Cell>>,
        dataset2: Vec<HashMap<String, Cell>>,
        options: &ProfileOptions,
    ) -> Result<ComparisonOutcome, OrchestratorError> {
        let (first, second) = tokio::join!(
            self.profile_records(dataset1, options),
            self.profile_records(dataset2, options)
        );
        let first = first?;
        let second = second?;
        let comparison = comparison::compare(&first.report, &second.report);
        Ok(ComparisonOutcome { comparison, first, second })
    }
}

fn elapsed_ms(since: Instant) -> f64 {
    since.elapsed().as_secs_f64() * 1000.0
}
