use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Numeric,
    Categorical,
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NumericStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
    pub mode: f64,
    pub variance: f64,
    pub std_dev: f64,
    pub q1: f64,
    pub q3: f64,
    pub iqr: f64,
    pub outliers: usize,
    pub skewness: f64,
    pub excess_kurtosis: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoricalStats {
    pub top_values: Vec<(String, u64)>,
    pub mode: String,
    pub mode_count: u64,
    pub mode_percent: f64,
    pub entropy: f64,
}

/// Per-column statistical summary.
///
/// `numeric` and `categorical` are mutually exclusive populated variants,
/// matching the "specialization" split in the data model: every column gets
/// the common attributes, plus exactly one of the two specializations
/// (neither when `r#type == Unknown`, i.e. the column's profiling raised).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnStats {
    pub r#type: ColumnType,
    pub total_count: usize,
    pub valid_count: usize,
    pub missing_count: usize,
    pub missing_percent: f64,
    pub unique: usize,
    pub unique_percent: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub numeric: Option<NumericStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub categorical: Option<CategoricalStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ColumnStats {
    pub fn unknown(error: impl Into<String>) -> Self {
        Self {
            r#type: ColumnType::Unknown,
            total_count: 0,
            valid_count: 0,
            missing_count: 0,
            missing_percent: 0.0,
            unique: 0,
            unique_percent: 0.0,
            numeric: None,
            categorical: None,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrelationPair {
    pub column_a: String,
    pub column_b: String,
    pub r: f64,
    pub strength: f64,
    pub sample_size: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrelationPartitions {
    pub all: Vec<CorrelationPair>,
    pub strong: Vec<CorrelationPair>,
    pub moderate: Vec<CorrelationPair>,
    pub weak: Vec<CorrelationPair>,
    pub positive: Vec<CorrelationPair>,
    pub negative: Vec<CorrelationPair>,
}

impl CorrelationPartitions {
    /// Build the derived partitions from a flat, already-sorted-by-strength
    /// `all` list. Sorting is re-applied defensively so callers that
    /// concatenate partial results from the worker pool don't need to
    /// remember to sort first.
    pub fn from_all(mut all: Vec<CorrelationPair>) -> Self {
        all.sort_by(|a, b| b.strength.partial_cmp(&a.strength).unwrap_or(std::cmp::Ordering::Equal));

        let strong = all.iter().filter(|p| p.strength > 0.7).cloned().collect();
        let moderate = all
            .iter()
            .filter(|p| p.strength > 0.3 && p.strength <= 0.7)
            .cloned()
            .collect();
        let weak = all.iter().filter(|p| p.strength <= 0.3).cloned().collect();
        let positive = all.iter().filter(|p| p.r > 0.0).take(5).cloned().collect();
        let negative = all.iter().filter(|p| p.r < 0.0).take(5).cloned().collect();

        Self { all, strong, moderate, weak, positive, negative }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightType {
    Warning,
    Info,
    Insight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Insight {
    pub r#type: InsightType,
    pub category: String,
    pub message: String,
    pub severity: Severity,
}

/// Sorts insights high-severity-first, stable so ties keep emission order —
/// keeps the ordering deterministic regardless of which rule fired first.
pub fn sort_insights(insights: &mut [Insight]) {
    insights.sort_by(|a, b| b.severity.cmp(&a.severity));
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingTime {
    pub total_ms: f64,
    pub parse_ms: f64,
    pub profile_ms: f64,
    pub rows_per_second: f64,
    pub columns_per_second: f64,
    pub efficiency: String,
}


impl ProcessingTime {
    pub fn new(total_ms: f64, parse_ms: f64, profile_ms: f64, rows: usize, columns: usize) -> Self {
        let seconds = (total_ms / 1000.0).max(1e-9);
        let rows_per_second = rows as f64 / seconds;
        let columns_per_second = columns as f64 / seconds;
        let efficiency = if rows_per_second > 50_000.0 {
            "excellent"
        } else if rows_per_second > 10_000.0 {
            "good"
        } else if rows_per_second > 1_000.0 {
            "fair"
        } else {
            "slow"
        };
        Self {
            total_ms,
            parse_ms,
            profile_ms,
            rows_per_second,
            columns_per_second,
            efficiency: efficiency.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total_rows: usize,
    pub total_columns: usize,
    pub numeric_columns: usize,
    pub categorical_columns: usize,
    pub total_missing_values: usize,
    pub processing_time: ProcessingTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SamplingMetadata {
    pub is_sampled: bool,
    pub original_size: usize,
    pub sample_size: usize,
    pub sampling_rate: f64,
    pub stratified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preserved_distribution: Option<HashMap<String, f64>>,
}

impl SamplingMetadata {
    pub fn unsampled(original_size: usize) -> Self {
        Self {
            is_sampled: false,
            original_size,
            sample_size: original_size,
            sampling_rate: 1.0,
            stratified: false,
            preserved_distribution: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileReport {
    pub summary: Summary,
    pub column_stats: HashMap<String, ColumnStats>,
    pub correlations: CorrelationPartitions,
    pub insights: Vec<Insight>,
}
