use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::models::{ColumnStats, ColumnType, Insight, InsightType, Severity, sort_insights, ProfileReport};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopValueDiff {
    pub value: String,
    pub count_1: u64,
    pub count_2: u64,
    pub diff: i64,
    pub percent_change: f64,
    pub significant: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnChange {
    pub column: String,
    pub type_changed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_change_label: Option<String>,
    pub missing_count_delta: i64,
    pub missing_count_percent_change: f64,
    pub unique_delta: i64,
    pub unique_percent_change: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean_delta: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean_percent_change: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub std_dev_delta: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_delta: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_delta: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range_delta: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outliers_delta: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entropy_delta: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_values_diff: Option<Vec<TopValueDiff>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrelationChange {
    pub column_a: String,
    pub column_b: String,
    pub r1: f64,
    pub r2: f64,
    pub diff: f64,
    pub significant: bool,
    pub sign_change: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrelationChanges {
    pub added: Vec<(String, String)>,
    pub removed: Vec<(String, String)>,
    pub changed: Vec<CorrelationChange>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonReport {
    pub common_columns: Vec<String>,
    pub only_in_first: Vec<String>,
    pub only_in_second: Vec<String>,
    pub row_count_delta: i64,
    pub row_count_percent_change: f64,
    pub column_changes: Vec<ColumnChange>,
    pub correlation_changes: CorrelationChanges,
    pub insights: Vec<Insight>,
}

/// Diffs two profile reports into a structured change document, per the
/// comparison engine contract.
pub fn compare(first: &ProfileReport, second: &ProfileReport) -> ComparisonReport {
    let cols1: HashSet<&String> = first.column_stats.keys().collect();
    let cols2: HashSet<&String> = second.column_stats.keys().collect();

    let mut common: Vec<String> = cols1.intersection(&cols2).map(|s| (*s).clone()).collect();
    common.sort();
    let mut only_in_first: Vec<String> = cols1.difference(&cols2).map(|s| (*s).clone()).collect();
    only_in_first.sort();
    let mut only_in_second: Vec<String> = cols2.difference(&cols1).map(|s| (*s).clone()).collect();
    only_in_second.sort();

    let rows1 = first.summary.total_rows as i64;
    let rows2 = second.summary.total_rows as i64;
    let row_count_delta = rows2 - rows1;
    let row_count_percent_change = percent_change(rows1 as f64, rows2 as f64);

    let column_changes: Vec<ColumnChange> = common
        .iter()
        .map(|name| column_change(name, &first.column_stats[name], &second.column_stats[name]))
        .collect();

    let correlation_changes = correlation_changes(first, second);

    let insights = generate_comparison_insights(
        row_count_percent_change,
        &only_in_first,
        &only_in_second,
        &column_changes,
        &correlation_changes,
    );

    ComparisonReport {
        common_columns: common,
        only_in_first,
        only_in_second,
        row_count_delta,
        row_count_percent_change,
        column_changes,
        correlation_changes,
        insights,
    }
}

fn percent_change(before: f64, after: f64) -> f64 {
    if before == 0.0 {
        0.0
    } else {
        (after - before) / before * 100.0
    }
}

fn column_change(name: &str, a: &ColumnStats, b: &ColumnStats) -> ColumnChange {
    let type_changed = a.r#type != b.r#type;
    let type_change_label = type_changed.then(|| format!("{:?}\u{2192}{:?}", a.r#type, b.r#type).to_lowercase());

    let missing_count_delta = b.missing_count as i64 - a.missing_count as i64;
    let missing_count_percent_change =
        percent_change(a.missing_count as f64, b.missing_count as f64);
    let unique_delta = b.unique as i64 - a.unique as i64;
    let unique_percent_change = percent_change(a.unique as f64, b.unique as f64);

    let mut change = ColumnChange {
        column: name.to_string(),
        type_changed,
        type_change_label,
        missing_count_delta,
        missing_count_percent_change,
        unique_delta,
        unique_percent_change,
        ..Default::default()
    };

    if let (ColumnType::Numeric, ColumnType::Numeric) = (a.r#type, b.r#type) {
        if let (Some(na), Some(nb)) = (&a.numeric, &b.numeric) {
            change.mean_delta = Some(nb.mean - na.mean);
            change.mean_percent_change = Some(percent_change(na.mean, nb.mean));
            change.std_dev_delta = Some(nb.std_dev - na.std_dev);
            change.min_delta = Some(nb.min - na.min);
            change.max_delta = Some(nb.max - na.max);
            change.range_delta = Some((nb.max - nb.min) - (na.max - na.min));
            change.outliers_delta = Some(nb.outliers as i64 - na.outliers as i64);
        }
    }

    if let (ColumnType::Categorical, ColumnType::Categorical) = (a.r#type, b.r#type) {
        if let (Some(ca), Some(cb)) = (&a.categorical, &b.categorical) {
            change.entropy_delta = Some(cb.entropy - ca.entropy);
            change.top_values_diff = Some(top_values_diff(&ca.top_values, &cb.top_values));
        }
    }

    change
}

fn top_values_diff(a: &[(String, u64)], b: &[(String, u64)]) -> Vec<TopValueDiff> {
    let mut values: Vec<String> = a.iter().map(|(v, _)| v.clone()).collect();
    for (v, _) in b {
        if !values.contains(v) {
            values.push(v.clone());
        }
    }

    values
        .into_iter()
        .map(|value| {
            let count_1 = a.iter().find(|(v, _)| v == &value).map(|(_, c)| *c).unwrap_or(0);
            let count_2 = b.iter().find(|(v, _)| v == &value).map(|(_, c)| *c).unwrap_or(0);
            let diff = count_2 as i64 - count_1 as i64;
            let percent_change = percent_change(count_1 as f64, count_2 as f64);
            let significant = percent_change.abs() > 20.0;
            TopValueDiff { value, count_1, count_2, diff, percent_change, significant }
        })
        .collect()
}

fn correlation_changes(first: &ProfileReport, second: &ProfileReport) -> CorrelationChanges {
    let mut added = Vec::new();
    let mut removed = Vec::new();
    let mut changed = Vec::new();

    let key = |a: &str, b: &str| (a.to_string(), b.to_string());

    for pair in &first.correlations.all {
        let found = second.correlations.all.iter().find(|p| p.column_a == pair.column_a && p.column_b == pair.column_b);
        match found {
            None => removed.push(key(&pair.column_a, &pair.column_b)),
            Some(other) => {
                let diff = other.r - pair.r;
                let sign_change = pair.r.signum() != other.r.signum() && pair.r != 0.0 && other.r != 0.0;
                changed.push(CorrelationChange {
                    column_a: pair.column_a.clone(),
                    column_b: pair.column_b.clone(),
                    r1: pair.r,
                    r2: other.r,
                    diff,
                    significant: diff.abs() > 0.2,
                    sign_change,
                });
            }
        }
    }

    for pair in &second.correlations.all {
        let exists_in_first =
            first.correlations.all.iter().any(|p| p.column_a == pair.column_a && p.column_b == pair.column_b);
        if !exists_in_first {
            added.push(key(&pair.column_a, &pair.column_b));
        }
    }

    CorrelationChanges { added, removed, changed }
}

fn generate_comparison_insights(
    row_count_percent_change: f64,
    only_in_first: &[String],
    only_in_second: &[String],
    column_changes: &[ColumnChange],
    correlation_changes: &CorrelationChanges,
) -> Vec<Insight> {
    let mut insights = Vec::new();
    let abs_row_change = row_count_percent_change.abs();

    if abs_row_change > 50.0 {
        insights.push(insight_of(
            "Dataset Size",
            format!("Row count changed by {row_count_percent_change:.1}%"),
            Severity::High,
        ));
    } else if abs_row_change > 20.0 {
        insights.push(insight_of(
            "Dataset Size",
            format!("Row count changed by {row_count_percent_change:.1}%"),
            Severity::Medium,
        ));
    }

    if !only_in_first.is_empty() || !only_in_second.is_empty() {
        insights.push(insight_of(
            "Schema",
            format!(
                "{} column(s) removed, {} column(s) added",
                only_in_first.len(),
                only_in_second.len()
            ),
            Severity::High,
        ));
    }

    let type_changed: Vec<&str> = column_changes.iter().filter(|c| c.type_changed).map(|c| c.column.as_str()).collect();
    if !type_changed.is_empty() {
        insights.push(insight_of(
            "Schema",
            format!("Column type changed for: {}", type_changed.join(", ")),
            Severity::High,
        ));
    }

    let missing_increased = column_changes.iter().filter(|c| c.missing_count_percent_change > 5.0).count();
    if missing_increased > 0 {
        insights.push(insight_of(
            "Data Quality",
            format!("{missing_increased} column(s) have an increased missing rate"),
            Severity::Medium,
        ));
    }

    let mean_shifted = column_changes
        .iter()
        .filter(|c| c.mean_percent_change.map(|p| p.abs() > 20.0).unwrap_or(false))
        .count();
    if mean_shifted > 0 {
        insights.push(insight_of(
            "Distribution",
            format!("{mean_shifted} numeric column(s) shifted mean by more than 20%"),
            Severity::Medium,
        ));
    }

    let significant_corr = correlation_changes.changed.iter().filter(|c| c.significant).count();
    if significant_corr > 0 {
        insights.push(insight_of(
            "Relationships",
            format!("{significant_corr} correlation pair(s) changed significantly"),
            Severity::Medium,
        ));
    }

    let sign_flips = correlation_changes.changed.iter().filter(|c| c.sign_change).count();
    if sign_flips > 0 {
        insights.push(insight_of(
            "Relationships",
            format!("{sign_flips} correlation pair(s) flipped sign"),
            Severity::High,
        ));
    }

    sort_insights(&mut insights);
    insights
}

fn insight_of(category: &str, message: String, severity: Severity) -> Insight {
    Insight { r#type: InsightType::Insight, category: category.to_string(), message, severity }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CorrelationPair, CorrelationPartitions, ProcessingTime, Summary};
    use std::collections::HashMap;

    fn report_with_pair(r: f64) -> ProfileReport {
        let pair = CorrelationPair { column_a: "u".to_string(), column_b: "v".to_string(), r, strength: r.abs(), sample_size: 10 };
        ProfileReport {
            summary: Summary {
                total_rows: 10,
                total_columns: 2,
                numeric_columns: 2,
                categorical_columns: 0,
                total_missing_values: 0,
                processing_time: ProcessingTime::new(1.0, 0.5, 0.5, 10, 2),
            },
            column_stats: HashMap::new(),
            correlations: CorrelationPartitions::from_all(vec![pair]),
            insights: vec![],
        }
    }

    #[test]
    fn sign_flip_is_flagged_as_high_severity_relationship_insight() {
        let first = report_with_pair(0.6);
        let second = report_with_pair(-0.5);
        let comparison = compare(&first, &second);
        assert_eq!(comparison.correlation_changes.changed.len(), 1);
        let change = &comparison.correlation_changes.changed[0];
        assert!(change.sign_change);
        assert!(comparison
            .insights
            .iter()
            .any(|i| i.category == "Relationships" && i.severity == Severity::High));
    }

    #[test]
    fn column_only_in_one_side_is_reported() {
        let mut first = report_with_pair(0.5);
        first.column_stats.insert("only_first".to_string(), ColumnStats::unknown("x"));
        let second = report_with_pair(0.5);
        let comparison = compare(&first, &second);
        assert_eq!(comparison.only_in_first, vec!["only_first".to_string()]);
        assert!(comparison.insights.iter().any(|i| i.category == "Schema"));
    }
}
