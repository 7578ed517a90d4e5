use std::collections::HashMap;

use crate::models::{ColumnStats, ColumnType, CorrelationPartitions, Insight, InsightType, Severity, sort_insights};

fn warn(category: &str, message: String, severity: Severity) -> Insight {
    Insight { r#type: InsightType::Warning, category: category.to_string(), message, severity }
}

fn info(category: &str, message: String, severity: Severity) -> Insight {
    Insight { r#type: InsightType::Info, category: category.to_string(), message, severity }
}

fn insight(category: &str, message: String, severity: Severity) -> Insight {
    Insight { r#type: InsightType::Insight, category: category.to_string(), message, severity }
}

/// Per-column and global rule-derived insights, sorted high-severity-first.
pub fn generate_insights(
    column_stats: &HashMap<String, ColumnStats>,
    correlations: &CorrelationPartitions,
) -> Vec<Insight> {
    let mut insights = Vec::new();

    for (name, stats) in column_stats {
        if stats.missing_percent > 30.0 {
            insights.push(warn(
                "Data Quality",
                format!("Column '{name}' has {:.1}% missing values", stats.missing_percent),
                Severity::High,
            ));
        }

        if stats.r#type == ColumnType::Numeric {
            if let Some(numeric) = &stats.numeric {
                if numeric.outliers > 0 {
                    insights.push(info(
                        "Outliers",
                        format!("Column '{name}' has {} outlier value(s)", numeric.outliers),
                        Severity::Medium,
                    ));
                }
                if numeric.std_dev == 0.0 {
                    insights.push(warn(
                        "Data Quality",
                        format!("Column '{name}' has zero variance (constant value)"),
                        Severity::High,
                    ));
                }
            }
        }

        if stats.r#type == ColumnType::Categorical {
            if stats.unique == 1 {
                insights.push(warn(
                    "Feature Engineering",
                    format!("Column '{name}' is a constant column"),
                    Severity::High,
                ));
            }
            if stats.unique == stats.valid_count && stats.valid_count > 0 {
                insights.push(info(
                    "Feature Engineering",
                    format!("Column '{name}' looks like a unique identifier"),
                    Severity::Low,
                ));
            }
            if stats.unique_percent > 90.0 && stats.unique > 100 {
                insights.push(info(
                    "Feature Engineering",
                    format!("Column '{name}' has high cardinality ({} distinct values)", stats.unique),
                    Severity::Medium,
                ));
            }
        }
    }

    if !correlations.strong.is_empty() {
        insights.push(insight(
            "Multicollinearity",
            format!("{} strongly correlated column pair(s) detected", correlations.strong.len()),
            Severity::Medium,
        ));
    }

    let numeric_missing_percents: Vec<f64> = column_stats
        .values()
        .filter(|s| s.r#type == ColumnType::Numeric)
        .map(|s| s.missing_percent)
        .collect();
    if !numeric_missing_percents.is_empty() {
        let avg = numeric_missing_percents.iter().sum::<f64>() / numeric_missing_percents.len() as f64;
        if avg > 15.0 {
            insights.push(warn(
                "Data Quality",
                format!("Numeric columns average {avg:.1}% missing values"),
                Severity::High,
            ));
        }
    }

    sort_insights(&mut insights);
    insights
}
