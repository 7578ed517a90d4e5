use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};

use crate::models::{CategoricalStats, Cell, ColumnStats, ColumnType, NumericStats};
use crate::services::record_view::RecordView;

/// Profiles a single column, catching any panic raised while doing so and
/// converting it into an `{type: unknown, error}` stats record — a single
/// bad column must never fail the surrounding request.
pub fn profile_column_safe(view: &RecordView, column: &str) -> ColumnStats {
    match panic::catch_unwind(AssertUnwindSafe(|| profile_column(view, column))) {
        Ok(stats) => stats,
        Err(payload) => {
            let message = panic_message(payload);
            tracing::warn!(column, error = %message, "column profiling failed");
            ColumnStats::unknown(message)
        }
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown error".to_string()
    }
}

fn profile_column(view: &RecordView, column: &str) -> ColumnStats {
    let all_values = view.column(column).expect("column must exist in view");
    let total_count = all_values.len();

    let non_null: Vec<&Cell> = all_values.iter().filter(|c| !c.is_missing()).collect();
    let valid_count = non_null.len();
    let missing_count = total_count - valid_count;
    let missing_percent = if total_count > 0 {
        missing_count as f64 / total_count as f64 * 100.0
    } else {
        0.0
    };

    let numeric_values: Vec<f64> = non_null.iter().filter_map(|c| c.as_number()).collect();
    let n_v = valid_count;
    let n_n = numeric_values.len();
    let column_type = if n_n > 0 && n_v > 0 && (n_n as f64 / n_v as f64) > 0.5 {
        ColumnType::Numeric
    } else {
        ColumnType::Categorical
    };

    let unique = match column_type {
        ColumnType::Numeric => count_unique_numeric(&numeric_values),
        _ => count_unique_strings(&non_null),
        // Unknown is never produced here; panics are the only path to it.
    };
    let unique_percent = if valid_count > 0 { unique as f64 / valid_count as f64 * 100.0 } else { 0.0 };

    let (numeric, categorical) = match column_type {
        ColumnType::Numeric => (Some(numeric_stats(&numeric_values)), None),
        ColumnType::Categorical => (None, Some(categorical_stats(&non_null))),
        ColumnType::Unknown => (None, None),
    };

    ColumnStats {
        r#type: column_type,
        total_count,
        valid_count,
        missing_count,
        missing_percent,
        unique,
        unique_percent,
        numeric,
        categorical,
        error: None,
    }
}

fn count_unique_numeric(values: &[f64]) -> usize {
    let mut seen = std::collections::HashSet::with_capacity(values.len());
    for v in values {
        seen.insert(v.to_bits());
    }
    seen.len()
}

fn count_unique_strings(values: &[&Cell]) -> usize {
    let mut seen = std::collections::HashSet::with_capacity(values.len());
    for v in values {
        seen.insert(v.display_string());
    }
    seen.len()
}

fn percentile_sorted(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    if sorted.len() == 1 {
        return sorted[0];
    }
    let idx = p * (sorted.len() - 1) as f64;
    let lower = idx.floor() as usize;
    let upper = idx.ceil() as usize;
    if lower == upper {
        sorted[lower]
    } else {
        let frac = idx - lower as f64;
        sorted[lower] + frac * (sorted[upper] - sorted[lower])
    }
}

fn numeric_stats(values: &[f64]) -> NumericStats {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let std_dev = variance.sqrt();

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let min = sorted[0];
    let max = sorted[sorted.len() - 1];
    let q1 = percentile_sorted(&sorted, 0.25);
    let median = percentile_sorted(&sorted, 0.5);
    let q3 = percentile_sorted(&sorted, 0.75);
    let iqr = q3 - q1;

    let lower_bound = q1 - 1.5 * iqr;
    let upper_bound = q3 + 1.5 * iqr;
    let outliers = values.iter().filter(|&&v| v < lower_bound || v > upper_bound).count();

    let (skewness, excess_kurtosis) = if std_dev == 0.0 {
        (0.0, 0.0)
    } else {
        let skew = values.iter().map(|v| ((v - mean) / std_dev).powi(3)).sum::<f64>() / n;
        let kurt = values.iter().map(|v| ((v - mean) / std_dev).powi(4)).sum::<f64>() / n - 3.0;
        (skew, kurt)
    };

    let mode = numeric_mode(values);

    NumericStats {
        min,
        max,
        mean,
        median,
        mode,
        variance,
        std_dev,
        q1,
        q3,
        iqr,
        outliers,
        skewness,
        excess_kurtosis,
    }
}

/// Most frequent value over the numeric multiset directly — never through a
/// string conversion, which would be locale-dependent. Ties broken by
/// first-seen order.
fn numeric_mode(values: &[f64]) -> f64 {
    let mut counts: HashMap<u64, (f64, u64, usize)> = HashMap::new();
    for (idx, &v) in values.iter().enumerate() {
        let key = v.to_bits();
        let entry = counts.entry(key).or_insert((v, 0, idx));
        entry.1 += 1;
    }
    counts
        .values()
        .max_by(|a, b| a.1.cmp(&b.1).then(b.2.cmp(&a.2)))
        .map(|(v, _, _)| *v)
        .unwrap_or(0.0)
}

fn categorical_stats(values: &[&Cell]) -> CategoricalStats {
    let mut counts: HashMap<String, (u64, usize)> = HashMap::new();
    for (idx, v) in values.iter().enumerate() {
        let key = v.display_string();
        let entry = counts.entry(key).or_insert((0, idx));
        entry.0 += 1;
    }

    let mut entries: Vec<(String, u64, usize)> =
        counts.into_iter().map(|(k, (count, first_seen))| (k, count, first_seen)).collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));

    let total = values.len() as f64;
    let entropy = entries
        .iter()
        .map(|(_, count, _)| {
            let p = *count as f64 / total;
            -p * p.log2()
        })
        .sum::<f64>();

    let top_values: Vec<(String, u64)> =
        entries.iter().take(10).map(|(k, c, _)| (k.clone(), *c)).collect();

    let (mode, mode_count) = entries
        .first()
        .map(|(k, c, _)| (k.clone(), *c))
        .unwrap_or_else(|| (String::new(), 0));
    let mode_percent = if total > 0.0 { mode_count as f64 / total * 100.0 } else { 0.0 };

    CategoricalStats { top_values, mode, mode_count, mode_percent, entropy }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap as Map;

    fn view_from(column: &str, values: Vec<Cell>) -> RecordView {
        let rows: Vec<Map<String, Cell>> =
            values.into_iter().map(|v| Map::from([(column.to_string(), v)])).collect();
        RecordView::from_rows(rows).unwrap()
    }

    #[test]
    fn small_numeric_column_matches_hand_computed_stats() {
        let values = vec![1.0, 2.0, 3.0, 4.0, 5.0].into_iter().map(Cell::Number).collect();
        let view = view_from("x", values);
        let stats = profile_column_safe(&view, "x");
        assert_eq!(stats.r#type, ColumnType::Numeric);
        assert_eq!(stats.total_count, 5);
        assert_eq!(stats.valid_count, 5);
        assert_eq!(stats.missing_count, 0);
        assert_eq!(stats.unique, 5);
        let n = stats.numeric.unwrap();
        assert!((n.mean - 3.0).abs() < 1e-9);
        assert!((n.variance - 2.0).abs() < 1e-9);
        assert!((n.std_dev - 1.4142135623730951).abs() < 1e-9);
        assert!((n.median - 3.0).abs() < 1e-9);
        assert!((n.q1 - 2.0).abs() < 1e-9);
        assert!((n.q3 - 4.0).abs() < 1e-9);
        assert!((n.iqr - 2.0).abs() < 1e-9);
        assert_eq!(n.min, 1.0);
        assert_eq!(n.max, 5.0);
        assert_eq!(n.outliers, 0);
        assert!(n.skewness.abs() < 1e-9);
        assert!((n.excess_kurtosis - (-1.3)).abs() < 1e-9);
    }

    #[test]
    fn categorical_column_with_clear_mode_and_entropy() {
        let values =
            vec!["a", "a", "a", "b", "c"].into_iter().map(|s| Cell::Text(s.into())).collect();
        let view = view_from("c", values);
        let stats = profile_column_safe(&view, "c");
        assert_eq!(stats.r#type, ColumnType::Categorical);
        assert_eq!(stats.unique, 3);
        assert!((stats.unique_percent - 60.0).abs() < 1e-9);
        let cat = stats.categorical.unwrap();
        assert_eq!(cat.mode, "a");
        assert_eq!(cat.mode_count, 3);
        assert!((cat.mode_percent - 60.0).abs() < 1e-9);
        assert_eq!(cat.top_values[0], ("a".to_string(), 3));
        let expected_entropy = -(0.6 * 0.6_f64.log2() + 0.2 * 0.2_f64.log2() + 0.2 * 0.2_f64.log2());
        assert!((cat.entropy - expected_entropy).abs() < 1e-9);
    }

    #[test]
    fn iqr_bounds_flag_a_single_extreme_value() {
        let values = vec![1.0, 1.0, 2.0, 2.0, 3.0, 3.0, 4.0, 4.0, 100.0]
            .into_iter()
            .map(Cell::Number)
            .collect();
        let view = view_from("y", values);
        let stats = profile_column_safe(&view, "y");
        let n = stats.numeric.unwrap();
        assert!((n.q1 - 1.5).abs() < 1e-9);
        assert!((n.q3 - 3.5).abs() < 1e-9);
        assert!((n.iqr - 2.0).abs() < 1e-9);
        assert_eq!(n.outliers, 1);
    }

    #[test]
    fn all_nulls_resolves_categorical_with_zero_entropy() {
        let values = vec![Cell::Null, Cell::Null, Cell::Null];
        let view = view_from("z", values);
        let stats = profile_column_safe(&view, "z");
        assert_eq!(stats.r#type, ColumnType::Categorical);
        assert_eq!(stats.valid_count, 0);
        assert_eq!(stats.unique, 0);
        let cat = stats.categorical.unwrap();
        assert_eq!(cat.entropy, 0.0);
    }

    #[test]
    fn constant_numeric_column_has_zero_variance() {
        let values = vec![Cell::Number(5.0); 10];
        let view = view_from("k", values);
        let stats = profile_column_safe(&view, "k");
        let n = stats.numeric.unwrap();
        assert_eq!(n.std_dev, 0.0);
        assert_eq!(n.skewness, 0.0);
        assert_eq!(n.excess_kurtosis, 0.0);
        assert_eq!(n.outliers, 0);
    }

    #[test]
    fn single_row_view_has_zero_variance_and_no_outliers() {
        let values = vec![Cell::Number(42.0)];
        let view = view_from("single", values);
        let stats = profile_column_safe(&view, "single");
        let n = stats.numeric.unwrap();
        assert_eq!(n.variance, 0.0);
        assert_eq!(n.outliers, 0);
        assert_eq!(n.median, 42.0);
    }

    proptest::proptest! {
        /// Universal invariants over any numeric column: the spread
        /// ordering holds, variance never goes negative, and outliers never
        /// exceed the valid count.
        #[test]
        fn numeric_stats_satisfy_universal_invariants(
            values in proptest::collection::vec(-1.0e6f64..1.0e6, 2..200),
        ) {
            let cells = values.into_iter().map(Cell::Number).collect();
            let view = view_from("v", cells);
            let stats = profile_column_safe(&view, "v");
            prop_assert_eq!(stats.missing_count + stats.valid_count, stats.total_count);
            prop_assert!(stats.missing_percent >= 0.0 && stats.missing_percent <= 100.0);
            prop_assert!(stats.unique <= stats.valid_count);

            if let Some(n) = stats.numeric {
                prop_assert!(n.min <= n.q1 + 1e-9);
                prop_assert!(n.q1 <= n.median + 1e-9);
                prop_assert!(n.median <= n.q3 + 1e-9);
                prop_assert!(n.q3 <= n.max + 1e-9);
                prop_assert!(n.variance >= 0.0);
                prop_assert!((n.std_dev * n.std_dev - n.variance).abs() < 1e-6);
                prop_assert!(n.outliers <= stats.valid_count);
            }
        }

        /// Entropy of a categorical column is bounded by log2(unique count),
        /// with the degenerate single-category case landing at zero.
        #[test]
        fn categorical_entropy_is_bounded_by_log2_unique(
            values in proptest::collection::vec("[a-e]", 1..200),
        ) {
            let cells = values.into_iter().map(|s| Cell::Text(s)).collect();
            let view = view_from("c", cells);
            let stats = profile_column_safe(&view, "c");
            if let Some(cat) = stats.categorical {
                let max_entropy = (stats.unique.max(1) as f64).log2();
                prop_assert!(cat.entropy >= -1e-9);
                prop_assert!(cat.entropy <= max_entropy + 1e-9);
            }
        }
    }
}
