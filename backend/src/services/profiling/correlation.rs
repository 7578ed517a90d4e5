use crate::models::{CorrelationPair, CorrelationPartitions};
use crate::services::record_view::RecordView;

/// Pearson correlation coefficient over two series, computed prefix-aligned:
/// each column's own null-filtered numeric sequence, truncated to the
/// shorter of the two lengths, rather than paired by original row index.
/// Deliberately preserved this way; see DESIGN.md.
pub fn pearson(a: &[f64], b: &[f64]) -> Option<f64> {
    let n = a.len().min(b.len());
    if n < 3 {
        return None;
    }
    let a = &a[..n];
    let b = &b[..n];
    let n_f = n as f64;

    let mean_a = a.iter().sum::<f64>() / n_f;
    let mean_b = b.iter().sum::<f64>() / n_f;

    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for i in 0..n {
        let da = a[i] - mean_a;
        let db = b[i] - mean_b;
        cov += da * db;
        var_a += da * da;
        var_b += db * db;
    }

    let denom = (var_a * var_b).sqrt();
    if denom == 0.0 {
        return None;
    }
    let r = cov / denom;
    if r.is_nan() { None } else { Some(r.clamp(-1.0, 1.0)) }
}

/// Numeric cells of a column, nulls filtered out, in original row order —
/// the "internal null-filtered sequence" the engine pairs up prefix-wise.
pub fn numeric_series(view: &RecordView, column: &str) -> Vec<f64> {
    view.column(column)
        .map(|cells| cells.iter().filter_map(|c| c.as_number()).collect())
        .unwrap_or_default()
}

/// Computes every accepted pair among `numeric_columns`, sorted and
/// partitioned per the data model.
pub fn compute_pairs(view: &RecordView, numeric_columns: &[String]) -> CorrelationPartitions {
    let pairs = pairs_for(view, numeric_columns, 0, numeric_columns.len());
    CorrelationPartitions::from_all(pairs)
}

/// Computes pairs drawn only from the column-index range `[start, end)` of
/// `numeric_columns` against the full set — used when the engine shards
/// correlation work across the worker pool by column-pair range.
pub fn pairs_for(
    view: &RecordView,
    numeric_columns: &[String],
    start: usize,
    end: usize,
) -> Vec<CorrelationPair> {
    let mut pairs = Vec::new();
    let end = end.min(numeric_columns.len());
    for i in start..end {
        let a = &numeric_columns[i];
        let series_a = numeric_series(view, a);
        for b in &numeric_columns[i + 1..] {
            let series_b = numeric_series(view, b);
            if let Some(r) = pearson(&series_a, &series_b) {
                let sample_size = series_a.len().min(series_b.len());
                pairs.push(CorrelationPair {
                    column_a: a.clone(),
                    column_b: b.clone(),
                    r,
                    strength: r.abs(),
                    sample_size,
                });
            }
        }
    }
    pairs
}

/// Flat list of `(start, end)` index ranges over `numeric_columns`,
/// dividing the upper-triangular pair space into roughly `group_count`
/// equal-sized column ranges for the worker pool.
pub fn column_ranges(numeric_columns_len: usize, group_count: usize) -> Vec<(usize, usize)> {
    if numeric_columns_len == 0 || group_count == 0 {
        return vec![(0, numeric_columns_len)];
    }
    let chunk = (numeric_columns_len as f64 / group_count as f64).ceil() as usize;
    let chunk = chunk.max(1);
    let mut ranges = Vec::new();
    let mut start = 0;
    while start < numeric_columns_len {
        let end = (start + chunk).min(numeric_columns_len);
        ranges.push((start, end));
        start = end;
    }
    ranges
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Cell;
    use std::collections::HashMap;

    fn two_column_view(a: Vec<f64>, b: Vec<f64>) -> RecordView {
        let rows: Vec<HashMap<String, Cell>> = a
            .into_iter()
            .zip(b)
            .map(|(x, y)| HashMap::from([("a".to_string(), Cell::Number(x)), ("b".to_string(), Cell::Number(y))]))
            .collect();
        RecordView::from_rows(rows).unwrap()
    }

    #[test]
    fn perfectly_proportional_series_yields_correlation_of_one() {
        let view = two_column_view(vec![1.0, 2.0, 3.0, 4.0, 5.0], vec![2.0, 4.0, 6.0, 8.0, 10.0]);
        let partitions = compute_pairs(&view, &["a".to_string(), "b".to_string()]);
        assert_eq!(partitions.all.len(), 1);
        let pair = &partitions.all[0];
        assert!((pair.r - 1.0).abs() < 1e-12);
        assert_eq!(partitions.strong.len(), 1);
        assert_eq!(partitions.positive[0].r, pair.r);
    }

    #[test]
    fn fewer_than_three_observations_is_discarded() {
        let view = two_column_view(vec![1.0, 2.0], vec![2.0, 4.0]);
        let partitions = compute_pairs(&view, &["a".to_string(), "b".to_string()]);
        assert!(partitions.all.is_empty());
    }

    #[test]
    fn zero_variance_series_is_discarded() {
        let view = two_column_view(vec![1.0, 1.0, 1.0, 1.0], vec![1.0, 2.0, 3.0, 4.0]);
        let partitions = compute_pairs(&view, &["a".to_string(), "b".to_string()]);
        assert!(partitions.all.is_empty());
    }

    proptest::proptest! {
        /// Every accepted correlation pair obeys r in [-1, 1], strength = |r|,
        /// and a sample size floor of 3, regardless of the input series.
        #[test]
        fn accepted_pairs_satisfy_universal_invariants(
            a in proptest::collection::vec(-1000.0f64..1000.0, 0..100),
            b in proptest::collection::vec(-1000.0f64..1000.0, 0..100),
        ) {
            if let Some(r) = pearson(&a, &b) {
                prop_assert!(r >= -1.0 - 1e-9 && r <= 1.0 + 1e-9);
                prop_assert!(a.len().min(b.len()) >= 3);
            }
        }
    }
}
