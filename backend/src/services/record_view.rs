use std::collections::HashMap;
use std::sync::Arc;

use crate::models::Cell;

/// A read-only, column-major, random-access sequence of records.
///
/// Backed by an `Arc` so handing a view (or a slice of one) to worker-pool
/// chunks is a cheap pointer clone rather than a deep copy — chunks never
/// mutate their input, only ever read it. Column lookup is O(1) (`HashMap`),
/// row iteration is index-based and stable.
#[derive(Debug, Clone)]
pub struct RecordView {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    columns: Vec<String>,
    data: HashMap<String, Vec<Cell>>,
    len: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum RecordViewError {
    #[error("record view is empty")]
    Empty,
    #[error("row {row} has a different column shape than the first row")]
    InconsistentShape { row: usize },
}

impl RecordView {
    /// Builds a view from row-major records, validating column-shape
    /// consistency against the first row. Rows whose column *set* doesn't
    /// match the first row are a hard construction error — this is the
    /// "fails if ... its column shape is inconsistent across rows" contract,
    /// surfaced to the orchestrator before the engine ever runs.
    pub fn from_rows(rows: Vec<HashMap<String, Cell>>) -> Result<Self, RecordViewError> {
        if rows.is_empty() {
            return Err(RecordViewError::Empty);
        }

        let columns: Vec<String> = {
            let mut cols: Vec<String> = rows[0].keys().cloned().collect();
            cols.sort();
            cols
        };
        // Preserve first-row insertion order for the public column list,
        // but use the sorted copy above only to compare shape cheaply.
        let ordered_columns: Vec<String> = rows[0].keys().cloned().collect();

        let mut data: HashMap<String, Vec<Cell>> =
            ordered_columns.iter().map(|c| (c.clone(), Vec::with_capacity(rows.len()))).collect();

        for (idx, row) in rows.into_iter().enumerate() {
            let mut row_cols: Vec<String> = row.keys().cloned().collect();
            row_cols.sort();
            if row_cols != columns {
                return Err(RecordViewError::InconsistentShape { row: idx });
            }
            let mut row = row;
            for col in &ordered_columns {
                let cell = row.remove(col).unwrap_or(Cell::Null);
                data.get_mut(col).unwrap().push(cell);
            }
        }

        let len = data.values().next().map(|v| v.len()).unwrap_or(0);
        Ok(Self { inner: Arc::new(Inner { columns: ordered_columns, data, len }) })
    }

    pub fn len(&self) -> usize {
        self.inner.len
    }

    pub fn is_empty(&self) -> bool {
        self.inner.len == 0
    }

    pub fn column_names(&self) -> &[String] {
        &self.inner.columns
    }

    pub fn num_columns(&self) -> usize {
        self.inner.columns.len()
    }

    pub fn column(&self, name: &str) -> Option<&[Cell]> {
        self.inner.data.get(name).map(|v| v.as_slice())
    }

    /// Builds a new view containing only the given row indices, in the order
    /// given. Used by the sampling service; indices are not required to be
    /// sorted or contiguous (stratified sampling interleaves partitions).
    pub fn subset(&self, indices: &[usize]) -> RecordView {
        let data: HashMap<String, Vec<Cell>> = self
            .inner
            .columns
            .iter()
            .map(|col| {
                let source = &self.inner.data[col];
                let values = indices.iter().map(|&i| source[i].clone()).collect();
                (col.clone(), values)
            })
            .collect();
        RecordView {
            inner: Arc::new(Inner { columns: self.inner.columns.clone(), data, len: indices.len() }),
        }
    }

    /// Contiguous chunk `[start, end)`, used by the worker pool's default
    /// row-chunking strategy.
    pub fn slice(&self, start: usize, end: usize) -> RecordView {
        let end = end.min(self.inner.len);
        let indices: Vec<usize> = (start..end).collect();
        self.subset(&indices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, Cell)]) -> HashMap<String, Cell> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn empty_input_is_rejected() {
        let err = RecordView::from_rows(vec![]).unwrap_err();
        assert!(matches!(err, RecordViewError::Empty));
    }

    #[test]
    fn inconsistent_shape_is_rejected() {
        let rows = vec![
            row(&[("a", Cell::Number(1.0)), ("b", Cell::Number(2.0))]),
            row(&[("a", Cell::Number(1.0))]),
        ];
        let err = RecordView::from_rows(rows).unwrap_err();
        assert!(matches!(err, RecordViewError::InconsistentShape { row: 1 }));
    }

    #[test]
    fn column_lookup_preserves_order() {
        let rows = vec![
            row(&[("a", Cell::Number(1.0)), ("b", Cell::Text("x".into()))]),
            row(&[("a", Cell::Number(2.0)), ("b", Cell::Text("y".into()))]),
        ];
        let view = RecordView::from_rows(rows).unwrap();
        assert_eq!(view.len(), 2);
        assert_eq!(view.column("a").unwrap(), &[Cell::Number(1.0), Cell::Number(2.0)]);
        assert_eq!(view.column("b").unwrap()[1], Cell::Text("y".into()));
    }

    #[test]
    fn subset_preserves_requested_order() {
        let rows = (0..5)
            .map(|i| row(&[("a", Cell::Number(i as f64))]))
            .collect();
        let view = RecordView::from_rows(rows).unwrap();
        let sub = view.subset(&[3, 1]);
        assert_eq!(sub.column("a").unwrap(), &[Cell::Number(3.0), Cell::Number(1.0)]);
    }
}
