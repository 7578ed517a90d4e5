use std::collections::HashMap;

use crate::models::Cell;

#[derive(Debug, thiserror::Error)]
pub enum CsvParseError {
    #[error("delimiter error: {0}")]
    Delimiter(String),
    #[error("csv contains no header row")]
    NoHeader,
}

/// Turns raw CSV text into the row-major record sequence `RecordView`
/// consumes. This is explicitly outside the profiling core's own scope —
/// the core accepts an already-parsed record stream — but the HTTP surface
/// still needs to get from request body to records somehow.
pub fn parse(content: &str, delimiter: char, skip_empty_lines: bool) -> Result<Vec<HashMap<String, Cell>>, CsvParseError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter as u8)
        .has_headers(true)
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| CsvParseError::Delimiter(e.to_string()))?
        .iter()
        .map(|h| h.to_string())
        .collect();
    if headers.is_empty() {
        return Err(CsvParseError::NoHeader);
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = match record {
            Ok(r) => r,
            Err(_) => continue,
        };

        if skip_empty_lines && record.iter().all(|f| f.trim().is_empty()) {
            continue;
        }

        let mut row = HashMap::with_capacity(headers.len());
        for (idx, header) in headers.iter().enumerate() {
            let raw = record.get(idx).unwrap_or("");
            row.insert(header.clone(), cell_from_str(raw));
        }
        rows.push(row);
    }

    Ok(rows)
}

fn cell_from_str(raw: &str) -> Cell {
    if raw.is_empty() {
        return Cell::Null;
    }
    match raw.parse::<f64>() {
        Ok(n) if n.is_finite() => Cell::Number(n),
        _ => Cell::Text(raw.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mixed_numeric_and_text_columns() {
        let rows = parse("a,b\n1,x\n2,y\n", ',', true).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("a"), Some(&Cell::Number(1.0)));
        assert_eq!(rows[0].get("b"), Some(&Cell::Text("x".to_string())));
    }

    #[test]
    fn empty_fields_become_null() {
        let rows = parse("a,b\n,y\n", ',', true).unwrap();
        assert_eq!(rows[0].get("a"), Some(&Cell::Null));
    }

    #[test]
    fn blank_lines_are_skipped_when_requested() {
        let rows = parse("a,b\n1,2\n,\n3,4\n", ',', true).unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn semicolon_delimiter_is_honored() {
        let rows = parse("a;b\n1;2\n", ';', true).unwrap();
        assert_eq!(rows[0].get("a"), Some(&Cell::Number(1.0)));
    }
}
