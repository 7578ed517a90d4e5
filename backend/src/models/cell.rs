use serde::{Deserialize, Serialize};

/// A single value in a parsed record.
///
/// Mirrors the dynamic `null | number | string` union the source product
/// passes around: a cell is either absent, a finite number, or text. There is
/// no separate "undefined" variant — callers that need to distinguish
/// "column absent from this row" from "value is null" do so before
/// constructing a [`Cell`]; by the time a row reaches the engine, both
/// collapse to `Cell::Null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Null,
    Number(f64),
    Text(String),
}

impl Cell {
    /// A cell counts as "missing" for profiling purposes when it is null or
    /// an empty string — not just when it's the null variant.
    pub fn is_missing(&self) -> bool {
        match self {
            Cell::Null => true,
            Cell::Text(s) => s.is_empty(),
            Cell::Number(_) => false,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(n) if n.is_finite() => Some(*n),
            _ => None,
        }
    }

    /// Stringified representation used for categorical frequency counting and
    /// stratification keys. Numbers are rendered without a trailing `.0` for
    /// integral values so `1` and `1.0` count as the same category.
    pub fn display_string(&self) -> String {
        match self {
            Cell::Null => "null".to_string(),
            Cell::Text(s) => s.clone(),
            Cell::Number(n) => format_number(*n),
        }
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

impl From<f64> for Cell {
    fn from(n: f64) -> Self {
        Cell::Number(n)
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

impl From<String> for Cell {
    fn from(s: String) -> Self {
        Cell::Text(s)
    }
}
