//! Typed cells and rows produced by the tabular loader

use serde::{Deserialize, Serialize};

/// A single scalar cell value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl CellValue {
    /// Coerce a raw field into a typed value
    ///
    /// Precedence: `NULL` or empty → null, numeric → number,
    /// `true`/`false` (any case) → bool, anything else → trimmed text.
    pub fn coerce(raw: &str) -> Self {
        let value = raw.trim();

        if value.is_empty() || value == "NULL" {
            return Self::Null;
        }

        if let Some(number) = parse_number(value) {
            return Self::Number(number);
        }

        if value.eq_ignore_ascii_case("true") {
            Self::Bool(true)
        } else if value.eq_ignore_ascii_case("false") {
            Self::Bool(false)
        } else {
            Self::Text(value.to_string())
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Render as plain text, with null as the empty string
    pub fn to_plain_string(&self) -> String {
        match self {
            Self::Null => String::new(),
            other => other.to_string(),
        }
    }
}

impl std::fmt::Display for CellValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            Self::Number(n) => write!(f, "{}", n),
            Self::Text(s) => write!(f, "{}", s),
        }
    }
}

/// Decimal literal parsing
///
/// Only plain decimal notation is accepted (optional sign, digits, one
/// optional fraction, optional exponent). Words such as `inf` or `NaN`
/// stay text.
fn parse_number(value: &str) -> Option<f64> {
    let digits = value.strip_prefix(['+', '-']).unwrap_or(value);
    let starts_numeric = digits
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_digit() || c == '.');

    if !starts_numeric {
        return None;
    }

    value.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// One data row: columns in header order with their coerced values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TabularRow {
    cells: Vec<(String, CellValue)>,
}

impl TabularRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, column: impl Into<String>, value: CellValue) {
        self.cells.push((column.into(), value));
    }

    /// Builder-style variant of [`TabularRow::push`]
    pub fn with(mut self, column: impl Into<String>, value: CellValue) -> Self {
        self.push(column, value);
        self
    }

    /// Replace the value of an existing column, or append it
    pub fn set(&mut self, column: &str, value: CellValue) {
        match self.cells.iter_mut().find(|(c, _)| c == column) {
            Some((_, existing)) => *existing = value,
            None => self.cells.push((column.to_string(), value)),
        }
    }

    pub fn get(&self, column: &str) -> Option<&CellValue> {
        self.cells.iter().find(|(c, _)| c == column).map(|(_, v)| v)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(c, _)| c.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &CellValue> {
        self.cells.iter().map(|(_, v)| v)
    }

    pub fn cells(&self) -> &[(String, CellValue)] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}
