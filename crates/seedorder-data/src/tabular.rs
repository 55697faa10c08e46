//! Tabular seed file loader
//!
//! Reads comma-separated seed files line by line. The first non-blank line
//! is the header; every following non-blank line becomes one typed row.
//! Rows whose field count differs from the header are dropped with a
//! warning instead of failing the load.

use seedorder_core::{CellValue, TabularRow};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, BufReader};

const FIELD_SEPARATOR: char = ',';
const QUOTE: char = '"';

/// Split one line into raw fields
///
/// A `"` toggles quoting; inside quotes a doubled `""` is a literal quote
/// and the separator is ordinary data. Fields are returned untrimmed.
pub fn split_fields(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            QUOTE if in_quotes && chars.peek() == Some(&QUOTE) => {
                current.push(QUOTE);
                chars.next();
            }
            QUOTE => in_quotes = !in_quotes,
            FIELD_SEPARATOR if !in_quotes => fields.push(std::mem::take(&mut current)),
            other => current.push(other),
        }
    }
    fields.push(current);

    fields
}

/// Incremental row builder fed one line at a time
#[derive(Debug, Default)]
struct RowAssembler {
    headers: Option<Vec<String>>,
    skipped: usize,
}

impl RowAssembler {
    /// Feed a line; returns a row once the header is known
    fn feed(&mut self, line: &str, source: &Path, line_no: usize) -> Option<TabularRow> {
        if line.trim().is_empty() {
            return None;
        }

        let values = split_fields(line);

        if self.headers.is_none() {
            let headers = values
                .iter()
                .map(|h| h.trim().trim_start_matches('\u{feff}').to_string())
                .collect();
            self.headers = Some(headers);
            return None;
        }
        let headers = self.headers.as_ref()?;

        if values.len() != headers.len() {
            tracing::warn!(
                file = %source.display(),
                line = line_no,
                data_columns = values.len(),
                header_columns = headers.len(),
                "skipping malformed row: data columns do not match header columns"
            );
            self.skipped += 1;
            return None;
        }

        let mut row = TabularRow::new();
        for (header, raw) in headers.iter().zip(values) {
            row.push(header.clone(), CellValue::coerce(&raw));
        }
        Some(row)
    }
}

/// Load every well-formed row of a seed file
pub async fn load_rows(path: &Path) -> Result<Vec<TabularRow>, LoadError> {
    let mut lines = open_lines(path).await?;
    let mut assembler = RowAssembler::default();
    let mut rows = Vec::new();
    let mut line_no = 0;

    while let Some(line) = lines.next_line().await.map_err(|e| LoadError::io(path, e))? {
        line_no += 1;
        if let Some(row) = assembler.feed(&line, path, line_no) {
            rows.push(row);
        }
    }

    tracing::debug!(
        file = %path.display(),
        rows = rows.len(),
        skipped = assembler.skipped,
        "loaded seed file"
    );

    Ok(rows)
}

/// Header plus rows rendered as display strings (null renders empty)
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Preview {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Read a seed file for display
///
/// Fails with [`LoadError::Empty`] when the file has no header or no
/// well-formed data rows.
pub async fn preview(path: &Path) -> Result<Preview, LoadError> {
    let rows = load_rows(path).await?;

    let Some(first) = rows.first() else {
        return Err(LoadError::Empty(path.to_path_buf()));
    };

    let headers: Vec<String> = first.columns().map(str::to_string).collect();
    let rows = rows
        .iter()
        .map(|row| row.values().map(CellValue::to_plain_string).collect())
        .collect();

    Ok(Preview { headers, rows })
}

async fn open_lines(
    path: &Path,
) -> Result<tokio::io::Lines<BufReader<tokio::fs::File>>, LoadError> {
    let file = tokio::fs::File::open(path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            LoadError::NotFound(path.to_path_buf())
        } else {
            LoadError::io(path, e)
        }
    })?;

    Ok(BufReader::new(file).lines())
}

/// Errors that can occur while reading a seed file
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("File not found at path: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Seed file {} is empty or has no data rows", .0.display())]
    Empty(PathBuf),

    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl LoadError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}
