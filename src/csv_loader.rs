//! CSV fixture reading.
//!
//! Row 0 is the header; every other row is passed to the server as text.

use csv::ReaderBuilder;
use std::path::Path;

use crate::error::{SqlError, SqlResult};
use crate::value::Value;

/// Header plus data rows of a CSV file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvFixture {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl CsvFixture {
    /// Rows converted to bound values, all as text.
    pub fn value_rows(&self) -> Vec<Vec<Value>> {
        self.rows
            .iter()
            .map(|row| row.iter().map(Value::from).collect())
            .collect()
    }

    /// Positional `source -> destination` pairs, truncated to the shorter list.
    pub fn mapping<'a>(&'a self, destination: &[&'a str]) -> Vec<(&'a str, &'a str)> {
        self.headers
            .iter()
            .map(String::as_str)
            .zip(destination.iter().copied())
            .collect()
    }
}

/// Render a column mapping as `a -> a, b -> b`.
pub fn describe_mapping(mapping: &[(&str, &str)]) -> String {
    mapping
        .iter()
        .map(|(src, dst)| format!("{} -> {}", src, dst))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Read a comma-delimited file with a header row.
pub fn read_csv(path: impl AsRef<Path>) -> SqlResult<CsvFixture> {
    let path = path.as_ref();
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(|e| SqlError::Csv(format!("{}: {}", path.display(), e)))?;

    let mut records = reader.records();
    let headers = match records.next() {
        Some(record) => record?.iter().map(|h| h.trim().to_string()).collect(),
        None => return Err(SqlError::Csv(format!("{}: file is empty", path.display()))),
    };

    let mut rows = Vec::new();
    for record in records {
        let record = record?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    tracing::debug!(path = %path.display(), rows = rows.len(), "read csv fixture");
    Ok(CsvFixture { headers, rows })
}
