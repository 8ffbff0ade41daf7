use super::columns::{resolve_column, ColumnSpec};
use std::io::Read;

/// Header row plus string cells, as read from a CSV export.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, csv::Error> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);

        let headers = csv_reader
            .headers()?
            .iter()
            .map(|header| header.replace('\u{feff}', ""))
            .collect();

        let mut rows = Vec::new();
        for record in csv_reader.records() {
            let record = record?;
            if record.iter().all(|cell| cell.trim().is_empty()) {
                continue;
            }
            rows.push(record.iter().map(str::to_string).collect());
        }

        Ok(Self { headers, rows })
    }

    pub fn column(&self, spec: &ColumnSpec) -> Option<usize> {
        resolve_column(&self.headers, spec)
    }
}

/// Reads one cell, treating short rows as blanks.
pub(crate) fn cell(row: &[String], index: Option<usize>) -> &str {
    index
        .and_then(|index| row.get(index))
        .map(String::as_str)
        .unwrap_or("")
}
