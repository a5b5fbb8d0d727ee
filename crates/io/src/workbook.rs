//! Workbook import (xlsx, xls, xlsb, ods) into header + rows tables.

use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;

use calamine::{open_workbook_auto_from_rs, Data, Reader, Sheets};
use dmfr_core::{Table, Value};

/// A workbook held in memory, identified by the BLAKE3 hash of its bytes.
#[derive(Debug, Clone)]
pub struct WorkbookSource {
    bytes: Vec<u8>,
    identity: String,
}

impl WorkbookSource {
    pub fn open(path: &Path) -> Result<Self, String> {
        let bytes = std::fs::read(path)
            .map_err(|e| format!("Failed to read workbook '{}': {}", path.display(), e))?;
        Ok(Self::from_bytes(bytes))
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        let identity = blake3::hash(&bytes).to_hex().to_string();
        Self {
            bytes,
            identity,
        }
    }

    /// Hex BLAKE3 hash of the workbook bytes.
    pub fn identity(&self) -> &str {
        &self.identity
    }

    fn reader(&self) -> Result<Sheets<Cursor<&[u8]>>, String> {
        open_workbook_auto_from_rs(Cursor::new(self.bytes.as_slice()))
            .map_err(|e| format!("Failed to open workbook: {}", e))
    }

    /// Sheet names in workbook order.
    pub fn sheet_names(&self) -> Result<Vec<String>, String> {
        let names = self.reader()?.sheet_names();
        if names.is_empty() {
            return Err("Workbook contains no sheets".to_string());
        }
        Ok(names)
    }

    /// Read one sheet. The first row holds the column headers; fully empty
    /// rows below it are skipped.
    pub fn read_sheet(&self, name: &str) -> Result<Table, String> {
        let mut workbook = self.reader()?;
        let range = workbook
            .worksheet_range(name)
            .map_err(|e| format!("Failed to read sheet '{}': {}", name, e))?;

        let mut rows = range.rows();
        let headers = match rows.next() {
            Some(header_row) => header_names(header_row),
            None => Vec::new(),
        };

        let mut table = Table::new(name, headers);
        for row in rows {
            let cells: Vec<Value> = row.iter().map(cell_value).collect();
            if cells.iter().all(Value::is_missing) {
                continue;
            }
            table.push_row(cells);
        }

        tracing::debug!(sheet = name, rows = table.len(), columns = table.width(), "read sheet");
        Ok(table)
    }
}

/// Convert one calamine cell. Dates stay as their serial number.
pub fn cell_value(cell: &Data) -> Value {
    match cell {
        Data::Empty => Value::Empty,
        Data::String(s) if s.is_empty() => Value::Empty,
        Data::String(s) => Value::Text(s.clone()),
        Data::Float(n) => Value::Number(*n),
        Data::Int(n) => Value::Number(*n as f64),
        Data::Bool(b) => Value::Bool(*b),
        Data::DateTime(dt) => Value::Number(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Value::Text(s.clone()),
        Data::Error(e) => Value::Text(format!("#{:?}", e)),
    }
}

/// Header row to column names. Blank headers become `Unnamed: {index}`;
/// repeated names get `.1`, `.2`, ... suffixes.
pub fn header_names(row: &[Data]) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut names = Vec::with_capacity(row.len());
    for (idx, cell) in row.iter().enumerate() {
        let raw = cell_value(cell).to_string();
        let base = if raw.trim().is_empty() {
            format!("Unnamed: {idx}")
        } else {
            raw
        };

        let mut name = base.clone();
        while let Some(count) = seen.get_mut(&name) {
            *count += 1;
            name = format!("{base}.{count}");
        }
        seen.insert(name.clone(), 0);
        names.push(name);
    }
    names
}
