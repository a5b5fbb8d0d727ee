//! Report export: laid-out report sheets to an in-memory .xlsx artifact.

use std::path::Path;

use dmfr_core::{ColumnFormat, ReportSheet, RowKind, Value};
use rust_xlsxwriter::{Format, FormatAlign, FormatBorder, Workbook, Worksheet};

use crate::sheet_name::SheetNamer;

pub const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
pub const REPORT_FILE_NAME: &str = "updated_data.xlsx";
const PERCENT_FORMAT: &str = "0.00%";

/// A finished workbook ready for download or persistence.
#[derive(Debug, Clone)]
pub struct ReportArtifact {
    pub file_name: String,
    pub mime: &'static str,
    pub bytes: Vec<u8>,
    /// Final (sanitized) sheet names, in workbook order.
    pub sheet_names: Vec<String>,
}

impl ReportArtifact {
    /// Write the artifact next to `path` first, then move it into place, so
    /// a failed write never leaves a partial report behind.
    pub fn persist(&self, path: &Path) -> Result<(), String> {
        let partial = path.with_extension("xlsx.partial");
        std::fs::write(&partial, &self.bytes)
            .map_err(|e| format!("Failed to write '{}': {}", partial.display(), e))?;
        std::fs::rename(&partial, path).map_err(|e| {
            let _ = std::fs::remove_file(&partial);
            format!("Failed to move report into '{}': {}", path.display(), e)
        })
    }
}

/// Cell formats shared by every sheet of one export.
struct Formats {
    header: Format,
    emphasis: Format,
    percent: Format,
    total: Format,
    total_percent: Format,
}

impl Formats {
    fn new() -> Self {
        Self {
            header: Format::new().set_bold(),
            emphasis: Format::new()
                .set_bold()
                .set_text_wrap()
                .set_align(FormatAlign::Top)
                .set_border(FormatBorder::Thin),
            percent: Format::new().set_num_format(PERCENT_FORMAT),
            total: Format::new().set_bold(),
            total_percent: Format::new().set_bold().set_num_format(PERCENT_FORMAT),
        }
    }

    fn for_cell(&self, kind: RowKind, column: ColumnFormat) -> Option<&Format> {
        match (kind, column) {
            (RowKind::Header, _) => Some(&self.header),
            (RowKind::EmphasisHeader, _) => Some(&self.emphasis),
            (RowKind::Total | RowKind::GrandTotal, ColumnFormat::Percent) => Some(&self.total_percent),
            (RowKind::Total | RowKind::GrandTotal, ColumnFormat::General) => Some(&self.total),
            (RowKind::Data, ColumnFormat::Percent) => Some(&self.percent),
            (RowKind::Data, ColumnFormat::General) | (RowKind::Blank, _) => None,
        }
    }
}

/// Render report sheets into one workbook. Sheet names are made
/// Excel-safe and unique on the way.
pub fn write_report(sheets: &[ReportSheet], file_name: &str) -> Result<ReportArtifact, String> {
    let mut workbook = Workbook::new();
    let formats = Formats::new();
    let mut namer = SheetNamer::new();
    let mut sheet_names = Vec::with_capacity(sheets.len());

    for sheet in sheets {
        let name = namer.assign(&sheet.name);
        let worksheet = workbook
            .add_worksheet()
            .set_name(&name)
            .map_err(|e| format!("Failed to create sheet '{}': {}", name, e))?;
        write_sheet(worksheet, sheet, &formats)?;
        if name != sheet.name {
            tracing::debug!(original = %sheet.name, name = %name, "renamed sheet");
        }
        sheet_names.push(name);
    }

    let bytes = workbook
        .save_to_buffer()
        .map_err(|e| format!("Failed to save XLSX report: {}", e))?;

    tracing::info!(sheets = sheet_names.len(), bytes = bytes.len(), "rendered report");
    Ok(ReportArtifact {
        file_name: file_name.to_string(),
        mime: XLSX_MIME,
        bytes,
        sheet_names,
    })
}

fn write_sheet(worksheet: &mut Worksheet, sheet: &ReportSheet, formats: &Formats) -> Result<(), String> {
    for (row_idx, row) in sheet.rows.iter().enumerate() {
        let row32 = u32::try_from(row_idx)
            .map_err(|_| format!("Sheet '{}' has too many rows", sheet.name))?;
        for (col_idx, value) in row.cells.iter().enumerate() {
            let col16 = u16::try_from(col_idx)
                .map_err(|_| format!("Sheet '{}' has too many columns", sheet.name))?;
            let format = formats.for_cell(row.kind, sheet.column_format(col_idx));
            write_cell(worksheet, row32, col16, value, format)
                .map_err(|e| format!("Failed to write cell ({}, {}) in '{}': {}", row_idx, col_idx, sheet.name, e))?;
        }
    }
    Ok(())
}

/// Missing values and non-finite numbers become blank cells.
fn write_cell(
    worksheet: &mut Worksheet,
    row: u32,
    col: u16,
    value: &Value,
    format: Option<&Format>,
) -> Result<(), rust_xlsxwriter::XlsxError> {
    match (value, format) {
        (Value::Number(n), Some(f)) if n.is_finite() => {
            worksheet.write_number_with_format(row, col, *n, f)?;
        }
        (Value::Number(n), None) if n.is_finite() => {
            worksheet.write_number(row, col, *n)?;
        }
        (Value::Text(s), Some(f)) => {
            worksheet.write_string_with_format(row, col, s, f)?;
        }
        (Value::Text(s), None) => {
            worksheet.write_string(row, col, s)?;
        }
        (Value::Bool(b), Some(f)) => {
            worksheet.write_boolean_with_format(row, col, *b, f)?;
        }
        (Value::Bool(b), None) => {
            worksheet.write_boolean(row, col, *b)?;
        }
        (_, Some(f)) => {
            worksheet.write_blank(row, col, f)?;
        }
        (_, None) => {}
    }
    Ok(())
}
