// Workbook I/O: sheet import through calamine, report export through
// rust_xlsxwriter.

pub mod cache;
pub mod sheet_name;
pub mod workbook;
pub mod xlsx;

pub use cache::SheetCache;
pub use workbook::WorkbookSource;
pub use xlsx::{write_report, ReportArtifact, REPORT_FILE_NAME, XLSX_MIME};
