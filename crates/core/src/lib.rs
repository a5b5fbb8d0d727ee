//! `dmfr-core`: shared tabular types.
//!
//! `table` is the input side: sheets of rows with named columns.
//! `report` is the output side: rows tagged with how they should be rendered.

pub mod report;
pub mod table;

pub use report::{ColumnFormat, ReportRow, ReportSheet, RowKind};
pub use table::{SheetSet, Table, Value};
