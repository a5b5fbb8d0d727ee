use crate::table::{Table, Value};

/// How a report row is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKind {
    /// Column header row at the top of a sheet.
    Header,
    /// Repeated header inside a sheet (bold, wrapped, top-aligned, bordered).
    EmphasisHeader,
    Data,
    /// Subtotal of one block.
    Total,
    /// Combination of block subtotals.
    GrandTotal,
    Blank,
}

/// Number format applied to every data cell of a column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ColumnFormat {
    #[default]
    General,
    Percent,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportRow {
    pub kind: RowKind,
    pub cells: Vec<Value>,
}

/// One output sheet, laid out row by row.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportSheet {
    pub name: String,
    pub columns: Vec<ColumnFormat>,
    pub rows: Vec<ReportRow>,
}

impl ReportSheet {
    pub fn new(name: impl Into<String>, columns: Vec<ColumnFormat>) -> Self {
        Self {
            name: name.into(),
            columns,
            rows: Vec::new(),
        }
    }

    /// Header row followed by every data row of the table.
    pub fn from_table(name: impl Into<String>, table: &Table, columns: Vec<ColumnFormat>) -> Self {
        let mut sheet = Self::new(name, columns);
        sheet.push_header(table.headers(), RowKind::Header);
        for row in table.rows() {
            sheet.push(RowKind::Data, row.clone());
        }
        sheet
    }

    pub fn push(&mut self, kind: RowKind, cells: Vec<Value>) {
        self.rows.push(ReportRow { kind, cells });
    }

    pub fn push_header(&mut self, headers: &[String], kind: RowKind) {
        let cells = headers.iter().map(|h| Value::Text(h.clone())).collect();
        self.push(kind, cells);
    }

    pub fn push_blank(&mut self, count: usize) {
        for _ in 0..count {
            self.push(RowKind::Blank, Vec::new());
        }
    }

    pub fn column_format(&self, col: usize) -> ColumnFormat {
        self.columns.get(col).copied().unwrap_or_default()
    }

    /// Rows of the given kind, in sheet order.
    pub fn rows_of(&self, kind: RowKind) -> impl Iterator<Item = &ReportRow> {
        self.rows.iter().filter(move |r| r.kind == kind)
    }
}
