use dmfr_core::{ReportSheet, Value};
use serde::Serialize;

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// One billed test/item from the transaction sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionLine {
    /// Join key of the invoice (see `Value::key`); `None` when blank.
    pub invoice_no: Option<String>,
    /// Invoice cell as read.
    pub invoice: Value,
    pub referral_doctor: String,
    pub department: String,
    pub item_name: String,
    pub item_rate: Option<f64>,
    pub cancel_qty: Option<f64>,
    pub total_sale: Option<f64>,
    /// Every cell of the source row, echoed in the output.
    pub source: Vec<Value>,
}

impl TransactionLine {
    pub fn is_cancelled(&self) -> bool {
        self.cancel_qty == Some(1.0)
    }
}

/// A transaction line with its resolved rate applied.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferralLine {
    pub line: TransactionLine,
    pub rate: f64,
    pub amount: f64,
}

/// Referral total of one invoice.
#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceAggregate {
    pub invoice_no: String,
    /// First-seen invoice cell, so numeric ids stay numbers in the pivot.
    pub invoice: Value,
    pub referral: f64,
}

/// Row of the doctor-wise summary sheet as read.
#[derive(Debug, Clone, PartialEq)]
pub struct DoctorRow {
    pub invoice_id: Value,
    pub group_code: Value,
    /// NaN when blank or non-numeric.
    pub actual_total_sale: f64,
    pub actual_total_discount: f64,
    pub source: Vec<Value>,
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// Per-line filter counts from the line aggregator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LineStats {
    pub read: usize,
    pub used: usize,
    pub excluded_department: usize,
    pub zero_item_rate: usize,
    pub cancelled: usize,
    pub special_rate_hits: usize,
    pub default_rate_hits: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupStats {
    pub label: String,
    pub rows: usize,
    pub b2_rows: usize,
    pub achievement: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunMeta {
    pub config_name: String,
    pub engine_version: String,
    pub run_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub meta: RunMeta,
    pub lines: LineStats,
    pub invoices: usize,
    pub doctor_rows: usize,
    pub zero_sale_dropped: usize,
    pub unmatched_doctor_rows: usize,
    pub groups: Vec<GroupStats>,
}

/// Everything one run hands to the output sink.
#[derive(Debug, Clone)]
pub struct RunOutput {
    /// Sheets in workbook order.
    pub sheets: Vec<ReportSheet>,
    pub summary: RunSummary,
}
