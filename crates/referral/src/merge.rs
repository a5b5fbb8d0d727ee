//! Summary merger: joins per-invoice referral totals into the doctor-wise
//! sheet and derives the secondary financial columns.

use std::collections::HashMap;

use dmfr_core::{ColumnFormat, ReportSheet, Table, Value};

use crate::config::DoctorColumns;
use crate::error::ReferralError;
use crate::input::{load_doctor_rows, require_column};
use crate::model::{DoctorRow, InvoiceAggregate};

/// Columns computed by the merger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DerivedColumn {
    Cdr,
    CdrPercent,
    ActualReferral,
    RefPercent,
    ActualNetSale,
    DiscountPercent,
}

impl DerivedColumn {
    /// Columns appended after the pass-through columns, in order.
    /// `DiscountPercent` is placed next to the discount column instead.
    pub const APPENDED: [DerivedColumn; 5] = [
        DerivedColumn::Cdr,
        DerivedColumn::CdrPercent,
        DerivedColumn::ActualReferral,
        DerivedColumn::RefPercent,
        DerivedColumn::ActualNetSale,
    ];

    pub const ALL: [DerivedColumn; 6] = [
        DerivedColumn::Cdr,
        DerivedColumn::CdrPercent,
        DerivedColumn::ActualReferral,
        DerivedColumn::RefPercent,
        DerivedColumn::ActualNetSale,
        DerivedColumn::DiscountPercent,
    ];

    pub fn header(self) -> &'static str {
        match self {
            DerivedColumn::Cdr => "CDR",
            DerivedColumn::CdrPercent => "CDRPercent",
            DerivedColumn::ActualReferral => "ActualReferral",
            DerivedColumn::RefPercent => "RefPercent",
            DerivedColumn::ActualNetSale => "ActualNetSale",
            DerivedColumn::DiscountPercent => "DiscountPercent",
        }
    }

    pub fn is_percentage(self) -> bool {
        matches!(
            self,
            DerivedColumn::CdrPercent | DerivedColumn::RefPercent | DerivedColumn::DiscountPercent
        )
    }

    pub fn from_header(header: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.header() == header)
    }
}

/// Derived metrics of one doctor-wise row. Undefined ratios are NaN.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Derived {
    pub cdr: f64,
    pub cdr_percent: f64,
    pub actual_referral: f64,
    pub ref_percent: f64,
    pub actual_net_sale: f64,
    pub discount_percent: f64,
}

impl Derived {
    pub fn compute(cdr: f64, actual_total_sale: f64, actual_total_discount: f64) -> Self {
        let gap = cdr - actual_total_discount;
        // NaN must survive the clamp; f64::max would swallow it
        let actual_referral = if gap.is_nan() { f64::NAN } else { gap.max(0.0) };
        Self {
            cdr,
            cdr_percent: ratio(cdr, actual_total_sale),
            actual_referral,
            ref_percent: ratio(actual_referral, actual_total_sale),
            actual_net_sale: actual_total_sale - actual_total_discount - actual_referral,
            discount_percent: ratio(actual_total_discount, actual_total_sale),
        }
    }

    pub fn get(&self, column: DerivedColumn) -> f64 {
        match column {
            DerivedColumn::Cdr => self.cdr,
            DerivedColumn::CdrPercent => self.cdr_percent,
            DerivedColumn::ActualReferral => self.actual_referral,
            DerivedColumn::RefPercent => self.ref_percent,
            DerivedColumn::ActualNetSale => self.actual_net_sale,
            DerivedColumn::DiscountPercent => self.discount_percent,
        }
    }
}

/// `numerator / denominator`, NaN when the denominator is zero or either
/// side is undefined.
pub fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 || denominator.is_nan() || numerator.is_nan() {
        f64::NAN
    } else {
        numerator / denominator
    }
}

/// Where an output column's values come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnSource {
    PassThrough(usize),
    Derived(DerivedColumn),
}

/// Output column order for a doctor-wise sheet with these headers.
///
/// Pass-through columns keep their order, except ones named like a derived
/// column, which are dropped in favour of the derived value.
/// `DiscountPercent` follows the discount column; the rest are appended.
pub fn column_layout(headers: &[String], discount_col: usize) -> Vec<ColumnSource> {
    let mut layout = Vec::with_capacity(headers.len() + DerivedColumn::ALL.len());
    for (idx, header) in headers.iter().enumerate() {
        if idx != discount_col && DerivedColumn::from_header(header).is_some() {
            continue;
        }
        layout.push(ColumnSource::PassThrough(idx));
        if idx == discount_col {
            layout.push(ColumnSource::Derived(DerivedColumn::DiscountPercent));
        }
    }
    layout.extend(DerivedColumn::APPENDED.map(ColumnSource::Derived));
    layout
}

/// The enriched doctor-wise sheet.
#[derive(Debug, Clone)]
pub struct MergedSummary {
    pub table: Table,
    pub layout: Vec<ColumnSource>,
    pub rows: Vec<DoctorRow>,
    pub derived: Vec<Derived>,
    pub group_col: usize,
    pub zero_sale_dropped: usize,
    pub unmatched: usize,
}

impl MergedSummary {
    pub fn is_percentage(&self, col: usize) -> bool {
        matches!(self.layout.get(col), Some(ColumnSource::Derived(d)) if d.is_percentage())
    }

    pub fn column_formats(&self) -> Vec<ColumnFormat> {
        (0..self.layout.len())
            .map(|col| {
                if self.is_percentage(col) {
                    ColumnFormat::Percent
                } else {
                    ColumnFormat::General
                }
            })
            .collect()
    }

    pub fn to_report_sheet(&self) -> ReportSheet {
        ReportSheet::from_table(self.table.name(), &self.table, self.column_formats())
    }
}

/// Drop zero-sale rows, left-join the invoice totals and lay out the
/// derived columns.
pub fn merge_summary(
    doctor: &Table,
    cols: &DoctorColumns,
    invoices: &[InvoiceAggregate],
) -> Result<MergedSummary, ReferralError> {
    let discount_col = require_column(doctor, &cols.actual_total_discount)?;
    require_column(doctor, &cols.invoice_id)?;
    let group_src = require_column(doctor, &cols.mkt_code)?;

    let all_rows = load_doctor_rows(doctor, cols)?;
    let read = all_rows.len();
    let rows: Vec<DoctorRow> = all_rows
        .into_iter()
        .filter(|r| r.actual_total_sale != 0.0)
        .collect();
    let zero_sale_dropped = read - rows.len();

    let pivot: HashMap<&str, f64> = invoices
        .iter()
        .map(|a| (a.invoice_no.as_str(), a.referral))
        .collect();

    let mut unmatched = 0;
    let derived: Vec<Derived> = rows
        .iter()
        .map(|row| {
            let cdr = match row.invoice_id.key().and_then(|k| pivot.get(k.as_str()).copied()) {
                Some(cdr) => cdr,
                None => {
                    unmatched += 1;
                    0.0
                }
            };
            Derived::compute(cdr, row.actual_total_sale, row.actual_total_discount)
        })
        .collect();

    let layout = column_layout(doctor.headers(), discount_col);
    let headers = layout
        .iter()
        .map(|source| match source {
            ColumnSource::PassThrough(idx) => doctor.headers()[*idx].clone(),
            ColumnSource::Derived(d) => d.header().to_string(),
        })
        .collect();

    let mut table = Table::new(doctor.name(), headers);
    for (row, values) in rows.iter().zip(&derived) {
        let cells = layout
            .iter()
            .map(|source| match source {
                ColumnSource::PassThrough(idx) => row.source[*idx].clone(),
                ColumnSource::Derived(d) => Value::number(values.get(*d)),
            })
            .collect();
        table.push_row(cells);
    }

    let position = |src: usize| {
        layout
            .iter()
            .position(|s| *s == ColumnSource::PassThrough(src))
            .unwrap_or(src)
    };
    let group_col = position(group_src);

    Ok(MergedSummary {
        table,
        layout,
        rows,
        derived,
        group_col,
        zero_sale_dropped,
        unmatched,
    })
}
