//! Report partitioner: one block-structured sheet per group code.

use std::collections::HashSet;

use dmfr_core::{ReportSheet, RowKind, Value};

use crate::merge::MergedSummary;
use crate::model::GroupStats;

/// Label of the group holding rows without a group code.
pub const WALKING_PATIENT: &str = "Walking Patient";
pub const TOTAL_LABEL: &str = "Total";
pub const GRAND_TOTAL_LABEL: &str = "Grand Total";
/// Invoice-id prefix of the first block.
pub const B2_PREFIX: &str = "B2";
/// Blank rows between the two blocks.
const SEPARATOR_ROWS: usize = 3;

/// How each column of the merged summary behaves in a total row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TotalKind {
    /// Left blank.
    Skip,
    Sum,
    Mean,
}

/// Per-column total rules, fixed for a whole run.
#[derive(Debug, Clone)]
pub struct TotalPlan {
    pub kinds: Vec<TotalKind>,
    /// Column that carries the "Total" label; `kinds.len()` means an extra
    /// column past the data.
    pub label_col: usize,
}

impl TotalPlan {
    pub fn for_summary(summary: &MergedSummary) -> Self {
        let kinds: Vec<TotalKind> = (0..summary.table.width())
            .map(|col| {
                if col == summary.group_col || !summary.table.column_is_numeric(col) {
                    TotalKind::Skip
                } else if summary.is_percentage(col) {
                    TotalKind::Mean
                } else {
                    TotalKind::Sum
                }
            })
            .collect();
        let label_col = match kinds.first() {
            Some(TotalKind::Skip) => 0,
            _ => kinds.len(),
        };
        Self { kinds, label_col }
    }

    pub fn width(&self) -> usize {
        self.kinds.len()
    }
}

/// One total row: `None` for skipped columns.
#[derive(Debug, Clone, PartialEq)]
pub struct TotalRow(pub Vec<Option<f64>>);

impl TotalRow {
    /// Sum (missing counts as 0) or mean over present values (NaN → 0).
    pub fn of_rows<'a>(plan: &TotalPlan, rows: impl Iterator<Item = &'a Vec<Value>> + Clone) -> Self {
        let cells = plan
            .kinds
            .iter()
            .enumerate()
            .map(|(col, kind)| {
                let values = rows.clone().filter_map(|row| row.get(col).and_then(Value::as_f64));
                match kind {
                    TotalKind::Skip => None,
                    TotalKind::Sum => Some(values.sum::<f64>()),
                    TotalKind::Mean => {
                        let (sum, count) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
                        Some(if count == 0 { 0.0 } else { sum / count as f64 })
                    }
                }
            })
            .collect();
        TotalRow(cells)
    }

    /// Sum fields add up; mean fields average the two block means.
    pub fn combine(plan: &TotalPlan, a: &TotalRow, b: &TotalRow) -> Self {
        let cells = plan
            .kinds
            .iter()
            .zip(a.0.iter().zip(&b.0))
            .map(|(kind, (x, y))| match (kind, x, y) {
                (TotalKind::Skip, _, _) => None,
                (TotalKind::Sum, Some(x), Some(y)) => Some(x + y),
                (TotalKind::Mean, Some(x), Some(y)) => Some((x + y) / 2.0),
                _ => None,
            })
            .collect();
        TotalRow(cells)
    }

    pub fn get(&self, col: usize) -> Option<f64> {
        self.0.get(col).copied().flatten()
    }

    fn cells(&self, plan: &TotalPlan, label: &str) -> Vec<Value> {
        let mut cells: Vec<Value> = self
            .0
            .iter()
            .map(|v| v.map(Value::number).unwrap_or_default())
            .collect();
        if plan.label_col >= cells.len() {
            cells.resize(plan.label_col + 1, Value::Empty);
        }
        cells[plan.label_col] = Value::from(label);
        cells
    }
}

/// One group code with its blocks and totals. Row lists index into the
/// merged summary.
#[derive(Debug, Clone)]
pub struct ReportGroup {
    pub key: Option<String>,
    pub label: String,
    pub b2_rows: Vec<usize>,
    pub other_rows: Vec<usize>,
    pub b2_total: TotalRow,
    pub other_total: TotalRow,
    pub grand_total: TotalRow,
    /// Distinct non-missing invoice ids across both blocks.
    pub achievement: usize,
}

impl ReportGroup {
    pub fn stats(&self) -> GroupStats {
        GroupStats {
            label: self.label.clone(),
            rows: self.b2_rows.len() + self.other_rows.len(),
            b2_rows: self.b2_rows.len(),
            achievement: self.achievement,
        }
    }
}

fn is_b2(invoice_id: &Value) -> bool {
    matches!(invoice_id, Value::Text(s) if s.starts_with(B2_PREFIX))
}

/// Groups in order of first appearance, each split into B2 and other rows.
pub fn partition(summary: &MergedSummary, plan: &TotalPlan) -> Vec<ReportGroup> {
    let mut order: Vec<Option<String>> = Vec::new();
    let mut members: Vec<Vec<usize>> = Vec::new();
    for (idx, row) in summary.rows.iter().enumerate() {
        let key = row.group_code.key();
        match order.iter().position(|k| *k == key) {
            Some(pos) => members[pos].push(idx),
            None => {
                order.push(key);
                members.push(vec![idx]);
            }
        }
    }

    let table_rows = summary.table.rows();
    order
        .into_iter()
        .zip(members)
        .map(|(key, rows)| {
            let (b2_rows, other_rows): (Vec<usize>, Vec<usize>) =
                rows.iter().partition(|&&i| is_b2(&summary.rows[i].invoice_id));

            let b2_total = TotalRow::of_rows(plan, b2_rows.iter().map(|&i| &table_rows[i]));
            let other_total = TotalRow::of_rows(plan, other_rows.iter().map(|&i| &table_rows[i]));
            let grand_total = TotalRow::combine(plan, &b2_total, &other_total);

            let achievement = rows
                .iter()
                .filter_map(|&i| summary.rows[i].invoice_id.key())
                .collect::<HashSet<_>>()
                .len();

            let label = key.clone().unwrap_or_else(|| WALKING_PATIENT.to_string());
            tracing::debug!(
                group = %label,
                b2 = b2_rows.len(),
                other = other_rows.len(),
                achievement,
                "partitioned group"
            );

            ReportGroup {
                key,
                label,
                b2_rows,
                other_rows,
                b2_total,
                other_total,
                grand_total,
                achievement,
            }
        })
        .collect()
}

/// Lay out one group's sheet: header, B2 block and total, separator rows,
/// other block and total, emphasised header, grand total.
pub fn group_sheet(summary: &MergedSummary, plan: &TotalPlan, group: &ReportGroup) -> ReportSheet {
    let headers = summary.table.headers();
    let rows = summary.table.rows();
    let mut sheet = ReportSheet::new(group.label.clone(), summary.column_formats());

    sheet.push_header(headers, RowKind::Header);
    for &i in &group.b2_rows {
        sheet.push(RowKind::Data, rows[i].clone());
    }
    sheet.push(RowKind::Total, group.b2_total.cells(plan, TOTAL_LABEL));

    sheet.push_blank(SEPARATOR_ROWS);

    for &i in &group.other_rows {
        sheet.push(RowKind::Data, rows[i].clone());
    }
    sheet.push(RowKind::Total, group.other_total.cells(plan, TOTAL_LABEL));

    sheet.push_header(headers, RowKind::EmphasisHeader);
    sheet.push(RowKind::GrandTotal, group.grand_total.cells(plan, GRAND_TOTAL_LABEL));
    sheet
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DoctorColumns;
    use crate::merge::merge_summary;
    use crate::model::InvoiceAggregate;
    use dmfr_core::Table;

    fn summary() -> MergedSummary {
        let table = Table::with_rows(
            "Doctor Wise",
            &["InvoiceId", "MktCode", "ActualTotalSale", "ActualTotalDiscount"],
            vec![
                vec!["B2001".into(), "M1".into(), 1000.0.into(), 100.0.into()],
                vec!["C1".into(), "M1".into(), 500.0.into(), 0.0.into()],
                vec!["B2100234".into(), Value::Empty, 400.0.into(), 0.0.into()],
                vec!["B2002".into(), "M1".into(), 200.0.into(), 20.0.into()],
                vec!["C1".into(), "M1".into(), 300.0.into(), Value::Empty],
            ],
        );
        let pivot = vec![
            InvoiceAggregate { invoice_no: "B2001".into(), invoice: "B2001".into(), referral: 150.0 },
            InvoiceAggregate { invoice_no: "B2100234".into(), invoice: "B2100234".into(), referral: 40.0 },
        ];
        merge_summary(&table, &DoctorColumns::default(), &pivot).unwrap()
    }

    #[test]
    fn plan_skips_text_and_group_columns() {
        let s = summary();
        let plan = TotalPlan::for_summary(&s);
        assert_eq!(plan.kinds[0], TotalKind::Skip);
        assert_eq!(plan.kinds[1], TotalKind::Skip);
        assert_eq!(plan.kinds[2], TotalKind::Sum);
        assert_eq!(plan.kinds[4], TotalKind::Mean);
        assert_eq!(plan.label_col, 0);
    }

    #[test]
    fn groups_follow_first_appearance_and_split_on_b2() {
        let s = summary();
        let plan = TotalPlan::for_summary(&s);
        let groups = partition(&s, &plan);

        let labels: Vec<_> = groups.iter().map(|g| g.label.as_str()).collect();
        assert_eq!(labels, vec!["M1", WALKING_PATIENT]);

        let m1 = &groups[0];
        assert_eq!(m1.b2_rows, vec![0, 3]);
        assert_eq!(m1.other_rows, vec![1, 4]);
        assert_eq!(m1.achievement, 3);

        let walking = &groups[1];
        assert_eq!(walking.key, None);
        assert_eq!(walking.b2_rows, vec![2]);
        assert!(walking.other_rows.is_empty());
    }

    #[test]
    fn totals_sum_and_average() {
        let s = summary();
        let plan = TotalPlan::for_summary(&s);
        let m1 = &partition(&s, &plan)[0];
        let sale = s.table.column_index("ActualTotalSale").unwrap();
        let disc_pct = s.table.column_index("DiscountPercent").unwrap();

        assert_eq!(m1.b2_total.get(sale), Some(1200.0));
        assert_eq!(m1.other_total.get(sale), Some(800.0));
        assert_eq!(m1.grand_total.get(sale), Some(2000.0));

        // B2: 0.1 and 0.1; other: 0.0 and a missing value
        assert_eq!(m1.b2_total.get(disc_pct), Some(0.1));
        assert_eq!(m1.other_total.get(disc_pct), Some(0.0));
        assert_eq!(m1.grand_total.get(disc_pct), Some(0.05));
        assert_eq!(m1.grand_total.get(0), None);
    }

    #[test]
    fn empty_block_totals_are_zero() {
        let s = summary();
        let plan = TotalPlan::for_summary(&s);
        let walking = &partition(&s, &plan)[1];
        let sale = s.table.column_index("ActualTotalSale").unwrap();
        let cdr_pct = s.table.column_index("CDRPercent").unwrap();
        assert_eq!(walking.other_total.get(sale), Some(0.0));
        assert_eq!(walking.other_total.get(cdr_pct), Some(0.0));
        assert_eq!(walking.grand_total.get(cdr_pct), Some(0.05));
    }

    #[test]
    fn sheet_layout() {
        let s = summary();
        let plan = TotalPlan::for_summary(&s);
        let m1 = &partition(&s, &plan)[0];
        let sheet = group_sheet(&s, &plan, m1);

        let kinds: Vec<RowKind> = sheet.rows.iter().map(|r| r.kind).collect();
        assert_eq!(
            kinds,
            vec![
                RowKind::Header,
                RowKind::Data,
                RowKind::Data,
                RowKind::Total,
                RowKind::Blank,
                RowKind::Blank,
                RowKind::Blank,
                RowKind::Data,
                RowKind::Data,
                RowKind::Total,
                RowKind::EmphasisHeader,
                RowKind::GrandTotal,
            ]
        );
        assert_eq!(sheet.rows[3].cells[0], Value::from(TOTAL_LABEL));
        assert_eq!(sheet.rows[11].cells[0], Value::from(GRAND_TOTAL_LABEL));
        assert_eq!(sheet.rows[10].cells, sheet.rows[0].cells);
    }

    #[test]
    fn numeric_first_column_pushes_label_past_the_data() {
        let table = Table::with_rows(
            "Doctor Wise",
            &["InvoiceId", "MktCode", "ActualTotalSale", "ActualTotalDiscount"],
            vec![vec![Value::from(1001.0), "M1".into(), 100.0.into(), 0.0.into()]],
        );
        let s = merge_summary(&table, &DoctorColumns::default(), &[]).unwrap();
        let plan = TotalPlan::for_summary(&s);
        assert_eq!(plan.label_col, s.table.width());

        let groups = partition(&s, &plan);
        let sheet = group_sheet(&s, &plan, &groups[0]);
        let total = sheet.rows_of(RowKind::GrandTotal).next().unwrap();
        assert_eq!(total.cells.len(), s.table.width() + 1);
        assert_eq!(total.cells[s.table.width()], Value::from(GRAND_TOTAL_LABEL));
        // numeric invoice ids are summed like any other numeric column
        assert_eq!(total.cells[0], Value::Number(1001.0));
    }
}
