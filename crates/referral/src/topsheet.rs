use dmfr_core::{ColumnFormat, ReportSheet, RowKind, Value};

use crate::merge::MergedSummary;
use crate::partition::{ReportGroup, TotalKind, TotalPlan};

pub const TOP_SHEET: &str = "Top Sheet";
pub const ACHIEVEMENT: &str = "Achievement";

/// One row per group: label, grand-total fields, achievement count.
pub fn build_top_sheet(summary: &MergedSummary, plan: &TotalPlan, groups: &[ReportGroup]) -> ReportSheet {
    let fields: Vec<usize> = plan
        .kinds
        .iter()
        .enumerate()
        .filter(|(_, kind)| **kind != TotalKind::Skip)
        .map(|(col, _)| col)
        .collect();

    let mut formats = vec![ColumnFormat::General];
    formats.extend(fields.iter().map(|&col| match plan.kinds[col] {
        TotalKind::Mean => ColumnFormat::Percent,
        _ => ColumnFormat::General,
    }));
    formats.push(ColumnFormat::General);

    let headers = summary.table.headers();
    let mut header_row = Vec::with_capacity(fields.len() + 2);
    header_row.push(headers[summary.group_col].clone());
    header_row.extend(fields.iter().map(|&col| headers[col].clone()));
    header_row.push(ACHIEVEMENT.to_string());

    let mut sheet = ReportSheet::new(TOP_SHEET, formats);
    sheet.push_header(&header_row, RowKind::Header);
    for group in groups {
        let mut cells = Vec::with_capacity(header_row.len());
        cells.push(Value::from(group.label.as_str()));
        cells.extend(
            fields
                .iter()
                .map(|&col| group.grand_total.get(col).map(Value::number).unwrap_or_default()),
        );
        cells.push(Value::Number(group.achievement as f64));
        sheet.push(RowKind::Data, cells);
    }
    sheet
}
