//! Typed views over the designated input sheets.
//!
//! Column presence is checked here, before any computation starts.

use dmfr_core::{SheetSet, Table};

use crate::config::{DoctorColumns, MainColumns, RunConfig, SelectedSheets};
use crate::department::Department;
use crate::error::ReferralError;
use crate::model::{DoctorRow, TransactionLine};

pub fn require_column(table: &Table, column: &str) -> Result<usize, ReferralError> {
    table.column_index(column).ok_or_else(|| ReferralError::MissingColumn {
        sheet: table.name().to_string(),
        column: column.to_string(),
    })
}

/// Look up a designated sheet by role.
pub fn sheet<'a>(sheets: &'a SheetSet, role: &str, name: &str) -> Result<&'a Table, ReferralError> {
    sheets.get(name).ok_or_else(|| ReferralError::MissingSheet {
        role: role.to_string(),
        sheet: name.to_string(),
    })
}

/// Every structural problem with the selected sheets, in sheet order.
/// An empty result means a run can start.
pub fn validate_inputs(config: &RunConfig, selected: &SelectedSheets, sheets: &SheetSet) -> Vec<ReferralError> {
    let mut problems = Vec::new();
    let cols = &config.columns;

    let main = &cols.main;
    check_sheet(
        sheets,
        "main",
        &selected.main,
        &[
            &main.referral_doctor,
            &main.department,
            &main.item_name,
            &main.item_rate,
            &main.cancel_qty,
            &main.total_sale,
            &main.invoice_no,
        ],
        &mut problems,
    );

    if let Some(policy) = check_sheet(sheets, "policy", &selected.policy, &[&cols.policy.doctor_name], &mut problems) {
        problems.extend(policy_width_problem(policy));
    }

    let special = &cols.special;
    check_sheet(
        sheets,
        "special",
        &selected.special,
        &[&special.doctor_name, &special.item_name, &special.special_rate],
        &mut problems,
    );

    let doctor = &cols.doctor;
    check_sheet(
        sheets,
        "doctor",
        &selected.doctor,
        &[
            &doctor.invoice_id,
            &doctor.actual_total_sale,
            &doctor.actual_total_discount,
            &doctor.mkt_code,
        ],
        &mut problems,
    );

    problems
}

fn check_sheet<'a>(
    sheets: &'a SheetSet,
    role: &str,
    name: &str,
    columns: &[&String],
    problems: &mut Vec<ReferralError>,
) -> Option<&'a Table> {
    match sheet(sheets, role, name) {
        Ok(table) => {
            for column in columns {
                if let Err(e) = require_column(table, column) {
                    problems.push(e);
                }
            }
            Some(table)
        }
        Err(e) => {
            problems.push(e);
            None
        }
    }
}

/// The policy sheet must reach the last department's rate column.
pub fn policy_width_problem(table: &Table) -> Option<ReferralError> {
    Department::all()
        .find(|d| d.policy_column() >= table.width())
        .map(|d| ReferralError::PolicyTooNarrow {
            sheet: table.name().to_string(),
            department: d.name().to_string(),
            column: d.policy_column(),
        })
}

pub fn load_lines(table: &Table, cols: &MainColumns) -> Result<Vec<TransactionLine>, ReferralError> {
    let doctor_idx = require_column(table, &cols.referral_doctor)?;
    let department_idx = require_column(table, &cols.department)?;
    let item_idx = require_column(table, &cols.item_name)?;
    let rate_idx = require_column(table, &cols.item_rate)?;
    let cancel_idx = require_column(table, &cols.cancel_qty)?;
    let sale_idx = require_column(table, &cols.total_sale)?;
    let invoice_idx = require_column(table, &cols.invoice_no)?;

    let lines = table
        .rows()
        .iter()
        .map(|row| TransactionLine {
            invoice_no: row[invoice_idx].key(),
            invoice: row[invoice_idx].clone(),
            referral_doctor: row[doctor_idx].to_string(),
            department: row[department_idx].to_string(),
            item_name: row[item_idx].to_string(),
            item_rate: row[rate_idx].as_f64(),
            cancel_qty: row[cancel_idx].as_f64(),
            total_sale: row[sale_idx].as_f64(),
            source: row.clone(),
        })
        .collect();

    Ok(lines)
}

pub fn load_doctor_rows(table: &Table, cols: &DoctorColumns) -> Result<Vec<DoctorRow>, ReferralError> {
    let invoice_idx = require_column(table, &cols.invoice_id)?;
    let sale_idx = require_column(table, &cols.actual_total_sale)?;
    let discount_idx = require_column(table, &cols.actual_total_discount)?;
    let code_idx = require_column(table, &cols.mkt_code)?;

    let rows = table
        .rows()
        .iter()
        .map(|row| DoctorRow {
            invoice_id: row[invoice_idx].clone(),
            group_code: row[code_idx].clone(),
            actual_total_sale: row[sale_idx].as_f64().unwrap_or(f64::NAN),
            actual_total_discount: row[discount_idx].as_f64().unwrap_or(f64::NAN),
            source: row.clone(),
        })
        .collect();

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dmfr_core::Value;

    fn main_table(headers: &[&str]) -> Table {
        Table::with_rows("Test Wise", headers, vec![])
    }

    #[test]
    fn missing_main_column_is_named() {
        let table = main_table(&["ReferralDoctor", "Department", "ItemName", "ItemRate", "TotalSale", "InvoiceNo"]);
        let err = load_lines(&table, &MainColumns::default()).unwrap_err();
        assert_eq!(
            err,
            ReferralError::MissingColumn {
                sheet: "Test Wise".into(),
                column: "CencelQty".into(),
            }
        );
    }

    #[test]
    fn lines_keep_source_cells_and_parse_numbers() {
        let table = Table::with_rows(
            "Test Wise",
            &["InvoiceNo", "ReferralDoctor", "Department", "ItemName", "ItemRate", "CencelQty", "TotalSale", "Extra"],
            vec![vec![
                Value::from(1001.0),
                "DR. A".into(),
                "X-RAY".into(),
                "X-RAY SCAN".into(),
                "500".into(),
                Value::Empty,
                1000.0.into(),
                "note".into(),
            ]],
        );
        let lines = load_lines(&table, &MainColumns::default()).unwrap();
        assert_eq!(lines.len(), 1);
        let line = &lines[0];
        assert_eq!(line.invoice_no.as_deref(), Some("1001"));
        assert_eq!(line.item_rate, Some(500.0));
        assert_eq!(line.cancel_qty, None);
        assert!(!line.is_cancelled());
        assert_eq!(line.source.len(), 8);
    }

    #[test]
    fn policy_needs_every_rate_column() {
        let mut headers = vec!["DoctorName", "Code", "Area"];
        let names: Vec<String> = Department::all().map(|d| d.name().to_string()).collect();
        headers.extend(names.iter().take(16).map(String::as_str));
        let table = Table::with_rows("Policy", &headers, vec![]);
        match policy_width_problem(&table) {
            Some(ReferralError::PolicyTooNarrow { department, column, .. }) => {
                assert_eq!(department, "USG 3D/4D");
                assert_eq!(column, 19);
            }
            other => panic!("expected PolicyTooNarrow, got {other:?}"),
        }

        headers.push("USG 3D/4D");
        let table = Table::with_rows("Policy", &headers, vec![]);
        assert!(policy_width_problem(&table).is_none());
    }

    #[test]
    fn validate_reports_every_problem() {
        let mut sheets = SheetSet::new();
        sheets.insert(main_table(&["ReferralDoctor"]));
        sheets.insert(Table::with_rows("Doctor Wise", &["InvoiceId", "ActualTotalSale"], vec![]));
        let selected = SelectedSheets {
            main: "Test Wise".into(),
            policy: "Policy".into(),
            doctor: "Doctor Wise".into(),
            special: "Special".into(),
        };
        let problems = validate_inputs(&RunConfig::default(), &selected, &sheets);
        // 6 main columns, policy sheet, special sheet, 2 doctor columns
        assert_eq!(problems.len(), 10, "{problems:?}");
        assert!(problems.contains(&ReferralError::MissingSheet {
            role: "policy".into(),
            sheet: "Policy".into(),
        }));
        assert!(problems.contains(&ReferralError::MissingColumn {
            sheet: "Doctor Wise".into(),
            column: "MktCode".into(),
        }));
    }
}
