use dmfr_core::{ReportSheet, RowKind, SheetSet, Table, Value};

use crate::aggregate::{aggregate_by_invoice, apply_rates, filter_lines};
use crate::config::RunConfig;
use crate::error::ReferralError;
use crate::input::{load_lines, sheet, validate_inputs};
use crate::merge::merge_summary;
use crate::model::{InvoiceAggregate, LineStats, ReferralLine, RunMeta, RunOutput, RunSummary};
use crate::partition::{group_sheet, partition, TotalPlan};
use crate::rates::RateTables;
use crate::topsheet::build_top_sheet;

pub const PIVOT_SHEET: &str = "Pivot Data";
pub const REFERRAL_RATE: &str = "ReferralRate";
pub const REFERRAL_AMOUNT: &str = "ReferralAmount";

/// Run the referral pipeline over pre-loaded sheets. Returns every output
/// sheet in workbook order plus the run summary.
///
/// Structural problems (unselected or missing sheets, missing columns)
/// abort the run before any computation.
pub fn run(config: &RunConfig, sheets: &SheetSet) -> Result<RunOutput, ReferralError> {
    let selected = config.sheets.resolve()?;

    let problems = validate_inputs(config, &selected, sheets);
    if let Some(first) = problems.first() {
        for problem in &problems[1..] {
            tracing::warn!(%problem, "input problem");
        }
        return Err(first.clone());
    }

    let main = sheet(sheets, "main", &selected.main)?;
    let policy = sheet(sheets, "policy", &selected.policy)?;
    let special = sheet(sheets, "special", &selected.special)?;
    let doctor = sheet(sheets, "doctor", &selected.doctor)?;
    let cols = &config.columns;

    // Rate Resolver + Line Aggregator
    let rates = RateTables::from_tables(policy, &cols.policy, special, &cols.special)?;
    let mut stats = LineStats::default();
    let lines = filter_lines(load_lines(main, &cols.main)?, &config.excluded_departments, &mut stats);
    let applied = apply_rates(lines, &rates, &mut stats);
    let invoices = aggregate_by_invoice(&applied);
    tracing::info!(
        read = stats.read,
        used = stats.used,
        excluded_department = stats.excluded_department,
        zero_item_rate = stats.zero_item_rate,
        cancelled = stats.cancelled,
        invoices = invoices.len(),
        "aggregated transaction lines"
    );

    // Summary Merger
    let merged = merge_summary(doctor, &cols.doctor, &invoices)?;
    tracing::info!(
        rows = merged.rows.len(),
        zero_sale_dropped = merged.zero_sale_dropped,
        unmatched = merged.unmatched,
        "merged doctor-wise summary"
    );

    // Report Partitioner + Top-Sheet Builder
    let plan = TotalPlan::for_summary(&merged);
    let groups = partition(&merged, &plan);
    tracing::info!(groups = groups.len(), "partitioned report groups");

    let mut output = Vec::with_capacity(groups.len() + 6);
    output.push(main_echo_sheet(main, &applied));
    output.push(ReportSheet::from_table(policy.name(), policy, Vec::new()));
    output.push(ReportSheet::from_table(special.name(), special, Vec::new()));
    output.push(pivot_sheet(&invoices));
    output.push(merged.to_report_sheet());
    output.extend(groups.iter().map(|g| group_sheet(&merged, &plan, g)));
    output.push(build_top_sheet(&merged, &plan, &groups));

    let summary = RunSummary {
        meta: RunMeta {
            config_name: config.name.clone(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
        },
        lines: stats,
        invoices: invoices.len(),
        doctor_rows: merged.rows.len() + merged.zero_sale_dropped,
        zero_sale_dropped: merged.zero_sale_dropped,
        unmatched_doctor_rows: merged.unmatched,
        groups: groups.iter().map(|g| g.stats()).collect(),
    };

    Ok(RunOutput {
        sheets: output,
        summary,
    })
}

/// The filtered transaction lines with their rate and amount appended.
fn main_echo_sheet(main: &Table, lines: &[ReferralLine]) -> ReportSheet {
    let mut headers = main.headers().to_vec();
    headers.push(REFERRAL_RATE.to_string());
    headers.push(REFERRAL_AMOUNT.to_string());

    let mut sheet = ReportSheet::new(main.name(), Vec::new());
    sheet.push_header(&headers, RowKind::Header);
    for l in lines {
        let mut cells = l.line.source.clone();
        cells.resize(main.width(), Value::Empty);
        cells.push(Value::Number(l.rate));
        cells.push(Value::Number(l.amount));
        sheet.push(RowKind::Data, cells);
    }
    sheet
}

fn pivot_sheet(invoices: &[InvoiceAggregate]) -> ReportSheet {
    let mut sheet = ReportSheet::new(PIVOT_SHEET, Vec::new());
    sheet.push_header(&["InvoiceNo".to_string(), "Referral".to_string()], RowKind::Header);
    for agg in invoices {
        sheet.push(
            RowKind::Data,
            vec![agg.invoice.clone(), Value::Number(agg.referral)],
        );
    }
    sheet
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SheetSelection;
    use crate::department::Department;

    fn config() -> RunConfig {
        RunConfig {
            sheets: SheetSelection {
                main: Some("Test Wise".into()),
                policy: Some("Policy".into()),
                doctor: Some("Doctor Wise".into()),
                special: Some("Special".into()),
            },
            ..RunConfig::default()
        }
    }

    fn workbook() -> SheetSet {
        let mut sheets = SheetSet::new();
        sheets.insert(Table::with_rows(
            "Test Wise",
            &["InvoiceNo", "ReferralDoctor", "Department", "ItemName", "ItemRate", "CencelQty", "TotalSale"],
            vec![
                vec!["B2001".into(), "DR. A".into(), "X-RAY".into(), "X-RAY SCAN".into(), 1000.0.into(), Value::Empty, 1000.0.into()],
                vec!["B2001".into(), "DR. A".into(), "MEDICINE".into(), "ORS".into(), 50.0.into(), Value::Empty, 50.0.into()],
            ],
        ));

        let mut policy_headers = vec!["DoctorName", "Code", "Area"];
        let names: Vec<&str> = Department::all().map(Department::name).collect();
        policy_headers.extend(names);
        let mut policy_row = vec![Value::Empty; policy_headers.len()];
        policy_row[0] = "DR. A".into();
        policy_row[Department::XRay.policy_column()] = 0.05.into();
        sheets.insert(Table::with_rows("Policy", &policy_headers, vec![policy_row]));

        sheets.insert(Table::with_rows(
            "Special",
            &["DoctorName", "ItemName", "SpecialRate"],
            vec![vec!["DR. A".into(), "X-RAY SCAN".into(), 0.10.into()]],
        ));
        sheets.insert(Table::with_rows(
            "Doctor Wise",
            &["InvoiceId", "MktCode", "ActualTotalSale", "ActualTotalDiscount"],
            vec![vec!["B2001".into(), "M1".into(), 1050.0.into(), 0.0.into()]],
        ));
        sheets
    }

    #[test]
    fn sheets_come_out_in_workbook_order() {
        let output = run(&config(), &workbook()).unwrap();
        let names: Vec<&str> = output.sheets.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["Test Wise", "Policy", "Special", PIVOT_SHEET, "Doctor Wise", "M1", "Top Sheet"]
        );

        let main = &output.sheets[0];
        assert_eq!(main.rows.len(), 2, "excluded department line is not echoed");
        assert_eq!(main.rows[0].cells.last(), Some(&Value::from(REFERRAL_AMOUNT)));
        assert_eq!(main.rows[1].cells[8], Value::Number(100.0));

        let pivot = &output.sheets[3];
        assert_eq!(pivot.rows[1].cells, vec![Value::from("B2001"), Value::Number(100.0)]);

        assert_eq!(output.summary.lines.excluded_department, 1);
        assert_eq!(output.summary.groups.len(), 1);
        assert_eq!(output.summary.groups[0].b2_rows, 1);
    }

    #[test]
    fn missing_sheet_aborts_before_computation() {
        let mut cfg = config();
        cfg.sheets.special = Some("Nope".into());
        let err = run(&cfg, &workbook()).unwrap_err();
        assert_eq!(
            err,
            ReferralError::MissingSheet {
                role: "special".into(),
                sheet: "Nope".into(),
            }
        );
    }

    #[test]
    fn summary_serializes_counts() {
        let output = run(&config(), &workbook()).unwrap();
        let json = serde_json::to_value(&output.summary).unwrap();
        assert_eq!(json["meta"]["config_name"], "DMFR Referral Sheet");
        assert_eq!(json["lines"]["read"], 2);
        assert_eq!(json["lines"]["special_rate_hits"], 1);
        assert_eq!(json["invoices"], 1);
        assert_eq!(json["groups"][0]["label"], "M1");
        assert_eq!(json["groups"][0]["achievement"], 1);
    }

    #[test]
    fn pivot_keeps_numeric_invoice_and_matches_line_amounts() {
        let mut sheets = workbook();
        sheets.insert(Table::with_rows(
            "Test Wise",
            &["InvoiceNo", "ReferralDoctor", "Department", "ItemName", "ItemRate", "CencelQty", "TotalSale"],
            vec![
                vec!["B2001".into(), "DR. A".into(), "X-RAY".into(), "X-RAY SCAN".into(), 1000.0.into(), Value::Empty, 1000.0.into()],
                vec![1001.0.into(), "DR. A".into(), "X-RAY".into(), "CHEST PA".into(), 200.0.into(), Value::Empty, 200.0.into()],
                vec![1001.0.into(), "DR. A".into(), "X-RAY".into(), "SPINE".into(), 400.0.into(), Value::Empty, 400.0.into()],
            ],
        ));
        let output = run(&config(), &sheets).unwrap();

        let pivot = &output.sheets[3];
        assert_eq!(pivot.rows[0].cells, vec![Value::from("InvoiceNo"), Value::from("Referral")]);
        assert_eq!(pivot.rows[1].cells, vec![Value::Number(1001.0), Value::Number(30.0)]);
        assert_eq!(pivot.rows[2].cells, vec![Value::from("B2001"), Value::Number(100.0)]);

        // the echoed line amounts add up to the pivot per invoice
        let main = &output.sheets[0];
        let amount = main.rows[0].cells.iter().position(|c| *c == Value::from(REFERRAL_AMOUNT)).unwrap();
        let numeric: f64 = main.rows[1..]
            .iter()
            .filter(|r| r.cells[0] == Value::Number(1001.0))
            .filter_map(|r| r.cells[amount].as_f64())
            .sum();
        assert_eq!(numeric, 30.0);
    }

    #[test]
    fn unselected_role_is_a_config_error() {
        let mut cfg = config();
        cfg.sheets.doctor = None;
        assert!(matches!(run(&cfg, &workbook()), Err(ReferralError::ConfigValidation(_))));
    }
}
