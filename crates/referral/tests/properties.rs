// Property-based tests for the referral pipeline invariants.
// CI: 128 cases (default). Soak: PROPTEST_CASES=10000 cargo test --release

use std::collections::{BTreeMap, HashSet};

use dmfr_core::{Table, Value};
use dmfr_referral::aggregate::{aggregate_by_invoice, apply_rates, filter_lines};
use dmfr_referral::config::DoctorColumns;
use dmfr_referral::merge::{merge_summary, Derived};
use dmfr_referral::model::{InvoiceAggregate, LineStats, TransactionLine};
use dmfr_referral::partition::{partition, TotalKind, TotalPlan};
use dmfr_referral::rates::RateTables;
use dmfr_referral::Department;
use proptest::prelude::*;

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

fn config_128() -> ProptestConfig {
    ProptestConfig {
        cases: std::env::var("PROPTEST_CASES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(128),
        failure_persistence: None,
        ..ProptestConfig::default()
    }
}

// ---------------------------------------------------------------------------
// Generators
// ---------------------------------------------------------------------------

const DOCTORS: [&str; 3] = ["DR. A", "DR. B", "DR. C"];
const DEPARTMENTS: [&str; 5] = ["X-RAY", "HAEMATOLOGY", "SEROLOGY", "MEDICINE", "PHYSIOTHERAPY"];
const ITEMS: [&str; 4] = ["SCAN", "CBC", "WIDAL", "ORS"];

fn arb_line() -> impl Strategy<Value = TransactionLine> {
    (
        prop_oneof![4 => (0..6u32).prop_map(|i| Some(format!("INV{i}"))), 1 => Just(None)],
        0..DOCTORS.len(),
        0..DEPARTMENTS.len(),
        0..ITEMS.len(),
        prop_oneof![4 => (1..5000u32).prop_map(|r| Some(r as f64)), 1 => Just(Some(0.0))],
        prop_oneof![6 => Just(None), 1 => Just(Some(1.0))],
        prop_oneof![6 => (0..100_000u32).prop_map(|s| Some(s as f64 / 100.0)), 1 => Just(None)],
    )
        .prop_map(|(invoice_no, d, dept, item, item_rate, cancel_qty, total_sale)| TransactionLine {
            invoice: invoice_no.as_deref().map(Value::from).unwrap_or_default(),
            invoice_no,
            referral_doctor: DOCTORS[d].to_string(),
            department: DEPARTMENTS[dept].to_string(),
            item_name: ITEMS[item].to_string(),
            item_rate,
            cancel_qty,
            total_sale,
            source: vec![],
        })
}

fn arb_rates() -> impl Strategy<Value = RateTables> {
    (
        prop::collection::vec((0..DOCTORS.len(), 0..ITEMS.len(), 0..50u32), 0..4),
        prop::collection::vec((0..DOCTORS.len(), 0..3usize, 0..50u32), 0..6),
    )
        .prop_map(|(specials, defaults)| {
            let depts = [Department::XRay, Department::Haematology, Department::Serology];
            let mut rates = RateTables::default();
            for (d, i, r) in specials {
                rates.insert_special(DOCTORS[d], ITEMS[i], Value::Number(r as f64 / 100.0));
            }
            for (d, dept, r) in defaults {
                rates.insert_default(DOCTORS[d], depts[dept], Value::Number(r as f64 / 100.0));
            }
            rates
        })
}

/// Doctor-wise rows: (invoice id, group code, sale, discount).
fn arb_doctor_table() -> impl Strategy<Value = Table> {
    prop::collection::vec(
        (
            prop_oneof![Just("B2"), Just("C"), Just("B3")],
            0..8u32,
            prop_oneof![3 => (0..3u32).prop_map(Some), 1 => Just(None)],
            prop_oneof![5 => (1..100_000u32).prop_map(|s| s as f64), 1 => Just(0.0)],
            0..20_000u32,
        ),
        0..25,
    )
    .prop_map(|rows| {
        let rows = rows
            .into_iter()
            .map(|(prefix, n, code, sale, discount)| {
                vec![
                    Value::from(format!("{prefix}{n:04}")),
                    code.map(|c| Value::from(format!("MK-{c}"))).unwrap_or_default(),
                    Value::Number(sale),
                    Value::Number(discount as f64),
                ]
            })
            .collect();
        Table::with_rows(
            "Doctor Wise",
            &["InvoiceId", "MktCode", "ActualTotalSale", "ActualTotalDiscount"],
            rows,
        )
    })
}

fn arb_pivot() -> impl Strategy<Value = Vec<InvoiceAggregate>> {
    prop::collection::btree_map(
        (prop_oneof![Just("B2"), Just("C")], 0..8u32).prop_map(|(p, n)| format!("{p}{n:04}")),
        0..50_000u32,
        0..10,
    )
    .prop_map(|m| {
        m.into_iter()
            .map(|(invoice_no, r)| InvoiceAggregate { invoice: Value::from(invoice_no.as_str()), invoice_no, referral: r as f64 })
            .collect()
    })
}

fn excluded() -> Vec<String> {
    vec!["MEDICINE".to_string()]
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(config_128())]

    #[test]
    fn cancellation_removes_every_matching_line(lines in prop::collection::vec(arb_line(), 0..40)) {
        let cancelled: HashSet<(Option<String>, String)> = lines
            .iter()
            .filter(|l| l.cancel_qty == Some(1.0))
            .map(|l| (l.invoice_no.clone(), l.item_name.clone()))
            .collect();

        let mut stats = LineStats::default();
        let kept = filter_lines(lines.clone(), &excluded(), &mut stats);

        for l in &kept {
            prop_assert!(!cancelled.contains(&(l.invoice_no.clone(), l.item_name.clone())));
            prop_assert!(l.department != "MEDICINE");
            prop_assert!(l.item_rate != Some(0.0));
        }
        prop_assert_eq!(
            stats.read,
            stats.used + stats.excluded_department + stats.zero_item_rate + stats.cancelled
        );
    }

    #[test]
    fn special_rate_wins_whenever_present(line in arb_line(), rates in arb_rates(), special in 1..100u32) {
        let mut rates = rates;
        let rate = special as f64 / 100.0;
        // inserts keep the first value, so a fresh doctor/item key is used
        rates.insert_special("DR. NEW", &line.item_name, Value::Number(rate));
        rates.insert_default("DR. NEW", Department::XRay, Value::Number(0.99));
        let mut line = line;
        line.referral_doctor = "DR. NEW".to_string();
        line.department = "X-RAY".to_string();
        prop_assert_eq!(rates.resolve(&line), rate);
    }

    #[test]
    fn pivot_equals_sum_of_line_amounts(lines in prop::collection::vec(arb_line(), 0..40), rates in arb_rates()) {
        let mut stats = LineStats::default();
        let kept = filter_lines(lines, &excluded(), &mut stats);
        let applied = apply_rates(kept, &rates, &mut stats);
        let pivot = aggregate_by_invoice(&applied);

        let mut expected: BTreeMap<String, f64> = BTreeMap::new();
        for l in &applied {
            if let Some(invoice) = &l.line.invoice_no {
                *expected.entry(invoice.clone()).or_insert(0.0) += l.amount;
            }
        }
        let got: BTreeMap<String, f64> = pivot.into_iter().map(|a| (a.invoice_no, a.referral)).collect();
        prop_assert_eq!(got, expected);
    }

    #[test]
    fn derived_metrics_balance(cdr in 0..100_000u32, sale in 1..1_000_000u32, discount in 0..100_000u32) {
        let (cdr, sale, discount) = (cdr as f64 / 100.0, sale as f64 / 100.0, discount as f64 / 100.0);
        let d = Derived::compute(cdr, sale, discount);
        prop_assert!(d.actual_referral >= 0.0);
        let recomposed = d.actual_net_sale + discount + d.actual_referral;
        prop_assert!((recomposed - sale).abs() < 1e-6, "{} != {}", recomposed, sale);
    }

    #[test]
    fn grand_totals_and_achievement(table in arb_doctor_table(), pivot in arb_pivot()) {
        let summary = merge_summary(&table, &DoctorColumns::default(), &pivot).unwrap();
        let plan = TotalPlan::for_summary(&summary);
        let groups = partition(&summary, &plan);

        let rows_seen: usize = groups.iter().map(|g| g.b2_rows.len() + g.other_rows.len()).sum();
        prop_assert_eq!(rows_seen, summary.rows.len());

        for group in &groups {
            for (col, kind) in plan.kinds.iter().enumerate() {
                let (a, b, g) = (group.b2_total.get(col), group.other_total.get(col), group.grand_total.get(col));
                match kind {
                    TotalKind::Skip => prop_assert_eq!(g, None),
                    TotalKind::Sum => prop_assert_eq!(g, Some(a.unwrap() + b.unwrap())),
                    TotalKind::Mean => prop_assert_eq!(g, Some((a.unwrap() + b.unwrap()) / 2.0)),
                }
            }

            let ids: HashSet<String> = group
                .b2_rows
                .iter()
                .chain(&group.other_rows)
                .filter_map(|&i| summary.rows[i].invoice_id.key())
                .collect();
            prop_assert_eq!(group.achievement, ids.len());

            for &i in &group.b2_rows {
                prop_assert!(summary.rows[i].invoice_id.to_string().starts_with("B2"));
            }
            for &i in &group.other_rows {
                prop_assert!(!summary.rows[i].invoice_id.to_string().starts_with("B2"));
            }
        }
    }
}
