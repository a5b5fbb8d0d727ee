use std::collections::{BTreeMap, HashSet};

use dmfr_core::Value;

use crate::model::{InvoiceAggregate, LineStats, ReferralLine, TransactionLine};
use crate::rates::{RateSource, RateTables};

/// (InvoiceNo, ItemName) pair of a cancelled item.
type CancelKey = (Option<String>, String);

/// Every (invoice, item) pair that has a cancellation line anywhere in the
/// input, computed once over the unfiltered lines.
pub fn cancelled_pairs(lines: &[TransactionLine]) -> HashSet<CancelKey> {
    lines
        .iter()
        .filter(|l| l.is_cancelled())
        .map(|l| (l.invoice_no.clone(), l.item_name.clone()))
        .collect()
}

/// Drop excluded departments, zero-rate items and cancelled pairs, in that
/// order. Counts land in `stats`.
pub fn filter_lines(
    lines: Vec<TransactionLine>,
    excluded_departments: &[String],
    stats: &mut LineStats,
) -> Vec<TransactionLine> {
    let cancelled = cancelled_pairs(&lines);
    stats.read += lines.len();

    let mut kept = Vec::with_capacity(lines.len());
    for line in lines {
        if excluded_departments.iter().any(|d| *d == line.department) {
            stats.excluded_department += 1;
            continue;
        }
        if line.item_rate == Some(0.0) {
            stats.zero_item_rate += 1;
            continue;
        }
        if cancelled.contains(&(line.invoice_no.clone(), line.item_name.clone())) {
            stats.cancelled += 1;
            continue;
        }
        kept.push(line);
    }

    stats.used += kept.len();
    kept
}

/// Referral amount per line: TotalSale × rate, 0 when TotalSale is missing.
pub fn apply_rates(lines: Vec<TransactionLine>, rates: &RateTables, stats: &mut LineStats) -> Vec<ReferralLine> {
    lines
        .into_iter()
        .map(|line| {
            let (rate, source) = rates.resolve_with_source(&line);
            match source {
                RateSource::Special => stats.special_rate_hits += 1,
                RateSource::Default => stats.default_rate_hits += 1,
                RateSource::None => {}
            }
            let amount = line.total_sale.map(|sale| sale * rate).unwrap_or(0.0);
            ReferralLine { line, rate, amount }
        })
        .collect()
}

/// Sum referral amounts per invoice, sorted by invoice key. Lines without an
/// invoice number have nowhere to go and are left out.
pub fn aggregate_by_invoice(lines: &[ReferralLine]) -> Vec<InvoiceAggregate> {
    let mut totals: BTreeMap<&str, (&Value, f64)> = BTreeMap::new();
    for l in lines {
        if let Some(invoice) = l.line.invoice_no.as_deref() {
            totals.entry(invoice).or_insert((&l.line.invoice, 0.0)).1 += l.amount;
        }
    }

    totals
        .into_iter()
        .map(|(invoice_no, (invoice, referral))| InvoiceAggregate {
            invoice_no: invoice_no.to_string(),
            invoice: invoice.clone(),
            referral,
        })
        .collect()
}
