//! Billing metrics aggregation — raw invoice rows into financial KPIs.
//!
//! One pass over the customer's rows produces totals per status bucket,
//! DSO, the distinct-month billing average and the overage alert. The
//! input is never mutated; re-running on the same rows yields identical
//! totals.

use crate::invoice::{days_between, round_cents, InvoiceRow, InvoiceStatus};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingMetrics {
    pub total_billed: f64,
    pub paid_total: f64,
    pub overdue_total: f64,
    pub pending_total: f64,
    pub invoices_total: usize,
    pub invoices_paid: usize,
    pub invoices_overdue: usize,
    /// Whole days since the most recent paid_date among paid invoices.
    /// None when no paid invoice carries a valid paid_date.
    pub last_payment_days_ago: Option<i64>,
    /// Days Sales Outstanding: mean |paid_date - due_date| over paid
    /// invoices where both dates parse. None when no such invoice exists.
    pub dso_avg_days: Option<f64>,
    /// total_billed over the count of distinct reference months (min 1).
    pub average_monthly_billing: f64,
    pub distinct_months: usize,
    /// Sum of the three usage extra-cost fields across all rows.
    pub overage_total: f64,
    pub overage_percentage: f64,
    pub margin_bleed_alert: bool,
}

pub const MARGIN_BLEED_THRESHOLD_PCT: f64 = 40.0;

pub fn compute(rows: &[InvoiceRow], today: NaiveDate) -> BillingMetrics {
    let mut total_billed = 0.0;
    let mut paid_total = 0.0;
    let mut overdue_total = 0.0;
    let mut pending_total = 0.0;
    let mut invoices_paid = 0usize;
    let mut invoices_overdue = 0usize;
    let mut last_paid: Option<NaiveDate> = None;
    let mut dso_days: Vec<i64> = Vec::new();
    let mut months: BTreeSet<String> = BTreeSet::new();
    let mut overage_total = 0.0;

    for row in rows {
        total_billed += row.amount;
        overage_total += row.usage_overage();
        if let Some(month) = row.month_key() {
            months.insert(month);
        }

        match row.status() {
            InvoiceStatus::Paid => {
                paid_total += row.amount;
                invoices_paid += 1;
                if let Some(paid) = row.paid_date {
                    last_paid = Some(last_paid.map_or(paid, |prev| prev.max(paid)));
                    if let Some(due) = row.due_date {
                        dso_days.push(days_between(due, paid).abs());
                    }
                }
            }
            InvoiceStatus::Overdue => {
                overdue_total += row.amount;
                invoices_overdue += 1;
            }
            InvoiceStatus::Pending => pending_total += row.amount,
            InvoiceStatus::Other => {}
        }
    }

    let distinct_months = months.len();
    let average_monthly_billing = round_cents(total_billed / distinct_months.max(1) as f64);
    let overage_percentage = if total_billed > 0.0 {
        round_cents(overage_total / total_billed * 100.0)
    } else {
        0.0
    };

    BillingMetrics {
        total_billed: round_cents(total_billed),
        paid_total: round_cents(paid_total),
        overdue_total: round_cents(overdue_total),
        pending_total: round_cents(pending_total),
        invoices_total: rows.len(),
        invoices_paid,
        invoices_overdue,
        last_payment_days_ago: last_paid.map(|d| days_between(d, today)),
        dso_avg_days: if dso_days.is_empty() {
            None
        } else {
            Some(dso_days.iter().sum::<i64>() as f64 / dso_days.len() as f64)
        },
        average_monthly_billing,
        distinct_months,
        overage_total: round_cents(overage_total),
        overage_percentage,
        margin_bleed_alert: overage_percentage > MARGIN_BLEED_THRESHOLD_PCT,
    }
}

/// Optional pre-filter applied before aggregation. Date bounds are
/// inclusive and compare against due_date; rows without a due date only
/// survive when no bound is set.
#[derive(Debug, Clone, Default)]
pub struct BillingFilter {
    pub status: Option<InvoiceStatus>,
    pub due_from: Option<NaiveDate>,
    pub due_to: Option<NaiveDate>,
    /// Keep only rows from the N most recent distinct reference months.
    pub last_months: Option<usize>,
}

pub fn filter_rows(rows: &[InvoiceRow], filter: &BillingFilter) -> Vec<InvoiceRow> {
    let month_cutoff: Option<BTreeSet<String>> = filter.last_months.map(|n| {
        let mut months: Vec<String> = rows.iter().filter_map(|r| r.month_key()).collect();
        months.sort();
        months.dedup();
        months.into_iter().rev().take(n).collect()
    });

    rows.iter()
        .filter(|row| {
            if let Some(status) = filter.status {
                if row.status() != status {
                    return false;
                }
            }
            if let Some(from) = filter.due_from {
                match row.due_date {
                    Some(due) if due >= from => {}
                    _ => return false,
                }
            }
            if let Some(to) = filter.due_to {
                match row.due_date {
                    Some(due) if due <= to => {}
                    _ => return false,
                }
            }
            if let Some(keep) = &month_cutoff {
                match row.month_key() {
                    Some(month) if keep.contains(&month) => {}
                    _ => return false,
                }
            }
            true
        })
        .cloned()
        .collect()
}
