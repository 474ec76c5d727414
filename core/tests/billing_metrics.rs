//! Billing aggregation: status buckets, DSO, distinct-month averages,
//! overage alerts.

use chrono::NaiveDate;
use insights_core::{
    billing_metrics::{compute, filter_rows, BillingFilter},
    invoice::{InvoiceRow, InvoiceStatus},
};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn invoice(month: (i32, u32), amount: f64, status: &str) -> InvoiceRow {
    InvoiceRow {
        customer_id: 1,
        due_date: Some(date(month.0, month.1, 10)),
        paid_date: None,
        amount,
        status: status.into(),
        reference_month: Some(date(month.0, month.1, 1)),
        pageviews: 0.0,
        requests: 0.0,
        bandwidth_gb: 0.0,
        pageviews_ratio: 0.0,
        requests_ratio: 0.0,
        extra_pageviews_price: 0.0,
        extra_req_price: 0.0,
        extra_bw_price: 0.0,
        seats_builder_cost: 0.0,
        support_price: 0.0,
        tier_40_cost: None,
        tier_50_cost: None,
        tier_80_cost: None,
    }
}

fn paid(month: (i32, u32), amount: f64, paid_day: u32) -> InvoiceRow {
    let mut inv = invoice(month, amount, "Paid");
    inv.paid_date = Some(date(month.0, month.1, paid_day));
    inv
}

const TODAY: (i32, u32, u32) = (2024, 7, 1);

#[test]
fn totals_bucketed_by_normalized_status() {
    let rows = vec![
        paid((2024, 6), 100.0, 12),
        invoice((2024, 5), 200.0, "OVERDUE"),
        invoice((2024, 4), 50.0, "open"),
        invoice((2024, 3), 75.0, "Pending"),
        invoice((2024, 2), 999.0, "disputed"), // unrecognized bucket
    ];
    let m = compute(&rows, date(TODAY.0, TODAY.1, TODAY.2));

    assert_eq!(m.total_billed, 1424.0);
    assert_eq!(m.paid_total, 100.0);
    assert_eq!(m.overdue_total, 200.0);
    assert_eq!(m.pending_total, 125.0, "open and pending share a bucket");
    assert_eq!(m.invoices_paid, 1);
    assert_eq!(m.invoices_overdue, 1);
    assert_eq!(m.invoices_total, 5);
}

/// Two invoices in the same reference month count as one month for the
/// average denominator.
#[test]
fn monthly_average_uses_distinct_months() {
    let rows = vec![
        invoice((2024, 5), 300.0, "paid"),
        invoice((2024, 5), 100.0, "paid"), // adjustment row, same month
        invoice((2024, 4), 200.0, "paid"),
    ];
    let m = compute(&rows, date(TODAY.0, TODAY.1, TODAY.2));
    assert_eq!(m.distinct_months, 2);
    assert_eq!(m.average_monthly_billing, 300.0);
}

#[test]
fn monthly_average_denominator_floors_at_one() {
    let mut inv = invoice((2024, 5), 120.0, "paid");
    inv.reference_month = None;
    let m = compute(&[inv], date(TODAY.0, TODAY.1, TODAY.2));
    assert_eq!(m.distinct_months, 0);
    assert_eq!(m.average_monthly_billing, 120.0);
}

#[test]
fn dso_is_mean_of_due_to_paid_gaps() {
    let rows = vec![
        paid((2024, 6), 100.0, 20), // due 10th, paid 20th: 10 days
        paid((2024, 5), 100.0, 14), // 4 days
        invoice((2024, 4), 100.0, "overdue"),
    ];
    let m = compute(&rows, date(TODAY.0, TODAY.1, TODAY.2));
    assert_eq!(m.dso_avg_days, Some(7.0));
}

#[test]
fn dso_is_null_without_paid_dates() {
    let rows = vec![invoice((2024, 6), 100.0, "overdue")];
    let m = compute(&rows, date(TODAY.0, TODAY.1, TODAY.2));
    assert_eq!(m.dso_avg_days, None);
    assert_eq!(m.last_payment_days_ago, None);
}

/// Days since the most recent paid_date, measured from the injected "today".
#[test]
fn last_payment_days_ago_uses_latest_payment() {
    let rows = vec![
        paid((2024, 6), 100.0, 21), // 2024-06-21, 10 days before July 1
        paid((2024, 5), 100.0, 15),
    ];
    let m = compute(&rows, date(2024, 7, 1));
    assert_eq!(m.last_payment_days_ago, Some(10));
}

#[test]
fn overage_percentage_and_margin_alert() {
    let mut inv = invoice((2024, 6), 1000.0, "paid");
    inv.extra_pageviews_price = 250.0;
    inv.extra_req_price = 100.0;
    inv.extra_bw_price = 60.0;
    // Seats/support are not usage overage.
    inv.seats_builder_cost = 500.0;
    let m = compute(&[inv], date(TODAY.0, TODAY.1, TODAY.2));
    assert_eq!(m.overage_total, 410.0);
    assert_eq!(m.overage_percentage, 41.0);
    assert!(m.margin_bleed_alert, "41% overage crosses the 40% threshold");
}

#[test]
fn zero_billing_has_zero_overage_percentage() {
    let m = compute(&[], date(TODAY.0, TODAY.1, TODAY.2));
    assert_eq!(m.overage_percentage, 0.0);
    assert!(!m.margin_bleed_alert);
}

/// Monetary outputs are multiples of 0.01.
#[test]
fn monetary_outputs_are_cent_aligned() {
    let rows = vec![
        invoice((2024, 6), 10.005, "paid"),
        invoice((2024, 5), 33.333, "overdue"),
        invoice((2024, 4), 0.015, "pending"),
    ];
    let m = compute(&rows, date(TODAY.0, TODAY.1, TODAY.2));
    for value in [
        m.total_billed,
        m.paid_total,
        m.overdue_total,
        m.pending_total,
        m.overage_total,
        m.average_monthly_billing,
    ] {
        let cents = value * 100.0;
        assert!(
            (cents - cents.round()).abs() < 1e-6,
            "{value} is not cent-aligned"
        );
    }
}

/// Aggregation never mutates its input: two runs agree exactly.
#[test]
fn aggregation_is_idempotent() {
    let rows = vec![
        paid((2024, 6), 123.45, 18),
        invoice((2024, 5), 67.89, "overdue"),
        invoice((2024, 5), 10.0, "open"),
    ];
    let first = compute(&rows, date(TODAY.0, TODAY.1, TODAY.2));
    let second = compute(&rows, date(TODAY.0, TODAY.1, TODAY.2));
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[test]
fn filter_by_status_and_month_window() {
    let rows = vec![
        invoice((2024, 6), 100.0, "paid"),
        invoice((2024, 5), 200.0, "overdue"),
        invoice((2024, 4), 300.0, "paid"),
        invoice((2024, 3), 400.0, "paid"),
    ];

    let paid_only = filter_rows(
        &rows,
        &BillingFilter {
            status: Some(InvoiceStatus::Paid),
            ..Default::default()
        },
    );
    assert_eq!(paid_only.len(), 3);

    let recent = filter_rows(
        &rows,
        &BillingFilter {
            last_months: Some(2),
            ..Default::default()
        },
    );
    assert_eq!(recent.len(), 2);
    assert!(recent.iter().all(|r| r.amount <= 200.0));
}

#[test]
fn filter_by_due_date_range_is_inclusive() {
    let rows = vec![
        invoice((2024, 6), 100.0, "paid"),
        invoice((2024, 5), 200.0, "paid"),
        invoice((2024, 4), 300.0, "paid"),
    ];
    let filtered = filter_rows(
        &rows,
        &BillingFilter {
            due_from: Some(date(2024, 5, 10)),
            due_to: Some(date(2024, 6, 10)),
            ..Default::default()
        },
    );
    assert_eq!(filtered.len(), 2, "both boundary due dates survive");
}
