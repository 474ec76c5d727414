//! Invoice decomposition, period comparison and the narrative report.

use chrono::NaiveDate;
use insights_core::{
    invoice::InvoiceRow,
    invoice_breakdown::{
        breakdown, compare, find_by_month, normalize_month_key, prior_invoice, render_report,
        ChangeDirection, MonthLookup,
    },
};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn invoice(month: (i32, u32), amount: f64) -> InvoiceRow {
    InvoiceRow {
        customer_id: 1,
        due_date: Some(date(month.0, month.1, 10)),
        paid_date: None,
        amount,
        status: "paid".into(),
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

/// amount=2000 with extras 300+50+30+100+80 → extras 560, base 1440, 28%.
#[test]
fn breakdown_reference_scenario() {
    let mut inv = invoice((2024, 5), 2000.0);
    inv.extra_pageviews_price = 300.0;
    inv.extra_req_price = 50.0;
    inv.extra_bw_price = 30.0;
    inv.seats_builder_cost = 100.0;
    inv.support_price = 80.0;

    let b = breakdown(&inv);
    assert_eq!(b.total_extras, 560.0);
    assert_eq!(b.base_plan, 1440.0);
    assert_eq!(b.extras_percentage, 28.0);
}

/// Extras exceeding the amount is a data anomaly: base floors at 0.
#[test]
fn base_plan_floors_at_zero() {
    let mut inv = invoice((2024, 5), 100.0);
    inv.support_price = 150.0;
    let b = breakdown(&inv);
    assert_eq!(b.base_plan, 0.0);
}

#[test]
fn zero_amount_has_zero_extras_percentage() {
    let mut inv = invoice((2024, 5), 0.0);
    inv.support_price = 10.0;
    assert_eq!(breakdown(&inv).extras_percentage, 0.0);
}

/// Only present-and-positive tier costs are surfaced.
#[test]
fn tiering_simulation_filters_absent_tiers() {
    let mut inv = invoice((2024, 5), 500.0);
    inv.tier_40_cost = Some(420.0);
    inv.tier_50_cost = Some(0.0);
    inv.tier_80_cost = None;
    let b = breakdown(&inv);
    assert_eq!(b.tiering.tier_40, Some(420.0));
    assert_eq!(b.tiering.tier_50, None);
    assert_eq!(b.tiering.tier_80, None);
}

#[test]
fn comparison_direction_and_percent() {
    let current = invoice((2024, 5), 1200.0);
    let previous = invoice((2024, 4), 1000.0);
    let cmp = compare(&current, &previous);
    assert_eq!(cmp.amount_change_abs, 200.0);
    assert_eq!(cmp.amount_change_pct, Some(20.0));
    assert_eq!(cmp.direction, ChangeDirection::Increased);
}

/// Percent change is undefined against a zero-amount previous invoice.
#[test]
fn comparison_pct_null_when_previous_is_zero() {
    let cmp = compare(&invoice((2024, 5), 500.0), &invoice((2024, 4), 0.0));
    assert_eq!(cmp.amount_change_pct, None);
    assert_eq!(cmp.direction, ChangeDirection::Increased);
}

/// Equal absolute deltas resolve to the component listed first in the
/// fixed order (base_plan before any extra).
#[test]
fn biggest_driver_tie_breaks_on_fixed_order() {
    // Previous: base 100 (amount 100, no extras).
    // Current: base 200, support 100 — both deltas are +100.
    let previous = invoice((2024, 4), 100.0);
    let mut current = invoice((2024, 5), 300.0);
    current.support_price = 100.0;

    let cmp = compare(&current, &previous);
    assert_eq!(cmp.biggest_driver.component, "base_plan");
    assert_eq!(cmp.biggest_driver.delta, 100.0);
}

/// A decrease can be the biggest driver: absolute delta wins.
#[test]
fn biggest_driver_uses_absolute_delta() {
    let mut previous = invoice((2024, 4), 1000.0);
    previous.extra_bw_price = 400.0; // base 600
    let mut current = invoice((2024, 5), 650.0);
    current.extra_bw_price = 20.0; // base 630

    let cmp = compare(&current, &previous);
    assert_eq!(cmp.biggest_driver.component, "extra_bandwidth");
    assert_eq!(cmp.biggest_driver.delta, -380.0);
}

#[test]
fn month_key_normalization_accepts_both_forms() {
    assert_eq!(normalize_month_key("2024-05").unwrap(), "2024-05");
    assert_eq!(normalize_month_key(" 2024-05-15 ").unwrap(), "2024-05");
    assert!(normalize_month_key("May 2024").is_err());
    assert!(normalize_month_key("2024/05").is_err());
    assert!(normalize_month_key("24-05").is_err());
}

#[test]
fn month_lookup_finds_matching_invoice() {
    let rows = vec![invoice((2024, 6), 100.0), invoice((2024, 5), 90.0)];
    match find_by_month(&rows, "2024-05-01").unwrap() {
        MonthLookup::Found { index } => assert_eq!(index, 1),
        other => panic!("Expected Found, got {other:?}"),
    }
}

/// A missing month is a soft miss listing available months ascending,
/// deduplicated — not an error.
#[test]
fn month_lookup_miss_lists_available_months() {
    let rows = vec![
        invoice((2024, 6), 100.0),
        invoice((2024, 4), 90.0),
        invoice((2024, 4), 10.0),
    ];
    match find_by_month(&rows, "2024-01").unwrap() {
        MonthLookup::NotFound {
            requested,
            available_months,
        } => {
            assert_eq!(requested, "2024-01");
            assert_eq!(available_months, vec!["2024-04", "2024-06"]);
        }
        other => panic!("Expected NotFound, got {other:?}"),
    }
}

/// The earliest invoice has no prior period; that is a None comparison,
/// not an error.
#[test]
fn earliest_invoice_has_no_prior() {
    let rows = vec![invoice((2024, 6), 100.0), invoice((2024, 5), 90.0)];
    assert!(prior_invoice(&rows, 0).is_some());
    assert!(prior_invoice(&rows, 1).is_none());
}

#[test]
fn narrative_contains_required_markers() {
    let mut inv = invoice((2024, 5), 2000.0);
    inv.status = "Overdue".into();
    inv.extra_pageviews_price = 900.0; // 45% extras

    let b = breakdown(&inv);
    let prev = invoice((2024, 4), 1000.0);
    let cmp = compare(&inv, &prev); // +100%
    let text = render_report("Acme Corp", &b, Some(&cmp));

    assert!(text.contains("2024-05"), "reference month missing");
    assert!(text.contains("Acme Corp"), "customer name missing");
    assert!(text.contains("OVERDUE"), "overdue marker missing");
    assert!(
        text.contains("extras are 45.0%"),
        "extras alert missing: {text}"
    );
    assert!(
        text.contains("100.0% versus the previous period"),
        "swing alert missing: {text}"
    );
}

#[test]
fn narrative_omits_alerts_when_healthy() {
    let inv = invoice((2024, 5), 1000.0);
    let b = breakdown(&inv);
    let text = render_report("Globex", &b, None);
    assert!(!text.contains("ALERT"));
    assert!(!text.contains("OVERDUE"));
}
