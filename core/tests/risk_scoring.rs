//! Churn risk scoring: factor normalization, weighting, profiles,
//! advisory issue/action generation.

use chrono::NaiveDate;
use insights_core::{
    config::RiskConfig,
    invoice::InvoiceRow,
    risk_score::{assess, RiskProfile},
};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn paid_invoice(month: (i32, u32), amount: f64, delay_days: i64) -> InvoiceRow {
    let due = date(month.0, month.1, 10);
    InvoiceRow {
        customer_id: 1,
        due_date: Some(due),
        paid_date: Some(due + chrono::Duration::days(delay_days)),
        amount,
        status: "paid".into(),
        reference_month: Some(date(month.0, month.1, 1)),
        pageviews: 100.0,
        requests: 100.0,
        bandwidth_gb: 1.0,
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

fn factor<'a>(
    assessment: &'a insights_core::risk_score::RiskAssessment,
    name: &str,
) -> &'a insights_core::risk_score::RiskFactor {
    assessment
        .factors
        .iter()
        .find(|f| f.name == name)
        .unwrap_or_else(|| panic!("factor {name} missing"))
}

/// 30-day average delay saturates payment_delay at 10; with every other
/// factor at zero the composite is 10 × 0.30 = 3.0 → "moderate".
#[test]
fn thirty_day_delay_reference_scenario() {
    let rows = vec![
        paid_invoice((2024, 6), 100.0, 30),
        paid_invoice((2024, 5), 100.0, 30),
    ];
    let assessment = assess(&rows, &RiskConfig::default());

    let delay = factor(&assessment, "payment_delay");
    assert_eq!(delay.raw_value, 30.0);
    assert_eq!(delay.normalized, 10.0);
    assert_eq!(delay.weighted_contribution, 3.0);

    assert_eq!(assessment.score, 3.0);
    assert_eq!(assessment.profile, RiskProfile::Moderate);
}

#[test]
fn clean_history_is_stable() {
    let rows = vec![
        paid_invoice((2024, 6), 100.0, 0),
        paid_invoice((2024, 5), 100.0, 0),
        paid_invoice((2024, 4), 100.0, 0),
    ];
    let assessment = assess(&rows, &RiskConfig::default());
    assert_eq!(assessment.score, 0.0);
    assert_eq!(assessment.profile, RiskProfile::Stable);
    assert!(assessment.issues.is_empty());
    assert!(assessment.actions.is_empty());
}

/// Early payment is not negative risk: normalization clamps at 0.
#[test]
fn early_payment_clamps_to_zero() {
    let rows = vec![paid_invoice((2024, 6), 100.0, -5)];
    let assessment = assess(&rows, &RiskConfig::default());
    let delay = factor(&assessment, "payment_delay");
    assert_eq!(delay.raw_value, -5.0);
    assert_eq!(delay.normalized, 0.0);
}

#[test]
fn weights_sum_to_one() {
    let assessment = assess(&[], &RiskConfig::default());
    let total: f64 = assessment.factors.iter().map(|f| f.weight).sum();
    assert!((total - 1.0).abs() < 1e-9);
    assert_eq!(assessment.factors.len(), 5);
}

#[test]
fn overdue_frequency_factor() {
    // 2 of 4 invoices unpaid → 50% → 50/20 = 2.5 normalized.
    let mut rows = vec![
        paid_invoice((2024, 6), 100.0, 0),
        paid_invoice((2024, 5), 100.0, 0),
    ];
    let mut overdue = paid_invoice((2024, 4), 100.0, 0);
    overdue.status = "overdue".into();
    overdue.paid_date = None;
    let mut pending = paid_invoice((2024, 3), 100.0, 0);
    pending.status = "open".into();
    pending.paid_date = None;
    rows.push(overdue);
    rows.push(pending);

    let assessment = assess(&rows, &RiskConfig::default());
    let freq = factor(&assessment, "overdue_frequency");
    assert_eq!(freq.raw_value, 50.0);
    assert_eq!(freq.normalized, 2.5);
    assert!(
        assessment.issues.iter().any(|i| i.contains("2 of 4")),
        "unsettled-invoice issue expected: {:?}",
        assessment.issues
    );
}

/// A 50% usage drop saturates usage_trend (divisor 5).
#[test]
fn usage_decline_factor() {
    let mut rows: Vec<InvoiceRow> = Vec::new();
    for month in [(2024, 6), (2024, 5), (2024, 4)] {
        let mut inv = paid_invoice(month, 100.0, 0);
        inv.pageviews = 50.0;
        rows.push(inv);
    }
    for month in [(2024, 3), (2024, 2), (2024, 1)] {
        let mut inv = paid_invoice(month, 100.0, 0);
        inv.pageviews = 100.0;
        rows.push(inv);
    }

    let assessment = assess(&rows, &RiskConfig::default());
    let trend = factor(&assessment, "usage_trend");
    assert_eq!(trend.raw_value, 50.0, "a -50% change reads as +50 raw risk");
    assert_eq!(trend.normalized, 10.0);
    assert!(assessment
        .issues
        .iter()
        .any(|i| i.contains("declined")));
}

/// Invoices with no tier data count as already optimal, diluting the gap.
#[test]
fn tiering_gap_treats_missing_tiers_as_optimal() {
    let mut with_tier = paid_invoice((2024, 6), 100.0, 0);
    with_tier.tier_40_cost = Some(70.0);
    let without_tier = paid_invoice((2024, 5), 100.0, 0);

    let assessment = assess(&[with_tier, without_tier], &RiskConfig::default());
    let gap = factor(&assessment, "tiering_gap");
    // current 200, best 70 + 100 = 170 → gap 15%.
    assert_eq!(gap.raw_value, 15.0);
    assert_eq!(gap.normalized, 5.0);
}

#[test]
fn tiering_gap_zero_when_current_is_cheapest() {
    let mut inv = paid_invoice((2024, 6), 100.0, 0);
    inv.tier_40_cost = Some(150.0);
    let assessment = assess(&[inv], &RiskConfig::default());
    assert_eq!(factor(&assessment, "tiering_gap").raw_value, 0.0);
}

#[test]
fn overage_factor_over_all_rows() {
    let mut rows = vec![
        paid_invoice((2024, 6), 100.0, 0),
        paid_invoice((2024, 5), 100.0, 0),
    ];
    rows[0].extra_pageviews_price = 30.0;
    rows[1].extra_bw_price = 30.0;
    // seats/support never count toward overage
    rows[0].seats_builder_cost = 100.0;

    let assessment = assess(&rows, &RiskConfig::default());
    let overage = factor(&assessment, "overage_percentage");
    assert_eq!(overage.raw_value, 30.0);
    assert_eq!(overage.normalized, 5.0);
}

/// Payment delay and overdue invoices both suggest dunning; the action
/// list carries it once.
#[test]
fn duplicate_actions_are_deduplicated() {
    let mut rows = vec![
        paid_invoice((2024, 6), 100.0, 20),
        paid_invoice((2024, 5), 100.0, 20),
    ];
    let mut overdue = paid_invoice((2024, 4), 100.0, 0);
    overdue.status = "overdue".into();
    overdue.paid_date = None;
    rows.push(overdue);

    let assessment = assess(&rows, &RiskConfig::default());
    let dunning_actions = assessment
        .actions
        .iter()
        .filter(|a| a.contains("dunning"))
        .count();
    assert_eq!(dunning_actions, 1, "actions: {:?}", assessment.actions);
}

#[test]
fn profile_thresholds() {
    assert_eq!(RiskProfile::from_score(0.0), RiskProfile::Stable);
    assert_eq!(RiskProfile::from_score(1.0), RiskProfile::Stable);
    assert_eq!(RiskProfile::from_score(1.1), RiskProfile::Moderate);
    assert_eq!(RiskProfile::from_score(3.0), RiskProfile::Moderate);
    assert_eq!(RiskProfile::from_score(5.0), RiskProfile::Elevated);
    assert_eq!(RiskProfile::from_score(7.0), RiskProfile::High);
    assert_eq!(RiskProfile::from_score(7.1), RiskProfile::Critical);
}

#[test]
fn empty_history_scores_zero() {
    let assessment = assess(&[], &RiskConfig::default());
    assert_eq!(assessment.score, 0.0);
    assert_eq!(assessment.profile, RiskProfile::Stable);
}
