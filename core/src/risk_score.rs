//! Churn risk scoring — five weighted, normalized factors.
//!
//! Each factor normalizes its raw value onto [0, 10] via
//! `clamp(raw / divisor, 0, 10)`; the composite is the weight-sum of the
//! normalized values and the weights sum to 1.0, so the score stays in
//! [0, 10]. Issue/action text is advisory only and never feeds back into
//! the score.

use crate::{
    config::RiskConfig,
    invoice::{days_between, round2, InvoiceRow, InvoiceStatus},
    usage_trends::percent_change,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskFactor {
    pub name: String,
    pub weight: f64,
    pub raw_value: f64,
    pub normalized: f64,
    pub weighted_contribution: f64,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskProfile {
    Stable,
    Moderate,
    Elevated,
    High,
    Critical,
}

impl RiskProfile {
    /// Thresholds apply to the final rounded score.
    pub fn from_score(score: f64) -> Self {
        if score <= 1.0 {
            Self::Stable
        } else if score <= 3.0 {
            Self::Moderate
        } else if score <= 5.0 {
            Self::Elevated
        } else if score <= 7.0 {
            Self::High
        } else {
            Self::Critical
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskAssessment {
    /// Composite churn risk, 0–10, rounded to one decimal.
    pub score: f64,
    pub profile: RiskProfile,
    pub factors: Vec<RiskFactor>,
    pub issues: Vec<String>,
    pub actions: Vec<String>,
}

/// Score one customer's rows (newest due date first).
pub fn assess(rows: &[InvoiceRow], cfg: &RiskConfig) -> RiskAssessment {
    let w = &cfg.weights;
    let d = &cfg.divisors;

    let mut issues: Vec<String> = Vec::new();
    let mut actions: Vec<String> = Vec::new();

    // Factor 1: average payment delay over paid invoices with both dates.
    let delays: Vec<f64> = rows
        .iter()
        .filter(|r| r.status() == InvoiceStatus::Paid)
        .filter_map(|r| match (r.due_date, r.paid_date) {
            (Some(due), Some(paid)) => Some(days_between(due, paid) as f64),
            _ => None,
        })
        .collect();
    let avg_delay = mean(&delays);
    if avg_delay > cfg.delay_issue_days {
        issues.push(format!(
            "Payments arrive {avg_delay:.0} days after the due date on average"
        ));
        push_unique(&mut actions, "Tighten dunning and payment reminders");
    }

    // Factor 2: pageview trajectory over the recent invoice window.
    let trend_rows = &rows[..rows.len().min(cfg.recent_invoice_window)];
    let recent_pv = mean(
        &trend_rows[..trend_rows.len().min(3)]
            .iter()
            .map(|r| r.pageviews)
            .collect::<Vec<_>>(),
    );
    let previous_pv = mean(
        &trend_rows[trend_rows.len().min(3)..trend_rows.len().min(6)]
            .iter()
            .map(|r| r.pageviews)
            .collect::<Vec<_>>(),
    );
    let pv_change_pct = percent_change(previous_pv, recent_pv).unwrap_or(0.0);
    // A decline raises risk, growth lowers it (clamped at 0 anyway).
    let usage_trend_raw = -pv_change_pct;
    if pv_change_pct < -cfg.usage_decline_issue_pct {
        issues.push(format!(
            "Usage declined {:.1}% over the last 3 periods",
            -pv_change_pct
        ));
        push_unique(&mut actions, "Schedule a check-in before renewal");
    }

    // Factor 3: share of invoices not marked paid.
    let overdue_count = rows
        .iter()
        .filter(|r| r.status() != InvoiceStatus::Paid)
        .count();
    let overdue_rate_pct = if rows.is_empty() {
        0.0
    } else {
        overdue_count as f64 / rows.len() as f64 * 100.0
    };
    if overdue_count > 0 {
        issues.push(format!(
            "{overdue_count} of {} invoices are not settled",
            rows.len()
        ));
        push_unique(&mut actions, "Tighten dunning and payment reminders");
    }

    // Factor 4: usage overage share of total billing, all rows.
    let total_billed: f64 = rows.iter().map(|r| r.amount).sum();
    let overage: f64 = rows.iter().map(|r| r.usage_overage()).sum();
    let overage_pct = if total_billed > 0.0 {
        overage / total_billed * 100.0
    } else {
        0.0
    };
    if overage_pct > cfg.overage_issue_pct {
        issues.push(format!(
            "Overage charges are {overage_pct:.1}% of total billing"
        ));
        push_unique(&mut actions, "Review plan limits against actual usage");
    }

    // Factor 5: gap between actual spend and the cheapest simulated tier
    // over the recent window. Invoices without tier data count as already
    // optimal.
    let tier_rows = &rows[..rows.len().min(cfg.recent_invoice_window)];
    let current_spend: f64 = tier_rows.iter().map(|r| r.amount).sum();
    let best_spend: f64 = tier_rows.iter().map(|r| r.best_tier_cost()).sum();
    let tiering_gap_pct = if current_spend > best_spend && current_spend > 0.0 {
        (current_spend - best_spend) / current_spend * 100.0
    } else {
        0.0
    };
    if tiering_gap_pct > cfg.tiering_gap_issue_pct {
        push_unique(&mut actions, "Discuss migrating to a better-fit tier");
    }

    let factors = vec![
        factor(
            "payment_delay",
            w.payment_delay,
            avg_delay,
            d.payment_delay,
            "Average days between due date and payment",
        ),
        factor(
            "usage_trend",
            w.usage_trend,
            usage_trend_raw,
            d.usage_trend,
            "Pageview decline, recent 3 periods vs previous 3",
        ),
        factor(
            "overdue_frequency",
            w.overdue_frequency,
            overdue_rate_pct,
            d.overdue_frequency,
            "Share of invoices not marked paid",
        ),
        factor(
            "overage_percentage",
            w.overage_percentage,
            overage_pct,
            d.overage_percentage,
            "Usage overage share of total billing",
        ),
        factor(
            "tiering_gap",
            w.tiering_gap,
            tiering_gap_pct,
            d.tiering_gap,
            "Spend above the cheapest simulated tier",
        ),
    ];

    let composite: f64 = factors.iter().map(|f| f.normalized * f.weight).sum();
    let score = (composite * 10.0).round() / 10.0;

    RiskAssessment {
        score,
        profile: RiskProfile::from_score(score),
        factors,
        issues,
        actions,
    }
}

fn factor(name: &str, weight: f64, raw: f64, divisor: f64, description: &str) -> RiskFactor {
    let normalized = (raw / divisor).clamp(0.0, 10.0);
    RiskFactor {
        name: name.to_string(),
        weight,
        raw_value: round2(raw),
        normalized: round2(normalized),
        weighted_contribution: round2(normalized * weight),
        description: description.to_string(),
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

fn push_unique(list: &mut Vec<String>, item: &str) {
    if !list.iter().any(|existing| existing == item) {
        list.push(item.to_string());
    }
}
