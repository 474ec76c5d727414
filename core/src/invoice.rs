//! Typed billing rows and the status normalization boundary.
//!
//! Rows arrive from the store already converted to this strict shape;
//! the analytics components never see raw, duck-typed rows. Source data
//! quality is known to be inconsistent, so conversion tolerates anomalies
//! (unparseable dates become `None`, extras exceeding the invoice amount
//! floor the base plan at 0) instead of failing.

use crate::types::{CustomerId, MonthKey};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One billing row: one customer, one reference month. Multiple rows may
/// share a reference month (adjustments), which is why monthly averages
/// divide by distinct months rather than row count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceRow {
    pub customer_id: CustomerId,
    pub due_date: Option<NaiveDate>,
    pub paid_date: Option<NaiveDate>,
    pub amount: f64,
    /// Free-text status as stored. Normalize through [`InvoiceStatus::parse`].
    pub status: String,
    /// First-of-month date acting as the period key.
    pub reference_month: Option<NaiveDate>,
    pub pageviews: f64,
    pub requests: f64,
    pub bandwidth_gb: f64,
    pub pageviews_ratio: f64,
    pub requests_ratio: f64,
    pub extra_pageviews_price: f64,
    pub extra_req_price: f64,
    pub extra_bw_price: f64,
    pub seats_builder_cost: f64,
    pub support_price: f64,
    pub tier_40_cost: Option<f64>,
    pub tier_50_cost: Option<f64>,
    pub tier_80_cost: Option<f64>,
}

impl InvoiceRow {
    pub fn status(&self) -> InvoiceStatus {
        InvoiceStatus::parse(&self.status)
    }

    /// All five extra-cost fields.
    pub fn total_extras(&self) -> f64 {
        self.extra_pageviews_price
            + self.extra_req_price
            + self.extra_bw_price
            + self.seats_builder_cost
            + self.support_price
    }

    /// Usage overage only: the three extra-cost fields tied to plan limits
    /// (pageviews, requests, bandwidth). Seats and support are excluded.
    pub fn usage_overage(&self) -> f64 {
        self.extra_pageviews_price + self.extra_req_price + self.extra_bw_price
    }

    /// Derived base plan, floored at 0 when extras exceed the amount.
    pub fn base_plan(&self) -> f64 {
        (self.amount - self.total_extras()).max(0.0)
    }

    pub fn month_key(&self) -> Option<MonthKey> {
        self.reference_month.map(|d| d.format("%Y-%m").to_string())
    }

    /// Cheapest simulated alternative tier. An invoice with no positive
    /// tier data is treated as already optimal (its own amount).
    pub fn best_tier_cost(&self) -> f64 {
        [self.tier_40_cost, self.tier_50_cost, self.tier_80_cost]
            .into_iter()
            .flatten()
            .filter(|c| *c > 0.0)
            .fold(None::<f64>, |best, c| {
                Some(best.map_or(c, |b: f64| b.min(c)))
            })
            .unwrap_or(self.amount)
    }
}

/// Closed status enum. Recognized synonyms:
///   "paid"             → Paid
///   "overdue"          → Overdue
///   "pending" | "open" → Pending
///   anything else      → Other
/// Matching is case-insensitive on the trimmed input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Paid,
    Overdue,
    Pending,
    Other,
}

impl InvoiceStatus {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "paid" => Self::Paid,
            "overdue" => Self::Overdue,
            "pending" | "open" => Self::Pending,
            _ => Self::Other,
        }
    }
}

/// Round-half-up at the cent. Every monetary output passes through this,
/// so totals are multiples of 0.01.
pub fn round_cents(value: f64) -> f64 {
    (value * 100.0 + 0.5).floor() / 100.0
}

/// Two-decimal rounding for percentages and other non-monetary readouts.
pub fn round2(value: f64) -> f64 {
    round_cents(value)
}

/// Tolerant `YYYY-MM-DD` parse. Anything else is a data anomaly → `None`.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    // Date-time strings from the columnar store carry a time suffix.
    let date_part = trimmed.split(|c| c == 'T' || c == ' ').next()?;
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

/// Whole days between two dates, ignoring sub-day components.
pub fn days_between(from: NaiveDate, to: NaiveDate) -> i64 {
    (to - from).num_days()
}
