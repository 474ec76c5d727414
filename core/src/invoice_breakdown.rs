//! Invoice decomposition and period-over-period comparison.
//!
//! Splits one invoice into base plan + extras, compares it against the
//! prior period, attributes the biggest cost driver and renders the
//! narrative report callers scrape for literal markers (reference month,
//! customer name, "OVERDUE", alert lines).

use crate::{
    error::{InsightError, InsightResult},
    invoice::{round2, round_cents, InvoiceRow, InvoiceStatus},
    types::MonthKey,
};
use serde::{Deserialize, Serialize};

pub const EXTRAS_ALERT_THRESHOLD_PCT: f64 = 40.0;
pub const SWING_ALERT_THRESHOLD_PCT: f64 = 20.0;

/// Fixed component order. Biggest-driver ties resolve to the earliest
/// entry, so this order is part of the contract.
pub const COMPONENT_ORDER: [&str; 6] = [
    "base_plan",
    "extra_pageviews",
    "extra_requests",
    "extra_bandwidth",
    "seats_builder",
    "support",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceBreakdown {
    pub reference_month: Option<MonthKey>,
    pub amount: f64,
    pub base_plan: f64,
    pub total_extras: f64,
    /// Share of the invoice attributable to extras (0 when amount <= 0).
    pub extras_percentage: f64,
    pub extra_pageviews: f64,
    pub extra_requests: f64,
    pub extra_bandwidth: f64,
    pub seats_builder: f64,
    pub support: f64,
    pub status: String,
    pub due_date: Option<chrono::NaiveDate>,
    pub paid_date: Option<chrono::NaiveDate>,
    pub tiering: TieringSimulation,
}

/// Simulated alternative-tier costs; a tier is surfaced only when its
/// cost is present and positive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TieringSimulation {
    pub tier_40: Option<f64>,
    pub tier_50: Option<f64>,
    pub tier_80: Option<f64>,
}

pub fn breakdown(inv: &InvoiceRow) -> InvoiceBreakdown {
    let total_extras = inv.total_extras();
    let extras_percentage = if inv.amount > 0.0 {
        round2(total_extras / inv.amount * 100.0)
    } else {
        0.0
    };

    InvoiceBreakdown {
        reference_month: inv.month_key(),
        amount: round_cents(inv.amount),
        base_plan: round_cents(inv.base_plan()),
        total_extras: round_cents(total_extras),
        extras_percentage,
        extra_pageviews: round_cents(inv.extra_pageviews_price),
        extra_requests: round_cents(inv.extra_req_price),
        extra_bandwidth: round_cents(inv.extra_bw_price),
        seats_builder: round_cents(inv.seats_builder_cost),
        support: round_cents(inv.support_price),
        status: inv.status.clone(),
        due_date: inv.due_date,
        paid_date: inv.paid_date,
        tiering: TieringSimulation {
            tier_40: positive(inv.tier_40_cost),
            tier_50: positive(inv.tier_50_cost),
            tier_80: positive(inv.tier_80_cost),
        },
    }
}

fn positive(cost: Option<f64>) -> Option<f64> {
    cost.filter(|c| *c > 0.0)
}

// ── Comparison ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeDirection {
    Increased,
    Decreased,
    Unchanged,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentDelta {
    pub component: String,
    pub current: f64,
    pub previous: f64,
    pub delta: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceComparison {
    pub previous_month: Option<MonthKey>,
    pub amount_change_abs: f64,
    /// None when the previous total is 0 (undefined percent base).
    pub amount_change_pct: Option<f64>,
    pub direction: ChangeDirection,
    /// One delta per component, in [`COMPONENT_ORDER`].
    pub component_deltas: Vec<ComponentDelta>,
    /// The component with the largest absolute delta; ties go to the
    /// earlier entry in [`COMPONENT_ORDER`].
    pub biggest_driver: ComponentDelta,
}

fn components(inv: &InvoiceRow) -> [f64; 6] {
    [
        inv.base_plan(),
        inv.extra_pageviews_price,
        inv.extra_req_price,
        inv.extra_bw_price,
        inv.seats_builder_cost,
        inv.support_price,
    ]
}

pub fn compare(current: &InvoiceRow, previous: &InvoiceRow) -> InvoiceComparison {
    let delta_abs = current.amount - previous.amount;
    let direction = if current.amount > previous.amount {
        ChangeDirection::Increased
    } else if current.amount < previous.amount {
        ChangeDirection::Decreased
    } else {
        ChangeDirection::Unchanged
    };

    let cur = components(current);
    let prev = components(previous);
    let component_deltas: Vec<ComponentDelta> = COMPONENT_ORDER
        .iter()
        .zip(cur.iter().zip(prev.iter()))
        .map(|(name, (c, p))| ComponentDelta {
            component: (*name).to_string(),
            current: round_cents(*c),
            previous: round_cents(*p),
            delta: round_cents(c - p),
        })
        .collect();

    // Strict > keeps the first-listed component on ties.
    let mut biggest = component_deltas[0].clone();
    for d in &component_deltas[1..] {
        if d.delta.abs() > biggest.delta.abs() {
            biggest = d.clone();
        }
    }

    InvoiceComparison {
        previous_month: previous.month_key(),
        amount_change_abs: round_cents(delta_abs),
        amount_change_pct: if previous.amount == 0.0 {
            None
        } else {
            Some(round2(delta_abs / previous.amount * 100.0))
        },
        direction,
        component_deltas,
        biggest_driver: biggest,
    }
}

// ── Month lookup ─────────────────────────────────────────────────────────────

/// Soft lookup result: a missing month is an answer (with the available
/// months), not an error.
#[derive(Debug, Clone)]
pub enum MonthLookup {
    /// Index into the newest-first row slice.
    Found { index: usize },
    NotFound {
        requested: MonthKey,
        available_months: Vec<MonthKey>,
    },
}

/// Normalize `YYYY-MM` or `YYYY-MM-DD` input to a 7-char month key.
pub fn normalize_month_key(input: &str) -> InsightResult<MonthKey> {
    let trimmed = input.trim();
    let bytes = trimmed.as_bytes();
    let shape_ok = (trimmed.len() == 7 || trimmed.len() == 10)
        && bytes[..4].iter().all(u8::is_ascii_digit)
        && bytes[4] == b'-'
        && bytes[5..7].iter().all(u8::is_ascii_digit)
        && (trimmed.len() == 7
            || (bytes[7] == b'-' && bytes[8..10].iter().all(u8::is_ascii_digit)));
    if !shape_ok {
        return Err(InsightError::Input(format!(
            "Invalid month \"{trimmed}\". Use YYYY-MM or YYYY-MM-DD."
        )));
    }
    Ok(trimmed[..7].to_string())
}

/// Locate the invoice whose reference month matches the requested key.
/// Rows are the customer's invoices, newest due date first.
pub fn find_by_month(rows: &[InvoiceRow], month: &str) -> InsightResult<MonthLookup> {
    let key = normalize_month_key(month)?;

    if let Some(index) = rows.iter().position(|r| r.month_key().as_deref() == Some(&key)) {
        return Ok(MonthLookup::Found { index });
    }

    let mut available: Vec<MonthKey> = rows.iter().filter_map(|r| r.month_key()).collect();
    available.sort();
    available.dedup();
    Ok(MonthLookup::NotFound {
        requested: key,
        available_months: available,
    })
}

/// The prior-period invoice in a newest-first series, if any.
pub fn prior_invoice(rows: &[InvoiceRow], index: usize) -> Option<&InvoiceRow> {
    rows.get(index + 1)
}

// ── Narrative report ─────────────────────────────────────────────────────────

/// Free-form Markdown, but callers depend on literal markers: the
/// reference month, the customer name, "OVERDUE" for overdue invoices,
/// and the alert lines.
pub fn render_report(
    customer_name: &str,
    b: &InvoiceBreakdown,
    comparison: Option<&InvoiceComparison>,
) -> String {
    let month = b.reference_month.as_deref().unwrap_or("unknown month");
    let mut out = String::new();

    out.push_str(&format!("# Invoice {month} — {customer_name}\n\n"));

    let status_note = if b.status() == InvoiceStatus::Overdue {
        " (OVERDUE)"
    } else {
        ""
    };
    out.push_str(&format!(
        "Total: ${:.2}{status_note} — status \"{}\"\n\n",
        b.amount, b.status
    ));

    out.push_str("## Cost breakdown\n");
    out.push_str(&format!("- Base plan: ${:.2}\n", b.base_plan));
    out.push_str(&format!("- Extra pageviews: ${:.2}\n", b.extra_pageviews));
    out.push_str(&format!("- Extra requests: ${:.2}\n", b.extra_requests));
    out.push_str(&format!("- Extra bandwidth: ${:.2}\n", b.extra_bandwidth));
    out.push_str(&format!("- Seats/builder: ${:.2}\n", b.seats_builder));
    out.push_str(&format!("- Support: ${:.2}\n", b.support));
    out.push_str(&format!(
        "- Extras total: ${:.2} ({:.1}% of invoice)\n\n",
        b.total_extras, b.extras_percentage
    ));

    out.push_str("## Payment\n");
    out.push_str(&format!(
        "- Due: {}\n",
        b.due_date.map_or("n/a".into(), |d| d.to_string())
    ));
    out.push_str(&format!(
        "- Paid: {}\n\n",
        b.paid_date.map_or("not paid".into(), |d| d.to_string())
    ));

    if let Some(cmp) = comparison {
        out.push_str("## Versus previous period\n");
        let pct = cmp
            .amount_change_pct
            .map_or("n/a".into(), |p| format!("{p:.1}%"));
        out.push_str(&format!(
            "- Amount {}: {:+.2} ({pct})\n",
            direction_word(cmp.direction),
            cmp.amount_change_abs
        ));
        out.push_str(&format!(
            "- Biggest driver: {} ({:+.2})\n\n",
            cmp.biggest_driver.component, cmp.biggest_driver.delta
        ));
    }

    let tiers = [
        ("Tier 40", b.tiering.tier_40),
        ("Tier 50", b.tiering.tier_50),
        ("Tier 80", b.tiering.tier_80),
    ];
    if tiers.iter().any(|(_, c)| c.is_some()) {
        out.push_str("## Tiering simulation\n");
        for (label, cost) in tiers {
            if let Some(cost) = cost {
                out.push_str(&format!("- {label}: ${cost:.2}\n"));
            }
        }
        out.push('\n');
    }

    let mut alerts = Vec::new();
    if b.extras_percentage > EXTRAS_ALERT_THRESHOLD_PCT {
        alerts.push(format!(
            "ALERT: extras are {:.1}% of this invoice (threshold {:.0}%).",
            b.extras_percentage, EXTRAS_ALERT_THRESHOLD_PCT
        ));
    }
    if let Some(cmp) = comparison {
        if let Some(pct) = cmp.amount_change_pct {
            if pct.abs() > SWING_ALERT_THRESHOLD_PCT {
                alerts.push(format!(
                    "ALERT: invoice {} {:.1}% versus the previous period.",
                    direction_word(cmp.direction),
                    pct.abs()
                ));
            }
        }
    }
    if b.status() == InvoiceStatus::Overdue {
        alerts.push("ALERT: this invoice is OVERDUE.".to_string());
    }
    if !alerts.is_empty() {
        out.push_str("## Alerts\n");
        for alert in alerts {
            out.push_str(&format!("- {alert}\n"));
        }
    }

    out
}

impl InvoiceBreakdown {
    fn status(&self) -> InvoiceStatus {
        InvoiceStatus::parse(&self.status)
    }
}

fn direction_word(direction: ChangeDirection) -> &'static str {
    match direction {
        ChangeDirection::Increased => "increased",
        ChangeDirection::Decreased => "decreased",
        ChangeDirection::Unchanged => "unchanged",
    }
}
