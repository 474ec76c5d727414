//! Timeline merging — billing, usage and email events in one stream.
//!
//! Event ids are derived from the source rows, so re-running a request
//! yields an identical timeline. Events with no parseable timestamp are
//! dropped rather than surfaced as errors.

use crate::{
    config::TimelineConfig,
    email::EmailMessage,
    invoice::InvoiceRow,
};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventSource {
    Billing,
    Usage,
    Gmail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    InvoiceDue,
    PaymentReceived,
    UsageMonthly,
    UsageSpike,
    CustomerEmail,
    CustomerComplaint,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineEvent {
    pub id: String,
    pub occurred_at: DateTime<Utc>,
    pub event_type: EventType,
    pub source: EventSource,
    pub title: String,
    pub description: String,
    pub data: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Ascending,
    Descending,
}

#[derive(Debug, Clone)]
pub struct TimelineQuery {
    /// None means all sources.
    pub sources: Option<Vec<EventSource>>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub order: SortOrder,
    pub limit: usize,
}

impl TimelineQuery {
    pub fn latest(limit: usize) -> Self {
        Self {
            sources: None,
            from: None,
            to: None,
            order: SortOrder::Descending,
            limit,
        }
    }
}

fn at_midnight(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

// ── Billing events ───────────────────────────────────────────────────────────

/// One `invoice_due` per row with a parseable due date, one
/// `payment_received` per row with a parseable paid date. Adjustment
/// rows sharing a reference month get a per-row discriminator so ids
/// stay unique.
pub fn billing_events(rows: &[InvoiceRow]) -> Vec<TimelineEvent> {
    let mut events = Vec::new();
    let mut seen: HashMap<String, usize> = HashMap::new();
    for (idx, row) in rows.iter().enumerate() {
        let month = row.month_key().unwrap_or_else(|| format!("row{idx}"));
        let tag = month_tag(&mut seen, &month);
        if let Some(due) = row.due_date {
            events.push(TimelineEvent {
                id: format!("inv-{}-{tag}-due", row.customer_id),
                occurred_at: at_midnight(due),
                event_type: EventType::InvoiceDue,
                source: EventSource::Billing,
                title: format!("Invoice due — {month}"),
                description: format!("${:.2} due, status \"{}\"", row.amount, row.status),
                data: serde_json::json!({
                    "amount": row.amount,
                    "status": row.status,
                    "reference_month": row.month_key(),
                }),
            });
        }
        if let Some(paid) = row.paid_date {
            events.push(TimelineEvent {
                id: format!("inv-{}-{tag}-paid", row.customer_id),
                occurred_at: at_midnight(paid),
                event_type: EventType::PaymentReceived,
                source: EventSource::Billing,
                title: format!("Payment received — {month}"),
                description: format!("${:.2} paid", row.amount),
                data: serde_json::json!({
                    "amount": row.amount,
                    "reference_month": row.month_key(),
                }),
            });
        }
    }
    events
}

// ── Usage events ─────────────────────────────────────────────────────────────

/// One `usage_monthly` per period, plus a `usage_spike` whenever the
/// plan-utilization ratio (the row's stored `pageviews_ratio` or
/// `requests_ratio`, whichever grew more) rises ≥ `spike_ratio` over the
/// immediately preceding period (adjacent periods only, not a rolling
/// average).
pub fn usage_events(rows: &[InvoiceRow], spike_ratio: f64) -> Vec<TimelineEvent> {
    // Ascending by reference month; rows without one are skipped.
    let mut ordered: Vec<&InvoiceRow> =
        rows.iter().filter(|r| r.reference_month.is_some()).collect();
    ordered.sort_by_key(|r| r.reference_month);

    let mut events = Vec::new();
    let mut seen: HashMap<String, usize> = HashMap::new();
    for (idx, row) in ordered.iter().enumerate() {
        let reference_month = match row.reference_month {
            Some(d) => d,
            None => continue,
        };
        let month = row.month_key().unwrap_or_default();
        let tag = month_tag(&mut seen, &month);
        let occurred_at = at_midnight(reference_month);

        events.push(TimelineEvent {
            id: format!("usage-{}-{tag}", row.customer_id),
            occurred_at,
            event_type: EventType::UsageMonthly,
            source: EventSource::Usage,
            title: format!("Monthly usage — {month}"),
            description: format!(
                "{:.0} pageviews, {:.0} requests, {:.1} GB",
                row.pageviews, row.requests, row.bandwidth_gb
            ),
            data: serde_json::json!({
                "pageviews": row.pageviews,
                "requests": row.requests,
                "bandwidth_gb": row.bandwidth_gb,
            }),
        });

        if idx == 0 {
            continue;
        }
        let prev = ordered[idx - 1];
        let growth = f64::max(
            ratio(row.pageviews_ratio, prev.pageviews_ratio),
            ratio(row.requests_ratio, prev.requests_ratio),
        );
        if growth >= spike_ratio {
            events.push(TimelineEvent {
                id: format!("usage-{}-{tag}-spike", row.customer_id),
                occurred_at,
                event_type: EventType::UsageSpike,
                source: EventSource::Usage,
                title: format!("Usage spike — {month}"),
                description: format!(
                    "{:.0}% growth over the previous period",
                    (growth - 1.0) * 100.0
                ),
                data: serde_json::json!({ "growth_ratio": growth }),
            });
        }
    }
    events
}

fn ratio(current: f64, previous: f64) -> f64 {
    if previous > 0.0 {
        current / previous
    } else {
        0.0
    }
}

/// "2024-05" for a month's first row, "2024-05.2" for its second, etc.
fn month_tag(seen: &mut HashMap<String, usize>, month: &str) -> String {
    let n = seen.entry(month.to_string()).or_insert(0);
    *n += 1;
    if *n == 1 {
        month.to_string()
    } else {
        format!("{month}.{n}")
    }
}

// ── Email events ─────────────────────────────────────────────────────────────

/// Classify a message by scanning folded subject+snippet text against
/// the keyword lists. Critical and warning hits both read as complaints;
/// everything else is a plain customer email.
pub fn classify_email(msg: &EmailMessage, cfg: &TimelineConfig) -> EventType {
    let haystack = fold_diacritics(&format!("{} {}", msg.subject, msg.snippet)).to_lowercase();
    let hit = |keywords: &[String]| keywords.iter().any(|k| haystack.contains(k.as_str()));

    if hit(&cfg.critical_keywords) || hit(&cfg.warning_keywords) {
        EventType::CustomerComplaint
    } else {
        EventType::CustomerEmail
    }
}

pub fn email_events(messages: &[EmailMessage], cfg: &TimelineConfig) -> Vec<TimelineEvent> {
    messages
        .iter()
        .filter_map(|msg| {
            let occurred_at = msg.occurred_at()?;
            let event_type = classify_email(msg, cfg);
            Some(TimelineEvent {
                id: format!("mail-{}", msg.id),
                occurred_at,
                event_type,
                source: EventSource::Gmail,
                title: msg.subject.clone(),
                description: msg.snippet.clone(),
                data: serde_json::json!({
                    "from": msg.from,
                    "to": msg.to,
                }),
            })
        })
        .collect()
}

/// Strip the Latin diacritics that show up in customer mail, so keyword
/// matching sees "cobrança" as "cobranca".
pub fn fold_diacritics(input: &str) -> String {
    input
        .chars()
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ã' | 'ä' | 'Á' | 'À' | 'Â' | 'Ã' | 'Ä' => 'a',
            'é' | 'è' | 'ê' | 'ë' | 'É' | 'È' | 'Ê' | 'Ë' => 'e',
            'í' | 'ì' | 'î' | 'ï' | 'Í' | 'Ì' | 'Î' | 'Ï' => 'i',
            'ó' | 'ò' | 'ô' | 'õ' | 'ö' | 'Ó' | 'Ò' | 'Ô' | 'Õ' | 'Ö' => 'o',
            'ú' | 'ù' | 'û' | 'ü' | 'Ú' | 'Ù' | 'Û' | 'Ü' => 'u',
            'ç' | 'Ç' => 'c',
            'ñ' | 'Ñ' => 'n',
            other => other,
        })
        .collect()
}

// ── Merge ────────────────────────────────────────────────────────────────────

/// Filter, sort and truncate a combined event list.
pub fn merge(mut events: Vec<TimelineEvent>, query: &TimelineQuery) -> Vec<TimelineEvent> {
    if let Some(sources) = &query.sources {
        events.retain(|e| sources.contains(&e.source));
    }
    if let Some(from) = query.from {
        let bound = at_midnight(from);
        events.retain(|e| e.occurred_at >= bound);
    }
    if let Some(to) = query.to {
        // Inclusive upper bound: anything on the `to` day survives.
        let bound = at_midnight(to) + chrono::Duration::days(1);
        events.retain(|e| e.occurred_at < bound);
    }

    // Secondary sort on id keeps same-instant events in a stable order.
    events.sort_by(|a, b| (a.occurred_at, &a.id).cmp(&(b.occurred_at, &b.id)));
    if query.order == SortOrder::Descending {
        events.reverse();
    }
    events.truncate(query.limit);
    events
}
