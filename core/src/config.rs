//! Tunable thresholds for the analytics components.
//!
//! Every constant the detectors and the scorer compare against lives here,
//! with defaults matching production behavior. The runner may override the
//! whole structure from a JSON file.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InsightConfig {
    pub usage: UsageConfig,
    pub risk: RiskConfig,
    pub timeline: TimelineConfig,
    pub cache: CacheConfig,
}

// ── Usage trend & anomaly detection ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UsageConfig {
    /// Window of most-recent periods considered when none is requested.
    pub default_window_months: usize,
    /// Hard cap on the requested window.
    pub max_window_months: usize,
    /// Latest period's request/pageview ratio above this is bot-like.
    pub request_ratio_warning: f64,
    pub request_ratio_critical: f64,
    /// Bandwidth growing while pageviews stay flat.
    pub heavy_assets_bandwidth_warning_pct: f64,
    pub heavy_assets_pageview_ceiling_pct: f64,
    pub heavy_assets_bandwidth_critical_pct: f64,
    /// Pageview decline thresholds (strict `<`).
    pub usage_drop_warning_pct: f64,
    pub usage_drop_critical_pct: f64,
    /// Pageview growth threshold (strict `>`, warning only).
    pub usage_spike_warning_pct: f64,
}

impl Default for UsageConfig {
    fn default() -> Self {
        Self {
            default_window_months: 12,
            max_window_months: 60,
            request_ratio_warning: 20.0,
            request_ratio_critical: 50.0,
            heavy_assets_bandwidth_warning_pct: 15.0,
            heavy_assets_pageview_ceiling_pct: 5.0,
            heavy_assets_bandwidth_critical_pct: 40.0,
            usage_drop_warning_pct: -25.0,
            usage_drop_critical_pct: -50.0,
            usage_spike_warning_pct: 50.0,
        }
    }
}

// ── Churn risk scoring ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    pub weights: RiskWeights,
    pub divisors: RiskDivisors,
    /// Most-recent invoices considered for usage-trend and tiering factors.
    pub recent_invoice_window: usize,
    // Advisory thresholds (issues/actions only, never part of the score).
    pub delay_issue_days: f64,
    pub usage_decline_issue_pct: f64,
    pub overage_issue_pct: f64,
    pub tiering_gap_issue_pct: f64,
}

/// Factor weights. Must sum to 1.0 so the composite stays in [0, 10].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskWeights {
    pub payment_delay: f64,
    pub usage_trend: f64,
    pub overdue_frequency: f64,
    pub overage_percentage: f64,
    pub tiering_gap: f64,
}

/// Raw-value divisors mapping each factor onto [0, 10] before clamping.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskDivisors {
    pub payment_delay: f64,
    pub usage_trend: f64,
    pub overdue_frequency: f64,
    pub overage_percentage: f64,
    pub tiering_gap: f64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            weights: RiskWeights::default(),
            divisors: RiskDivisors::default(),
            recent_invoice_window: 6,
            delay_issue_days: 10.0,
            usage_decline_issue_pct: 25.0,
            overage_issue_pct: 40.0,
            tiering_gap_issue_pct: 15.0,
        }
    }
}

impl Default for RiskWeights {
    fn default() -> Self {
        Self {
            payment_delay: 0.30,
            usage_trend: 0.20,
            overdue_frequency: 0.20,
            overage_percentage: 0.15,
            tiering_gap: 0.15,
        }
    }
}

impl Default for RiskDivisors {
    fn default() -> Self {
        // 30 days late, a 50% usage drop, 60% overage and a 30% tiering
        // gap each saturate their factor at 10. The overdue share tops
        // out at 5.0 (100% unpaid / 20).
        Self {
            payment_delay: 3.0,
            usage_trend: 5.0,
            overdue_frequency: 20.0,
            overage_percentage: 6.0,
            tiering_gap: 3.0,
        }
    }
}

// ── Timeline merging & email classification ──────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineConfig {
    /// Adjacent-period growth ratio that flags a usage spike.
    pub spike_ratio: f64,
    /// Default truncation when the caller does not set a limit.
    pub default_max_events: usize,
    /// Cancellation/legal/fraud terms. Matched against diacritics-folded,
    /// lowercased subject+snippet text.
    pub critical_keywords: Vec<String>,
    /// Broader problem/billing/delay terms.
    pub warning_keywords: Vec<String>,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            spike_ratio: 1.15,
            default_max_events: 50,
            critical_keywords: [
                "cancel",
                "cancellation",
                "cancelamento",
                "cancelar",
                "terminate",
                "churn",
                "lawyer",
                "legal",
                "juridico",
                "lawsuit",
                "processo",
                "fraud",
                "fraude",
                "chargeback",
            ]
            .map(str::to_string)
            .to_vec(),
            warning_keywords: [
                "problem",
                "problema",
                "issue",
                "complaint",
                "reclamacao",
                "error",
                "erro",
                "bug",
                "outage",
                "down",
                "billing",
                "cobranca",
                "invoice",
                "fatura",
                "charge",
                "overcharge",
                "delay",
                "atraso",
                "late",
                "dispute",
            ]
            .map(str::to_string)
            .to_vec(),
        }
    }
}

// ── Caching ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// TTL for the customer directory backing name resolution.
    pub directory_ttl_secs: i64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            directory_ttl_secs: 300,
        }
    }
}
