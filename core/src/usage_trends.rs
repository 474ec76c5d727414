//! Usage trend computation and anomaly detection.
//!
//! Averages the three most recent periods against the three before them
//! and flags anomaly patterns. Rules are evaluated independently, so a
//! single window can fire several anomalies at once. All inequality
//! comparisons are strict, which makes exactly −50% a warning-tier drop,
//! not critical.

use crate::{
    config::UsageConfig,
    invoice::{round2, InvoiceRow},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct UsageAverages {
    pub pageviews: f64,
    pub requests: f64,
    pub bandwidth_gb: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageTrend {
    /// Periods actually considered (window clamped to available rows).
    pub window_months: usize,
    /// Mean of the first 3 rows of the window (most recent periods).
    pub recent: UsageAverages,
    /// Mean of rows 3..6 of the window (the previous 3 periods).
    pub previous: UsageAverages,
    /// None when both averages are 0; 100 when growth starts from 0.
    pub pageviews_change_pct: Option<f64>,
    pub requests_change_pct: Option<f64>,
    pub bandwidth_change_pct: Option<f64>,
    pub anomalies: Vec<UsageAnomaly>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    HighRequestRatio,
    HeavyAssets,
    UsageDrop,
    UsageSpike,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Warning,
    Critical,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageAnomaly {
    pub kind: AnomalyKind,
    pub severity: Severity,
    pub detail: String,
}

/// Analyze up to `window` most-recent periods (rows newest first).
pub fn analyze(rows: &[InvoiceRow], window: Option<usize>, cfg: &UsageConfig) -> UsageTrend {
    let window = window
        .unwrap_or(cfg.default_window_months)
        .clamp(1, cfg.max_window_months);
    let rows = &rows[..rows.len().min(window)];

    let recent = averages(&rows[..rows.len().min(3)]);
    let previous = averages(&rows[rows.len().min(3)..rows.len().min(6)]);

    let pageviews_change_pct = percent_change(previous.pageviews, recent.pageviews);
    let requests_change_pct = percent_change(previous.requests, recent.requests);
    let bandwidth_change_pct = percent_change(previous.bandwidth_gb, recent.bandwidth_gb);

    let mut anomalies = Vec::new();

    // Bot-like traffic: requests far outpacing pageviews in the latest period.
    if let Some(latest) = rows.first() {
        if latest.pageviews > 0.0 {
            let ratio = latest.requests / latest.pageviews;
            if ratio > cfg.request_ratio_warning {
                anomalies.push(UsageAnomaly {
                    kind: AnomalyKind::HighRequestRatio,
                    severity: if ratio > cfg.request_ratio_critical {
                        Severity::Critical
                    } else {
                        Severity::Warning
                    },
                    detail: format!(
                        "latest period averages {ratio:.1} requests per pageview"
                    ),
                });
            }
        }
    }

    // Bandwidth growing while pageviews stay flat.
    if let (Some(bw), Some(pv)) = (bandwidth_change_pct, pageviews_change_pct) {
        if bw > cfg.heavy_assets_bandwidth_warning_pct && pv < cfg.heavy_assets_pageview_ceiling_pct
        {
            anomalies.push(UsageAnomaly {
                kind: AnomalyKind::HeavyAssets,
                severity: if bw > cfg.heavy_assets_bandwidth_critical_pct {
                    Severity::Critical
                } else {
                    Severity::Warning
                },
                detail: format!(
                    "bandwidth up {bw:.1}% while pageviews moved only {pv:.1}%"
                ),
            });
        }
    }

    if let Some(pv) = pageviews_change_pct {
        if pv < cfg.usage_drop_warning_pct {
            anomalies.push(UsageAnomaly {
                kind: AnomalyKind::UsageDrop,
                severity: if pv < cfg.usage_drop_critical_pct {
                    Severity::Critical
                } else {
                    Severity::Warning
                },
                detail: format!("pageviews down {:.1}% versus the previous 3 periods", -pv),
            });
        }
        // No critical tier for spikes.
        if pv > cfg.usage_spike_warning_pct {
            anomalies.push(UsageAnomaly {
                kind: AnomalyKind::UsageSpike,
                severity: Severity::Warning,
                detail: format!("pageviews up {pv:.1}% versus the previous 3 periods"),
            });
        }
    }

    UsageTrend {
        window_months: rows.len(),
        recent,
        previous,
        pageviews_change_pct,
        requests_change_pct,
        bandwidth_change_pct,
        anomalies,
    }
}

fn averages(rows: &[InvoiceRow]) -> UsageAverages {
    if rows.is_empty() {
        return UsageAverages::default();
    }
    let n = rows.len() as f64;
    UsageAverages {
        pageviews: rows.iter().map(|r| r.pageviews).sum::<f64>() / n,
        requests: rows.iter().map(|r| r.requests).sum::<f64>() / n,
        bandwidth_gb: rows.iter().map(|r| r.bandwidth_gb).sum::<f64>() / n,
    }
}

/// Percent change with a degenerate-base rule: a 0→0 move is undefined
/// (None) and growth from 0 reads as 100%.
pub fn percent_change(previous: f64, recent: f64) -> Option<f64> {
    if previous == 0.0 {
        if recent == 0.0 {
            None
        } else {
            Some(100.0)
        }
    } else {
        Some(round2((recent - previous) / previous * 100.0))
    }
}
