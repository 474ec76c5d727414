//! insight-runner: headless report runner for the customer insights core.
//!
//! Usage:
//!   insight-runner --db billing.db --report health --customer-id 7
//!   insight-runner --db billing.db --report invoice --customer-name "Acme" --month 2024-05
//!   insight-runner --db billing.db --report timeline --customer-id 7 --limit 20
//!   insight-runner --db billing.db --report domain --domain acme.com
//!
//! Logs go to stderr; the report JSON goes to stdout.

use anyhow::{bail, Context, Result};
use insights_core::{
    billing_metrics::BillingFilter,
    config::InsightConfig,
    invoice::parse_date,
    report::InsightEngine,
    sanitize,
    store::InsightStore,
    timeline::{SortOrder, TimelineQuery},
};
use std::env;

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let db = string_arg(&args, "--db").unwrap_or_else(|| ":memory:".into());
    let report = string_arg(&args, "--report").unwrap_or_else(|| "health".into());
    let customer_id = string_arg(&args, "--customer-id");
    let customer_name = string_arg(&args, "--customer-name");

    let store = InsightStore::open(&db)?;
    store.migrate()?;

    let config = match string_arg(&args, "--config") {
        Some(path) => {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("reading config {path}"))?;
            serde_json::from_str::<InsightConfig>(&raw)
                .with_context(|| format!("parsing config {path}"))?
        }
        None => InsightConfig::default(),
    };

    let mut engine = InsightEngine::new(
        store,
        config,
        Box::new(insights_core::clock::SystemClock),
        Box::new(insights_core::email::NoEmailSource),
    );

    let id = customer_id.as_deref();
    let name = customer_name.as_deref();

    let value = match report.as_str() {
        "health" => sanitize::to_clean_json(&engine.customer_health(id, name)?)?,
        "billing" => {
            let filter = BillingFilter {
                last_months: usize_arg(&args, "--months"),
                ..Default::default()
            };
            sanitize::to_clean_json(&engine.billing_report(id, name, &filter)?)?
        }
        "invoice" => {
            let month = string_arg(&args, "--month");
            sanitize::to_clean_json(&engine.invoice_report(id, name, month.as_deref())?)?
        }
        "usage" => {
            let window = usize_arg(&args, "--months");
            sanitize::to_clean_json(&engine.usage_report(id, name, window)?)?
        }
        "risk" => sanitize::to_clean_json(&engine.risk_report(id, name)?)?,
        "timeline" => {
            let query = TimelineQuery {
                sources: None,
                from: string_arg(&args, "--from").as_deref().and_then(parse_date),
                to: string_arg(&args, "--to").as_deref().and_then(parse_date),
                order: match string_arg(&args, "--order").as_deref() {
                    Some("asc") => SortOrder::Ascending,
                    _ => SortOrder::Descending,
                },
                limit: usize_arg(&args, "--limit").unwrap_or(50),
            };
            sanitize::to_clean_json(&engine.timeline_report(id, name, &query)?)?
        }
        "domain" => {
            let domain = string_arg(&args, "--domain")
                .context("--domain is required for the domain report")?;
            sanitize::to_clean_json(&engine.customers_by_domain(&domain)?)?
        }
        "resolve" => sanitize::to_clean_json(&engine.resolve_customer(id, name)?)?,
        other => bail!(
            "unknown report \"{other}\" (expected health|billing|invoice|usage|risk|timeline|domain|resolve)"
        ),
    };

    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

fn string_arg(args: &[String], flag: &str) -> Option<String> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].clone())
}

fn usize_arg(args: &[String], flag: &str) -> Option<usize> {
    string_arg(args, flag).and_then(|v| v.parse().ok())
}
