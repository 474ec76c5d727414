//! Customer resolution + billing/risk analytics core.
//!
//! The components are synchronous, stateless pure functions over
//! in-memory invoice rows fetched once per request from the embedded
//! store. [`report::InsightEngine`] wires resolution, the row source and
//! the analytics into the operations callers invoke.

pub mod billing_metrics;
pub mod cache;
pub mod clock;
pub mod config;
pub mod email;
pub mod error;
pub mod invoice;
pub mod invoice_breakdown;
pub mod report;
pub mod resolver;
pub mod risk_score;
pub mod sanitize;
pub mod store;
pub mod timeline;
pub mod types;
pub mod usage_trends;
