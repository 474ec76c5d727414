//! The insight engine — the operations a caller invokes.
//!
//! Each operation resolves its own customer, pulls that customer's rows
//! from the store and hands them to the pure analytics components. The
//! only cross-request state is the TTL-cached customer directory backing
//! name resolution.
//!
//! RULE: a failed optional sub-fetch (email) degrades the result, it
//! never aborts the computation.

use crate::{
    billing_metrics::{self, BillingFilter, BillingMetrics},
    cache::TtlCache,
    clock::{Clock, SystemClock},
    config::InsightConfig,
    email::{EmailSource, NoEmailSource},
    error::InsightResult,
    invoice_breakdown::{self, InvoiceBreakdown, InvoiceComparison, MonthLookup},
    resolver::{self, Customer, MatchType, ResolvedCustomer},
    risk_score::{self, RiskAssessment},
    store::InsightStore,
    timeline::{self, EventSource, TimelineEvent, TimelineQuery},
    types::MonthKey,
    usage_trends::{self, UsageTrend},
};
use chrono::Duration;
use serde::Serialize;

/// Cap on messages pulled from the email source per request.
const EMAIL_FETCH_MAX: usize = 50;

pub struct InsightEngine {
    pub store: InsightStore,
    config: InsightConfig,
    clock: Box<dyn Clock>,
    email: Box<dyn EmailSource>,
    directory: TtlCache<Vec<Customer>>,
}

impl InsightEngine {
    pub fn new(
        store: InsightStore,
        config: InsightConfig,
        clock: Box<dyn Clock>,
        email: Box<dyn EmailSource>,
    ) -> Self {
        let ttl = Duration::seconds(config.cache.directory_ttl_secs);
        Self {
            store,
            config,
            clock,
            email,
            directory: TtlCache::new(ttl),
        }
    }

    /// Production wiring: system clock, no email credentials.
    pub fn build(store: InsightStore) -> Self {
        Self::new(
            store,
            InsightConfig::default(),
            Box::new(SystemClock),
            Box::new(NoEmailSource),
        )
    }

    pub fn config(&self) -> &InsightConfig {
        &self.config
    }

    // ── Resolution ────────────────────────────────────────────────

    pub fn resolve_customer(
        &mut self,
        customer_id: Option<&str>,
        customer_name: Option<&str>,
    ) -> InsightResult<ResolvedCustomer> {
        let directory = self.directory()?;
        resolver::resolve(&directory, customer_id, customer_name)
    }

    pub fn customers_by_domain(&mut self, domain: &str) -> InsightResult<Vec<Customer>> {
        let directory = self.directory()?;
        resolver::resolve_by_domain(&directory, domain)
    }

    fn directory(&mut self) -> InsightResult<Vec<Customer>> {
        let store = &self.store;
        self.directory
            .get_or_try_insert_with(self.clock.as_ref(), || store.customer_directory())
            .map(|directory| directory.clone())
    }

    // ── Reports ───────────────────────────────────────────────────

    pub fn billing_report(
        &mut self,
        customer_id: Option<&str>,
        customer_name: Option<&str>,
        filter: &BillingFilter,
    ) -> InsightResult<BillingReport> {
        let resolved = self.resolve_customer(customer_id, customer_name)?;
        let rows = self.store.invoices_for_customer(resolved.customer.id)?;
        let rows = billing_metrics::filter_rows(&rows, filter);
        let metrics = billing_metrics::compute(&rows, self.clock.today());
        log::info!(
            "billing report for customer {} ({} rows)",
            resolved.customer.id,
            rows.len()
        );
        Ok(BillingReport {
            customer: resolved.customer,
            match_type: resolved.match_type,
            metrics,
        })
    }

    /// Breakdown of one invoice; `month` None targets the latest. A month
    /// with no invoice is a soft miss listing the available months.
    pub fn invoice_report(
        &mut self,
        customer_id: Option<&str>,
        customer_name: Option<&str>,
        month: Option<&str>,
    ) -> InsightResult<InvoiceReport> {
        let resolved = self.resolve_customer(customer_id, customer_name)?;
        let rows = self.store.invoices_for_customer(resolved.customer.id)?;

        let lookup = match month {
            Some(month) => invoice_breakdown::find_by_month(&rows, month)?,
            None if rows.is_empty() => MonthLookup::NotFound {
                requested: "latest".into(),
                available_months: Vec::new(),
            },
            None => MonthLookup::Found { index: 0 },
        };

        let outcome = match lookup {
            MonthLookup::NotFound {
                requested,
                available_months,
            } => InvoiceReportOutcome::MonthNotFound {
                requested,
                available_months,
            },
            MonthLookup::Found { index } => {
                let target = &rows[index];
                let breakdown = invoice_breakdown::breakdown(target);
                let comparison = invoice_breakdown::prior_invoice(&rows, index)
                    .map(|prev| invoice_breakdown::compare(target, prev));
                let narrative = invoice_breakdown::render_report(
                    &resolved.customer.name,
                    &breakdown,
                    comparison.as_ref(),
                );
                InvoiceReportOutcome::Report {
                    breakdown,
                    comparison,
                    narrative,
                }
            }
        };

        Ok(InvoiceReport {
            customer: resolved.customer,
            match_type: resolved.match_type,
            outcome,
        })
    }

    pub fn usage_report(
        &mut self,
        customer_id: Option<&str>,
        customer_name: Option<&str>,
        window_months: Option<usize>,
    ) -> InsightResult<UsageReport> {
        let resolved = self.resolve_customer(customer_id, customer_name)?;
        let rows = self.store.invoices_for_customer(resolved.customer.id)?;
        let trend = usage_trends::analyze(&rows, window_months, &self.config.usage);
        Ok(UsageReport {
            customer: resolved.customer,
            match_type: resolved.match_type,
            trend,
        })
    }

    pub fn risk_report(
        &mut self,
        customer_id: Option<&str>,
        customer_name: Option<&str>,
    ) -> InsightResult<RiskReport> {
        let resolved = self.resolve_customer(customer_id, customer_name)?;
        let rows = self.store.invoices_for_customer(resolved.customer.id)?;
        let assessment = risk_score::assess(&rows, &self.config.risk);
        log::info!(
            "risk score {} ({:?}) for customer {}",
            assessment.score,
            assessment.profile,
            resolved.customer.id
        );
        Ok(RiskReport {
            customer: resolved.customer,
            match_type: resolved.match_type,
            assessment,
        })
    }

    pub fn timeline_report(
        &mut self,
        customer_id: Option<&str>,
        customer_name: Option<&str>,
        query: &TimelineQuery,
    ) -> InsightResult<TimelineReport> {
        let resolved = self.resolve_customer(customer_id, customer_name)?;
        let rows = self.store.invoices_for_customer(resolved.customer.id)?;

        let mut events = timeline::billing_events(&rows);
        events.extend(timeline::usage_events(&rows, self.config.timeline.spike_ratio));
        let (email_events, email_status) = self.fetch_email_events(&resolved.customer, query);
        events.extend(email_events);

        Ok(TimelineReport {
            customer: resolved.customer,
            match_type: resolved.match_type,
            events: timeline::merge(events, query),
            email_status,
        })
    }

    /// The combined per-customer report: billing KPIs, usage trend, risk
    /// score and recent timeline in one request. The email sub-fetch may
    /// fail without failing the report.
    pub fn customer_health(
        &mut self,
        customer_id: Option<&str>,
        customer_name: Option<&str>,
    ) -> InsightResult<CustomerHealthReport> {
        let resolved = self.resolve_customer(customer_id, customer_name)?;
        let rows = self.store.invoices_for_customer(resolved.customer.id)?;

        let billing = billing_metrics::compute(&rows, self.clock.today());
        let usage = usage_trends::analyze(&rows, None, &self.config.usage);
        let risk = risk_score::assess(&rows, &self.config.risk);

        let query = TimelineQuery::latest(self.config.timeline.default_max_events);
        let mut events = timeline::billing_events(&rows);
        events.extend(timeline::usage_events(&rows, self.config.timeline.spike_ratio));
        let (email_events, email_status) = self.fetch_email_events(&resolved.customer, &query);
        events.extend(email_events);

        Ok(CustomerHealthReport {
            customer: resolved.customer,
            match_type: resolved.match_type,
            billing,
            usage,
            risk,
            timeline: timeline::merge(events, &query),
            email_status,
        })
    }

    fn fetch_email_events(
        &self,
        customer: &Customer,
        query: &TimelineQuery,
    ) -> (Vec<TimelineEvent>, EmailFetchStatus) {
        // Skip the upstream call when the caller filtered email out.
        if let Some(sources) = &query.sources {
            if !sources.contains(&EventSource::Gmail) {
                return (
                    Vec::new(),
                    EmailFetchStatus {
                        included: false,
                        reason: Some("email source excluded by request".into()),
                    },
                );
            }
        }

        match self
            .email
            .list_messages(&customer.email, EMAIL_FETCH_MAX, query.from, query.to)
        {
            Ok(messages) => (
                timeline::email_events(&messages, &self.config.timeline),
                EmailFetchStatus {
                    included: true,
                    reason: None,
                },
            ),
            Err(err) => {
                let err = crate::error::InsightError::from(err);
                log::warn!(
                    "email fetch skipped for customer {}: {err}",
                    customer.id
                );
                (
                    Vec::new(),
                    EmailFetchStatus {
                        included: false,
                        reason: Some(err.to_string()),
                    },
                )
            }
        }
    }
}

// ── Report payloads ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct BillingReport {
    pub customer: Customer,
    pub match_type: MatchType,
    pub metrics: BillingMetrics,
}

#[derive(Debug, Clone, Serialize)]
pub struct InvoiceReport {
    pub customer: Customer,
    pub match_type: MatchType,
    #[serde(flatten)]
    pub outcome: InvoiceReportOutcome,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum InvoiceReportOutcome {
    Report {
        breakdown: InvoiceBreakdown,
        comparison: Option<InvoiceComparison>,
        narrative: String,
    },
    MonthNotFound {
        requested: MonthKey,
        available_months: Vec<MonthKey>,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct UsageReport {
    pub customer: Customer,
    pub match_type: MatchType,
    pub trend: UsageTrend,
}

#[derive(Debug, Clone, Serialize)]
pub struct RiskReport {
    pub customer: Customer,
    pub match_type: MatchType,
    pub assessment: RiskAssessment,
}

#[derive(Debug, Clone, Serialize)]
pub struct TimelineReport {
    pub customer: Customer,
    pub match_type: MatchType,
    pub events: Vec<TimelineEvent>,
    pub email_status: EmailFetchStatus,
}

/// Partial-result annotation for the optional email sub-fetch.
#[derive(Debug, Clone, Serialize)]
pub struct EmailFetchStatus {
    pub included: bool,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CustomerHealthReport {
    pub customer: Customer,
    pub match_type: MatchType,
    pub billing: BillingMetrics,
    pub usage: UsageTrend,
    pub risk: RiskAssessment,
    pub timeline: Vec<TimelineEvent>,
    pub email_status: EmailFetchStatus,
}
