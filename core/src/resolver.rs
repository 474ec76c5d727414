//! Customer resolution — identifier or name in, exactly one customer out.
//!
//! Resolution order:
//!   1. `customer_id` (always wins when both are given): numeric lookup.
//!   2. `customer_name`: case-insensitive exact match, then substring
//!      match only when no exact match exists.
//!
//! Ambiguity is an error that carries the candidate list so the caller
//! can re-resolve by id. Partial candidate lists are capped at
//! [`MAX_PARTIAL_CANDIDATES`]; exact lists are uncapped.

use crate::{
    error::{InsightError, InsightResult},
    types::CustomerId,
};
use serde::{Deserialize, Serialize};

pub const MAX_PARTIAL_CANDIDATES: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub name: String,
    pub email: String,
}

/// Which resolution path produced the customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    Id,
    Exact,
    Partial,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResolvedCustomer {
    pub customer: Customer,
    pub match_type: MatchType,
}

/// Resolve one customer from the directory.
///
/// The directory is the full list of contacts with billing history; both
/// inputs are trimmed before the emptiness test, so a whitespace-only id
/// falls through to name handling.
pub fn resolve(
    directory: &[Customer],
    customer_id: Option<&str>,
    customer_name: Option<&str>,
) -> InsightResult<ResolvedCustomer> {
    let id = customer_id.map(str::trim).filter(|s| !s.is_empty());
    let name = customer_name.map(str::trim).filter(|s| !s.is_empty());

    if let Some(raw) = id {
        return resolve_by_id(directory, raw);
    }
    if let Some(raw) = name {
        return resolve_by_name(directory, raw);
    }
    Err(InsightError::Input(
        "Please provide customer_id (recommended, unique) or customer_name.".into(),
    ))
}

fn resolve_by_id(directory: &[Customer], raw: &str) -> InsightResult<ResolvedCustomer> {
    let not_found =
        || InsightError::NotFound("Customer not found for the given customer_id.".into());

    // Accept any finite numeric spelling of an integer id ("7", "7.0").
    let parsed: f64 = raw.parse().map_err(|_| not_found())?;
    if !parsed.is_finite() || parsed.fract() != 0.0 {
        return Err(not_found());
    }
    let id = parsed as CustomerId;

    directory
        .iter()
        .find(|c| c.id == id)
        .map(|c| ResolvedCustomer {
            customer: c.clone(),
            match_type: MatchType::Id,
        })
        .ok_or_else(not_found)
}

fn resolve_by_name(directory: &[Customer], raw: &str) -> InsightResult<ResolvedCustomer> {
    let needle = raw.to_lowercase();

    let exact: Vec<&Customer> = directory
        .iter()
        .filter(|c| c.name.to_lowercase() == needle)
        .collect();
    match exact.len() {
        1 => {
            return Ok(ResolvedCustomer {
                customer: exact[0].clone(),
                match_type: MatchType::Exact,
            })
        }
        n if n > 1 => {
            // Exact ambiguity lists every candidate, uncapped.
            return Err(InsightError::Ambiguous {
                candidates: exact.iter().map(|c| format_candidate(c)).collect(),
            });
        }
        _ => {}
    }

    let partial: Vec<&Customer> = directory
        .iter()
        .filter(|c| c.name.to_lowercase().contains(&needle))
        .collect();
    match partial.len() {
        0 => Err(InsightError::NotFound(
            "Customer not found in contacts/billing database. Try searching by customer_id."
                .into(),
        )),
        1 => Ok(ResolvedCustomer {
            customer: partial[0].clone(),
            match_type: MatchType::Partial,
        }),
        _ => Err(InsightError::Ambiguous {
            candidates: partial
                .iter()
                .take(MAX_PARTIAL_CANDIDATES)
                .map(|c| format_candidate(c))
                .collect(),
        }),
    }
}

/// All customers whose email ends with `@<domain>`. An empty result is
/// a valid answer, not an error.
pub fn resolve_by_domain(directory: &[Customer], domain: &str) -> InsightResult<Vec<Customer>> {
    let normalized = domain.trim().to_lowercase();
    let normalized = normalized.strip_prefix('@').unwrap_or(&normalized);
    if normalized.is_empty() {
        return Err(InsightError::Input(
            "Please provide a valid email domain, e.g. \"acme.com\".".into(),
        ));
    }

    let suffix = format!("@{normalized}");
    Ok(directory
        .iter()
        .filter(|c| c.email.to_lowercase().ends_with(&suffix))
        .cloned()
        .collect())
}

fn format_candidate(c: &Customer) -> String {
    format!("ID {}: {} <{}>", c.id, c.name, c.email)
}
