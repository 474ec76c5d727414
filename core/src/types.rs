//! Shared primitive types used across the analytics core.

/// Stable numeric identifier of a customer in the contacts table.
pub type CustomerId = i64;

/// 7-char `YYYY-MM` key identifying a billing period.
pub type MonthKey = String;
