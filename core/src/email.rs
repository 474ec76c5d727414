//! External email source collaborator.
//!
//! The timeline merger consumes message metadata through this trait;
//! concrete transports (the Gmail gateway, test doubles) live behind it.
//! Missing credentials surface as a typed condition, never a crash, so
//! combined reports can degrade to partial results.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct EmailMessage {
    pub id: String,
    pub subject: String,
    pub from: String,
    pub to: String,
    pub date: Option<DateTime<Utc>>,
    pub snippet: String,
    /// Millisecond epoch from the provider, used when `date` is absent.
    pub internal_date: Option<i64>,
}

impl EmailMessage {
    /// Best-effort timestamp; `None` drops the message from timelines.
    pub fn occurred_at(&self) -> Option<DateTime<Utc>> {
        self.date.or_else(|| {
            self.internal_date
                .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
        })
    }
}

#[derive(Error, Debug)]
pub enum EmailError {
    #[error("email source not authenticated")]
    NotAuthenticated,

    #[error("email source unavailable: {0}")]
    Unavailable(String),
}

pub trait EmailSource: Send + Sync {
    /// List messages whose sender matches `from_contains`, newest first,
    /// capped at `max`, optionally bounded by an inclusive date range.
    fn list_messages(
        &self,
        from_contains: &str,
        max: usize,
        after: Option<NaiveDate>,
        before: Option<NaiveDate>,
    ) -> Result<Vec<EmailMessage>, EmailError>;
}

/// Default source when no mail credentials are configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoEmailSource;

impl EmailSource for NoEmailSource {
    fn list_messages(
        &self,
        _from_contains: &str,
        _max: usize,
        _after: Option<NaiveDate>,
        _before: Option<NaiveDate>,
    ) -> Result<Vec<EmailMessage>, EmailError> {
        Err(EmailError::NotAuthenticated)
    }
}
