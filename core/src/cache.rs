//! Explicitly passed TTL cache.
//!
//! Replaces the process-wide memoized lookups the upstream tool servers
//! used: the holder owns the cache, expiry reads time through the
//! injected clock, and nothing is global.

use crate::clock::Clock;
use chrono::{DateTime, Duration, Utc};

#[derive(Debug)]
pub struct TtlCache<T> {
    ttl: Duration,
    entry: Option<(DateTime<Utc>, T)>,
}

impl<T> TtlCache<T> {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, entry: None }
    }

    /// Return the cached value, or populate it from `load`. An entry
    /// older than the TTL is reloaded in place.
    pub fn get_or_try_insert_with<E>(
        &mut self,
        clock: &dyn Clock,
        load: impl FnOnce() -> Result<T, E>,
    ) -> Result<&T, E> {
        let now = clock.now();
        let fresh = matches!(&self.entry, Some((stored_at, _)) if now - *stored_at < self.ttl);
        if !fresh {
            self.entry = Some((now, load()?));
        }
        let (_, value) = self.entry.as_ref().expect("entry populated above");
        Ok(value)
    }
}
