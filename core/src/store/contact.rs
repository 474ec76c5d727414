use super::InsightStore;
use crate::{error::InsightResult, resolver::Customer, types::CustomerId};
use rusqlite::params;

/// A contact only counts as a customer when it has billing history, so
/// every directory query carries this EXISTS guard.
const HAS_BILLING: &str =
    "EXISTS (SELECT 1 FROM billing b WHERE b.customer_id = contacts.id)";

impl InsightStore {
    // ── Contacts ──────────────────────────────────────────────────

    pub fn insert_contact(&self, id: CustomerId, name: &str, email: &str) -> InsightResult<()> {
        self.conn.execute(
            "INSERT INTO contacts (id, name, email) VALUES (?1, ?2, ?3)",
            params![id, name, email],
        )?;
        Ok(())
    }

    /// Every contact with billing history, ordered by id. This is the
    /// directory the resolver matches against (cached with a TTL by the
    /// engine).
    pub fn customer_directory(&self) -> InsightResult<Vec<Customer>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT id, name, email FROM contacts WHERE {HAS_BILLING} ORDER BY id"
        ))?;
        let rows = stmt.query_map([], |row| {
            Ok(Customer {
                id: row.get(0)?,
                name: row.get(1)?,
                email: row.get(2)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}
