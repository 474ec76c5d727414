//! SQLite row source.
//!
//! RULE: Only store.rs (and its submodules) talks to the database.
//! Analytics components receive in-memory row vectors — they never
//! execute SQL directly.

use crate::error::InsightResult;

mod contact;
mod invoice;

pub struct InsightStore {
    conn: rusqlite::Connection,
    path: Option<String>, // None for :memory:, Some(path) for file
}

impl InsightStore {
    pub fn open(path: &str) -> InsightResult<Self> {
        let conn = rusqlite::Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only for real files (:memory: ignores it).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self {
            conn,
            path: Some(path.to_string()),
        })
    }

    /// Open an in-memory database (used in tests and demo runs).
    pub fn in_memory() -> InsightResult<Self> {
        let conn = rusqlite::Connection::open(":memory:")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn, path: None })
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Apply the schema. Idempotent.
    pub fn migrate(&self) -> InsightResult<()> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS contacts (
                 id    INTEGER PRIMARY KEY,
                 name  TEXT NOT NULL,
                 email TEXT NOT NULL DEFAULT ''
             );
             CREATE TABLE IF NOT EXISTS billing (
                 id                    INTEGER PRIMARY KEY AUTOINCREMENT,
                 customer_id           INTEGER NOT NULL REFERENCES contacts(id),
                 due_date              TEXT,
                 paid_date             TEXT,
                 amount                REAL NOT NULL DEFAULT 0,
                 status                TEXT NOT NULL DEFAULT '',
                 reference_month       TEXT,
                 pageviews             REAL NOT NULL DEFAULT 0,
                 requests              REAL NOT NULL DEFAULT 0,
                 bandwidth_gb          REAL NOT NULL DEFAULT 0,
                 pageviews_ratio       REAL NOT NULL DEFAULT 0,
                 requests_ratio        REAL NOT NULL DEFAULT 0,
                 extra_pageviews_price REAL NOT NULL DEFAULT 0,
                 extra_req_price       REAL NOT NULL DEFAULT 0,
                 extra_bw_price        REAL NOT NULL DEFAULT 0,
                 seats_builder_cost    REAL NOT NULL DEFAULT 0,
                 support_price         REAL NOT NULL DEFAULT 0,
                 tier_40_cost          REAL,
                 tier_50_cost          REAL,
                 tier_80_cost          REAL
             );
             CREATE INDEX IF NOT EXISTS idx_billing_customer
                 ON billing (customer_id, due_date);
             CREATE INDEX IF NOT EXISTS idx_billing_month
                 ON billing (customer_id, reference_month);",
        )?;
        Ok(())
    }
}
