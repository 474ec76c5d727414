use super::InsightStore;
use crate::{
    error::InsightResult,
    invoice::{parse_date, InvoiceRow},
    types::CustomerId,
};
use rusqlite::params;

const INVOICE_COLUMNS: &str = "customer_id, due_date, paid_date, amount, status,
     reference_month, pageviews, requests, bandwidth_gb, pageviews_ratio,
     requests_ratio, extra_pageviews_price, extra_req_price, extra_bw_price,
     seats_builder_cost, support_price, tier_40_cost, tier_50_cost, tier_80_cost";

impl InsightStore {
    // ── Billing rows ──────────────────────────────────────────────

    pub fn insert_invoice(&self, inv: &InvoiceRow) -> InsightResult<()> {
        self.conn.execute(
            "INSERT INTO billing (
                customer_id, due_date, paid_date, amount, status, reference_month,
                pageviews, requests, bandwidth_gb, pageviews_ratio, requests_ratio,
                extra_pageviews_price, extra_req_price, extra_bw_price,
                seats_builder_cost, support_price,
                tier_40_cost, tier_50_cost, tier_80_cost
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14,
                      ?15, ?16, ?17, ?18, ?19)",
            params![
                inv.customer_id,
                inv.due_date.map(|d| d.to_string()),
                inv.paid_date.map(|d| d.to_string()),
                inv.amount,
                &inv.status,
                inv.reference_month.map(|d| d.to_string()),
                inv.pageviews,
                inv.requests,
                inv.bandwidth_gb,
                inv.pageviews_ratio,
                inv.requests_ratio,
                inv.extra_pageviews_price,
                inv.extra_req_price,
                inv.extra_bw_price,
                inv.seats_builder_cost,
                inv.support_price,
                inv.tier_40_cost,
                inv.tier_50_cost,
                inv.tier_80_cost,
            ],
        )?;
        Ok(())
    }

    /// All billing rows for one customer, newest due date first.
    /// Date columns are validated here, at the ingestion boundary:
    /// unparseable text becomes `None` rather than an error.
    pub fn invoices_for_customer(&self, customer_id: CustomerId) -> InsightResult<Vec<InvoiceRow>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {INVOICE_COLUMNS} FROM billing
             WHERE customer_id = ?1
             ORDER BY due_date DESC"
        ))?;
        let rows = stmt.query_map(params![customer_id], |row| {
            Ok(InvoiceRow {
                customer_id: row.get(0)?,
                due_date: row
                    .get::<_, Option<String>>(1)?
                    .as_deref()
                    .and_then(parse_date),
                paid_date: row
                    .get::<_, Option<String>>(2)?
                    .as_deref()
                    .and_then(parse_date),
                amount: row.get(3)?,
                status: row.get(4)?,
                reference_month: row
                    .get::<_, Option<String>>(5)?
                    .as_deref()
                    .and_then(parse_date),
                pageviews: row.get(6)?,
                requests: row.get(7)?,
                bandwidth_gb: row.get(8)?,
                pageviews_ratio: row.get(9)?,
                requests_ratio: row.get(10)?,
                extra_pageviews_price: row.get(11)?,
                extra_req_price: row.get(12)?,
                extra_bw_price: row.get(13)?,
                seats_builder_cost: row.get(14)?,
                support_price: row.get(15)?,
                tier_40_cost: row.get(16)?,
                tier_50_cost: row.get(17)?,
                tier_80_cost: row.get(18)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}
