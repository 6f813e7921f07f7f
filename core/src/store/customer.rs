use super::{decode_ts, encode_ts, ComplaintStore, StoreTx};
use crate::{
    customer::CustomerRecord,
    error::{StoreError, StoreResult},
};
use rusqlite::{params, Connection, OptionalExtension};

const CUSTOMER_COLUMNS: &str = "customer_id, name, phone, is_anonymous, complaint_count, segment,
                                first_seen_at, last_complaint_at";

type CustomerRow = (String, Option<String>, Option<String>, i32, i64, String, String, Option<String>);

fn customer_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<CustomerRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
    ))
}

fn decode_customer(raw: CustomerRow) -> StoreResult<CustomerRecord> {
    let (customer_id, name, phone, is_anonymous, complaint_count, segment, first_seen, last) = raw;
    Ok(CustomerRecord {
        customer_id,
        name,
        phone,
        is_anonymous: is_anonymous != 0,
        complaint_count,
        segment,
        first_seen_at: decode_ts("first_seen_at", &first_seen)?,
        last_complaint_at: last
            .as_deref()
            .map(|t| decode_ts("last_complaint_at", t))
            .transpose()?,
    })
}

fn select_one(conn: &Connection, filter: &str, key: &str) -> StoreResult<Option<CustomerRecord>> {
    let sql = format!("SELECT {CUSTOMER_COLUMNS} FROM customer WHERE {filter} = ?1");
    conn.query_row(&sql, params![key], customer_row)
        .optional()?
        .map(decode_customer)
        .transpose()
}

impl StoreTx<'_> {
    // ── Customer ──────────────────────────────────────────────────

    pub fn customer_by_phone(&self, phone: &str) -> StoreResult<Option<CustomerRecord>> {
        select_one(&self.tx, "phone", phone)
    }

    pub fn insert_customer(&self, c: &CustomerRecord) -> StoreResult<()> {
        self.tx.execute(
            "INSERT INTO customer (
                customer_id, name, phone, is_anonymous, complaint_count, segment,
                first_seen_at, last_complaint_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                &c.customer_id,
                c.name.as_deref(),
                c.phone.as_deref(),
                if c.is_anonymous { 1i32 } else { 0i32 },
                c.complaint_count,
                &c.segment,
                encode_ts(&c.first_seen_at),
                c.last_complaint_at.as_ref().map(encode_ts),
            ],
        )?;
        Ok(())
    }

    /// Fill in a name for a customer first seen without one.
    pub fn set_customer_name(&self, customer_id: &str, name: &str) -> StoreResult<()> {
        self.tx.execute(
            "UPDATE customer SET name = ?1 WHERE customer_id = ?2 AND name IS NULL",
            params![name, customer_id],
        )?;
        Ok(())
    }

    pub fn update_customer_stats(&self, c: &CustomerRecord) -> StoreResult<()> {
        let updated = self.tx.execute(
            "UPDATE customer SET complaint_count = ?1, segment = ?2, last_complaint_at = ?3
             WHERE customer_id = ?4",
            params![
                c.complaint_count,
                &c.segment,
                c.last_complaint_at.as_ref().map(encode_ts),
                &c.customer_id,
            ],
        )?;
        if updated == 0 {
            return Err(StoreError::MissingRow {
                table: "customer",
                key: c.customer_id.clone(),
            });
        }
        Ok(())
    }
}

impl ComplaintStore {
    pub fn get_customer(&self, customer_id: &str) -> StoreResult<Option<CustomerRecord>> {
        select_one(&self.conn, "customer_id", customer_id)
    }

    pub fn find_customer_by_phone(&self, phone: &str) -> StoreResult<Option<CustomerRecord>> {
        select_one(&self.conn, "phone", phone)
    }

    pub fn customer_count(&self) -> StoreResult<i64> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM customer", [], |r| r.get(0))?)
    }
}
