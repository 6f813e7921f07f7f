use super::{decode_ts, encode_ts, ComplaintStore, StoreTx};
use crate::{error::StoreResult, insight::InsightRecord};
use rusqlite::params;

impl StoreTx<'_> {
    // ── Insight ──────────────────────────────────────────────────

    pub fn insert_insight(&self, i: &InsightRecord) -> StoreResult<()> {
        self.tx.execute(
            "INSERT INTO insight (
                insight_id, complaint_id, kind, title, description, impact,
                probability, suggested_actions_json, created_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                &i.insight_id,
                &i.complaint_id,
                &i.kind,
                &i.title,
                &i.description,
                &i.impact,
                i.probability,
                serde_json::to_string(&i.suggested_actions)?,
                encode_ts(&i.created_at),
            ],
        )?;
        Ok(())
    }
}

impl ComplaintStore {
    pub fn insights_for_complaint(&self, complaint_id: &str) -> StoreResult<Vec<InsightRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT insight_id, complaint_id, kind, title, description, impact,
                    probability, suggested_actions_json, created_at
             FROM insight WHERE complaint_id = ?1
             ORDER BY insight_id ASC",
        )?;
        let rows = stmt
            .query_map(params![complaint_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, f64>(6)?,
                    row.get::<_, String>(7)?,
                    row.get::<_, String>(8)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|r| -> StoreResult<InsightRecord> {
                let (insight_id, complaint_id, kind, title, description, impact, probability, actions, created_at) = r;
                Ok(InsightRecord {
                    insight_id,
                    complaint_id,
                    kind,
                    title,
                    description,
                    impact,
                    probability,
                    suggested_actions: serde_json::from_str(&actions)?,
                    created_at: decode_ts("created_at", &created_at)?,
                })
            })
            .collect()
    }

    pub fn insight_count(&self) -> StoreResult<i64> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM insight", [], |r| r.get(0))?)
    }
}
