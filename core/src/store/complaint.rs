use super::{decode_ts, encode_ts, ComplaintStore, StoreTx};
use crate::{
    branch_resolver::ResolutionOutcome,
    categorizer::CategoryMatch,
    complaint::{AnalysisMetadata, BranchMatch, EnrichedComplaint},
    error::{StoreError, StoreResult},
    sentiment::{SentimentLabel, SentimentResult},
};
use rusqlite::{params, OptionalExtension};

const COMPLAINT_COLUMNS: &str = "complaint_id, customer_id, customer_name, phone, text, branch_hint,
        created_at, sentiment_label, sentiment_score, category_id, category_name, criticality,
        subcategory_id, subcategory_name, matched_keyword, urgency, keywords_json,
        branch_outcome, branch_id, branch_confidence, branch_candidates_json";

/// Column values as stored, before decoding.
struct ComplaintRow {
    complaint_id: String,
    customer_id: String,
    customer_name: Option<String>,
    phone: Option<String>,
    text: String,
    branch_hint: Option<String>,
    created_at: String,
    sentiment_label: String,
    sentiment_score: f64,
    category_id: Option<i64>,
    category_name: String,
    criticality: u8,
    subcategory_id: Option<i64>,
    subcategory_name: Option<String>,
    matched_keyword: Option<String>,
    urgency: u8,
    keywords_json: String,
    branch_outcome: String,
    branch_id: Option<i64>,
    branch_confidence: Option<f64>,
    branch_candidates_json: String,
}

fn complaint_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ComplaintRow> {
    Ok(ComplaintRow {
        complaint_id: row.get(0)?,
        customer_id: row.get(1)?,
        customer_name: row.get(2)?,
        phone: row.get(3)?,
        text: row.get(4)?,
        branch_hint: row.get(5)?,
        created_at: row.get(6)?,
        sentiment_label: row.get(7)?,
        sentiment_score: row.get(8)?,
        category_id: row.get(9)?,
        category_name: row.get(10)?,
        criticality: row.get(11)?,
        subcategory_id: row.get(12)?,
        subcategory_name: row.get(13)?,
        matched_keyword: row.get(14)?,
        urgency: row.get(15)?,
        keywords_json: row.get(16)?,
        branch_outcome: row.get(17)?,
        branch_id: row.get(18)?,
        branch_confidence: row.get(19)?,
        branch_candidates_json: row.get(20)?,
    })
}

impl TryFrom<ComplaintRow> for EnrichedComplaint {
    type Error = StoreError;

    fn try_from(r: ComplaintRow) -> StoreResult<Self> {
        let label = SentimentLabel::parse(&r.sentiment_label).ok_or_else(|| StoreError::InvalidRow {
            column: "sentiment_label",
            value: r.sentiment_label.clone(),
        })?;
        let outcome = ResolutionOutcome::parse(&r.branch_outcome).ok_or_else(|| StoreError::InvalidRow {
            column: "branch_outcome",
            value: r.branch_outcome.clone(),
        })?;

        Ok(EnrichedComplaint {
            complaint_id: r.complaint_id,
            customer_id: r.customer_id,
            customer_name: r.customer_name,
            phone: r.phone,
            text: r.text,
            branch_hint: r.branch_hint,
            created_at: decode_ts("created_at", &r.created_at)?,
            sentiment: SentimentResult {
                label,
                score: r.sentiment_score,
            },
            category: CategoryMatch {
                category_id: r.category_id,
                category_name: r.category_name,
                criticality: r.criticality,
                subcategory_id: r.subcategory_id,
                subcategory_name: r.subcategory_name,
                matched_keyword: r.matched_keyword,
            },
            urgency: r.urgency,
            keywords: serde_json::from_str(&r.keywords_json)?,
            branch: BranchMatch {
                outcome,
                branch_id: r.branch_id,
                confidence: r.branch_confidence,
                candidate_ids: serde_json::from_str(&r.branch_candidates_json)?,
            },
        })
    }
}

impl StoreTx<'_> {
    // ── Complaint ──────────────────────────────────────────────────

    pub fn insert_complaint(
        &self,
        c: &EnrichedComplaint,
        raw_json: &str,
        analysis: &AnalysisMetadata,
    ) -> StoreResult<()> {
        self.tx.execute(
            "INSERT INTO complaint (
                complaint_id, customer_id, customer_name, phone, text, branch_hint,
                created_at, sentiment_label, sentiment_score, category_id, category_name,
                criticality, subcategory_id, subcategory_name, matched_keyword, urgency,
                keywords_json, branch_outcome, branch_id, branch_confidence,
                branch_candidates_json, raw_json, analysis_json
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16,
                       ?17, ?18, ?19, ?20, ?21, ?22, ?23)",
            params![
                &c.complaint_id,
                &c.customer_id,
                c.customer_name.as_deref(),
                c.phone.as_deref(),
                &c.text,
                c.branch_hint.as_deref(),
                encode_ts(&c.created_at),
                c.sentiment.label.as_str(),
                c.sentiment.score,
                c.category.category_id,
                &c.category.category_name,
                c.category.criticality,
                c.category.subcategory_id,
                c.category.subcategory_name.as_deref(),
                c.category.matched_keyword.as_deref(),
                c.urgency,
                serde_json::to_string(&c.keywords)?,
                c.branch.outcome.as_str(),
                c.branch.branch_id,
                c.branch.confidence,
                serde_json::to_string(&c.branch.candidate_ids)?,
                raw_json,
                serde_json::to_string(analysis)?,
            ],
        )?;
        Ok(())
    }
}

impl ComplaintStore {
    pub fn get_complaint(&self, complaint_id: &str) -> StoreResult<Option<EnrichedComplaint>> {
        let sql = format!("SELECT {COMPLAINT_COLUMNS} FROM complaint WHERE complaint_id = ?1");
        self.conn
            .query_row(&sql, params![complaint_id], complaint_row)
            .optional()?
            .map(EnrichedComplaint::try_from)
            .transpose()
    }

    pub fn complaints_for_customer(&self, customer_id: &str) -> StoreResult<Vec<EnrichedComplaint>> {
        let sql = format!(
            "SELECT {COMPLAINT_COLUMNS} FROM complaint WHERE customer_id = ?1
             ORDER BY created_at ASC, complaint_id ASC"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![customer_id], complaint_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(EnrichedComplaint::try_from).collect()
    }

    /// The submission exactly as received, as JSON.
    pub fn raw_submission(&self, complaint_id: &str) -> StoreResult<Option<String>> {
        Ok(self
            .conn
            .query_row(
                "SELECT raw_json FROM complaint WHERE complaint_id = ?1",
                params![complaint_id],
                |r| r.get(0),
            )
            .optional()?)
    }

    pub fn analysis_metadata(&self, complaint_id: &str) -> StoreResult<Option<AnalysisMetadata>> {
        let json: Option<String> = self
            .conn
            .query_row(
                "SELECT analysis_json FROM complaint WHERE complaint_id = ?1",
                params![complaint_id],
                |r| r.get(0),
            )
            .optional()?;
        json.map(|j| serde_json::from_str(&j).map_err(StoreError::from))
            .transpose()
    }

    pub fn complaint_count(&self) -> StoreResult<i64> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM complaint", [], |r| r.get(0))?)
    }
}
