//! Complaint enrichment pipeline.
//!
//! STAGE ORDER (fixed):
//!   1. Normalize the raw submission
//!   2. Sentiment, category, branch (independent of each other)
//!   3. Urgency (sentiment + category + emergency keywords)
//!   4. Keywords
//!   5. Customer identity          ┐
//!   6. Complaint insert           │ one transaction:
//!   7. Customer stats refresh     │ all commit or none do
//!   8. Insight, if urgent         ┘
//!
//! RULES:
//!   - Stages 1–4 are total; they never fail.
//!   - Only persistence can fail, and it reports the failing stage.
//!   - One catalog snapshot is used for the whole submission.

use chrono::{TimeZone, Utc};
use std::sync::Arc;

use crate::{
    branch_resolver::{self, BranchResolution},
    catalog::{CatalogCache, CatalogSnapshot, CatalogSource},
    categorizer::{Categorizer, CategoryMatch},
    clock::{Clock, FixedClock, SystemClock},
    complaint::{AnalysisMetadata, BranchMatch, EnrichedComplaint},
    config::PipelineConfig,
    customer::CustomerRecord,
    error::{AtStage, CatalogError, ConfigError, PersistStage, ProcessingError, StoreError},
    ids::IdSource,
    insight::build_insight,
    keywords::KeywordExtractor,
    normalizer::{NormalizedComplaint, Normalizer, RawSubmission},
    sentiment::{SentimentAnalysis, SentimentScorer},
    store::ComplaintStore,
    urgency::{UrgencyAssessment, UrgencyCalculator},
};

/// Everything derived from the normalized text and hint, before any I/O.
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    pub sentiment: SentimentAnalysis,
    pub category: CategoryMatch,
    pub branch: BranchResolution,
    pub urgency: UrgencyAssessment,
    pub keywords: Vec<String>,
}

pub struct ComplaintPipeline {
    config: Arc<PipelineConfig>,
    catalog: Arc<CatalogCache>,
    store: ComplaintStore,
    clock: Box<dyn Clock>,
    ids: IdSource,
    sentiment: SentimentScorer,
    urgency: UrgencyCalculator,
    keywords: KeywordExtractor,
}

impl ComplaintPipeline {
    pub fn new(
        config: Arc<PipelineConfig>,
        catalog: Arc<CatalogCache>,
        store: ComplaintStore,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            sentiment: SentimentScorer::new(&config.sentiment)?,
            urgency: UrgencyCalculator::new(&config.urgency)?,
            keywords: KeywordExtractor::new(&config.keywords),
            config,
            catalog,
            store,
            clock: Box::new(SystemClock),
            ids: IdSource::random(),
        })
    }

    /// In-memory pipeline seeded from `source`, with a fixed clock and
    /// deterministic ids.
    pub fn build_test(source: &dyn CatalogSource, seed: u64) -> anyhow::Result<Self> {
        let mut store = ComplaintStore::in_memory()?;
        store.migrate()?;
        store.seed_catalog(source)?;
        let catalog = Arc::new(CatalogCache::load(&store)?);
        let epoch = Utc
            .with_ymd_and_hms(2024, 1, 15, 12, 0, 0)
            .single()
            .unwrap_or_default();
        Ok(Self::new(Arc::new(PipelineConfig::default()), catalog, store)?
            .with_clock(FixedClock(epoch))
            .with_ids(IdSource::seeded(seed, 0)))
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn with_ids(mut self, ids: IdSource) -> Self {
        self.ids = ids;
        self
    }

    pub fn catalog(&self) -> &Arc<CatalogCache> {
        &self.catalog
    }

    pub fn store(&self) -> &ComplaintStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut ComplaintStore {
        &mut self.store
    }

    /// Reload the shared catalog cache from this pipeline's database.
    pub fn reload_catalog(&self) -> Result<Arc<CatalogSnapshot>, CatalogError> {
        self.catalog.reload(&self.store)
    }

    pub fn normalize(&self, raw: &RawSubmission) -> NormalizedComplaint {
        Normalizer::new(&self.config.normalizer).normalize(raw, self.clock.now())
    }

    /// Run the scoring stages against one catalog snapshot.
    pub fn analyze(&self, normalized: &NormalizedComplaint, snapshot: &CatalogSnapshot) -> Analysis {
        let text = normalized.text.as_str();

        let sentiment = self.sentiment.analyze(text);
        let category = Categorizer::new(&snapshot.keyword_index, &self.config.default_category)
            .categorize(text);
        let branch = branch_resolver::resolve(
            &snapshot.branches,
            normalized.branch_hint.as_deref(),
            self.config.branches.candidate_limit,
        );
        let urgency = self
            .urgency
            .assess(&sentiment.result, &category.category_name, text);
        let keywords = self.keywords.extract(text, self.config.keywords.top_n);

        Analysis {
            sentiment,
            category,
            branch,
            urgency,
            keywords,
        }
    }

    /// Enrich and persist one submission.
    pub fn submit(&mut self, raw: &RawSubmission) -> Result<EnrichedComplaint, ProcessingError> {
        let snapshot = self.catalog.snapshot();
        if !snapshot.is_loaded() {
            log::warn!("catalog unavailable: using default category and no branch candidates");
        }

        let normalized = self.normalize(raw);
        let analysis = self.analyze(&normalized, &snapshot);
        log::debug!(
            "analyzed submission: sentiment={} category={} urgency={} branch={}",
            analysis.sentiment.result.label,
            analysis.category.category_name,
            analysis.urgency.level,
            analysis.branch.outcome.as_str(),
        );

        match self.persist(raw, normalized, analysis, snapshot.generation) {
            Ok(complaint) => {
                log::info!(
                    "complaint {} recorded for customer {} (urgency {})",
                    complaint.complaint_id,
                    complaint.customer_id,
                    complaint.urgency,
                );
                Ok(complaint)
            }
            Err(e) => {
                log::error!("complaint not recorded, rolled back: {e}");
                Err(e)
            }
        }
    }

    fn persist(
        &mut self,
        raw: &RawSubmission,
        normalized: NormalizedComplaint,
        analysis: Analysis,
        catalog_generation: u64,
    ) -> Result<EnrichedComplaint, ProcessingError> {
        let raw_json = serde_json::to_string(raw)
            .map_err(StoreError::from)
            .at(PersistStage::ComplaintInsert)?;
        let metadata = AnalysisMetadata {
            pipeline_version: env!("CARGO_PKG_VERSION").to_string(),
            catalog_generation,
            negative_hits: analysis.sentiment.negative_hits,
            positive_hits: analysis.sentiment.positive_hits,
            matched_keyword: analysis.category.matched_keyword.clone(),
            emergency_keyword: analysis.urgency.emergency_keyword.clone(),
            branch_outcome: analysis.branch.outcome,
            branch_candidates: analysis.branch.candidates.clone(),
        };
        let complaint_id = self.ids.next_complaint_id();

        let tx = self.store.begin().at(PersistStage::Begin)?;

        // Identity: phone is the only dedup key.
        let existing = match normalized.phone.as_deref() {
            Some(phone) => tx.customer_by_phone(phone).at(PersistStage::CustomerLookup)?,
            None => None,
        };
        let mut customer = match existing {
            Some(found) => {
                if let (None, Some(name)) = (&found.name, &normalized.customer_name) {
                    tx.set_customer_name(&found.customer_id, name)
                        .at(PersistStage::CustomerUpdate)?;
                }
                found
            }
            None => {
                let created = CustomerRecord::new(
                    self.ids.next_customer_id(),
                    normalized.customer_name.clone(),
                    normalized.phone.clone(),
                    normalized.created_at,
                );
                tx.insert_customer(&created).at(PersistStage::CustomerInsert)?;
                log::debug!(
                    "created {} customer {}",
                    if created.is_anonymous { "anonymous" } else { "identified" },
                    created.customer_id
                );
                created
            }
        };

        let complaint = EnrichedComplaint {
            complaint_id,
            customer_id: customer.customer_id.clone(),
            customer_name: normalized.customer_name,
            phone: normalized.phone,
            text: normalized.text,
            branch_hint: normalized.branch_hint,
            created_at: normalized.created_at,
            sentiment: analysis.sentiment.result,
            branch: BranchMatch::from(&analysis.branch),
            category: analysis.category,
            urgency: analysis.urgency.level,
            keywords: analysis.keywords,
        };
        tx.insert_complaint(&complaint, &raw_json, &metadata)
            .at(PersistStage::ComplaintInsert)?;

        customer.record_complaint(complaint.created_at);
        tx.update_customer_stats(&customer)
            .at(PersistStage::CustomerStats)?;

        let threshold = self.config.urgency.insight_threshold;
        if complaint.urgency >= threshold {
            let insight = build_insight(
                self.ids.next_insight_id(),
                &complaint,
                analysis.urgency.emergency_keyword.is_some(),
                threshold,
                &self.config.insights,
            );
            if let Some(insight) = insight {
                tx.insert_insight(&insight).at(PersistStage::InsightInsert)?;
                log::debug!("insight {} raised for {}", insight.insight_id, complaint.complaint_id);
            }
        }

        tx.commit().at(PersistStage::Commit)?;
        Ok(complaint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        catalog::{Branch, CategoryRow, StaticCatalog},
    };

    fn catalog() -> StaticCatalog {
        StaticCatalog::new(
            vec![Branch {
                branch_id: 1,
                external_key: "101".into(),
                name: "Monterrey".into(),
                municipality: "Monterrey".into(),
                state_code: "NL".into(),
                active: true,
            }],
            vec![CategoryRow {
                category_id: 2,
                category_name: "Higiene".into(),
                criticality: 5,
                subcategory_id: Some(21),
                subcategory_name: Some("Contaminación".into()),
                keywords: vec!["cabello".into(), "cucaracha".into()],
            }],
        )
    }

    fn pipeline() -> ComplaintPipeline {
        let store = ComplaintStore::in_memory().unwrap();
        store.migrate().unwrap();
        let cache = Arc::new(CatalogCache::load(&catalog()).unwrap());
        ComplaintPipeline::new(Arc::new(PipelineConfig::default()), cache, store)
            .unwrap()
            .with_clock(FixedClock(Utc.with_ymd_and_hms(2024, 5, 1, 13, 0, 0).unwrap()))
            .with_ids(IdSource::seeded(7, 0))
    }

    fn urgent() -> RawSubmission {
        RawSubmission::new()
            .with("descripcion", "Había una cucaracha en la sopa, horrible y asqueroso")
            .with("telefono", "5598765432")
            .with("sucursal", "Monterrey")
    }

    #[test]
    fn failure_in_last_write_rolls_back_everything() {
        let mut p = pipeline();
        p.store().execute_batch("DROP TABLE insight;").unwrap();

        let err = p.submit(&urgent()).unwrap_err();
        assert_eq!(err.stage(), PersistStage::InsightInsert);

        assert_eq!(p.store().complaint_count().unwrap(), 0, "complaint must roll back");
        assert_eq!(p.store().customer_count().unwrap(), 0, "customer must roll back");
    }

    #[test]
    fn unmigrated_store_fails_at_customer_lookup() {
        let store = ComplaintStore::in_memory().unwrap();
        let cache = Arc::new(CatalogCache::load(&catalog()).unwrap());
        let mut p = ComplaintPipeline::new(Arc::new(PipelineConfig::default()), cache, store).unwrap();

        let err = p.submit(&urgent()).unwrap_err();
        assert_eq!(err.stage(), PersistStage::CustomerLookup);
        assert!(err.to_string().contains("customer_lookup"));
    }

    #[test]
    fn anonymous_submission_fails_at_customer_insert_when_unmigrated() {
        let store = ComplaintStore::in_memory().unwrap();
        let mut p = ComplaintPipeline::new(
            Arc::new(PipelineConfig::default()),
            Arc::new(CatalogCache::empty()),
            store,
        )
        .unwrap();
        let err = p
            .submit(&RawSubmission::new().with("descripcion", "sin teléfono"))
            .unwrap_err();
        assert_eq!(err.stage(), PersistStage::CustomerInsert);
    }

    #[test]
    fn name_backfill_failure_is_reported_as_customer_update() {
        let mut p = pipeline();
        p.submit(&RawSubmission::new().with("descripcion", "sopa fría").with("telefono", "5511112222"))
            .unwrap();
        p.store()
            .execute_batch(
                "CREATE TRIGGER reject_name BEFORE UPDATE OF name ON customer \
                 BEGIN SELECT RAISE(ABORT, 'name locked'); END;",
            )
            .unwrap();

        let err = p
            .submit(
                &RawSubmission::new()
                    .with("descripcion", "otra vez fría")
                    .with("telefono", "5511112222")
                    .with("nombre", "Lucía"),
            )
            .unwrap_err();
        assert_eq!(err.stage(), PersistStage::CustomerUpdate);
        assert_eq!(p.store().complaint_count().unwrap(), 1);
    }

    #[test]
    fn urgent_complaint_commits_with_insight() {
        let mut p = pipeline();
        let c = p.submit(&urgent()).unwrap();
        assert_eq!(c.urgency, 5);
        assert_eq!(c.category.category_name, "Higiene");

        let insights = p.store().insights_for_complaint(&c.complaint_id).unwrap();
        assert_eq!(insights.len(), 1);
        assert_eq!(insights[0].impact, "critical");
        assert_eq!(insights[0].probability, 0.95);
        assert_eq!(insights[0].suggested_actions[0], "Programar inspección sanitaria en la sucursal");
    }

    #[test]
    fn metadata_records_catalog_generation_and_hits() {
        let mut p = pipeline();
        let c = p.submit(&urgent()).unwrap();
        let meta = p.store().analysis_metadata(&c.complaint_id).unwrap().unwrap();
        assert_eq!(meta.catalog_generation, 1);
        assert_eq!(meta.negative_hits, 2);
        assert_eq!(meta.matched_keyword.as_deref(), Some("cucaracha"));
        assert_eq!(meta.branch_candidates.len(), 1);
    }
}
