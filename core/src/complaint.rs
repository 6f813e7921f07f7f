//! The enriched, persisted form of one submission.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    branch_resolver::{BranchCandidate, BranchResolution, ResolutionOutcome},
    categorizer::CategoryMatch,
    normalizer::NormalizedComplaint,
    sentiment::SentimentResult,
    types::{BranchId, ComplaintId, CustomerId, Urgency},
};

/// Branch attribution as stored with the complaint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchMatch {
    pub outcome: ResolutionOutcome,
    pub branch_id: Option<BranchId>,
    pub confidence: Option<f64>,
    pub candidate_ids: Vec<BranchId>,
}

impl From<&BranchResolution> for BranchMatch {
    fn from(resolution: &BranchResolution) -> Self {
        let best = resolution.best();
        Self {
            outcome: resolution.outcome,
            branch_id: best.map(|c| c.branch_id),
            confidence: best.map(|c| c.confidence),
            candidate_ids: resolution.candidates.iter().map(|c| c.branch_id).collect(),
        }
    }
}

/// Created once per submission and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedComplaint {
    pub complaint_id: ComplaintId,
    pub customer_id: CustomerId,
    pub customer_name: Option<String>,
    pub phone: Option<String>,
    pub text: String,
    pub branch_hint: Option<String>,
    pub created_at: DateTime<Utc>,
    pub sentiment: SentimentResult,
    pub category: CategoryMatch,
    pub urgency: Urgency,
    /// At most five, most frequent first.
    pub keywords: Vec<String>,
    pub branch: BranchMatch,
}

impl EnrichedComplaint {
    /// The normalized input this record was derived from.
    pub fn normalized(&self) -> NormalizedComplaint {
        NormalizedComplaint {
            customer_name: self.customer_name.clone(),
            phone: self.phone.clone(),
            text: self.text.clone(),
            branch_hint: self.branch_hint.clone(),
            created_at: self.created_at,
        }
    }
}

/// Diagnostic blob stored next to each complaint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisMetadata {
    pub pipeline_version: String,
    pub catalog_generation: u64,
    pub negative_hits: usize,
    pub positive_hits: usize,
    pub matched_keyword: Option<String>,
    pub emergency_keyword: Option<String>,
    pub branch_outcome: ResolutionOutcome,
    pub branch_candidates: Vec<BranchCandidate>,
}
