//! Fuzzy attribution of a free-text location hint to catalog branches.
//!
//! Each branch is tested against six predicates, strongest first, and
//! keeps only the strongest one that holds. Branches matching none are
//! not candidates at all.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::{catalog::Branch, types::BranchId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchReason {
    ExactId,
    ExactName,
    ExactCity,
    PartialName,
    PartialCity,
    State,
}

impl MatchReason {
    /// Strongest first.
    pub const TIERS: [MatchReason; 6] = [
        MatchReason::ExactId,
        MatchReason::ExactName,
        MatchReason::ExactCity,
        MatchReason::PartialName,
        MatchReason::PartialCity,
        MatchReason::State,
    ];

    pub fn confidence(self) -> f64 {
        match self {
            MatchReason::ExactId     => 1.00,
            MatchReason::ExactName   => 0.95,
            MatchReason::ExactCity   => 0.85,
            MatchReason::PartialName => 0.75,
            MatchReason::PartialCity => 0.65,
            MatchReason::State       => 0.60,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MatchReason::ExactId     => "exact_id",
            MatchReason::ExactName   => "exact_name",
            MatchReason::ExactCity   => "exact_city",
            MatchReason::PartialName => "partial_name",
            MatchReason::PartialCity => "partial_city",
            MatchReason::State       => "state",
        }
    }

    fn holds(self, branch: &Branch, hint: &str) -> bool {
        match self {
            MatchReason::ExactId     => branch.external_key.trim() == hint,
            MatchReason::ExactName   => branch.name.to_lowercase() == hint,
            MatchReason::ExactCity   => branch.municipality.to_lowercase() == hint,
            MatchReason::PartialName => branch.name.to_lowercase().contains(hint),
            MatchReason::PartialCity => branch.municipality.to_lowercase().contains(hint),
            MatchReason::State       => branch.state_code.to_lowercase() == hint,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchCandidate {
    pub branch_id: BranchId,
    pub name: String,
    pub municipality: String,
    pub state_code: String,
    pub confidence: f64,
    pub match_reason: MatchReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionOutcome {
    /// No hint was given.
    Unspecified,
    /// A hint was given and no branch matched it.
    NoMatch,
    Matched,
}

impl ResolutionOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            ResolutionOutcome::Unspecified => "unspecified",
            ResolutionOutcome::NoMatch     => "no_match",
            ResolutionOutcome::Matched     => "matched",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "unspecified" => Some(ResolutionOutcome::Unspecified),
            "no_match"    => Some(ResolutionOutcome::NoMatch),
            "matched"     => Some(ResolutionOutcome::Matched),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchResolution {
    pub outcome: ResolutionOutcome,
    /// Highest confidence first.
    pub candidates: Vec<BranchCandidate>,
}

impl BranchResolution {
    pub fn unspecified() -> Self {
        Self { outcome: ResolutionOutcome::Unspecified, candidates: Vec::new() }
    }

    pub fn best(&self) -> Option<&BranchCandidate> {
        self.candidates.first()
    }
}

/// Rank `branches` against `hint`, keeping at most `limit` candidates
/// (at least one, so a match always names its branch).
pub fn resolve(branches: &[Branch], hint: Option<&str>, limit: usize) -> BranchResolution {
    let hint = match hint.map(|h| h.trim().to_lowercase()) {
        Some(h) if !h.is_empty() => h,
        _ => return BranchResolution::unspecified(),
    };

    let mut candidates: Vec<BranchCandidate> = branches
        .iter()
        .filter(|b| b.active)
        .filter_map(|b| {
            let reason = MatchReason::TIERS.into_iter().find(|t| t.holds(b, &hint))?;
            Some(BranchCandidate {
                branch_id: b.branch_id,
                name: b.name.clone(),
                municipality: b.municipality.clone(),
                state_code: b.state_code.clone(),
                confidence: reason.confidence(),
                match_reason: reason,
            })
        })
        .collect();

    if candidates.is_empty() {
        log::debug!("no branch matched hint {hint:?}");
        return BranchResolution { outcome: ResolutionOutcome::NoMatch, candidates };
    }

    candidates.sort_by(rank);
    candidates.truncate(limit.max(1));
    BranchResolution { outcome: ResolutionOutcome::Matched, candidates }
}

fn rank(a: &BranchCandidate, b: &BranchCandidate) -> Ordering {
    b.confidence
        .total_cmp(&a.confidence)
        .then_with(|| a.name.cmp(&b.name))
        .then_with(|| a.branch_id.cmp(&b.branch_id))
}
