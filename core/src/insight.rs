//! Operational alerts raised for urgent complaints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    complaint::EnrichedComplaint,
    config::InsightConfig,
    types::{ComplaintId, InsightId},
    urgency::MAX_URGENCY,
};

pub const URGENT_COMPLAINT_KIND: &str = "urgent_complaint";

/// Probability reported when no branch could be attributed.
const UNATTRIBUTED_PROBABILITY: f64 = 0.5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightRecord {
    pub insight_id: InsightId,
    pub complaint_id: ComplaintId,
    pub kind: String,
    pub title: String,
    pub description: String,
    pub impact: String,
    pub probability: f64,
    pub suggested_actions: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Build the insight for `complaint`, or `None` below `threshold`.
pub fn build_insight(
    insight_id: InsightId,
    complaint: &EnrichedComplaint,
    emergency: bool,
    threshold: u8,
    config: &InsightConfig,
) -> Option<InsightRecord> {
    if complaint.urgency < threshold {
        return None;
    }

    let impact = if complaint.urgency >= MAX_URGENCY { "critical" } else { "high" };
    let branch = match complaint.branch.branch_id {
        Some(id) => format!("sucursal {id}"),
        None => "sucursal sin identificar".to_string(),
    };
    let title = format!(
        "Queja urgente ({}) en {branch}",
        complaint.category.category_name
    );
    let description = format!(
        "Urgencia {}/{MAX_URGENCY}, sentimiento {}. {}",
        complaint.urgency,
        complaint.sentiment.label,
        excerpt(&complaint.text, 160),
    );

    let wanted = complaint.category.category_name.to_lowercase();
    let mut suggested_actions: Vec<String> = config
        .playbooks
        .iter()
        .find(|p| p.category.to_lowercase() == wanted)
        .map(|p| p.actions.clone())
        .unwrap_or_else(|| config.default_actions.clone());
    if emergency {
        suggested_actions.insert(0, config.emergency_action.clone());
    }

    Some(InsightRecord {
        insight_id,
        complaint_id: complaint.complaint_id.clone(),
        kind: URGENT_COMPLAINT_KIND.to_string(),
        title,
        description,
        impact: impact.to_string(),
        probability: complaint.branch.confidence.unwrap_or(UNATTRIBUTED_PROBABILITY),
        suggested_actions,
        created_at: complaint.created_at,
    })
}

fn excerpt(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{cut}…")
}
