//! Customer identity and per-customer complaint aggregates.
//!
//! A valid phone is the only identity key. Submissions without one get
//! a fresh anonymous customer each time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::CustomerId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerRecord {
    pub customer_id: CustomerId,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub is_anonymous: bool,
    pub complaint_count: i64,
    pub segment: String,
    pub first_seen_at: DateTime<Utc>,
    pub last_complaint_at: Option<DateTime<Utc>>,
}

impl CustomerRecord {
    pub fn new(
        customer_id: CustomerId,
        name: Option<String>,
        phone: Option<String>,
        seen_at: DateTime<Utc>,
    ) -> Self {
        Self {
            customer_id,
            is_anonymous: phone.is_none(),
            name,
            phone,
            complaint_count: 0,
            segment: segment_for(0).to_string(),
            first_seen_at: seen_at,
            last_complaint_at: None,
        }
    }

    /// Count one more complaint and recompute the segment.
    pub fn record_complaint(&mut self, at: DateTime<Utc>) {
        self.complaint_count += 1;
        self.segment = segment_for(self.complaint_count).to_string();
        self.last_complaint_at = Some(match self.last_complaint_at {
            Some(prev) if prev > at => prev,
            _ => at,
        });
    }
}

pub fn segment_for(complaint_count: i64) -> &'static str {
    match complaint_count {
        i64::MIN..=1 => "first_time",
        2..=4 => "recurring",
        _ => "chronic",
    }
}
