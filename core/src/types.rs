//! Shared primitive types used across the pipeline.

/// Generated identifier of a persisted complaint (`cmp-…`).
pub type ComplaintId = String;

/// Identifier of a customer identity (`cus-…`).
pub type CustomerId = String;

/// Identifier of an emitted insight (`ins-…`).
pub type InsightId = String;

/// Catalog key of a branch. Owned by the branch catalog.
pub type BranchId = i64;

/// Catalog key of a category or subcategory.
pub type CategoryId = i64;

/// Operational priority, always within `1..=5`.
pub type Urgency = u8;
