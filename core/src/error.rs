use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid stored value in column '{column}': {value}")]
    InvalidRow { column: &'static str, value: String },

    #[error("No {table} row with key '{key}'")]
    MissingRow { table: &'static str, key: String },
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Catalog store error: {0}")]
    Store(#[from] StoreError),

    #[error("Cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Catalog parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Cannot build category keyword matcher: {0}")]
    Matcher(#[from] aho_corasick::BuildError),
}

/// A rule set that cannot be compiled into matchers.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot build {lexicon} keyword matcher: {source}")]
    Lexicon {
        lexicon: &'static str,
        #[source]
        source: aho_corasick::BuildError,
    },
}

/// The persistence step a submission was in when it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistStage {
    Begin,
    CustomerLookup,
    CustomerInsert,
    CustomerUpdate,
    ComplaintInsert,
    CustomerStats,
    InsightInsert,
    Commit,
}

impl PersistStage {
    pub fn as_str(self) -> &'static str {
        match self {
            PersistStage::Begin           => "begin",
            PersistStage::CustomerLookup  => "customer_lookup",
            PersistStage::CustomerInsert  => "customer_insert",
            PersistStage::CustomerUpdate  => "customer_update",
            PersistStage::ComplaintInsert => "complaint_insert",
            PersistStage::CustomerStats   => "customer_stats",
            PersistStage::InsightInsert   => "insight_insert",
            PersistStage::Commit          => "commit",
        }
    }
}

impl fmt::Display for PersistStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The only failure `ComplaintPipeline::submit` reports.
/// Every other stage falls back instead of failing.
#[derive(Error, Debug)]
pub enum ProcessingError {
    #[error("Persistence failed at stage '{stage}': {source}")]
    Persistence {
        stage: PersistStage,
        #[source]
        source: StoreError,
    },
}

impl ProcessingError {
    pub fn stage(&self) -> PersistStage {
        match self {
            ProcessingError::Persistence { stage, .. } => *stage,
        }
    }
}

/// Attach a stage to a store failure.
pub(crate) trait AtStage<T> {
    fn at(self, stage: PersistStage) -> Result<T, ProcessingError>;
}

impl<T> AtStage<T> for StoreResult<T> {
    fn at(self, stage: PersistStage) -> Result<T, ProcessingError> {
        self.map_err(|source| ProcessingError::Persistence { stage, source })
    }
}
