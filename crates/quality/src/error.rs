//! Error taxonomy of the inspection core.

use portdq_core::InspectionId;
use portdq_storage::StorageError;
use std::time::Duration;

/// Result alias for inspection operations.
pub type Result<T> = std::result::Result<T, QualityError>;

/// Run-level and lookup errors.
///
/// Per-rule configuration problems never surface here; they are recorded as
/// degraded field statistics and the run continues.
#[derive(Debug, thiserror::Error)]
pub enum QualityError {
    /// Catalog has no such data type; raised before any fetch
    #[error("Unknown data type: {0}")]
    UnknownDataType(String),

    /// Row source unreachable, timed out, or returned a malformed body
    #[error("Row fetch failed for {data_type}: {source}")]
    FetchFailed {
        /// Data type being inspected
        data_type: String,
        /// Underlying failure
        #[source]
        source: FetchError,
    },

    /// Resolved rule set has nothing to evaluate
    #[error("No rules configured for {0}")]
    NoRulesConfigured(String),

    /// Request or configuration could not be understood
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A computed result could not be stored
    #[error("Failed to persist inspection {inspection_id}: {source}")]
    Persistence {
        /// Id of the result that was not stored
        inspection_id: InspectionId,
        /// Underlying failure
        #[source]
        source: StorageError,
    },

    /// Lookup on a key with no record
    #[error("Not found: {0}")]
    NotFound(String),

    /// Catalog could not be loaded
    #[error(transparent)]
    Catalog(#[from] crate::catalog::CatalogError),

    /// History read failure
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Failures of a row source.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Connection or protocol failure
    #[error("transport error: {0}")]
    Transport(String),

    /// Upstream answered with a non-2xx status
    #[error("upstream returned HTTP {0}")]
    Status(u16),

    /// Body was not a row set
    #[error("malformed body: {0}")]
    Body(String),

    /// Fetch did not finish in time
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// Local file source could not be read
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
