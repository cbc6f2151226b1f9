//! Error types for the derivation stages.

use crate::assessment::Pass;
use kabu_data::DataError;
use thiserror::Error;

/// Result type for analysis operations.
pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Errors that can occur while deriving summaries or assessments.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Store or parsing error outside a pass
    #[error(transparent)]
    Data(#[from] DataError),

    /// An assessment pass failed; earlier passes stay committed
    #[error("Assessment pass '{pass}' failed: {source}")]
    Pass {
        /// The pass that failed
        pass: Pass,
        /// Underlying error
        source: DataError,
    },

    /// The summary rebuild transaction failed; previous summaries are intact
    #[error("Summary rebuild failed: {0}")]
    Transaction(DataError),

    /// A disclosure set that cannot be reduced
    #[error("Invalid disclosure for {code}: {reason}")]
    InvalidDisclosure {
        /// Issuer code being processed
        code: String,
        /// What was wrong
        reason: String,
    },
}
