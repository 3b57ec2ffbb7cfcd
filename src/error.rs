//! Crate-wide error type.
//!
//! Fatal conditions (missing inputs, invalid configuration) and the
//! scheduler invariant violation are reported through [`ArrangeError`].
//! Non-fatal conditions (duplicate job ids, stale cache entries) are
//! logged and handled in place.

use thiserror::Error;
use std::path::PathBuf;

use crate::validation::ValidationError;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ArrangeError>;

/// Errors produced by the reduction pipeline.
#[derive(Debug, Error)]
pub enum ArrangeError {
    /// The score file does not exist. No partial output is produced.
    #[error("score input not found: {}", .0.display())]
    MissingScore(PathBuf),

    /// A previously computed solver result was requested but is absent.
    #[error("solver result not found: {}", .0.display())]
    MissingResult(PathBuf),

    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Input data failed structural validation.
    #[error("invalid input: {} validation error(s)", .0.len())]
    InvalidInput(Vec<ValidationError>),

    /// A feasible selection could not be placed on the available tracks.
    ///
    /// Indicates a bug: feasibility guarantees at most `M` overlapping jobs.
    #[error("internal invariant violated: jobs {job_ids:?} could not be placed on {tracks} tracks")]
    UnplacedJobs {
        /// Ids of the dropped jobs.
        job_ids: Vec<u32>,
        /// Number of tracks available.
        tracks: usize,
    },

    /// A solver back end failed.
    #[error("solver failed: {0}")]
    Solver(String),

    /// Filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// (De)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
