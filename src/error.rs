use chrono::{DateTime, Utc};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Error taxonomy for a capture cycle.
///
/// Only `NotFound` during store open is recovered internally (the container is
/// recreated); every other variant aborts the current cycle and carries enough
/// context to diagnose which collaborator failed. The core never retries.
#[derive(Debug, Error)]
pub enum Error {
    /// A persistence location or record does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A configuration value or serialized record failed its declared shape.
    #[error("validation failed for {context}: {reason}")]
    Validation { context: String, reason: String },

    /// Two items in one captured roster share an external id. This violates
    /// the per-capture uniqueness invariant and points at upstream data
    /// corruption.
    #[error("duplicate external id '{external_id}' in roster '{roster}'")]
    DuplicateIdentity { roster: String, external_id: String },

    /// A page fetch failed partway through a listing. Partial results are
    /// discarded rather than passed off as a complete history.
    #[error("record listing failed after {fetched} records: {reason}")]
    Pagination { fetched: usize, reason: String },

    /// A collection could not be serialized for storage.
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A new capture's timestamp does not advance past the stored history.
    /// Indicates a clock problem or a concurrent writer, both of which must
    /// fail loudly instead of reordering history.
    #[error("capture timestamp {next} is not newer than the latest stored capture {last}")]
    NonMonotonic {
        last: DateTime<Utc>,
        next: DateTime<Utc>,
    },

    /// The upstream source failed while fetching one roster.
    #[error("fetch failed for roster '{roster}': {reason}")]
    Fetch { roster: String, reason: String },

    #[error("storage backend error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
