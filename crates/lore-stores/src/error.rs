//! Error types for store operations
//!
//! The taxonomy mirrors how the engine reacts: `DescriptionTooLong` is a
//! per-record validation failure surfaced to the user, `NotFound` marks a
//! skippable unit of work, and `Transport`/`Storage` are generic per-job
//! failures the executor isolates and continues past.

/// Result type for store operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the local store or the remote campaign service
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A payload description exceeded the remote service's documented limit.
    /// Distinct from generic failure so callers can message it precisely.
    #[error("Description for {kind} '{name}' is {len} characters; the service accepts at most {max}")]
    DescriptionTooLong {
        kind: String,
        name: String,
        len: usize,
        max: usize,
    },

    /// The referenced record does not exist (anymore)
    #[error("Record not found: {id}")]
    NotFound { id: String },

    /// The remote service rejected or failed the request
    #[error("Remote service error: {message}")]
    Transport { message: String },

    /// The local store failed to read or write a record
    #[error("Local store error: {message}")]
    Storage { message: String },

    /// Metadata attached to a record failed schema validation
    #[error(transparent)]
    Model(#[from] lore_model::Error),

    /// JSON serialization/deserialization error
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// True for errors that mark a missing unit of work rather than a failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }
}
