//! Error types for lore-model

/// Result type for lore-model operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when working with the entity model
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A string did not name a known entity kind
    #[error("Unknown entity kind: {kind}")]
    UnknownKind { kind: String },

    /// A metadata block failed schema validation
    #[error("Invalid sync metadata for {record_id}: {reason}")]
    InvalidMetadata { record_id: String, reason: String },

    /// JSON serialization/deserialization error
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
