//! Error types for lore-engine

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in engine operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A sync plan was started while another execution was in flight
    #[error("A sync plan is already executing")]
    PlanAlreadyRunning,

    /// No mapping preset is registered under the given id
    #[error("Mapping preset not found: {id}")]
    PresetNotFound { id: String },

    /// A mapping rule carried an invalid guard pattern
    #[error("Invalid rule pattern in '{rule}': {message}")]
    InvalidRulePattern { rule: String, message: String },

    /// Engine configuration failed validation
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    // Transparent wrappers for underlying crate errors
    /// Model error from lore-model
    #[error(transparent)]
    Model(#[from] lore_model::Error),

    /// Store error from lore-stores
    #[error(transparent)]
    Store(#[from] lore_stores::Error),

    /// JSON serialization/deserialization error
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// TOML deserialization error
    #[error(transparent)]
    TomlDe(#[from] toml::de::Error),
}
