//! Local record shapes as exposed by the host document model

use serde::{Deserialize, Serialize};

use lore_model::{EntityKind, SyncMetadata};

/// A record as read from the local store.
///
/// `attributes` is the host's ad hoc nested property bag, passed through
/// untouched. Only the extractor is allowed to reach into it; everything
/// downstream works on the normalized `GenericEntity`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalRecord {
    pub id: String,
    pub kind: EntityKind,
    pub name: String,
    /// Host-side type/subtype (e.g. "character" sheet flavor)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtype: Option<String>,
    /// Name of the containing folder, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder: Option<String>,
    /// Raw kind-specific attributes
    #[serde(default)]
    pub attributes: serde_json::Map<String, serde_json::Value>,
    /// Image URL candidates, in host order
    #[serde(default)]
    pub images: Vec<String>,
    /// Engine-owned metadata block
    #[serde(default)]
    pub metadata: SyncMetadata,
}

impl LocalRecord {
    /// Create a bare record with the given identity.
    pub fn new(id: impl Into<String>, kind: EntityKind, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            name: name.into(),
            subtype: None,
            folder: None,
            attributes: serde_json::Map::new(),
            images: Vec::new(),
            metadata: SyncMetadata::default(),
        }
    }
}

/// Payload for creating a record in the local store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewRecord {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtype: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder: Option<String>,
    /// Free-text body; the host decides which native field it lands in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl NewRecord {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}
