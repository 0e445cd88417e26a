//! Normalized entity representation shared by all engine stages
//!
//! Every source record, whatever ad hoc shape the local store gives it,
//! is normalized into a [`GenericEntity`] by the extractor. Nothing past
//! the extraction boundary touches raw attribute bags.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// The kinds of entity the engine understands.
///
/// `Journal` covers free-text records (notes, session logs, handouts) that
/// carry no sheet semantics of their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Character,
    Item,
    Location,
    Faction,
    Journal,
}

impl EntityKind {
    /// All kinds, in the order the engine processes them.
    pub const ALL: [EntityKind; 5] = [
        EntityKind::Character,
        EntityKind::Item,
        EntityKind::Location,
        EntityKind::Faction,
        EntityKind::Journal,
    ];
}

impl FromStr for EntityKind {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "character" | "actor" => Ok(EntityKind::Character),
            "item" => Ok(EntityKind::Item),
            "location" | "scene" | "place" => Ok(EntityKind::Location),
            "faction" | "organization" => Ok(EntityKind::Faction),
            "journal" | "journalentry" | "note" => Ok(EntityKind::Journal),
            _ => Err(Error::UnknownKind {
                kind: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Character => write!(f, "character"),
            EntityKind::Item => write!(f, "item"),
            EntityKind::Location => write!(f, "location"),
            EntityKind::Faction => write!(f, "faction"),
            EntityKind::Journal => write!(f, "journal"),
        }
    }
}

/// A cross-reference token found embedded in a record's free text.
///
/// Two grammars produce these: the generic `@Kind[id]{label}` token and the
/// journal shorthand `@JournalEntry[id]`, which has no label component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossRef {
    /// The referenced document kind as written in the token (e.g. "Actor")
    pub target: String,
    /// The referenced document id
    pub id: String,
    /// Display label, when the token carried one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// Uniform shape produced by extraction.
///
/// Created fresh on each extraction pass and consumed by the mapper and the
/// fingerprint engine; never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenericEntity {
    /// Classified kind of the source record
    pub kind: EntityKind,
    /// Kind-specific subtype (e.g. "player" / "npc" for characters)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtype: Option<String>,
    /// Display name
    pub name: String,
    /// Best-available free-text body, already stripped of markup
    pub body: String,
    /// Tag set; ordered so downstream hashing is stable
    #[serde(default)]
    pub tags: BTreeSet<String>,
    /// Cross-reference tokens found in the body
    #[serde(default)]
    pub links: Vec<CrossRef>,
    /// Candidate image URLs, in source order
    #[serde(default)]
    pub images: Vec<String>,
    /// Stable identity of the source record in the local store
    pub source_id: String,
    /// Name of the folder the source record lives in, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder_name: Option<String>,
    /// Kind-specific raw attributes retained for the mapper's field paths
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl GenericEntity {
    /// Create a minimally-populated entity for the given source record.
    pub fn new(kind: EntityKind, source_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind,
            subtype: None,
            name: name.into(),
            body: String::new(),
            tags: BTreeSet::new(),
            links: Vec::new(),
            images: Vec::new(),
            source_id: source_id.into(),
            folder_name: None,
            metadata: serde_json::Map::new(),
        }
    }

    /// Look up a dotted path against the entity's scalar fields and raw
    /// metadata. Used by mapping rules to materialize output fields.
    ///
    /// Recognized roots: `name`, `body`, `subtype`, `folder`, `tags`,
    /// `images.N`, and `metadata.<dotted.path>`.
    pub fn lookup(&self, path: &str) -> Option<String> {
        let (root, rest) = match path.split_once('.') {
            Some((r, rest)) => (r, Some(rest)),
            None => (path, None),
        };

        match root {
            "name" => Some(self.name.clone()),
            "body" => Some(self.body.clone()),
            "subtype" => self.subtype.clone(),
            "folder" => self.folder_name.clone(),
            "tags" => {
                let joined = self
                    .tags
                    .iter()
                    .cloned()
                    .collect::<Vec<_>>()
                    .join(", ");
                if joined.is_empty() { None } else { Some(joined) }
            }
            "images" => {
                let index: usize = rest?.parse().ok()?;
                self.images.get(index).cloned()
            }
            "metadata" => {
                let mut current = self.metadata.get(rest?.split('.').next()?)?;
                for part in rest?.split('.').skip(1) {
                    current = current.get(part)?;
                }
                json_scalar_to_string(current)
            }
            _ => None,
        }
    }
}

/// Render a JSON scalar as a plain string; objects and arrays yield None.
fn json_scalar_to_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => {
            if s.is_empty() {
                None
            } else {
                Some(s.clone())
            }
        }
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
