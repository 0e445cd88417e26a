//! Entity extraction
//!
//! Reads raw local records and produces the uniform [`GenericEntity`]
//! stream every other engine stage consumes. Extraction is read-only and
//! restartable; a malformed record is skipped with a warning and never
//! aborts the pass.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use lore_model::{CrossRef, GenericEntity};
use lore_stores::{LocalRecord, LocalStore, list_all};

use crate::Result;
use crate::text::{is_external_url, strip_html};

/// Attribute paths probed for a record's free-text body, in priority order.
///
/// The first path that resolves to a non-empty string wins. Paths cover the
/// common sheet layouts: a flat `description`, the nested biography blocks
/// character sheets use, and the plain-text fields of journal records.
pub const DESCRIPTION_FALLBACKS: [&str; 7] = [
    "description",
    "details.biography.value",
    "details.description.value",
    "biography",
    "notes",
    "summary",
    "text.content",
];

/// Generic cross-reference token: `@UUID[Kind.id]` with an optional label.
static UUID_REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"@UUID\[([A-Za-z]+)\.([A-Za-z0-9]+)\](?:\{([^}]*)\})?")
        .expect("uuid ref regex must compile")
});

/// Journal-reference token: `@JournalEntry[id]` with an optional label.
static JOURNAL_REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"@JournalEntry\[([A-Za-z0-9]+)\](?:\{([^}]*)\})?")
        .expect("journal ref regex must compile")
});

/// Extracts and normalizes local records into [`GenericEntity`] values.
#[derive(Debug, Clone, Copy, Default)]
pub struct Extractor;

impl Extractor {
    pub fn new() -> Self {
        Self
    }

    /// Extract every record of every kind from the store.
    ///
    /// Records that fail normalization are skipped and logged; the rest of
    /// the pass continues.
    pub async fn extract_all(&self, store: &dyn LocalStore) -> Result<Vec<GenericEntity>> {
        let records = list_all(store).await?;
        let mut entities = Vec::with_capacity(records.len());
        for record in &records {
            match self.normalize(record) {
                Ok(entity) => entities.push(entity),
                Err(e) => {
                    tracing::warn!(record = %record.id, "Skipping malformed record: {}", e);
                }
            }
        }
        Ok(entities)
    }

    /// Normalize a single record.
    ///
    /// # Errors
    ///
    /// Returns an error if the record has a blank name or its metadata block
    /// fails validation. Callers doing bulk extraction treat this as a skip.
    pub fn normalize(&self, record: &LocalRecord) -> Result<GenericEntity> {
        if record.name.trim().is_empty() {
            return Err(lore_model::Error::InvalidMetadata {
                record_id: record.id.clone(),
                reason: "record has no name".to_string(),
            }
            .into());
        }
        record.metadata.validate(&record.id)?;

        let raw_body = first_description(&record.attributes).unwrap_or_default();
        let body = strip_html(&raw_body);

        let mut entity = GenericEntity::new(record.kind, record.id.clone(), record.name.trim());
        entity.subtype = record
            .subtype
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        entity.folder_name = record.folder.clone();
        // Tokens are scanned in the raw text: tag stripping may eat brackets
        entity.links = extract_refs(&raw_body);
        entity.body = body;
        entity.tags = extract_tags(&record.attributes);
        entity.images = record
            .images
            .iter()
            .filter(|url| is_external_url(url))
            .cloned()
            .collect();
        entity.metadata = record.attributes.clone();

        Ok(entity)
    }
}

/// Probe [`DESCRIPTION_FALLBACKS`] against the attribute bag.
fn first_description(attributes: &serde_json::Map<String, Value>) -> Option<String> {
    for path in DESCRIPTION_FALLBACKS {
        let mut current: Option<&Value> = None;
        for part in path.split('.') {
            current = match current {
                None => attributes.get(part),
                Some(value) => value.get(part),
            };
            if current.is_none() {
                break;
            }
        }
        if let Some(Value::String(s)) = current
            && !s.trim().is_empty()
        {
            return Some(s.clone());
        }
    }
    None
}

/// Pull the tag set out of the attribute bag.
///
/// Accepts either an array of strings or a comma-separated string under the
/// `tags` key; anything else yields an empty set.
fn extract_tags(attributes: &serde_json::Map<String, Value>) -> BTreeSet<String> {
    match attributes.get("tags") {
        Some(Value::Array(values)) => values
            .iter()
            .filter_map(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        Some(Value::String(joined)) => joined
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        _ => BTreeSet::new(),
    }
}

/// Scan free text for both cross-reference token grammars.
pub fn extract_refs(text: &str) -> Vec<CrossRef> {
    let mut refs = Vec::new();

    for capture in UUID_REF.captures_iter(text) {
        refs.push(CrossRef {
            target: capture[1].to_string(),
            id: capture[2].to_string(),
            label: capture.get(3).map(|m| m.as_str().to_string()),
        });
    }
    for capture in JOURNAL_REF.captures_iter(text) {
        refs.push(CrossRef {
            target: "JournalEntry".to_string(),
            id: capture[1].to_string(),
            label: capture.get(2).map(|m| m.as_str().to_string()),
        });
    }

    refs
}
