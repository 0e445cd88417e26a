//! Content fingerprinting
//!
//! A fingerprint is a hash over a canonical projection of a
//! [`GenericEntity`]: tags sorted, volatile metadata keys stripped, object
//! keys in deterministic order. It is stored next to a record's remote-id
//! reference and consulted to skip redundant re-import work. It is never
//! used to decide identity.

use serde_json::{Map, Value};

use lore_model::GenericEntity;

/// Metadata keys that change without the content changing. Stripped at
/// every nesting level before hashing.
pub const VOLATILE_KEYS: [&str; 9] = [
    "_id",
    "id",
    "_stats",
    "sort",
    "ownership",
    "permission",
    "timestamp",
    "createdTime",
    "modifiedTime",
];

/// Compute the content fingerprint of an entity.
///
/// Identical semantic content yields an identical hash regardless of
/// metadata key order or volatile bookkeeping fields.
pub fn fingerprint(entity: &GenericEntity) -> String {
    let serialized =
        serde_json::to_string(&canonical_projection(entity)).expect("projection serializes");
    digest(serialized.as_bytes())
}

/// Build the canonical, order-independent projection that gets hashed.
///
/// `serde_json` maps are BTree-backed, so object keys serialize sorted;
/// `tags` is an ordered set by construction. `source_id` is identity, not
/// content, and is deliberately left out.
pub fn canonical_projection(entity: &GenericEntity) -> Value {
    let mut projection = Map::new();
    projection.insert("kind".into(), Value::String(entity.kind.to_string()));
    projection.insert(
        "subtype".into(),
        entity
            .subtype
            .clone()
            .map(Value::String)
            .unwrap_or(Value::Null),
    );
    projection.insert("name".into(), Value::String(entity.name.clone()));
    projection.insert("body".into(), Value::String(entity.body.clone()));
    projection.insert(
        "tags".into(),
        Value::Array(
            entity
                .tags
                .iter()
                .cloned()
                .map(Value::String)
                .collect(),
        ),
    );
    projection.insert(
        "links".into(),
        serde_json::to_value(&entity.links).expect("links serialize"),
    );
    projection.insert(
        "images".into(),
        Value::Array(entity.images.iter().cloned().map(Value::String).collect()),
    );
    projection.insert(
        "folder".into(),
        entity
            .folder_name
            .clone()
            .map(Value::String)
            .unwrap_or(Value::Null),
    );
    projection.insert(
        "metadata".into(),
        strip_volatile(Value::Object(entity.metadata.clone())),
    );
    Value::Object(projection)
}

/// Remove volatile keys recursively.
fn strip_volatile(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(key, _)| !VOLATILE_KEYS.contains(&key.as_str()))
                .map(|(key, nested)| (key, strip_volatile(nested)))
                .collect(),
        ),
        Value::Array(values) => Value::Array(values.into_iter().map(strip_volatile).collect()),
        other => other,
    }
}

#[cfg(feature = "sha-fingerprint")]
fn digest(bytes: &[u8]) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Fast non-cryptographic fallback for hosts without a crypto primitive.
#[cfg(not(feature = "sha-fingerprint"))]
fn digest(bytes: &[u8]) -> String {
    use std::hash::{DefaultHasher, Hash, Hasher};
    let mut hasher = DefaultHasher::new();
    bytes.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lore_model::EntityKind;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn entity() -> GenericEntity {
        let mut entity = GenericEntity::new(EntityKind::Character, "c1", "Mira");
        entity.body = "A quiet ranger.".to_string();
        entity.tags.insert("ranger".to_string());
        entity.tags.insert("ally".to_string());
        entity
    }

    #[test]
    fn identical_content_hashes_identically() {
        let a = entity();
        let mut b = GenericEntity::new(EntityKind::Character, "c1", "Mira");
        b.body = "A quiet ranger.".to_string();
        // Insertion order differs; set ordering makes it irrelevant
        b.tags.insert("ally".to_string());
        b.tags.insert("ranger".to_string());

        assert_eq!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn volatile_metadata_does_not_affect_hash() {
        let a = entity();
        let mut b = entity();
        b.metadata
            .insert("_id".to_string(), serde_json::json!("xyz"));
        b.metadata
            .insert("modifiedTime".to_string(), serde_json::json!(1699999999));

        assert_eq!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn volatile_keys_are_stripped_recursively() {
        let mut a = entity();
        a.metadata.insert(
            "details".to_string(),
            serde_json::json!({ "origin": "north" }),
        );
        let mut b = entity();
        b.metadata.insert(
            "details".to_string(),
            serde_json::json!({ "origin": "north", "_stats": { "rev": 7 } }),
        );

        assert_eq!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn name_and_body_changes_change_hash() {
        let base = fingerprint(&entity());

        let mut renamed = entity();
        renamed.name = "Mira K.".to_string();
        assert_ne!(fingerprint(&renamed), base);

        let mut rewritten = entity();
        rewritten.body = "A loud ranger.".to_string();
        assert_ne!(fingerprint(&rewritten), base);
    }

    #[test]
    fn source_id_is_not_content() {
        let a = entity();
        let mut b = entity();
        b.source_id = "c2".to_string();

        assert_eq!(fingerprint(&a), fingerprint(&b));
    }

    proptest! {
        /// Hashing is a pure function of the canonical projection: any two
        /// entities with equal projections hash equally, and hashing twice
        /// is stable.
        #[test]
        fn fingerprint_is_deterministic(name in "[a-zA-Z ]{1,20}", body in ".{0,64}") {
            let mut a = GenericEntity::new(EntityKind::Journal, "j1", name.clone());
            a.body = body.clone();
            let mut b = GenericEntity::new(EntityKind::Journal, "j9", name);
            b.body = body;

            prop_assert_eq!(fingerprint(&a), fingerprint(&a));
            prop_assert_eq!(fingerprint(&a), fingerprint(&b));
        }
    }
}
