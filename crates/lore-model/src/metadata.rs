//! Per-record sync metadata schema
//!
//! Each local record carries one [`SyncMetadata`] block owned by the engine.
//! The block is the source of truth for remote identity and relationships;
//! the link graph is only ever derived from it. Validation happens on every
//! read and write so malformed blocks never travel further than the store
//! boundary.

use serde::{Deserialize, Serialize};

use crate::entity::EntityKind;
use crate::error::{Error, Result};

/// Kind-bucketed lists of related record ids.
///
/// Buckets are directional ("this record points at those"): the same pair of
/// records may appear in one side's buckets without appearing in the other's.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipBuckets {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub characters: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub factions: Vec<String>,
    /// Locations this record is associated with, as opposed to the strict
    /// parent/child hierarchy tracked by `parent_location_id`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub locations_associative: Vec<String>,
    /// Free-text/journal records
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entries: Vec<String>,
}

impl RelationshipBuckets {
    /// True when every bucket is empty.
    pub fn is_empty(&self) -> bool {
        self.characters.is_empty()
            && self.items.is_empty()
            && self.factions.is_empty()
            && self.locations_associative.is_empty()
            && self.entries.is_empty()
    }

    /// The bucket holding ids of the given kind.
    pub fn bucket(&self, kind: EntityKind) -> &Vec<String> {
        match kind {
            EntityKind::Character => &self.characters,
            EntityKind::Item => &self.items,
            EntityKind::Faction => &self.factions,
            EntityKind::Location => &self.locations_associative,
            EntityKind::Journal => &self.entries,
        }
    }

    /// Mutable access to the bucket holding ids of the given kind.
    pub fn bucket_mut(&mut self, kind: EntityKind) -> &mut Vec<String> {
        match kind {
            EntityKind::Character => &mut self.characters,
            EntityKind::Item => &mut self.items,
            EntityKind::Faction => &mut self.factions,
            EntityKind::Location => &mut self.locations_associative,
            EntityKind::Journal => &mut self.entries,
        }
    }

    /// Add an id to the bucket for `kind` if not already present.
    pub fn add(&mut self, kind: EntityKind, id: impl Into<String>) {
        let id = id.into();
        let bucket = self.bucket_mut(kind);
        if !bucket.contains(&id) {
            bucket.push(id);
        }
    }

    /// Remove an id from the bucket for `kind`. Returns true if it was there.
    pub fn remove(&mut self, kind: EntityKind, id: &str) -> bool {
        let bucket = self.bucket_mut(kind);
        let before = bucket.len();
        bucket.retain(|existing| existing != id);
        bucket.len() != before
    }

    /// All ids across every bucket, in bucket order.
    pub fn all_ids(&self) -> Vec<&str> {
        self.characters
            .iter()
            .chain(&self.items)
            .chain(&self.factions)
            .chain(&self.locations_associative)
            .chain(&self.entries)
            .map(String::as_str)
            .collect()
    }
}

/// The engine-owned metadata block attached to each local record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncMetadata {
    /// Sheet classification recorded at import time (e.g. "pc", "npc")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sheet_type: Option<String>,
    /// Id of the matching record on the remote service
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_id: Option<String>,
    /// Campaign the remote record belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_campaign_id: Option<String>,
    /// Directional relationship buckets
    #[serde(default, skip_serializing_if = "RelationshipBuckets::is_empty")]
    pub relationship_outbound: RelationshipBuckets,
    /// Legacy symmetric relationship buckets, read for backward compatibility
    #[serde(default, skip_serializing_if = "RelationshipBuckets::is_empty")]
    pub relationship_refs: RelationshipBuckets,
    /// Parent in the location hierarchy (locations only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_location_id: Option<String>,
    /// Ids of related local records of other kinds
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub local_cross_references: Vec<String>,
    /// Content fingerprint from the last import; idempotence only, never identity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
}

impl SyncMetadata {
    /// Validate the block against the schema rules.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidMetadata`] when any id field is blank or the
    /// record is recorded as its own parent.
    pub fn validate(&self, record_id: &str) -> Result<()> {
        let blank = |s: &String| s.trim().is_empty();

        if self.remote_id.as_ref().is_some_and(blank) {
            return Err(invalid(record_id, "remoteId must not be blank"));
        }
        if self.remote_campaign_id.as_ref().is_some_and(blank) {
            return Err(invalid(record_id, "remoteCampaignId must not be blank"));
        }
        if let Some(parent) = &self.parent_location_id {
            if blank(parent) {
                return Err(invalid(record_id, "parentLocationId must not be blank"));
            }
            if parent == record_id {
                return Err(invalid(record_id, "record cannot be its own parent"));
            }
        }
        for bucket_id in self
            .relationship_outbound
            .all_ids()
            .into_iter()
            .chain(self.relationship_refs.all_ids())
            .chain(self.local_cross_references.iter().map(String::as_str))
        {
            if bucket_id.trim().is_empty() {
                return Err(invalid(record_id, "relationship ids must not be blank"));
            }
        }
        Ok(())
    }

    /// Clear every engine-owned field, leaving the block empty.
    ///
    /// This is the reset primitive: it never touches host-owned data, so a
    /// reset is distinguishable from a destructive delete.
    pub fn clear_sync_fields(&mut self) {
        *self = SyncMetadata::default();
    }

    /// True when no engine field is populated.
    pub fn is_empty(&self) -> bool {
        self == &SyncMetadata::default()
    }
}

fn invalid(record_id: &str, reason: &str) -> Error {
    Error::InvalidMetadata {
        record_id: record_id.to_string(),
        reason: reason.to_string(),
    }
}
