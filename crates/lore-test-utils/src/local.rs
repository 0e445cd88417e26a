//! In-memory [`LocalStore`] fake

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use lore_model::{EntityKind, RelationshipBuckets, SyncMetadata};
use lore_stores::{Error, LocalRecord, LocalStore, NewRecord, Result};

/// A `LocalStore` backed by a map. Records are returned in id order so
/// tests see deterministic listings.
#[derive(Debug, Default)]
pub struct MemoryLocalStore {
    records: Mutex<BTreeMap<String, LocalRecord>>,
}

impl MemoryLocalStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with prebuilt records.
    pub fn with_records(records: impl IntoIterator<Item = LocalRecord>) -> Self {
        let store = Self::new();
        for record in records {
            store.insert(record);
        }
        store
    }

    /// Insert or replace a record directly, bypassing the trait surface.
    pub fn insert(&self, record: LocalRecord) {
        self.records
            .lock()
            .unwrap()
            .insert(record.id.clone(), record);
    }

    /// Snapshot a record for assertions.
    pub fn snapshot(&self, id: &str) -> Option<LocalRecord> {
        self.records.lock().unwrap().get(id).cloned()
    }

    /// Number of records of one kind.
    pub fn count(&self, kind: EntityKind) -> usize {
        self.records
            .lock()
            .unwrap()
            .values()
            .filter(|record| record.kind == kind)
            .count()
    }

    fn with_record<T>(
        &self,
        id: &str,
        mutate: impl FnOnce(&mut LocalRecord) -> T,
    ) -> Result<T> {
        let mut records = self.records.lock().unwrap();
        let record = records.get_mut(id).ok_or_else(|| Error::NotFound {
            id: id.to_string(),
        })?;
        Ok(mutate(record))
    }
}

#[async_trait]
impl LocalStore for MemoryLocalStore {
    async fn list(&self, kind: EntityKind) -> Result<Vec<LocalRecord>> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .values()
            .filter(|record| record.kind == kind)
            .cloned()
            .collect())
    }

    async fn get(&self, id: &str) -> Result<LocalRecord> {
        self.snapshot(id).ok_or_else(|| Error::NotFound {
            id: id.to_string(),
        })
    }

    async fn create(&self, kind: EntityKind, data: NewRecord) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        let mut record = LocalRecord::new(id.clone(), kind, data.name);
        record.subtype = data.subtype;
        record.folder = data.folder;
        if let Some(description) = data.description {
            record
                .attributes
                .insert("description".to_string(), serde_json::json!(description));
        }
        if let Some(image) = data.image {
            record.images.push(image);
        }
        self.insert(record);
        Ok(id)
    }

    async fn update_record(&self, id: &str, data: NewRecord) -> Result<()> {
        self.with_record(id, |record| {
            record.name = data.name;
            record.subtype = data.subtype;
            record.folder = data.folder;
            match data.description {
                Some(description) => {
                    record
                        .attributes
                        .insert("description".to_string(), serde_json::json!(description));
                }
                None => {
                    record.attributes.remove("description");
                }
            }
        })
    }

    async fn set_cross_reference(
        &self,
        id: &str,
        remote_id: &str,
        remote_campaign_id: &str,
    ) -> Result<()> {
        self.with_record(id, |record| {
            record.metadata.remote_id = Some(remote_id.to_string());
            record.metadata.remote_campaign_id = Some(remote_campaign_id.to_string());
        })
    }

    async fn set_relationship_metadata(
        &self,
        id: &str,
        outbound: RelationshipBuckets,
    ) -> Result<()> {
        self.with_record(id, |record| {
            record.metadata.relationship_outbound = outbound;
        })
    }

    async fn set_parent_location(&self, id: &str, parent_id: Option<&str>) -> Result<()> {
        self.with_record(id, |record| {
            record.metadata.parent_location_id = parent_id.map(str::to_string);
        })
    }

    async fn set_fingerprint(&self, id: &str, fingerprint: &str) -> Result<()> {
        self.with_record(id, |record| {
            record.metadata.fingerprint = Some(fingerprint.to_string());
        })
    }

    async fn set_local_cross_references(&self, id: &str, references: Vec<String>) -> Result<()> {
        self.with_record(id, |record| {
            record.metadata.local_cross_references = references;
        })
    }

    async fn reset_sync_metadata(&self, id: &str) -> Result<()> {
        self.with_record(id, |record| {
            record.metadata = SyncMetadata::default();
        })
    }
}

/// A character record with the "player" subtype.
pub fn player(id: &str, name: &str) -> LocalRecord {
    let mut record = LocalRecord::new(id, EntityKind::Character, name);
    record.subtype = Some("player".to_string());
    record
}

/// A character record with the "npc" subtype.
pub fn npc(id: &str, name: &str) -> LocalRecord {
    let mut record = LocalRecord::new(id, EntityKind::Character, name);
    record.subtype = Some("npc".to_string());
    record
}

/// A location record, optionally parented.
pub fn location(id: &str, name: &str, parent: Option<&str>) -> LocalRecord {
    let mut record = LocalRecord::new(id, EntityKind::Location, name);
    record.metadata.parent_location_id = parent.map(str::to_string);
    record
}
