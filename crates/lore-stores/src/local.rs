//! Local store interface
//!
//! The host document model seen through the narrow surface the engine
//! needs: list/read records per kind, create records, and attach the
//! engine-owned metadata block. Implementations own persistence; the
//! engine never assumes anything about how records are stored.

use async_trait::async_trait;

use lore_model::{EntityKind, RelationshipBuckets, SyncMetadata};

use crate::Result;
use crate::record::{LocalRecord, NewRecord};

/// Read/write access to the live, user-editable document graph.
#[async_trait]
pub trait LocalStore: Send + Sync {
    /// List all records of one kind. Journal covers free-text records.
    async fn list(&self, kind: EntityKind) -> Result<Vec<LocalRecord>>;

    /// Fetch a single record by id.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::NotFound`] if no record has that id.
    async fn get(&self, id: &str) -> Result<LocalRecord>;

    /// Create a record of the given kind, returning its new id.
    async fn create(&self, kind: EntityKind, data: NewRecord) -> Result<String>;

    /// Replace a record's host-owned fields (name, body, folder) in place.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::NotFound`] if no record has that id.
    async fn update_record(&self, id: &str, data: NewRecord) -> Result<()>;

    /// Record the remote identity of a local record.
    async fn set_cross_reference(
        &self,
        id: &str,
        remote_id: &str,
        remote_campaign_id: &str,
    ) -> Result<()>;

    /// Replace the record's directional relationship buckets.
    async fn set_relationship_metadata(
        &self,
        id: &str,
        outbound: RelationshipBuckets,
    ) -> Result<()>;

    /// Set or clear the record's parent location pointer.
    async fn set_parent_location(&self, id: &str, parent_id: Option<&str>) -> Result<()>;

    /// Store the content fingerprint from the latest import pass.
    async fn set_fingerprint(&self, id: &str, fingerprint: &str) -> Result<()>;

    /// Record ids of related local records of other kinds.
    async fn set_local_cross_references(&self, id: &str, references: Vec<String>) -> Result<()>;

    /// Clear every engine-owned metadata field on the record, leaving
    /// host-owned data untouched. Idempotent.
    async fn reset_sync_metadata(&self, id: &str) -> Result<()>;
}

/// List every record of every kind, in [`EntityKind::ALL`] order.
pub async fn list_all(store: &dyn LocalStore) -> Result<Vec<LocalRecord>> {
    let mut records = Vec::new();
    for kind in EntityKind::ALL {
        records.extend(store.list(kind).await?);
    }
    Ok(records)
}

/// Fetch a record and validate its metadata block before returning it.
pub async fn get_validated(store: &dyn LocalStore, id: &str) -> Result<LocalRecord> {
    let record = store.get(id).await?;
    record.metadata.validate(&record.id)?;
    Ok(record)
}

/// Fetch a record's metadata block, defaulting to empty if the record is gone.
pub async fn metadata_or_default(store: &dyn LocalStore, id: &str) -> Result<SyncMetadata> {
    match store.get(id).await {
        Ok(record) => Ok(record.metadata),
        Err(e) if e.is_not_found() => Ok(SyncMetadata::default()),
        Err(e) => Err(e),
    }
}
