//! Entity vocabulary and sync metadata schema for Lore Sync
//!
//! This crate defines the shared data model the rest of the workspace is
//! built on:
//!
//! - **Entity vocabulary**: [`EntityKind`] and the normalized
//!   [`GenericEntity`] shape every source record is reduced to
//! - **Sync metadata schema**: the validated, engine-owned
//!   [`SyncMetadata`] block persisted on each local record
//!
//! It deliberately has no I/O and no knowledge of either store; both
//! `lore-stores` and `lore-engine` depend on it.

pub mod entity;
pub mod error;
pub mod metadata;

pub use entity::{CrossRef, EntityKind, GenericEntity};
pub use error::{Error, Result};
pub use metadata::{RelationshipBuckets, SyncMetadata};
