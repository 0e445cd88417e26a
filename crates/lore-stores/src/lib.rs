//! Collaborator interfaces for Lore Sync
//!
//! The engine talks to exactly two external systems, both abstracted here:
//!
//! - [`LocalStore`] — the live, user-editable document graph of the hosting
//!   session (characters, items, locations, factions, free text)
//! - [`RemoteService`] — the external system of record reached via HTTP
//!
//! This crate defines the traits, record/payload shapes, and the store error
//! taxonomy. Real implementations (host adapter, HTTP client) live with the
//! host application; `lore-test-utils` provides in-memory fakes.

pub mod error;
pub mod local;
pub mod record;
pub mod remote;

pub use error::{Error, Result};
pub use local::{LocalStore, get_validated, list_all, metadata_or_default};
pub use record::{LocalRecord, NewRecord};
pub use remote::{
    MAX_DESCRIPTION_LEN, RemoteCharacter, RemoteFaction, RemoteItem, RemoteLink, RemoteLocation,
    RemoteService, RemoteSession, check_description,
};
