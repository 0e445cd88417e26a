//! Remote campaign service interface
//!
//! The external system of record, reachable only through a narrow HTTP API.
//! All payload fields are plain strings or URLs. Retry and timeout policy
//! live in the implementing client, not here.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Maximum accepted length for any description field, in characters.
///
/// Updates that exceed this must surface [`Error::DescriptionTooLong`]
/// rather than a generic transport failure.
pub const MAX_DESCRIPTION_LEN: usize = 10_000;

/// A character on the remote service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteCharacter {
    #[serde(default)]
    pub id: String,
    pub name: String,
    /// "PC" or "NPC"; other values are treated as unclassified
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub character_type: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteItem {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteLocation {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Parent in the service's location hierarchy, when one is set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteFaction {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// A play session record; the date drives recap ordering.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteSession {
    #[serde(default)]
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub summary: String,
}

/// A directional link between two remote records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteLink {
    #[serde(default)]
    pub id: String,
    pub from_id: String,
    pub to_id: String,
    #[serde(default)]
    pub link_type: String,
}

/// The narrow HTTP API of the remote campaign service.
#[async_trait]
pub trait RemoteService: Send + Sync {
    async fn list_characters(&self, campaign_id: &str) -> Result<Vec<RemoteCharacter>>;
    async fn list_items(&self, campaign_id: &str) -> Result<Vec<RemoteItem>>;
    async fn list_locations(&self, campaign_id: &str) -> Result<Vec<RemoteLocation>>;
    async fn list_factions(&self, campaign_id: &str) -> Result<Vec<RemoteFaction>>;
    async fn list_sessions(&self, campaign_id: &str) -> Result<Vec<RemoteSession>>;
    async fn list_links(&self, campaign_id: &str) -> Result<Vec<RemoteLink>>;

    async fn create_character(&self, campaign_id: &str, payload: RemoteCharacter)
    -> Result<String>;
    async fn create_item(&self, campaign_id: &str, payload: RemoteItem) -> Result<String>;
    async fn create_location(&self, campaign_id: &str, payload: RemoteLocation) -> Result<String>;
    async fn create_faction(&self, campaign_id: &str, payload: RemoteFaction) -> Result<String>;
    async fn create_link(&self, campaign_id: &str, payload: RemoteLink) -> Result<String>;

    async fn update_character(&self, id: &str, payload: RemoteCharacter) -> Result<()>;
    async fn update_item(&self, id: &str, payload: RemoteItem) -> Result<()>;
    async fn update_location(&self, id: &str, payload: RemoteLocation) -> Result<()>;
    async fn update_faction(&self, id: &str, payload: RemoteFaction) -> Result<()>;

    async fn delete_link(&self, id: &str) -> Result<()>;
}

/// Validate a description against [`MAX_DESCRIPTION_LEN`].
///
/// Clients call this before issuing a create/update so the too-long case is
/// reported uniformly across implementations.
pub fn check_description(kind: &str, name: &str, description: &str) -> Result<()> {
    let len = description.chars().count();
    if len > MAX_DESCRIPTION_LEN {
        return Err(Error::DescriptionTooLong {
            kind: kind.to_string(),
            name: name.to_string(),
            len,
            max: MAX_DESCRIPTION_LEN,
        });
    }
    Ok(())
}
