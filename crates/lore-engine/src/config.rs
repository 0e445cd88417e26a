//! Engine configuration
//!
//! Loaded from a TOML document supplied by the host. Only the engine's own
//! knobs live here; host credentials and HTTP endpoints belong to the
//! remote client implementation.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Configuration for one sync engine instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Remote campaign this session syncs against
    pub campaign_id: String,
    /// Host game system id, used to pick a mapping preset (None = generic)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    /// Folder name for imported reference records
    #[serde(default = "default_reference_folder")]
    pub reference_folder: String,
    /// Folder name for session recap records
    #[serde(default = "default_recap_folder")]
    pub recap_folder: String,
}

fn default_reference_folder() -> String {
    "Campaign Reference".to_string()
}

fn default_recap_folder() -> String {
    "Session Recaps".to_string()
}

impl EngineConfig {
    /// Minimal config for the given campaign.
    pub fn for_campaign(campaign_id: impl Into<String>) -> Self {
        Self {
            campaign_id: campaign_id.into(),
            system: None,
            reference_folder: default_reference_folder(),
            recap_folder: default_recap_folder(),
        }
    }

    /// Parse a TOML document into a validated config.
    ///
    /// # Errors
    ///
    /// Returns an error if the document does not parse or fails validation.
    pub fn parse(content: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate field constraints.
    pub fn validate(&self) -> Result<()> {
        if self.campaign_id.trim().is_empty() {
            return Err(Error::InvalidConfig {
                message: "campaign_id must not be empty".to_string(),
            });
        }
        Ok(())
    }
}
