//! Runtime configuration for the client and the field store

use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};
use log::debug;

pub const DEFAULT_API_BASE: &str
  = "https://api.anthropic.com/v1";
pub const DEFAULT_API_VERSION: &str = "2023-06-01";

/// Provider endpoint configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig
{   /// API base URL
    pub api_base: String
  , /// Value of the `anthropic-version` header
    pub api_version: String
  , /// Request timeout in seconds; no timeout when absent
    pub timeout_secs: Option<u64>
}

impl Default for ProviderConfig
{   fn default() -> Self
    {   ProviderConfig
        {   api_base: DEFAULT_API_BASE.to_string()
          , api_version: DEFAULT_API_VERSION.to_string()
          , timeout_secs: None
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig
{   /// Completion endpoint settings
    pub provider: ProviderConfig
  , /// Where form fields are persisted; platform config dir when absent
    pub store_path: Option<PathBuf>
  , /// Show the canned example response before the first submission
    pub example_on_first_load: bool
}

impl Default for AppConfig
{   fn default() -> Self
    {   AppConfig
        {   provider: ProviderConfig::default()
          , store_path: None
          , example_on_first_load: true
        }
    }
}

impl AppConfig
{   /// Load configuration from a JSON file
    pub fn load(path: &Path)
      -> Result<Self, crate::error::Error>
    {   debug!("Loading config from {}", path.display());
        let text = std::fs::read_to_string(path)
          .map_err(|e| {
            crate::error::Error::InvalidConfiguration(
              format!("{}: {}", path.display(), e)
            )
          })?;
        serde_json::from_str(&text).map_err(|e| {
          crate::error::Error::InvalidConfiguration(
            format!("{}: {}", path.display(), e)
          )
        })
    }

    /// Resolved path of the persisted field file
    pub fn resolved_store_path(&self)
      -> Result<PathBuf, crate::error::Error>
    {   if let Some(path) = &self.store_path
        {   return Ok(path.clone());
        }
        dirs::config_dir()
          .map(|dir| dir.join("claude-client").join("fields.json"))
          .ok_or_else(|| {
            crate::error::Error::InvalidConfiguration(
              "no platform config directory; pass --store".to_string()
            )
          })
    }
}
