//! # Configuration
//!
//! Configuration is managed by [`confique`], which handles layered loading from
//! environment variables and TOML files.
//!
//! ## Storage Hierarchy
//!
//! Configuration is resolved in priority order:
//! 1. **Environment variables**: `XFSITE_STORAGE_MODE`, `XFSITE_REMOTE_URL`, etc.
//! 2. **Cached remote override**: `<data dir>/remote.toml`, written by
//!    `xfsite remote set`.
//! 3. **Site config**: `<data dir>/xfsite.toml`.
//! 4. **Compiled defaults**: Built-in fallbacks via `#[config(default = ...)]`.
//!
//! ## Available Settings
//!
//! | Key | Env | Default | Description |
//! |-----|-----|---------|-------------|
//! | `storage.mode` | `XFSITE_STORAGE_MODE` | `local` | `local` or `remote` |
//! | `storage.debounce_ms` | `XFSITE_DEBOUNCE_MS` | `1000` | Quiet period before a write |
//! | `storage.quota_bytes` | `XFSITE_QUOTA_BYTES` | `5242880` | Local medium capacity |
//! | `storage.user_id` | `XFSITE_USER_ID` | `anonymous` | Row owner for remote storage |
//! | `remote.url` | `XFSITE_REMOTE_URL` | none | Base URL of the table store |
//! | `remote.api_key` | `XFSITE_REMOTE_KEY` | none | API key for the table store |
//! | `remote.timeout_ms` | `XFSITE_REMOTE_TIMEOUT_MS` | `5000` | Per-request bound |

use crate::error::{Result, SiteError};
use confique::Config;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use std::time::Duration;

pub const CONFIG_FILENAME: &str = "xfsite.toml";
pub const REMOTE_OVERRIDE_FILENAME: &str = "remote.toml";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageMode {
    Local,
    Remote,
}

impl fmt::Display for StorageMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageMode::Local => f.write_str("local"),
            StorageMode::Remote => f.write_str("remote"),
        }
    }
}

#[derive(Config, Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    #[config(env = "XFSITE_STORAGE_MODE", default = "local")]
    pub mode: StorageMode,

    #[config(env = "XFSITE_DEBOUNCE_MS", default = 1000)]
    pub debounce_ms: u64,

    #[config(env = "XFSITE_QUOTA_BYTES", default = 5242880)]
    pub quota_bytes: u64,

    #[config(env = "XFSITE_USER_ID", default = "anonymous")]
    pub user_id: String,
}

#[derive(Config, Debug, Clone, PartialEq, Eq)]
pub struct RemoteConfig {
    #[config(env = "XFSITE_REMOTE_URL")]
    pub url: Option<String>,

    #[config(env = "XFSITE_REMOTE_KEY")]
    pub api_key: Option<String>,

    #[config(env = "XFSITE_REMOTE_TIMEOUT_MS", default = 5000)]
    pub timeout_ms: u64,
}

/// Configuration for xfsite, stored in `xfsite.toml`.
#[derive(Config, Debug, Clone, PartialEq, Eq)]
pub struct SiteConfig {
    #[config(nested)]
    pub storage: StorageConfig,

    #[config(nested)]
    pub remote: RemoteConfig,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            mode: StorageMode::Local,
            debounce_ms: 1000,
            quota_bytes: 5 * 1024 * 1024,
            user_id: crate::store::ANONYMOUS_USER.to_string(),
        }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            url: None,
            api_key: None,
            timeout_ms: 5000,
        }
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            storage: StorageConfig::default(),
            remote: RemoteConfig::default(),
        }
    }
}

impl StorageConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl RemoteConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Both a URL and a key are present and non-blank.
    pub fn has_credentials(&self) -> bool {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        present(&self.url) && present(&self.api_key)
    }
}

impl SiteConfig {
    /// Load from the environment and the TOML files in `data_dir`.
    pub fn load(data_dir: &Path) -> Result<Self> {
        SiteConfig::builder()
            .env()
            .file(data_dir.join(REMOTE_OVERRIDE_FILENAME))
            .file(data_dir.join(CONFIG_FILENAME))
            .load()
            .map_err(|e| SiteError::Config(e.to_string()))
    }
}

/// Locally cached remote credentials, written by the admin tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteOverride {
    pub url: String,
    pub api_key: String,
}

#[derive(Serialize, Deserialize)]
struct RemoteOverrideFile {
    remote: RemoteOverride,
}

impl RemoteOverride {
    pub fn save(&self, data_dir: &Path) -> Result<()> {
        if !data_dir.exists() {
            fs::create_dir_all(data_dir).map_err(SiteError::Io)?;
        }
        let file = RemoteOverrideFile {
            remote: self.clone(),
        };
        let content = toml::to_string_pretty(&file)
            .map_err(|e| SiteError::Config(format!("cannot encode remote override: {}", e)))?;
        fs::write(data_dir.join(REMOTE_OVERRIDE_FILENAME), content).map_err(SiteError::Io)?;
        Ok(())
    }

    /// Returns true if a cached override existed.
    pub fn clear(data_dir: &Path) -> Result<bool> {
        let path = data_dir.join(REMOTE_OVERRIDE_FILENAME);
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(path).map_err(SiteError::Io)?;
        Ok(true)
    }
}
