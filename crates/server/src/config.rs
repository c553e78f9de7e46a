use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use finfolio_core::news::NewsConfig;
use serde::{Deserialize, Serialize};

/// Server settings, read from `finfolio.toml`.
///
/// Every field has a default, so a partial (or missing) file is fine.
/// The passphrase normally comes from `FINFOLIO_PASSPHRASE` rather than the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    /// Encrypted snapshot location
    pub data_file: PathBuf,
    /// Without a passphrase nothing is written to disk
    #[serde(skip_serializing)]
    pub passphrase: Option<String>,
    pub autosave_secs: u64,
    pub session_ttl_hours: i64,
    pub news: NewsConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8000".to_string(),
            data_file: PathBuf::from("finfolio.db"),
            passphrase: None,
            autosave_secs: 30,
            session_ttl_hours: 336,
            news: NewsConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: ServerConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Load config from a file, or return the defaults if it doesn't exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Whether the snapshot can be saved at all.
    pub fn persists(&self) -> bool {
        self.passphrase.as_deref().is_some_and(|p| !p.is_empty())
    }
}
