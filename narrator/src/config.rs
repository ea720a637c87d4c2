//! Narrator configuration management.

use crate::cache::{DEFAULT_CAPACITY, DEFAULT_EXPIRY_SECS};
use crate::text::DEFAULT_MAX_CHUNK_SIZE;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tts_client::ClientConfig;
use tts_client::config::DEFAULT_ENDPOINT;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NarratorConfig {
    /// Synthesis endpoint accepting `POST {"text": ...}`
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Seconds to wait for one chunk's audio before giving up
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Largest audio response accepted, in bytes
    #[serde(default = "default_max_audio_bytes")]
    pub max_audio_bytes: usize,

    /// Soft chunk limit in characters
    #[serde(default = "default_max_chunk_size")]
    pub max_chunk_size: usize,

    /// Number of pages whose chunks are cached
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,

    /// Lifetime of a cached page in seconds
    #[serde(default = "default_cache_expiry_secs")]
    pub cache_expiry_secs: u64,

    /// Player command; the audio file path is appended. Empty means write files only.
    #[serde(default = "default_player")]
    pub player: Vec<String>,

    /// Where chunk audio is written. None means a temporary directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_max_audio_bytes() -> usize {
    ClientConfig::default().max_audio_bytes
}

fn default_max_chunk_size() -> usize {
    DEFAULT_MAX_CHUNK_SIZE
}

fn default_cache_capacity() -> usize {
    DEFAULT_CAPACITY
}

fn default_cache_expiry_secs() -> u64 {
    DEFAULT_EXPIRY_SECS
}

fn default_player() -> Vec<String> {
    ["ffplay", "-nodisp", "-autoexit", "-loglevel", "quiet"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for NarratorConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            request_timeout_secs: default_request_timeout_secs(),
            max_audio_bytes: default_max_audio_bytes(),
            max_chunk_size: default_max_chunk_size(),
            cache_capacity: default_cache_capacity(),
            cache_expiry_secs: default_cache_expiry_secs(),
            player: default_player(),
            output_dir: None,
        }
    }
}

impl NarratorConfig {
    /// Get the config file path: ~/.config/cli-programs/narrator.toml
    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Could not determine home directory")?;
        Ok(home.join(".config").join("cli-programs").join("narrator.toml"))
    }

    /// Load config from file, returning default if file doesn't exist
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: NarratorConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(config)
    }

    /// Save config to file
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(&path, content)?;
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Settings for the synthesis client.
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            endpoint: self.endpoint.clone(),
            timeout_secs: self.request_timeout_secs,
            max_audio_bytes: self.max_audio_bytes,
        }
    }
}
