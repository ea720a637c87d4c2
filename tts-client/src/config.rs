use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{Result, SynthesisError};

/// Default synthesis endpoint (the local proxy in front of the vendor API)
pub const DEFAULT_ENDPOINT: &str = "http://localhost:5001/api/tts/generate";

/// Connection settings for a synthesis endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Full URL that accepts `POST {"text": ...}`
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Largest audio body accepted from the endpoint
    #[serde(default = "default_max_audio_bytes")]
    pub max_audio_bytes: usize,
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_audio_bytes() -> usize {
    50 * 1024 * 1024
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            timeout_secs: default_timeout_secs(),
            max_audio_bytes: default_max_audio_bytes(),
        }
    }
}

impl ClientConfig {
    /// Create a config for the given endpoint with default limits
    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Self::default()
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Check that the endpoint is an http(s) URL and limits are usable
    pub fn validate(&self) -> Result<()> {
        let endpoint = self.endpoint.trim();
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(SynthesisError::Config(format!(
                "endpoint must be an http(s) URL: '{}'",
                self.endpoint
            )));
        }
        if self.timeout_secs == 0 {
            return Err(SynthesisError::Config(
                "timeout_secs must be greater than zero".into(),
            ));
        }
        if self.max_audio_bytes == 0 {
            return Err(SynthesisError::Config(
                "max_audio_bytes must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}
