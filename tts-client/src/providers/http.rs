//! HTTP synthesis backend
//!
//! Posts `{"text": ...}` to a fixed endpoint and reads the raw audio body.

use async_trait::async_trait;
use futures_util::StreamExt;
use log::{debug, warn};
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;

use crate::config::ClientConfig;
use crate::error::{Result, SynthesisError};
use crate::provider::{SpeechSynthesizer, SynthesisRequest, SynthesizedAudio};

/// Synthesizer backed by an HTTP endpoint
pub struct HttpSynthesizer {
    config: ClientConfig,
    client: Client,
}

impl HttpSynthesizer {
    /// Create a new HTTP synthesizer
    pub fn new(config: ClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| SynthesisError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }
}

/// Accept `audio/*`, generic binary, or a missing header.
fn is_audio_content_type(content_type: &str) -> bool {
    let mime = content_type.split(';').next().unwrap_or_default().trim();
    mime.is_empty() || mime.starts_with("audio/") || mime == "application/octet-stream"
}

#[async_trait]
impl SpeechSynthesizer for HttpSynthesizer {
    async fn synthesize(&self, request: SynthesisRequest) -> Result<SynthesizedAudio> {
        debug!(
            "POST {} ({} chars)",
            self.config.endpoint,
            request.text.chars().count()
        );

        let response = self
            .client
            .post(&self.config.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SynthesisError::Timeout {
                        seconds: self.config.timeout_secs,
                    }
                } else {
                    SynthesisError::Request(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!("Synthesis endpoint responded with status {}", status);
            return Err(SynthesisError::Status {
                status_code: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        if !is_audio_content_type(&content_type) {
            return Err(SynthesisError::UnexpectedContentType(content_type));
        }

        let limit = self.config.max_audio_bytes;
        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(piece) = stream.next().await {
            let piece = piece.map_err(|e| {
                if e.is_timeout() {
                    SynthesisError::Timeout {
                        seconds: self.config.timeout_secs,
                    }
                } else {
                    SynthesisError::Request(format!("Failed to read audio body: {}", e))
                }
            })?;
            if bytes.len() + piece.len() > limit {
                return Err(SynthesisError::TooLarge { limit });
            }
            bytes.extend_from_slice(&piece);
        }

        if bytes.is_empty() {
            return Err(SynthesisError::EmptyAudio);
        }

        debug!("Received {} bytes of {}", bytes.len(), content_type);

        let content_type = if content_type.is_empty() {
            "application/octet-stream".to_string()
        } else {
            content_type
        };

        Ok(SynthesizedAudio::new(bytes, content_type))
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
