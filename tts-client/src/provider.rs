use async_trait::async_trait;
use serde::Serialize;

use crate::error::Result;

/// Request body sent to a synthesis endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SynthesisRequest {
    pub text: String,
}

impl SynthesisRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Audio returned by a synthesis endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesizedAudio {
    /// Raw encoded audio (mp3, wav, ...)
    pub bytes: Vec<u8>,
    /// MIME type reported by the endpoint
    pub content_type: String,
}

impl SynthesizedAudio {
    pub fn new(bytes: Vec<u8>, content_type: impl Into<String>) -> Self {
        Self {
            bytes,
            content_type: content_type.into(),
        }
    }

    /// File extension matching the content type, used when the audio is written to disk.
    pub fn extension(&self) -> &'static str {
        let mime = self
            .content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim();
        match mime {
            "audio/mpeg" | "audio/mp3" => "mp3",
            "audio/wav" | "audio/x-wav" | "audio/wave" => "wav",
            "audio/ogg" | "audio/opus" => "ogg",
            "audio/flac" => "flac",
            "audio/aac" => "aac",
            _ => "bin",
        }
    }
}

/// Trait for speech synthesis backends
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Turn a piece of text into audio
    async fn synthesize(&self, request: SynthesisRequest) -> Result<SynthesizedAudio>;

    /// Get the backend name for display
    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serializes_as_text_object() {
        let json = serde_json::to_value(SynthesisRequest::new("Hello.")).unwrap();
        assert_eq!(json, serde_json::json!({ "text": "Hello." }));
    }

    #[test]
    fn test_audio_extension() {
        assert_eq!(SynthesizedAudio::new(vec![1], "audio/mpeg").extension(), "mp3");
        assert_eq!(
            SynthesizedAudio::new(vec![1], "audio/wav; codecs=1").extension(),
            "wav"
        );
        assert_eq!(
            SynthesizedAudio::new(vec![1], "application/octet-stream").extension(),
            "bin"
        );
    }
}
