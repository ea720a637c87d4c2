//! Client library for remote speech synthesis.
//!
//! Provides a small interface over services that turn text into audio:
//! - HTTP endpoint (`POST {"text": ...}` returning raw audio bytes)
//! - Mock synthesizer for tests and offline runs

pub mod config;
pub mod error;
pub mod provider;
pub mod providers;

pub use config::ClientConfig;
pub use error::{Result, SynthesisError};
pub use provider::{SpeechSynthesizer, SynthesisRequest, SynthesizedAudio};
pub use providers::{HttpSynthesizer, MockSynthesizer, get_synthesizer};
