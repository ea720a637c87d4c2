//! Synthesis backend implementations

mod http;
pub mod mock;

pub use http::HttpSynthesizer;
pub use mock::MockSynthesizer;

use crate::config::ClientConfig;
use crate::error::Result;
use crate::provider::SpeechSynthesizer;

/// Create the HTTP synthesizer described by `config`
pub fn get_synthesizer(config: &ClientConfig) -> Result<Box<dyn SpeechSynthesizer>> {
    config.validate()?;
    Ok(Box::new(HttpSynthesizer::new(config.clone())?))
}
