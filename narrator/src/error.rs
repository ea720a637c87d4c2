use thiserror::Error;

/// Errors surfaced to the presentation layer through the narration snapshot.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NarrationError {
    #[error("No text available for audio")]
    NoTextAvailable,

    #[error("Failed to play audio: {0}")]
    PlaybackFailed(String),
}

/// Failures of an audio resource.
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("Failed to write audio: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to start player '{command}': {message}")]
    PlayerStart { command: String, message: String },

    #[error("Player control failed: {0}")]
    Control(String),
}
