use thiserror::Error;

#[derive(Error, Debug)]
pub enum SynthesisError {
    #[error("Request failed: {0}")]
    Request(String),

    #[error("Synthesis timed out after {seconds} seconds")]
    Timeout { seconds: u64 },

    #[error("Synthesis endpoint returned HTTP {status_code}")]
    Status { status_code: u16 },

    #[error("Expected audio response, got content type '{0}'")]
    UnexpectedContentType(String),

    #[error("Synthesis endpoint returned no audio data")]
    EmptyAudio,

    #[error("Audio response exceeded {limit} bytes")]
    TooLarge { limit: usize },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl SynthesisError {
    /// Whether this error came from the server rather than the transport.
    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::Status { status_code } if *status_code >= 500)
    }
}

pub type Result<T> = std::result::Result<T, SynthesisError>;
