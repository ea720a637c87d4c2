//! Audio resource abstraction used by the narration runner.

use crate::error::SinkError;
use tokio::sync::oneshot;
use tts_client::SynthesizedAudio;

/// Control surface of one loaded audio clip.
pub trait AudioHandle: Send {
    fn play(&mut self) -> Result<(), SinkError>;
    fn pause(&mut self) -> Result<(), SinkError>;
    fn resume(&mut self) -> Result<(), SinkError>;

    /// Stop playback and free the clip. Calling it twice is a no-op.
    fn stop(&mut self);
}

/// A clip ready to play.
///
/// `ended` resolves with `Ok(())` when playback reaches its natural end. If
/// the sender is dropped instead, playback ended abnormally.
pub struct LoadedAudio {
    pub handle: Box<dyn AudioHandle>,
    pub ended: oneshot::Receiver<()>,
}

/// Turns synthesized bytes into playable clips.
pub trait AudioSink: Send + Sync {
    fn load(&self, audio: &SynthesizedAudio, label: &str) -> Result<LoadedAudio, SinkError>;
}

/// Owns the single live clip. Dropping it stops and frees the clip.
pub struct ActiveAudio {
    handle: Box<dyn AudioHandle>,
}

impl ActiveAudio {
    pub fn new(handle: Box<dyn AudioHandle>) -> Self {
        Self { handle }
    }

    pub fn play(&mut self) -> Result<(), SinkError> {
        self.handle.play()
    }

    pub fn pause(&mut self) -> Result<(), SinkError> {
        self.handle.pause()
    }

    pub fn resume(&mut self) -> Result<(), SinkError> {
        self.handle.resume()
    }
}

impl Drop for ActiveAudio {
    fn drop(&mut self) {
        self.handle.stop();
    }
}
