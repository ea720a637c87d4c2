//! Chunk-by-chunk narration: state machine, controller task and audio sinks.

mod controller;
mod machine;
mod player;
mod sink;

pub use controller::{Narrator, NarratorBuilder};
pub use machine::{Effect, Event, NarrationMachine, NarrationSnapshot, Phase};
pub use player::ExternalPlayerSink;
pub use sink::{ActiveAudio, AudioHandle, AudioSink, LoadedAudio};
