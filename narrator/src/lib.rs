//! page-narrator - read document pages aloud through a remote speech service
//!
//! Page text is normalized and segmented into bounded chunks, cached per
//! page, and narrated one chunk at a time: each chunk's audio is requested,
//! played to the end, and only then is the next chunk requested.

pub mod cache;
pub mod config;
pub mod document;
pub mod error;
pub mod extract;
pub mod playback;
pub mod text;

pub use cache::PageChunkCache;
pub use config::NarratorConfig;
pub use document::PagedDocument;
pub use error::{NarrationError, SinkError};
pub use extract::{PageExtractor, PageSource, PageText};
pub use playback::{ExternalPlayerSink, NarrationSnapshot, Narrator, Phase};
pub use text::{TextChunk, segment, segment_page};
