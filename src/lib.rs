// Public modules
pub mod backend;
pub mod chat;
pub mod client;
pub mod error;
pub mod observability;
pub mod render;
pub mod sse;
pub mod strategy;
pub mod transcript;
pub mod types;
pub mod utils;

// Re-exports
pub use backend::{ChatBackend, EventStream, StreamHandle};
pub use chat::{ChatController, Session, StreamStatus};
pub use client::{DEFAULT_BASE_URL, Endpoints, HttpBackend};
pub use error::{Error, Result};
pub use observability::register_biometrics;
pub use render::{ContentRenderer, HtmlRenderer, TerminalRenderer};
pub use sse::{SseEvent, process_sse};
pub use strategy::{Mode, Reply, ReplyStrategy, SingleShot, StreamPerMessage, StreamWithSession};
pub use transcript::{
    Author, EntryHandle, MemoryTranscript, Message, TYPING_INDICATOR, TranscriptEntry,
    TranscriptView,
};
pub use types::*;
