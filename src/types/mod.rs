// Public modules
pub mod chat_reply;
pub mod chat_request;
pub mod history_entry;
pub mod session_id;
pub mod session_summary;
pub mod stream_event;

// Re-exports
pub use chat_reply::ChatReply;
pub use chat_request::{ChatRequest, MAX_MESSAGE_CHARS};
pub use history_entry::{ChatHistory, HistoryEntry};
pub use session_id::{SessionCreated, SessionId};
pub use session_summary::{SessionList, SessionSummary};
pub use stream_event::StreamEvent;
