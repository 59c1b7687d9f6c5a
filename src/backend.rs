//! The chat backend seam.
//!
//! [`ChatBackend`] describes the HTTP and push-stream endpoints the controller
//! consumes.  [`crate::HttpBackend`] implements it over `reqwest`; tests supply
//! their own implementations.

use std::pin::Pin;
use std::time::Instant;

use futures::{Stream, StreamExt};

use crate::observability::STREAM_DURATION;
use crate::sse::SseEvent;
use crate::types::{ChatHistory, ChatReply, ChatRequest, SessionId, SessionList};
use crate::Result;

/// A stream of server-sent events from an open push-stream.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<SseEvent>> + Send>>;

/// The endpoints a chat client talks to.
#[async_trait::async_trait]
pub trait ChatBackend: Send + Sync {
    /// `POST /chat/session`: create a session before any message is sent.
    async fn create_session(&self) -> Result<SessionId>;

    /// `POST /chat/stream`: register a message and get a per-message session.
    async fn start_stream(&self, request: &ChatRequest) -> Result<SessionId>;

    /// `GET /chat/stream/:session_id`: open the push-stream for a session.
    ///
    /// When `message` is given it is passed as the `message` query parameter.
    async fn open_stream(
        &self,
        session: &SessionId,
        message: Option<&str>,
    ) -> Result<EventStream>;

    /// `POST /api/chat`: single-shot, non-streaming reply.
    async fn chat(&self, request: &ChatRequest) -> Result<ChatReply>;

    /// `GET /history/:session_id`: stored exchanges, oldest first.
    async fn history(&self, session: &SessionId) -> Result<ChatHistory>;

    /// `GET /sessions`: stored sessions, most recently active first.
    async fn sessions(&self) -> Result<SessionList>;
}

/// Owns an open push-stream until it is closed.
///
/// Closing drops the underlying connection.  Dropping the handle closes it too,
/// so a stream can never outlive the reply it belongs to.
pub struct StreamHandle {
    inner: Option<EventStream>,
    opened: Instant,
}

impl StreamHandle {
    /// Take ownership of an open stream.
    pub fn new(stream: EventStream) -> Self {
        Self {
            inner: Some(stream),
            opened: Instant::now(),
        }
    }

    /// Wait for the next event.  A closed handle yields `None`.
    pub async fn next_event(&mut self) -> Option<Result<SseEvent>> {
        match self.inner.as_mut() {
            Some(stream) => stream.next().await,
            None => None,
        }
    }

    /// Release the connection.  Closing twice is a no-op.
    pub fn close(&mut self) {
        if self.inner.take().is_some() {
            STREAM_DURATION.add(self.opened.elapsed().as_secs_f64());
        }
    }

    /// Returns true once the connection has been released.
    pub fn is_closed(&self) -> bool {
        self.inner.is_none()
    }
}

impl Drop for StreamHandle {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for StreamHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamHandle")
            .field("closed", &self.is_closed())
            .finish()
    }
}
