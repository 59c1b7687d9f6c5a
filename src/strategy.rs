//! Request shapes for getting a reply out of the backend.
//!
//! The backend offers three ways to answer a message.  Each is a
//! [`ReplyStrategy`]; [`Mode`] names them for configuration.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::backend::{ChatBackend, StreamHandle};
use crate::types::{ChatReply, ChatRequest, SessionId};
use crate::{Error, Result};

/// What a strategy got back from the backend.
#[derive(Debug)]
pub enum Reply {
    /// An open push-stream of incremental events.
    Stream(StreamHandle),
    /// A complete, non-streamed reply.
    Complete(ChatReply),
}

/// Submits a message and returns the reply or replies.
#[async_trait::async_trait]
pub trait ReplyStrategy: Send + Sync {
    /// The mode this strategy implements.
    fn mode(&self) -> Mode;

    /// Returns true if a session must be created before the first send.
    fn needs_session(&self) -> bool {
        false
    }

    /// Submit `request`, using `session` if the strategy is session-first.
    async fn submit(
        &self,
        backend: &dyn ChatBackend,
        session: Option<&SessionId>,
        request: &ChatRequest,
    ) -> Result<Reply>;
}

/// Stream over a session created once, up front; the message travels as a
/// query parameter of the push-stream request.
#[derive(Debug, Clone, Copy, Default)]
pub struct StreamWithSession;

#[async_trait::async_trait]
impl ReplyStrategy for StreamWithSession {
    fn mode(&self) -> Mode {
        Mode::StreamWithSession
    }

    fn needs_session(&self) -> bool {
        true
    }

    async fn submit(
        &self,
        backend: &dyn ChatBackend,
        session: Option<&SessionId>,
        request: &ChatRequest,
    ) -> Result<Reply> {
        let session = session.ok_or_else(|| {
            Error::validation(
                "no session has been initialized",
                Some("session_id".to_string()),
            )
        })?;
        let stream = backend
            .open_stream(session, Some(request.message.as_str()))
            .await?;
        Ok(Reply::Stream(StreamHandle::new(stream)))
    }
}

/// Register each message to get a fresh session, then stream that session.
#[derive(Debug, Clone, Copy, Default)]
pub struct StreamPerMessage;

#[async_trait::async_trait]
impl ReplyStrategy for StreamPerMessage {
    fn mode(&self) -> Mode {
        Mode::StreamPerMessage
    }

    async fn submit(
        &self,
        backend: &dyn ChatBackend,
        _: Option<&SessionId>,
        request: &ChatRequest,
    ) -> Result<Reply> {
        let session = backend.start_stream(request).await?;
        tracing::debug!(session = %session, "per-message session issued");
        let stream = backend.open_stream(&session, None).await?;
        Ok(Reply::Stream(StreamHandle::new(stream)))
    }
}

/// One request, one complete reply.
#[derive(Debug, Clone, Copy, Default)]
pub struct SingleShot;

#[async_trait::async_trait]
impl ReplyStrategy for SingleShot {
    fn mode(&self) -> Mode {
        Mode::SingleShot
    }

    async fn submit(
        &self,
        backend: &dyn ChatBackend,
        _: Option<&SessionId>,
        request: &ChatRequest,
    ) -> Result<Reply> {
        Ok(Reply::Complete(backend.chat(request).await?))
    }
}

/// The configurable choice of [`ReplyStrategy`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Mode {
    /// See [`StreamWithSession`].
    #[default]
    #[serde(rename = "stream-session")]
    StreamWithSession,
    /// See [`StreamPerMessage`].
    StreamPerMessage,
    /// See [`SingleShot`].
    SingleShot,
}

impl Mode {
    /// Every mode, in display order.
    pub const ALL: [Mode; 3] = [
        Mode::StreamWithSession,
        Mode::StreamPerMessage,
        Mode::SingleShot,
    ];

    /// Build the strategy for this mode.
    pub fn strategy(self) -> Box<dyn ReplyStrategy> {
        match self {
            Mode::StreamWithSession => Box::new(StreamWithSession),
            Mode::StreamPerMessage => Box::new(StreamPerMessage),
            Mode::SingleShot => Box::new(SingleShot),
        }
    }

    /// The name used on the command line and in config files.
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::StreamWithSession => "stream-session",
            Mode::StreamPerMessage => "stream-per-message",
            Mode::SingleShot => "single-shot",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Mode::ALL
            .into_iter()
            .find(|mode| mode.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                Error::config(format!(
                    "unknown mode {s:?}; expected one of: stream-session, stream-per-message, single-shot"
                ))
            })
    }
}
