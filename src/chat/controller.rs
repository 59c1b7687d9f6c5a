//! The chat session controller.
//!
//! [`ChatController`] owns the session, the input buffer and the one reply
//! that may be in flight.  It drives a [`ReplyStrategy`] against a
//! [`ChatBackend`] and keeps a [`TranscriptView`] in step with what arrives.
//!
//! Failures never escape a send.  They are shown inline, in the assistant's
//! slot, and the input stays usable for the next message.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::backend::{ChatBackend, StreamHandle};
use crate::observability::{
    CHAT_CANCELLED, CHAT_SEND_FAILURES, CHAT_SENDS, HISTORY_FAILURES, HISTORY_LOADS,
    STREAM_ERRORS, STREAM_EVENTS, STREAM_MALFORMED,
};
use crate::render::{ContentRenderer, HtmlRenderer};
use crate::sse::SseEvent;
use crate::strategy::{Mode, Reply, ReplyStrategy};
use crate::transcript::{EntryHandle, Message, TranscriptView};
use crate::types::{ChatRequest, SessionId, SessionList, StreamEvent};
use crate::{Error, Result};

/// Shown when a request could not be started.
pub const FAILED_TO_START: &str = "Error: Failed to start conversation";

/// Shown when an open push-stream breaks.
pub const CONNECTION_LOST: &str = "Error: Connection lost";

const INTERRUPT_POLL: Duration = Duration::from_millis(50);

/// How the controller came to hold its session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOrigin {
    /// Issued by the backend for this controller.
    Created,
    /// An existing backend session adopted by the user.
    Resumed,
}

/// The backend session a controller talks in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    id: SessionId,
    origin: SessionOrigin,
}

impl Session {
    /// A session just issued by the backend.
    pub fn created(id: SessionId) -> Self {
        Self {
            id,
            origin: SessionOrigin::Created,
        }
    }

    /// An existing session picked up again.
    pub fn resumed(id: SessionId) -> Self {
        Self {
            id,
            origin: SessionOrigin::Resumed,
        }
    }

    /// The session identifier.
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Where the session came from.
    pub fn origin(&self) -> SessionOrigin {
        self.origin
    }
}

/// Where an assistant reply is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamStatus {
    /// The placeholder is showing; nothing has arrived yet.
    Pending,
    /// Content has started arriving.
    Streaming,
    /// The reply completed.
    Done,
    /// The reply failed; an inline error is showing.
    Error,
    /// The reply was interrupted or superseded.
    Cancelled,
}

impl StreamStatus {
    /// Returns true once no further content can arrive.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            StreamStatus::Done | StreamStatus::Error | StreamStatus::Cancelled
        )
    }
}

/// The in-flight assistant reply.
#[derive(Debug)]
pub struct StreamState {
    accumulated_text: String,
    handle: EntryHandle,
    status: StreamStatus,
    stream: Option<StreamHandle>,
}

impl StreamState {
    fn pending(handle: EntryHandle) -> Self {
        Self {
            accumulated_text: String::new(),
            handle,
            status: StreamStatus::Pending,
            stream: None,
        }
    }

    /// Everything received so far.
    pub fn accumulated_text(&self) -> &str {
        &self.accumulated_text
    }

    /// The transcript entry the reply renders into.
    pub fn handle(&self) -> EntryHandle {
        self.handle
    }

    /// The current status.
    pub fn status(&self) -> StreamStatus {
        self.status
    }

    /// Returns true while a push-stream connection is held.
    pub fn is_open(&self) -> bool {
        self.stream.as_ref().is_some_and(|s| !s.is_closed())
    }
}

/// Counters for one controller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControllerStats {
    /// Messages sent (no-op sends excluded).
    pub sends: u64,
    /// Replies that completed.
    pub completed: u64,
    /// Replies that ended in an inline error.
    pub failed: u64,
    /// Replies that were interrupted or superseded.
    pub cancelled: u64,
    /// Successful history loads.
    pub history_loads: u64,
}

enum Step {
    Continue,
    Finish(StreamStatus, Option<Message>),
}

/// Orchestrates session acquisition, sending, incremental rendering and the
/// input affordance for one conversation.
pub struct ChatController<V: TranscriptView> {
    backend: Arc<dyn ChatBackend>,
    strategy: Box<dyn ReplyStrategy>,
    renderer: Box<dyn ContentRenderer>,
    view: V,
    session: Option<Session>,
    input: String,
    active: Option<StreamState>,
    interrupt: Option<Arc<AtomicBool>>,
    stats: ControllerStats,
}

impl<V: TranscriptView> ChatController<V> {
    /// Create a controller in the default mode, rendering HTML.
    pub fn new(backend: Arc<dyn ChatBackend>, view: V) -> Self {
        Self {
            backend,
            strategy: Mode::default().strategy(),
            renderer: Box::new(HtmlRenderer::new()),
            view,
            session: None,
            input: String::new(),
            active: None,
            interrupt: None,
            stats: ControllerStats::default(),
        }
    }

    /// Use the strategy for `mode`.
    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.strategy = mode.strategy();
        self
    }

    /// Use a custom strategy.
    pub fn with_strategy(mut self, strategy: Box<dyn ReplyStrategy>) -> Self {
        self.strategy = strategy;
        self
    }

    /// Use a different content renderer.
    pub fn with_renderer(mut self, renderer: impl ContentRenderer + 'static) -> Self {
        self.renderer = Box::new(renderer);
        self
    }

    /// Watch `flag` while streaming; raising it cancels the reply in flight.
    pub fn with_interrupt(mut self, flag: Arc<AtomicBool>) -> Self {
        self.interrupt = Some(flag);
        self
    }

    /// Start out in an existing session.
    pub fn with_session(mut self, session: Session) -> Self {
        self.session = Some(session);
        self
    }

    /// The transcript view.
    pub fn view(&self) -> &V {
        &self.view
    }

    /// The transcript view, for mutation.
    pub fn view_mut(&mut self) -> &mut V {
        &mut self.view
    }

    /// The current session, if any.
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// The active mode.
    pub fn mode(&self) -> Mode {
        self.strategy.mode()
    }

    /// Switch to the strategy for `mode`.  The session is kept.
    pub fn set_mode(&mut self, mode: Mode) {
        self.strategy = mode.strategy();
    }

    /// Returns true if the active strategy needs a session before sending.
    pub fn needs_session(&self) -> bool {
        self.strategy.needs_session()
    }

    /// The reply in flight, if any.
    pub fn active_stream(&self) -> Option<&StreamState> {
        self.active.as_ref()
    }

    /// Counters for this controller.
    pub fn stats(&self) -> ControllerStats {
        self.stats
    }

    /// The input buffer.
    pub fn input(&self) -> &str {
        &self.input
    }

    /// Replace the input buffer, as when the user types.
    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    /// Returns true if the input buffer holds something worth sending.
    pub fn send_enabled(&self) -> bool {
        !self.input.trim().is_empty()
    }

    /// Create the session the session-first strategy streams over.
    ///
    /// On failure the session stays unset and sends under that strategy fail
    /// inline until a session is created.
    pub async fn initialize_session(&mut self) -> Result<&Session> {
        match self.backend.create_session().await {
            Ok(id) => {
                info!(session = %id, "session created");
                Ok(self.session.insert(Session::created(id)))
            }
            Err(err) => {
                warn!(error = %err, "failed to create session");
                Err(err)
            }
        }
    }

    /// Send the input buffer, if it holds anything.
    pub async fn submit_input(&mut self) -> Option<StreamStatus> {
        if !self.send_enabled() {
            return None;
        }
        let text = std::mem::take(&mut self.input);
        self.send_message(&text).await
    }

    /// Send `text` and render the reply into the transcript.
    ///
    /// Returns `None` without touching the transcript or the backend when the
    /// trimmed text is empty.  Otherwise exactly one user entry and one
    /// assistant entry are appended, and the reply's terminal status is
    /// returned.
    pub async fn send_message(&mut self, text: &str) -> Option<StreamStatus> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        CHAT_SENDS.click();
        self.stats.sends += 1;
        if let Some(flag) = &self.interrupt {
            flag.store(false, Ordering::Relaxed);
        }
        self.abandon_active();

        let user = Message::user(text, &*self.renderer);
        self.view.append_user(&user);
        self.view.scroll_to_latest();
        self.input.clear();

        let handle = self.view.append_assistant_placeholder();
        self.view.scroll_to_latest();
        self.active = Some(StreamState::pending(handle));

        let request = match ChatRequest::new(text) {
            Ok(request) => request,
            Err(err) => {
                warn!(error = %err, "refusing to send message");
                let notice = match &err {
                    Error::Validation { message, .. } => format!("Error: {message}"),
                    _ => FAILED_TO_START.to_string(),
                };
                let notice = Message::assistant_error(&notice, &*self.renderer);
                return Some(self.finish(StreamStatus::Error, Some(notice)));
            }
        };

        let session = self.session.as_ref().map(Session::id);
        let reply = self
            .strategy
            .submit(&*self.backend, session, &request)
            .await;
        let status = match reply {
            Ok(Reply::Stream(stream)) => {
                debug!(mode = %self.strategy.mode(), "push-stream opened");
                if let Some(state) = self.active.as_mut() {
                    state.stream = Some(stream);
                }
                self.pump().await
            }
            Ok(Reply::Complete(reply)) => match reply.error {
                Some(error) => {
                    let notice = Message::assistant_error(&format!("Error: {error}"), &*self.renderer);
                    self.finish(StreamStatus::Error, Some(notice))
                }
                None => {
                    if let Some(state) = self.active.as_mut() {
                        state.accumulated_text = reply.response;
                    }
                    self.finish(StreamStatus::Done, None)
                }
            },
            Err(err) => {
                warn!(error = %err, mode = %self.strategy.mode(), "failed to start conversation");
                let notice = Message::assistant_error(FAILED_TO_START, &*self.renderer);
                self.finish(StreamStatus::Error, Some(notice))
            }
        };
        debug!(?status, send_enabled = self.send_enabled(), "send finished");
        Some(status)
    }

    /// Replace the transcript with the stored history of `session`.
    ///
    /// The transcript is only cleared once the history has been fetched; on
    /// failure it is left as it was.  Returns the number of exchanges shown.
    pub async fn load_history(&mut self, session: &SessionId) -> Result<usize> {
        HISTORY_LOADS.click();
        let history = match self.backend.history(session).await {
            Ok(history) => history,
            Err(err) => {
                HISTORY_FAILURES.click();
                warn!(session = %session, error = %err, "failed to load history");
                return Err(err);
            }
        };

        self.clear_transcript();
        for entry in &history.messages {
            let user = Message::user(&entry.user_message, &*self.renderer);
            self.view.append_user(&user);
            self.view.scroll_to_latest();

            let handle = self.view.append_assistant_placeholder();
            let reply = Message::assistant(&entry.gemini_response, &*self.renderer);
            self.view.update_assistant(handle, &reply);
            self.view.finish_assistant(handle);
            self.view.scroll_to_latest();
        }
        self.stats.history_loads += 1;
        info!(session = %session, exchanges = history.messages.len(), "history loaded");
        Ok(history.messages.len())
    }

    /// Adopt an existing session and show its history.
    ///
    /// The session is adopted even if its history cannot be fetched.
    pub async fn resume_session(&mut self, id: SessionId) -> Result<usize> {
        self.session = Some(Session::resumed(id.clone()));
        self.load_history(&id).await
    }

    /// List the sessions the backend knows about.
    pub async fn list_sessions(&self) -> Result<SessionList> {
        self.backend.sessions().await.inspect_err(|err| {
            warn!(error = %err, "failed to list sessions");
        })
    }

    /// Forget the current session.
    pub fn reset_session(&mut self) {
        self.session = None;
    }

    /// Close any reply in flight and empty the transcript.
    pub fn clear_transcript(&mut self) {
        self.abandon_active();
        self.view.clear();
        self.view.scroll_to_latest();
    }

    /// Consume push-stream events until the reply reaches a terminal state.
    async fn pump(&mut self) -> StreamStatus {
        loop {
            let interrupt = self.interrupt.clone();
            let Some(state) = self.active.as_mut() else {
                return StreamStatus::Cancelled;
            };
            let Some(stream) = state.stream.as_mut() else {
                return state.status;
            };
            let next = tokio::select! {
                next = stream.next_event() => Some(next),
                _ = wait_for_interrupt(interrupt) => None,
            };
            let step = match next {
                Some(next) => self.handle_event(next),
                None => {
                    info!("reply interrupted");
                    Step::Finish(StreamStatus::Cancelled, None)
                }
            };
            if let Step::Finish(status, message) = step {
                return self.finish(status, message);
            }
        }
    }

    fn handle_event(&mut self, next: Option<Result<SseEvent>>) -> Step {
        let event = match next {
            Some(Ok(event)) => event,
            Some(Err(err @ Error::Encoding { .. })) => {
                STREAM_MALFORMED.click();
                warn!(error = %err, "skipping undecodable stream event");
                return Step::Continue;
            }
            Some(Err(err)) => {
                STREAM_ERRORS.click();
                warn!(error = %err, "push-stream connection error");
                let notice = Message::assistant_error(CONNECTION_LOST, &*self.renderer);
                return Step::Finish(StreamStatus::Error, Some(notice));
            }
            None => {
                STREAM_ERRORS.click();
                warn!("push-stream closed without a terminal event");
                let notice = Message::assistant_error(CONNECTION_LOST, &*self.renderer);
                return Step::Finish(StreamStatus::Error, Some(notice));
            }
        };

        STREAM_EVENTS.click();
        match StreamEvent::parse(&event.data) {
            Ok(StreamEvent::Content(content)) => {
                let Some(state) = self.active.as_mut() else {
                    return Step::Continue;
                };
                state.accumulated_text.push_str(&content);
                state.status = StreamStatus::Streaming;
                let message = Message::assistant(&state.accumulated_text, &*self.renderer);
                self.view.update_assistant(state.handle, &message);
                self.view.scroll_to_latest();
                Step::Continue
            }
            Ok(StreamEvent::Error(error)) => {
                warn!(error = %error, "backend reported a stream error");
                let notice = Message::assistant_error(&format!("Error: {error}"), &*self.renderer);
                Step::Finish(StreamStatus::Error, Some(notice))
            }
            Ok(StreamEvent::Done) => Step::Finish(StreamStatus::Done, None),
            Ok(StreamEvent::Ignored) => Step::Continue,
            Err(err) => {
                STREAM_MALFORMED.click();
                warn!(error = %err, "ignoring malformed stream event");
                Step::Continue
            }
        }
    }

    /// Close the reply in flight and settle its transcript entry.
    ///
    /// Without a replacement message, an entry that never received content is
    /// rendered empty so the typing indicator does not linger.
    fn finish(&mut self, status: StreamStatus, replacement: Option<Message>) -> StreamStatus {
        let Some(mut state) = self.active.take() else {
            return status;
        };
        if let Some(stream) = state.stream.as_mut() {
            stream.close();
        }
        state.status = status;

        let message = match replacement {
            Some(message) => Some(message),
            None if state.accumulated_text.is_empty() => {
                Some(Message::assistant("", &*self.renderer))
            }
            None if state.stream.is_none() => Some(Message::assistant(
                &state.accumulated_text,
                &*self.renderer,
            )),
            None => None,
        };
        if let Some(message) = message {
            self.view.update_assistant(state.handle, &message);
        }
        self.view.finish_assistant(state.handle);
        self.view.scroll_to_latest();

        match status {
            StreamStatus::Done => self.stats.completed += 1,
            StreamStatus::Error => {
                CHAT_SEND_FAILURES.click();
                self.stats.failed += 1;
            }
            StreamStatus::Cancelled => {
                CHAT_CANCELLED.click();
                self.stats.cancelled += 1;
            }
            StreamStatus::Pending | StreamStatus::Streaming => {}
        }
        status
    }

    /// Cancel a reply left in flight, e.g. by a send whose future was dropped.
    fn abandon_active(&mut self) {
        if self.active.is_some() {
            debug!("closing reply left in flight");
            self.finish(StreamStatus::Cancelled, None);
        }
    }
}

async fn wait_for_interrupt(flag: Option<Arc<AtomicBool>>) {
    let Some(flag) = flag else {
        return std::future::pending().await;
    };
    while !flag.load(Ordering::Relaxed) {
        tokio::time::sleep(INTERRUPT_POLL).await;
    }
}
