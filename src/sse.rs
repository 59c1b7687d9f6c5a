//! Server-Sent Events (SSE) processing for push-stream replies.
//!
//! This module turns the raw byte stream of an HTTP response into a stream of
//! [`SseEvent`]s.  It knows nothing about the payload: decoding the `data` of
//! each event is left to [`crate::StreamEvent::parse`], so that a malformed
//! payload can be told apart from a broken connection.

use std::error;

use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};

use crate::observability::STREAM_BYTES;
use crate::{Error, Result};

/// One dispatched server-sent event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SseEvent {
    /// The `event:` field, if the server named the event.
    pub event: Option<String>,
    /// The `data:` lines, joined with `\n`.
    pub data: String,
    /// The `id:` field, if any.
    pub id: Option<String>,
}

impl SseEvent {
    /// An unnamed event carrying `data`.
    pub fn message(data: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            ..Self::default()
        }
    }
}

/// Process a stream of bytes into a stream of server-sent events.
///
/// Transport errors from the underlying stream are surfaced as
/// [`Error::Streaming`]; the caller decides whether to keep reading.
pub fn process_sse<S, E>(byte_stream: S) -> impl Stream<Item = Result<SseEvent>>
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Unpin,
    E: error::Error + Send + Sync + 'static,
{
    let stream = byte_stream.map(|result| {
        result.map_err(|e| {
            Error::streaming(format!("Error in HTTP stream: {e}"), Some(Box::new(e)))
        })
    });

    stream::unfold(
        (stream, SseParser::default(), false),
        move |(mut stream, mut parser, mut finished)| async move {
            loop {
                while let Some(line) = parser.next_line() {
                    if let Some(event) = parser.feed_line(&line) {
                        return Some((event, (stream, parser, finished)));
                    }
                }

                if finished {
                    return None;
                }

                match stream.next().await {
                    Some(Ok(bytes)) => {
                        STREAM_BYTES.count(bytes.len() as u64);
                        parser.push(&bytes);
                    }
                    Some(Err(e)) => {
                        return Some((Err(e), (stream, parser, finished)));
                    }
                    None => {
                        finished = true;
                        // A trailing event without its blank line is still dispatched.
                        if let Some(event) = parser.finish() {
                            return Some((event, (stream, parser, finished)));
                        }
                        return None;
                    }
                }
            }
        },
    )
}

/// Line-oriented event assembly.
///
/// Lines end in CRLF, LF or a lone CR, and the three may be mixed within one
/// stream.  Bytes before `start` have been consumed; bytes before `scanned`
/// are known to hold no line terminator, so each byte is searched once.
#[derive(Default)]
struct SseParser {
    buffer: Vec<u8>,
    start: usize,
    scanned: usize,
    // The last line ended in CR at the end of the buffer; a leading LF in
    // the next chunk belongs to it.
    after_cr: bool,
    event: SseEvent,
    data: Option<String>,
    invalid: Option<Error>,
}

impl SseParser {
    fn push(&mut self, bytes: &[u8]) {
        if self.start > 0 {
            self.buffer.drain(..self.start);
            self.scanned -= self.start;
            self.start = 0;
        }
        self.buffer.extend_from_slice(bytes);
    }

    /// The next complete line, without its terminator.
    fn next_line(&mut self) -> Option<Vec<u8>> {
        if self.after_cr && self.start < self.buffer.len() {
            self.after_cr = false;
            if self.buffer[self.start] == b'\n' {
                self.start += 1;
            }
        }
        let from = self.scanned.max(self.start);
        let Some(offset) = self.buffer[from..]
            .iter()
            .position(|&b| b == b'\n' || b == b'\r')
        else {
            self.scanned = self.buffer.len();
            return None;
        };
        let end = from + offset;
        let line = self.buffer[self.start..end].to_vec();
        self.start = end + 1;
        if self.buffer[end] == b'\r' {
            match self.buffer.get(self.start) {
                Some(b'\n') => self.start += 1,
                Some(_) => {}
                None => self.after_cr = true,
            }
        }
        self.scanned = self.start;
        Some(line)
    }

    /// Apply one line; a blank line dispatches the pending event.
    fn feed_line(&mut self, line: &[u8]) -> Option<Result<SseEvent>> {
        if line.is_empty() {
            return self.dispatch();
        }
        let line = match std::str::from_utf8(line) {
            Ok(line) => line,
            Err(e) => {
                if self.invalid.is_none() {
                    self.invalid = Some(Error::encoding(
                        format!("Invalid UTF-8 in stream: {e}"),
                        Some(Box::new(e)),
                    ));
                }
                return None;
            }
        };
        if line.starts_with(':') {
            return None;
        }
        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "data" => match self.data.as_mut() {
                Some(data) => {
                    data.push('\n');
                    data.push_str(value);
                }
                None => self.data = Some(value.to_string()),
            },
            "event" => self.event.event = Some(value.to_string()),
            "id" => self.event.id = Some(value.to_string()),
            _ => {}
        }
        None
    }

    /// Emit the pending event.  Events without any `data:` line are dropped.
    fn dispatch(&mut self) -> Option<Result<SseEvent>> {
        let event = std::mem::take(&mut self.event);
        let data = self.data.take();
        if let Some(err) = self.invalid.take() {
            return Some(Err(err));
        }
        data.map(|data| Ok(SseEvent { data, ..event }))
    }

    /// Flush an unterminated last line and event at end of stream.
    fn finish(&mut self) -> Option<Result<SseEvent>> {
        let rest = self.buffer.split_off(self.start);
        self.buffer.clear();
        self.start = 0;
        self.scanned = 0;
        self.after_cr = false;
        if !rest.is_empty() {
            if let Some(event) = self.feed_line(&rest) {
                return Some(event);
            }
        }
        self.dispatch()
    }
}
