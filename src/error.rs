//! Error types for chatstream.
//!
//! This module defines the error type shared by the backend client, the SSE
//! decoder and the chat controller.  The controller never surfaces these to
//! the user directly; it maps them onto inline transcript entries.

use std::error;
use std::fmt;
use std::io;
use std::str::Utf8Error;
use std::sync::Arc;

/// The main error type for chatstream.
#[derive(Clone, Debug)]
pub enum Error {
    /// The backend answered with a status no other variant covers.
    Api {
        /// HTTP status code.
        status_code: u16,
        /// The backend's `detail`, or the raw body.
        message: String,
    },

    /// Unknown session or missing endpoint (HTTP 404).
    NotFound {
        /// The backend's `detail`.
        message: String,
        /// The request path that was not found.
        resource_id: Option<String>,
    },

    /// The backend rejected the message (HTTP 400 or 422).
    BadRequest {
        /// The backend's `detail`, flattened to text.
        message: String,
    },

    /// A JSON request ran past its deadline, or the backend reported 408.
    Timeout {
        /// What timed out.
        message: String,
        /// The configured deadline in seconds, when known.
        duration: Option<f64>,
    },

    /// The backend could not be reached.
    Connection {
        /// What failed.
        message: String,
        /// The transport error.
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    },

    /// The backend failed while handling the request (HTTP 500).
    InternalServer {
        /// The backend's `detail`.
        message: String,
    },

    /// A gateway in front of the backend gave up (HTTP 502 to 504).
    ServiceUnavailable {
        /// The gateway's `detail` or body.
        message: String,
    },

    /// A response body or push-stream payload was not the expected JSON.
    Serialization {
        /// What could not be decoded.
        message: String,
        /// The decoder's error.
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    },

    /// A local file, such as the configuration file, could not be read.
    Io {
        /// What was being read.
        message: String,
        /// The operating system's error.
        source: Arc<io::Error>,
    },

    /// `reqwest` failed outside of connecting or timing out.
    HttpClient {
        /// What failed.
        message: String,
        /// The client error.
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    },

    /// A message was refused before any request was made.
    Validation {
        /// Why it was refused.
        message: String,
        /// The offending field, e.g. `message` or `session_id`.
        param: Option<String>,
    },

    /// The base URL or an endpoint path could not be resolved.
    Url {
        /// Which URL was at fault.
        message: String,
        /// The parse error, if parsing failed.
        source: Option<url::ParseError>,
    },

    /// An open push-stream broke mid-reply.
    Streaming {
        /// What broke.
        message: String,
        /// The transport error.
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    },

    /// A push-stream event was not valid UTF-8; later events may still be fine.
    Encoding {
        /// Where the bad bytes were.
        message: String,
        /// The UTF-8 error.
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    },

    /// Invalid or unreadable configuration.
    Config {
        /// What was wrong, and in which file.
        message: String,
    },
}

impl Error {
    /// An unclassified HTTP status.
    pub fn api(status_code: u16, message: impl Into<String>) -> Self {
        Error::Api {
            status_code,
            message: message.into(),
        }
    }

    /// A 404 for `resource_id`.
    pub fn not_found(message: impl Into<String>, resource_id: Option<String>) -> Self {
        Error::NotFound {
            message: message.into(),
            resource_id,
        }
    }

    /// A rejected request.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Error::BadRequest {
            message: message.into(),
        }
    }

    /// A deadline was exceeded.
    pub fn timeout(message: impl Into<String>, duration: Option<f64>) -> Self {
        Error::Timeout {
            message: message.into(),
            duration,
        }
    }

    /// The backend was unreachable.
    pub fn connection(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::Connection {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// The backend failed.
    pub fn internal_server(message: impl Into<String>) -> Self {
        Error::InternalServer {
            message: message.into(),
        }
    }

    /// A gateway gave up.
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Error::ServiceUnavailable {
            message: message.into(),
        }
    }

    /// Undecodable JSON.
    pub fn serialization(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::Serialization {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// A local read failed.
    pub fn io(message: impl Into<String>, source: io::Error) -> Self {
        Error::Io {
            message: message.into(),
            source: Arc::new(source),
        }
    }

    /// The HTTP client failed.
    pub fn http_client(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::HttpClient {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// A message refused before sending.
    pub fn validation(message: impl Into<String>, param: Option<String>) -> Self {
        Error::Validation {
            message: message.into(),
            param,
        }
    }

    /// An unresolvable URL.
    pub fn url(message: impl Into<String>, source: Option<url::ParseError>) -> Self {
        Error::Url {
            message: message.into(),
            source,
        }
    }

    /// A broken push-stream.
    pub fn streaming(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::Streaming {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// Bad UTF-8 in a push-stream.
    pub fn encoding(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::Encoding {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// Bad configuration.
    pub fn config(message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
        }
    }

    /// An unknown session or endpoint.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }

    /// The backend refused the request as invalid.
    pub fn is_bad_request(&self) -> bool {
        matches!(self, Error::BadRequest { .. })
    }

    /// A request ran out of time.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout { .. })
    }

    /// The backend was never reached.
    pub fn is_connection(&self) -> bool {
        matches!(self, Error::Connection { .. })
    }

    /// The backend or a gateway in front of it failed.
    pub fn is_server_error(&self) -> bool {
        matches!(
            self,
            Error::InternalServer { .. } | Error::ServiceUnavailable { .. }
        )
    }

    /// Returns true if this error happened on an open stream rather than while
    /// setting one up.
    pub fn is_streaming(&self) -> bool {
        matches!(self, Error::Streaming { .. } | Error::Encoding { .. })
    }

    /// The message was refused locally, before any request.
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation { .. })
    }

    /// The HTTP status behind this error, when the backend sent one.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::Api { status_code, .. } => Some(*status_code),
            Error::NotFound { .. } => Some(404),
            Error::BadRequest { .. } => Some(400),
            Error::InternalServer { .. } => Some(500),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Api {
                status_code,
                message,
            } => {
                write!(f, "backend returned HTTP {status_code}: {message}")
            }
            Error::NotFound {
                message,
                resource_id,
            } => {
                if let Some(resource_id) = resource_id {
                    write!(f, "not found: {message} ({resource_id})")
                } else {
                    write!(f, "not found: {message}")
                }
            }
            Error::BadRequest { message } => {
                write!(f, "rejected by backend: {message}")
            }
            Error::Timeout { message, duration } => {
                if let Some(duration) = duration {
                    write!(f, "timed out after {duration}s: {message}")
                } else {
                    write!(f, "timed out: {message}")
                }
            }
            Error::Connection { message, .. } => {
                write!(f, "cannot reach backend: {message}")
            }
            Error::InternalServer { message } => {
                write!(f, "backend failure: {message}")
            }
            Error::ServiceUnavailable { message } => {
                write!(f, "backend unavailable: {message}")
            }
            Error::Serialization { message, .. } => {
                write!(f, "malformed JSON: {message}")
            }
            Error::Io { message, .. } => {
                write!(f, "I/O failure: {message}")
            }
            Error::HttpClient { message, .. } => {
                write!(f, "HTTP client: {message}")
            }
            Error::Validation { message, param } => {
                if let Some(param) = param {
                    write!(f, "invalid {param}: {message}")
                } else {
                    write!(f, "invalid input: {message}")
                }
            }
            Error::Url { message, .. } => {
                write!(f, "bad URL: {message}")
            }
            Error::Streaming { message, .. } => {
                write!(f, "push-stream broken: {message}")
            }
            Error::Encoding { message, .. } => {
                write!(f, "undecodable stream data: {message}")
            }
            Error::Config { message } => {
                write!(f, "configuration: {message}")
            }
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Error::Connection { source, .. }
            | Error::Serialization { source, .. }
            | Error::HttpClient { source, .. }
            | Error::Streaming { source, .. }
            | Error::Encoding { source, .. } => source
                .as_ref()
                .map(|e| e.as_ref() as &(dyn error::Error + 'static)),
            Error::Io { source, .. } => Some(source),
            Error::Url { source, .. } => {
                source.as_ref().map(|e| e as &(dyn error::Error + 'static))
            }
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::io(err.to_string(), err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::serialization(format!("JSON error: {err}"), Some(Box::new(err)))
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::config(format!("YAML error: {err}"))
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::url(format!("URL parse error: {err}"), Some(err))
    }
}

impl From<Utf8Error> for Error {
    fn from(err: Utf8Error) -> Self {
        Error::encoding(format!("UTF-8 error: {err}"), Some(Box::new(err)))
    }
}

/// A specialized Result type for chatstream operations.
pub type Result<T> = std::result::Result<T, Error>;
