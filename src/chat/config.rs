//! Configuration types for the chat application.
//!
//! This module provides CLI argument parsing via `arrrg`, an optional YAML
//! configuration file, and the resolved [`ChatConfig`].  Values are taken
//! from the command line first, then the file, then the `CHATSTREAM_BASE_URL`
//! environment variable, then defaults.

use std::path::Path;
use std::time::Duration;

use arrrg_derive::CommandLine;
use serde::{Deserialize, Serialize};

use crate::client::{DEFAULT_BASE_URL, Endpoints, HttpBackend};
use crate::strategy::Mode;
use crate::types::SessionId;
use crate::{Error, Result};

/// Environment variable consulted for the backend URL.
pub const BASE_URL_ENV: &str = "CHATSTREAM_BASE_URL";

/// Command-line arguments for the chatstream tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct ChatArgs {
    /// Base URL of the chat backend.
    #[arrrg(optional, "Backend base URL (default: http://127.0.0.1:8000/)", "URL")]
    pub base_url: Option<String>,

    /// Request strategy.
    #[arrrg(
        optional,
        "Request mode: stream-session, stream-per-message or single-shot",
        "MODE"
    )]
    pub mode: Option<String>,

    /// Timeout for non-streaming requests, in seconds.
    #[arrrg(optional, "Request timeout in seconds (default: 60)", "SECONDS")]
    pub timeout: Option<u32>,

    /// Resume an existing session instead of creating one.
    #[arrrg(optional, "Resume the given session", "SESSION_ID")]
    pub session: Option<String>,

    /// YAML configuration file.
    #[arrrg(optional, "Read configuration from a YAML file", "PATH")]
    pub config: Option<String>,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,

    /// Log at info level instead of warn.
    #[arrrg(flag, "Verbose logging")]
    pub verbose: bool,
}

/// The YAML configuration file.  Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChatConfigFile {
    /// Base URL of the chat backend.
    pub base_url: Option<String>,
    /// Request strategy.
    pub mode: Option<Mode>,
    /// Timeout for non-streaming requests, in seconds.
    pub timeout: Option<u64>,
    /// Session to resume.
    pub session: Option<String>,
    /// Whether to use ANSI colors.
    pub color: Option<bool>,
    /// Endpoint path overrides.
    pub endpoints: Option<Endpoints>,
}

impl ChatConfigFile {
    /// Load a configuration file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::io(format!("cannot read {}", path.display()), e))?;
        let config: Self = serde_yaml::from_str(&content)?;
        Ok(config)
    }
}

/// Configuration for a chat session.
///
/// This struct holds the resolved configuration values after processing
/// command-line arguments, the configuration file and the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatConfig {
    /// Base URL of the chat backend.
    pub base_url: String,

    /// Request strategy.
    pub mode: Mode,

    /// Timeout for non-streaming requests; `None` uses the client default.
    pub timeout: Option<Duration>,

    /// Session to resume instead of creating one.
    pub session: Option<SessionId>,

    /// Whether to use ANSI colors and styles in output.
    pub use_color: bool,

    /// Endpoint paths.
    pub endpoints: Endpoints,

    /// Whether to log verbosely.
    pub verbose: bool,
}

impl ChatConfig {
    /// Creates a new ChatConfig with default values.
    ///
    /// Defaults:
    /// - Base URL: http://127.0.0.1:8000/
    /// - Mode: stream-session
    /// - Color: enabled
    pub fn new() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            mode: Mode::default(),
            timeout: None,
            session: None,
            use_color: true,
            endpoints: Endpoints::default(),
            verbose: false,
        }
    }

    /// Sets the backend base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Sets the request mode.
    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the session to resume.
    pub fn with_session(mut self, session: Option<SessionId>) -> Self {
        self.session = session;
        self
    }

    /// Disables ANSI color output.
    pub fn without_color(mut self) -> Self {
        self.use_color = false;
        self
    }

    /// Sets the endpoint paths.
    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    /// Overlay the values set in a configuration file.
    pub fn apply_file(mut self, file: ChatConfigFile) -> Self {
        if let Some(base_url) = file.base_url {
            self.base_url = base_url;
        }
        if let Some(mode) = file.mode {
            self.mode = mode;
        }
        if let Some(timeout) = file.timeout {
            self.timeout = Some(Duration::from_secs(timeout));
        }
        if let Some(session) = file.session {
            self.session = Some(SessionId::new(session));
        }
        if let Some(color) = file.color {
            self.use_color = color;
        }
        if let Some(endpoints) = file.endpoints {
            self.endpoints = endpoints;
        }
        self
    }

    /// Resolve command-line arguments against the file they name, the given
    /// value of the base URL environment variable, and the defaults.
    pub fn resolve(args: ChatArgs, env_base_url: Option<String>) -> Result<Self> {
        let mut config = ChatConfig::new();
        if let Some(base_url) = env_base_url.filter(|url| !url.trim().is_empty()) {
            config.base_url = base_url;
        }
        if let Some(path) = &args.config {
            config = config.apply_file(ChatConfigFile::from_file(path)?);
        }
        if let Some(base_url) = args.base_url {
            config.base_url = base_url;
        }
        if let Some(mode) = args.mode {
            config.mode = mode.parse()?;
        }
        if let Some(timeout) = args.timeout {
            if timeout == 0 {
                return Err(Error::config("timeout must be at least one second"));
            }
            config.timeout = Some(Duration::from_secs(u64::from(timeout)));
        }
        if let Some(session) = args.session {
            config.session = Some(SessionId::new(session));
        }
        if args.no_color {
            config.use_color = false;
        }
        config.verbose = args.verbose;
        Ok(config)
    }

    /// Build the HTTP backend this configuration describes.
    pub fn backend(&self) -> Result<HttpBackend> {
        HttpBackend::with_options(&self.base_url, self.timeout, self.endpoints.clone())
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl TryFrom<ChatArgs> for ChatConfig {
    type Error = Error;

    fn try_from(args: ChatArgs) -> Result<Self> {
        ChatConfig::resolve(args, std::env::var(BASE_URL_ENV).ok())
    }
}
