//! Chat session control and the terminal front end.
//!
//! This module provides the [`ChatController`] that drives a conversation
//! against a [`crate::ChatBackend`], plus the pieces the `chatstream` REPL
//! builds on:
//!
//! - Session creation, resumption and history replay
//! - Incremental rendering of streamed replies with a typing indicator
//! - Slash commands for session control
//! - Configuration from the command line, a YAML file and the environment
//!
//! # Architecture
//!
//! - [`controller`]: the session controller and reply lifecycle
//! - [`config`]: CLI argument parsing and configuration
//! - [`commands`]: slash command parsing
//! - [`render`]: a [`crate::TranscriptView`] for terminals

mod commands;
mod config;
mod controller;
mod render;

pub use commands::{ChatCommand, help_text, parse_command};
pub use config::{BASE_URL_ENV, ChatArgs, ChatConfig, ChatConfigFile};
pub use controller::{
    CONNECTION_LOST, ChatController, ControllerStats, FAILED_TO_START, Session, SessionOrigin,
    StreamState, StreamStatus,
};
pub use render::TerminalTranscript;
