//! Interactive terminal client for a streaming chat backend.
//!
//! This binary provides a REPL that sends each line to the backend and
//! prints the reply as it streams in.
//!
//! # Usage
//!
//! ```bash
//! # Talk to a backend on the default local address
//! chatstream
//!
//! # Point at another backend and use single-shot requests
//! chatstream --base-url http://chat.example.com:8000 --mode single-shot
//!
//! # Pick up an existing session and show its history
//! chatstream --session 5f1c0e9a-77c2-4c1b-9d53-1c1f0f3a1e42
//!
//! # Disable colors (useful for piping output)
//! chatstream --no-color
//! ```
//!
//! # Commands
//!
//! While chatting, you can use slash commands:
//! - `/help` - Show available commands
//! - `/history [id]` - Reload stored history
//! - `/sessions` - List stored sessions
//! - `/mode <mode>` - Switch request mode
//! - `/new` - Start a new session
//! - `/quit` - Exit the application

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use arrrg::CommandLine;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use time::format_description::well_known::Rfc3339;
use tracing::info;
use tracing_subscriber::EnvFilter;

use chatstream::chat::{
    ChatArgs, ChatCommand, ChatConfig, ChatController, StreamStatus, TerminalTranscript,
    help_text, parse_command,
};
use chatstream::{ChatBackend, SessionId, TerminalRenderer};

type Controller = ChatController<TerminalTranscript>;

/// Main entry point for the chatstream application.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (args, _) = ChatArgs::from_command_line_relaxed("chatstream [OPTIONS]");
    let config = ChatConfig::try_from(args)?;

    let filter = if config.verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let backend: Arc<dyn ChatBackend> = Arc::new(config.backend()?);
    info!(base_url = %config.base_url, mode = %config.mode, "starting chatstream");

    // Flag for interrupt handling during streaming
    let interrupted = Arc::new(AtomicBool::new(false));
    let interrupted_clone = interrupted.clone();
    ctrlc::set_handler(move || {
        interrupted_clone.store(true, Ordering::Relaxed);
    })?;

    let view = TerminalTranscript::with_color(config.use_color);
    let mut controller = ChatController::new(backend, view)
        .with_mode(config.mode)
        .with_renderer(TerminalRenderer::new())
        .with_interrupt(interrupted.clone());
    let mut rl = DefaultEditor::new()?;

    println!("Chatstream ({}, mode: {})", config.base_url, config.mode);
    println!("Type /help for commands, /quit to exit\n");

    match &config.session {
        Some(session) => show_history(&mut controller, session.clone(), true).await,
        None => ensure_session(&mut controller).await,
    }

    loop {
        let readline = rl.readline("You: ");

        match readline {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(line);

                // Check for slash commands
                if let Some(cmd) = parse_command(line) {
                    match cmd {
                        ChatCommand::Quit => {
                            println!("Goodbye!");
                            break;
                        }
                        ChatCommand::Clear => {
                            controller.clear_transcript();
                            controller.view_mut().print_info("Transcript cleared.");
                        }
                        ChatCommand::Help => {
                            for line in help_text().lines() {
                                println!("    {}", line);
                            }
                        }
                        ChatCommand::History(id) => {
                            let id = id
                                .map(SessionId::new)
                                .or_else(|| controller.session().map(|s| s.id().clone()));
                            match id {
                                Some(id) => show_history(&mut controller, id, false).await,
                                None => controller.view_mut().print_error("No current session."),
                            }
                        }
                        ChatCommand::Sessions => print_sessions(&mut controller).await,
                        ChatCommand::Session => {
                            let description = match controller.session() {
                                Some(session) => {
                                    format!("Session: {} ({:?})", session.id(), session.origin())
                                }
                                None => "No current session.".to_string(),
                            };
                            controller.view_mut().print_info(&description);
                        }
                        ChatCommand::New => {
                            controller.clear_transcript();
                            controller.reset_session();
                            ensure_session(&mut controller).await;
                            controller.view_mut().print_info("Started a new conversation.");
                        }
                        ChatCommand::Mode(mode) => {
                            controller.set_mode(mode);
                            controller
                                .view_mut()
                                .print_info(&format!("Mode changed to: {mode}"));
                            ensure_session(&mut controller).await;
                        }
                        ChatCommand::Stats => print_stats(&controller),
                        ChatCommand::ShowConfig => print_config(&controller, &config),
                        ChatCommand::Invalid(message) => {
                            controller.view_mut().print_error(&message);
                        }
                    }
                    continue;
                }

                // Regular message - send to the backend
                if controller.send_message(line).await == Some(StreamStatus::Cancelled) {
                    controller.view_mut().print_interrupted();
                }
            }
            Err(ReadlineError::Interrupted) => {
                // Ctrl+C at prompt - soft interrupt
                println!();
                continue;
            }
            Err(ReadlineError::Eof) => {
                // Ctrl+D - exit
                println!("\nGoodbye!");
                break;
            }
            Err(err) => {
                controller
                    .view_mut()
                    .print_error(&format!("Input error: {}", err));
                break;
            }
        }
    }

    Ok(())
}

/// Create a session if the current mode streams over one and none is held.
async fn ensure_session(controller: &mut Controller) {
    if !controller.needs_session() || controller.session().is_some() {
        return;
    }
    if let Err(err) = controller.initialize_session().await {
        controller
            .view_mut()
            .print_error(&format!("Failed to start conversation: {err}"));
    }
}

async fn show_history(controller: &mut Controller, id: SessionId, resume: bool) {
    controller.view_mut().set_echo_user(true);
    let result = if resume {
        controller.resume_session(id.clone()).await
    } else {
        controller.load_history(&id).await
    };
    controller.view_mut().set_echo_user(false);
    match result {
        Ok(count) => controller
            .view_mut()
            .print_info(&format!("Loaded {count} exchanges from session {id}.")),
        Err(err) => controller
            .view_mut()
            .print_error(&format!("Failed to load history: {err}")),
    }
}

async fn print_sessions(controller: &mut Controller) {
    let list = match controller.list_sessions().await {
        Ok(list) => list,
        Err(err) => {
            controller
                .view_mut()
                .print_error(&format!("Failed to list sessions: {err}"));
            return;
        }
    };
    if list.sessions.is_empty() {
        println!("    No stored sessions.");
        return;
    }
    println!("    Sessions ({}):", list.count);
    for session in &list.sessions {
        let last_activity = session
            .last_activity
            .format(&Rfc3339)
            .unwrap_or_else(|_| session.last_activity.to_string());
        println!(
            "      {}  {} messages  last active {}",
            session.session_id, session.message_count, last_activity
        );
    }
}

fn print_stats(controller: &Controller) {
    let stats = controller.stats();
    println!("    Session Statistics:");
    match controller.session() {
        Some(session) => println!("      Session: {}", session.id()),
        None => println!("      Session: (none)"),
    }
    println!("      Mode: {}", controller.mode());
    println!("      Messages sent: {}", stats.sends);
    println!("      Replies completed: {}", stats.completed);
    println!("      Replies failed: {}", stats.failed);
    println!("      Replies interrupted: {}", stats.cancelled);
    println!("      History loads: {}", stats.history_loads);
}

fn print_config(controller: &Controller, config: &ChatConfig) {
    println!("    Current Configuration:");
    println!("      Base URL: {}", config.base_url);
    println!("      Mode: {}", controller.mode());
    match config.timeout {
        Some(timeout) => println!("      Timeout: {}s", timeout.as_secs()),
        None => println!("      Timeout: default"),
    }
    println!(
        "      Color: {}",
        if config.use_color {
            "enabled"
        } else {
            "disabled"
        }
    );
    println!("      Endpoints:");
    println!("        session: {}", config.endpoints.session);
    println!("        stream: {}", config.endpoints.stream);
    println!("        chat: {}", config.endpoints.chat);
    println!("        history: {}", config.endpoints.history);
    println!("        sessions: {}", config.endpoints.sessions);
}
