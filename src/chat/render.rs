//! Terminal output for the chat application.
//!
//! [`TerminalTranscript`] is a [`TranscriptView`] that writes the transcript
//! to a terminal as it changes.  Assistant replies are re-rendered in full on
//! every update, so it prints only the part not yet on screen.

use std::io::{self, Stdout, Write};

use crate::transcript::{EntryHandle, Message, TYPING_INDICATOR, TranscriptView};

/// ANSI escape code for dim text (used for the typing indicator).
const ANSI_DIM: &str = "\x1b[2m";

/// ANSI escape code for bold text (used for speaker labels).
const ANSI_BOLD: &str = "\x1b[1m";

/// ANSI escape code to reset all styling.
const ANSI_RESET: &str = "\x1b[0m";

/// ANSI escape code for cyan text (used for informational lines).
const ANSI_CYAN: &str = "\x1b[36m";

/// ANSI escape code for red text (used for errors).
const ANSI_RED: &str = "\x1b[31m";

/// Return to column zero and erase the line.
const ERASE_LINE: &str = "\r\x1b[2K";

/// Clear the screen and home the cursor.
const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";

/// Back over the typing indicator, blank it, and back up again.  Plain
/// control characters, so it also works without ANSI support.
const ERASE_INDICATOR: &str = "\x08\x08\x08   \x08\x08\x08";

const USER_LABEL: &str = "You:";
const ASSISTANT_LABEL: &str = "Assistant:";

/// A transcript view that prints to a terminal.
pub struct TerminalTranscript<W: Write = Stdout> {
    out: W,
    use_color: bool,
    echo_user: bool,
    generation: u64,
    next_index: usize,
    current: Option<EntryHandle>,
    started: bool,
    printed: String,
}

impl TerminalTranscript<Stdout> {
    /// Creates a transcript on stdout with ANSI colors enabled.
    pub fn new() -> Self {
        Self::with_color(true)
    }

    /// Creates a transcript on stdout with the specified color setting.
    pub fn with_color(use_color: bool) -> Self {
        Self::with_writer(io::stdout(), use_color)
    }
}

impl Default for TerminalTranscript<Stdout> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write> TerminalTranscript<W> {
    /// Creates a transcript writing to `out`.
    pub fn with_writer(out: W, use_color: bool) -> Self {
        Self {
            out,
            use_color,
            echo_user: false,
            generation: 0,
            next_index: 0,
            current: None,
            started: false,
            printed: String::new(),
        }
    }

    /// Whether user messages are printed.  A REPL leaves this off, since the
    /// user's line is already on screen; history replay turns it on.
    pub fn set_echo_user(&mut self, echo_user: bool) {
        self.echo_user = echo_user;
    }

    /// Returns whether ANSI styling is in use.
    pub fn use_color(&self) -> bool {
        self.use_color
    }

    /// The underlying writer.
    pub fn writer(&self) -> &W {
        &self.out
    }

    /// Print an informational line.
    pub fn print_info(&mut self, info: &str) {
        if self.use_color {
            self.emit(&format!("{ANSI_CYAN}{info}{ANSI_RESET}\n"));
        } else {
            self.emit(&format!("{info}\n"));
        }
    }

    /// Print an error that is not part of the transcript.
    pub fn print_error(&mut self, error: &str) {
        if self.use_color {
            self.emit(&format!("{ANSI_RED}Error: {error}{ANSI_RESET}\n"));
        } else {
            self.emit(&format!("Error: {error}\n"));
        }
    }

    /// Note that the last reply was interrupted.
    pub fn print_interrupted(&mut self) {
        self.print_info("[interrupted]");
    }

    fn emit(&mut self, text: &str) {
        let _ = self.out.write_all(text.as_bytes());
        let _ = self.out.flush();
    }

    fn label(&self, label: &str) -> String {
        if self.use_color {
            format!("{ANSI_BOLD}{label}{ANSI_RESET} ")
        } else {
            format!("{label} ")
        }
    }

    fn styled(&self, message: &Message, text: &str) -> String {
        if self.use_color && message.is_error {
            format!("{ANSI_RED}{text}{ANSI_RESET}")
        } else {
            text.to_string()
        }
    }
}

impl<W: Write> TranscriptView for TerminalTranscript<W> {
    fn append_user(&mut self, message: &Message) {
        self.next_index += 1;
        if self.echo_user {
            let line = format!("{}{}\n", self.label(USER_LABEL), message.rendered);
            self.emit(&line);
        }
    }

    fn append_assistant_placeholder(&mut self) -> EntryHandle {
        let handle = EntryHandle::new(self.generation, self.next_index);
        self.next_index += 1;
        self.current = Some(handle);
        self.started = false;
        self.printed.clear();

        let mut line = self.label(ASSISTANT_LABEL);
        if self.use_color {
            line.push_str(&format!("{ANSI_DIM}{TYPING_INDICATOR}{ANSI_RESET}"));
        } else {
            line.push_str(TYPING_INDICATOR);
        }
        self.emit(&line);
        handle
    }

    fn update_assistant(&mut self, handle: EntryHandle, message: &Message) {
        if self.current != Some(handle) {
            return;
        }
        let rendered = message.rendered.as_str();
        if !self.started {
            self.started = true;
            if self.use_color {
                let line = format!("{ERASE_LINE}{}", self.label(ASSISTANT_LABEL));
                self.emit(&line);
            } else {
                self.emit(ERASE_INDICATOR);
            }
        }
        if let Some(suffix) = rendered.strip_prefix(self.printed.as_str()) {
            let text = self.styled(message, suffix);
            self.emit(&text);
        } else {
            let text = format!("\n{}", self.styled(message, rendered));
            self.emit(&text);
        }
        self.printed = rendered.to_string();
    }

    fn finish_assistant(&mut self, handle: EntryHandle) {
        if self.current != Some(handle) {
            return;
        }
        self.current = None;
        self.printed.clear();
        self.emit("\n");
    }

    fn clear(&mut self) {
        self.generation += 1;
        self.next_index = 0;
        self.current = None;
        self.printed.clear();
        if self.use_color {
            self.emit(CLEAR_SCREEN);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::TerminalRenderer;

    fn output(view: &TerminalTranscript<Vec<u8>>) -> String {
        String::from_utf8(view.writer().clone()).unwrap()
    }

    #[test]
    fn transcript_default_has_color() {
        let view = TerminalTranscript::new();
        assert!(view.use_color());
        let view = TerminalTranscript::with_color(false);
        assert!(!view.use_color());
    }

    #[test]
    fn streams_only_new_text() {
        let renderer = TerminalRenderer::new();
        let mut view = TerminalTranscript::with_writer(Vec::new(), false);
        let handle = view.append_assistant_placeholder();
        view.update_assistant(handle, &Message::assistant("Hel", &renderer));
        view.update_assistant(handle, &Message::assistant("Hello", &renderer));
        view.finish_assistant(handle);
        assert_eq!(
            output(&view),
            format!("Assistant: {TYPING_INDICATOR}{ERASE_INDICATOR}Hello\n")
        );
    }

    #[test]
    fn indicator_is_erased_on_first_update() {
        let renderer = TerminalRenderer::new();
        let mut view = TerminalTranscript::with_writer(Vec::new(), true);
        let handle = view.append_assistant_placeholder();
        assert!(output(&view).contains(TYPING_INDICATOR));
        view.update_assistant(handle, &Message::assistant("Hi", &renderer));
        let out = output(&view);
        let erased = out.rfind(ERASE_LINE).unwrap();
        assert!(out[erased..].ends_with("Hi"));
        assert!(!out[erased..].contains(TYPING_INDICATOR));
    }

    #[test]
    fn replaced_text_is_reprinted() {
        let renderer = TerminalRenderer::new();
        let mut view = TerminalTranscript::with_writer(Vec::new(), false);
        let handle = view.append_assistant_placeholder();
        view.update_assistant(handle, &Message::assistant("partial", &renderer));
        view.update_assistant(
            handle,
            &Message::assistant_error("Error: Connection lost", &renderer),
        );
        view.finish_assistant(handle);
        assert_eq!(
            output(&view),
            format!("Assistant: {TYPING_INDICATOR}{ERASE_INDICATOR}partial\nError: Connection lost\n")
        );
    }

    #[test]
    fn user_echo_and_stale_handles() {
        let renderer = TerminalRenderer::new();
        let mut view = TerminalTranscript::with_writer(Vec::new(), false);
        view.append_user(&Message::user("quiet", &renderer));
        view.set_echo_user(true);
        view.append_user(&Message::user("loud", &renderer));
        let handle = view.append_assistant_placeholder();
        view.clear();
        view.update_assistant(handle, &Message::assistant("late", &renderer));
        assert_eq!(output(&view), format!("You: loud\nAssistant: {TYPING_INDICATOR}"));
    }

    #[test]
    fn plain_indicator_is_shown_and_erased() {
        let renderer = TerminalRenderer::new();
        let mut view = TerminalTranscript::with_writer(Vec::new(), false);
        let handle = view.append_assistant_placeholder();
        assert_eq!(output(&view), "Assistant: ●●●");
        view.update_assistant(handle, &Message::assistant("Hi", &renderer));
        let out = output(&view);
        assert!(!out.contains('\x1b'));
        assert!(out.ends_with("●●●\x08\x08\x08   \x08\x08\x08Hi"));
    }

    #[test]
    fn erase_matches_indicator_width() {
        let width = TYPING_INDICATOR.chars().count();
        assert_eq!(ERASE_INDICATOR.matches('\x08').count(), 2 * width);
        assert_eq!(ERASE_INDICATOR.matches(' ').count(), width);
    }
}
