//! The transcript view seam and an in-memory implementation.
//!
//! The controller only ever talks to a [`TranscriptView`]; any UI layer can
//! implement it.  [`MemoryTranscript`] keeps entries in a vector and is what
//! embedders and tests inspect.

use crate::render::ContentRenderer;

/// Shown in an assistant entry until the first content arrives.
pub const TYPING_INDICATOR: &str = "●●●";

/// Who wrote a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Author {
    /// The person typing.
    User,
    /// The backend's replies.
    Assistant,
}

/// A transcript message together with its rendered form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// The raw text.
    pub text: String,
    /// Who wrote it.
    pub author: Author,
    /// The display string produced by the renderer.
    pub rendered: String,
    /// Set for inline failure notices shown in place of a reply.
    pub is_error: bool,
}

impl Message {
    /// A user message; the text is escaped, never interpreted.
    pub fn user(text: &str, renderer: &dyn ContentRenderer) -> Self {
        Self {
            text: text.to_string(),
            author: Author::User,
            rendered: renderer.escape(text),
            is_error: false,
        }
    }

    /// An assistant reply rendered as Markdown.
    pub fn assistant(text: &str, renderer: &dyn ContentRenderer) -> Self {
        Self {
            text: text.to_string(),
            author: Author::Assistant,
            rendered: renderer.render_markdown(text),
            is_error: false,
        }
    }

    /// An inline failure notice in the assistant's slot, escaped.
    pub fn assistant_error(text: &str, renderer: &dyn ContentRenderer) -> Self {
        Self {
            text: text.to_string(),
            author: Author::Assistant,
            rendered: renderer.escape(text),
            is_error: true,
        }
    }
}

/// Identifies an assistant entry for later updates.
///
/// Handles are invalidated by [`TranscriptView::clear`]; views ignore updates
/// through stale handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryHandle {
    generation: u64,
    index: usize,
}

impl EntryHandle {
    /// Create a handle.  Views choose what the two numbers mean.
    pub fn new(generation: u64, index: usize) -> Self {
        Self { generation, index }
    }

    /// The generation the handle was issued in.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The position of the entry within its generation.
    pub fn index(&self) -> usize {
        self.index
    }
}

/// A live, ordered view of the conversation.
pub trait TranscriptView {
    /// Append a user message.
    fn append_user(&mut self, message: &Message);

    /// Append an assistant entry showing the typing indicator.
    fn append_assistant_placeholder(&mut self) -> EntryHandle;

    /// Replace the content of an assistant entry.
    fn update_assistant(&mut self, handle: EntryHandle, message: &Message);

    /// Called once an assistant entry will receive no further updates.
    fn finish_assistant(&mut self, handle: EntryHandle) {
        _ = handle;
    }

    /// Remove every entry.
    fn clear(&mut self);

    /// Bring the newest entry into view.
    fn scroll_to_latest(&mut self) {}
}

/// One entry of a [`MemoryTranscript`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptEntry {
    /// A user message.
    User(Message),
    /// An assistant entry that has not received content yet.
    Placeholder,
    /// An assistant reply (or an inline failure in its place).
    Assistant {
        /// The current content.
        message: Message,
        /// False while the reply may still change.
        complete: bool,
    },
}

impl TranscriptEntry {
    /// The author of the entry.
    pub fn author(&self) -> Author {
        match self {
            TranscriptEntry::User(_) => Author::User,
            TranscriptEntry::Placeholder | TranscriptEntry::Assistant { .. } => Author::Assistant,
        }
    }

    /// The message, unless this is still a placeholder.
    pub fn message(&self) -> Option<&Message> {
        match self {
            TranscriptEntry::User(message) => Some(message),
            TranscriptEntry::Assistant { message, .. } => Some(message),
            TranscriptEntry::Placeholder => None,
        }
    }

    /// What a view would display for this entry.
    pub fn rendered(&self) -> &str {
        match self.message() {
            Some(message) => &message.rendered,
            None => TYPING_INDICATOR,
        }
    }
}

/// An in-memory transcript, oldest entry first.
#[derive(Debug, Clone, Default)]
pub struct MemoryTranscript {
    entries: Vec<TranscriptEntry>,
    generation: u64,
    scrolled_to: usize,
}

impl MemoryTranscript {
    /// Create an empty transcript.
    pub fn new() -> Self {
        Self::default()
    }

    /// All entries, oldest first.
    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The entry a handle points to, if the handle is still valid.
    pub fn get(&self, handle: EntryHandle) -> Option<&TranscriptEntry> {
        if handle.generation != self.generation {
            return None;
        }
        self.entries.get(handle.index)
    }

    /// The newest entry.
    pub fn last(&self) -> Option<&TranscriptEntry> {
        self.entries.last()
    }

    /// Returns true if the view has been scrolled to the newest entry.
    pub fn is_scrolled_to_latest(&self) -> bool {
        self.scrolled_to == self.entries.len()
    }
}

impl TranscriptView for MemoryTranscript {
    fn append_user(&mut self, message: &Message) {
        self.entries.push(TranscriptEntry::User(message.clone()));
    }

    fn append_assistant_placeholder(&mut self) -> EntryHandle {
        self.entries.push(TranscriptEntry::Placeholder);
        EntryHandle::new(self.generation, self.entries.len() - 1)
    }

    fn update_assistant(&mut self, handle: EntryHandle, message: &Message) {
        if handle.generation != self.generation {
            return;
        }
        if let Some(entry) = self.entries.get_mut(handle.index)
            && entry.author() == Author::Assistant
        {
            *entry = TranscriptEntry::Assistant {
                message: message.clone(),
                complete: false,
            };
        }
    }

    fn finish_assistant(&mut self, handle: EntryHandle) {
        if handle.generation != self.generation {
            return;
        }
        if let Some(TranscriptEntry::Assistant { complete, .. }) =
            self.entries.get_mut(handle.index)
        {
            *complete = true;
        }
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.generation += 1;
        self.scrolled_to = 0;
    }

    fn scroll_to_latest(&mut self) {
        self.scrolled_to = self.entries.len();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::HtmlRenderer;

    #[test]
    fn placeholder_is_promoted_in_place() {
        let renderer = HtmlRenderer::new();
        let mut view = MemoryTranscript::new();
        view.append_user(&Message::user("hi", &renderer));
        let handle = view.append_assistant_placeholder();
        assert_eq!(view.get(handle), Some(&TranscriptEntry::Placeholder));
        assert_eq!(view.last().unwrap().rendered(), TYPING_INDICATOR);

        view.update_assistant(handle, &Message::assistant("Hel", &renderer));
        view.update_assistant(handle, &Message::assistant("Hello", &renderer));
        view.finish_assistant(handle);

        assert_eq!(view.len(), 2);
        match view.get(handle).unwrap() {
            TranscriptEntry::Assistant { message, complete } => {
                assert_eq!(message.text, "Hello");
                assert_eq!(message.rendered, "<p>Hello</p>\n");
                assert!(*complete);
            }
            other => panic!("unexpected entry: {other:?}"),
        }
    }

    #[test]
    fn stale_handles_are_ignored_after_clear() {
        let renderer = HtmlRenderer::new();
        let mut view = MemoryTranscript::new();
        let handle = view.append_assistant_placeholder();
        view.clear();
        assert!(view.is_empty());

        view.append_user(&Message::user("again", &renderer));
        view.update_assistant(handle, &Message::assistant("late", &renderer));
        assert_eq!(view.len(), 1);
        assert_eq!(view.entries()[0].author(), Author::User);
        assert!(view.get(handle).is_none());
    }

    #[test]
    fn user_entries_cannot_be_overwritten() {
        let renderer = HtmlRenderer::new();
        let mut view = MemoryTranscript::new();
        view.append_user(&Message::user("mine", &renderer));
        let bogus = EntryHandle::new(0, 0);
        view.update_assistant(bogus, &Message::assistant("theirs", &renderer));
        assert_eq!(view.entries()[0].message().unwrap().text, "mine");
    }

    #[test]
    fn error_messages_are_escaped() {
        let renderer = HtmlRenderer::new();
        let message = Message::assistant_error("Error: <b>nope</b>", &renderer);
        assert!(message.is_error);
        assert_eq!(message.rendered, "Error: &lt;b&gt;nope&lt;/b&gt;");
    }

    #[test]
    fn scroll_tracking() {
        let mut view = MemoryTranscript::new();
        assert!(view.is_scrolled_to_latest());
        view.append_assistant_placeholder();
        assert!(!view.is_scrolled_to_latest());
        view.scroll_to_latest();
        assert!(view.is_scrolled_to_latest());
    }
}
