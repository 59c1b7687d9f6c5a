//! Content rendering for transcript entries.
//!
//! A [`ContentRenderer`] turns assistant Markdown and plain user text into the
//! string a transcript view displays.  [`HtmlRenderer`] targets HTML views,
//! [`TerminalRenderer`] targets terminals.

use pulldown_cmark::{Event, Options, Parser, html};

/// Turns raw text into display strings.
///
/// Implementations must be pure: rendering the same input twice yields the
/// same output, which is what lets the controller re-render an assistant
/// reply from its full accumulated text on every delta.
pub trait ContentRenderer: Send + Sync {
    /// Render assistant Markdown.
    fn render_markdown(&self, markdown: &str) -> String;

    /// Render text that must be shown literally (user input, error messages).
    fn escape(&self, text: &str) -> String;
}

/// Renders Markdown to HTML with `pulldown-cmark`.
///
/// Raw HTML embedded in the Markdown source is escaped rather than passed
/// through, so backend output cannot inject markup.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlRenderer;

impl HtmlRenderer {
    /// Create a new HTML renderer.
    pub fn new() -> Self {
        Self
    }
}

impl ContentRenderer for HtmlRenderer {
    fn render_markdown(&self, markdown: &str) -> String {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        let parser = Parser::new_ext(markdown, options).map(|event| match event {
            Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
            other => other,
        });
        let mut html_output = String::with_capacity(markdown.len() * 3 / 2);
        html::push_html(&mut html_output, parser);
        html_output
    }

    fn escape(&self, text: &str) -> String {
        html_escape::encode_text(text).into_owned()
    }
}

/// Renders for a terminal: Markdown is shown as written, and control
/// characters other than newline and tab are dropped so that no text can
/// smuggle escape sequences onto the screen.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalRenderer;

impl TerminalRenderer {
    /// Create a new terminal renderer.
    pub fn new() -> Self {
        Self
    }
}

fn strip_controls(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect()
}

impl ContentRenderer for TerminalRenderer {
    fn render_markdown(&self, markdown: &str) -> String {
        strip_controls(markdown)
    }

    fn escape(&self, text: &str) -> String {
        strip_controls(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markdown_to_html() {
        let renderer = HtmlRenderer::new();
        assert_eq!(
            renderer.render_markdown("**Hello**"),
            "<p><strong>Hello</strong></p>\n"
        );
        assert!(renderer.render_markdown("| a |\n|---|\n| 1 |\n").contains("<table>"));
    }

    #[test]
    fn rendering_is_deterministic_over_accumulated_text() {
        let renderer = HtmlRenderer::new();
        let mut accumulated = String::new();
        accumulated.push_str("Hel");
        accumulated.push_str("lo");
        assert_eq!(
            renderer.render_markdown(&accumulated),
            renderer.render_markdown("Hello")
        );
    }

    #[test]
    fn raw_html_in_markdown_is_escaped() {
        let renderer = HtmlRenderer::new();
        let rendered = renderer.render_markdown("<script>alert(1)</script>");
        assert!(!rendered.contains("<script>"));
        assert!(rendered.contains("&lt;script&gt;"));

        let rendered = renderer.render_markdown("hi <b onclick=\"x\">there</b>");
        assert!(!rendered.contains("<b "));
    }

    #[test]
    fn escape_html_text() {
        let renderer = HtmlRenderer::new();
        assert_eq!(
            renderer.escape("<script>alert('x') & more</script>"),
            "&lt;script&gt;alert('x') &amp; more&lt;/script&gt;"
        );
    }

    #[test]
    fn terminal_drops_escape_sequences() {
        let renderer = TerminalRenderer::new();
        assert_eq!(renderer.escape("red\x1b[31m text\n\tok"), "red[31m text\n\tok");
        assert_eq!(renderer.render_markdown("**bold**"), "**bold**");
    }
}
