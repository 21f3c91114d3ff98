//! Markdown and plain-text rendering to HTML.
//!
//! Model output is rendered as GitHub-flavored markdown.  Raw HTML in the
//! input is escaped and `javascript:`-style link targets are dropped, so the
//! output is safe to inline into a page.  User-authored text is never
//! interpreted as markdown; it is escaped and shown literally.

use ::markdown::Options;

use crate::transcript::Message;

/// Render markdown to sanitized HTML.
pub fn render(text: &str) -> String {
    match ::markdown::to_html_with_options(text, &Options::gfm()) {
        Ok(html) => html,
        Err(err) => {
            // GFM without MDX does not fail; keep the text visible if it ever does.
            tracing::debug!(error = %err, "markdown rendering failed");
            format!("<p>{}</p>", escape_html(text))
        }
    }
}

/// Escape text for inclusion in HTML content or attribute values.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}

/// Render a message body: markdown for ai and error messages, escaped plain
/// text for user messages.
pub fn render_message(message: &Message) -> String {
    if message.sender().renders_markdown() {
        render(message.text())
    } else {
        escape_html(message.text())
    }
}
