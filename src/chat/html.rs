//! HTML rendering of the chat interface.
//!
//! [`render_page`] draws a [`ViewState`] as a standalone document.
//! [`HtmlSnapshot`] is a [`ChatView`] that rewrites such a document on disk
//! after every state change.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use super::view::{BUSY_TEXT, ChatView, ViewState};
use crate::markdown::{escape_html, render_message};
use crate::transcript::Message;

const TITLE: &str = "AI Chat Bot";

const STYLE: &str = r#"body { margin: 0; font-family: sans-serif; background: #f0f2f5; }
.chat-container { display: flex; flex-direction: column; height: 100vh; max-width: 760px; margin: 0 auto; background: #fff; }
.chat-header { padding: 1rem; font-weight: bold; background: #4a76a8; color: #fff; }
.chat-messages { flex: 1; overflow-y: auto; padding: 1rem; }
.message-bubble { max-width: 75%; margin: 0.5rem 0; padding: 0.5rem 0.75rem; border-radius: 12px; }
.message-bubble.user { margin-left: auto; background: #dcf8c6; }
.message-bubble.ai { background: #eef1f5; }
.message-bubble.error { background: #fdecea; color: #b00020; }
.message-bubble.user .message-content { white-space: pre-wrap; }
.message-timestamp { font-size: 0.75rem; color: #888; text-align: right; }
.loading-indicator { display: flex; align-items: center; gap: 0.5rem; padding: 0.5rem 1rem; color: #666; }
.spinner { width: 12px; height: 12px; border: 2px solid #ccc; border-top-color: #4a76a8; border-radius: 50%; animation: spin 1s linear infinite; }
@keyframes spin { to { transform: rotate(360deg); } }
.error-display { margin: 0 1rem; padding: 0.5rem 1rem; background: #fdecea; color: #b00020; border-radius: 8px; }
.input-area { display: flex; gap: 0.5rem; padding: 1rem; border-top: 1px solid #ddd; }
.input-area input { flex: 1; padding: 0.5rem; }
"#;

/// Render one message bubble.
pub fn render_bubble(message: &Message) -> String {
    let sender = message.sender().as_str();
    let timestamp = escape_html(message.timestamp());
    format!(
        "<div class=\"message-bubble {sender}\" id=\"{id}\" aria-label=\"{sender} message at {timestamp}\">\
<div class=\"message-content\">{content}</div>\
<div class=\"message-timestamp\">{timestamp}</div></div>\n",
        id = message.id(),
        content = render_message(message),
    )
}

/// Render the whole interface as a standalone HTML document.
pub fn render_page(state: &ViewState<'_>) -> String {
    let mut page = String::new();
    page.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    let _ = writeln!(page, "<title>{TITLE}</title>");
    let _ = writeln!(page, "<style>\n{STYLE}</style>\n</head>\n<body>");
    page.push_str("<div class=\"chat-container\" aria-live=\"polite\">\n");
    let _ = writeln!(page, "<header class=\"chat-header\">{TITLE}</header>");

    page.push_str("<div class=\"chat-messages\" role=\"log\">\n");
    for message in state.transcript().messages() {
        page.push_str(&render_bubble(message));
    }
    page.push_str("<div id=\"messages-end\"></div>\n</div>\n");

    if state.show_busy_indicator() {
        let _ = writeln!(
            page,
            "<div class=\"loading-indicator\"><div class=\"spinner\"></div><span>{BUSY_TEXT}</span></div>"
        );
    }
    if let Some(banner) = state.error_banner() {
        let _ = writeln!(
            page,
            "<div class=\"error-display\" role=\"alert\"><p>{}</p></div>",
            escape_html(banner)
        );
    }

    let input_disabled = if state.input_enabled() { "" } else { " disabled" };
    let submit_disabled = if state.submit_enabled() { "" } else { " disabled" };
    let _ = writeln!(
        page,
        "<form class=\"input-area\">\
<input type=\"text\" value=\"{}\" placeholder=\"Type your message...\" aria-label=\"Chat input\"{input_disabled}>\
<button type=\"submit\"{submit_disabled}>Send</button></form>",
        escape_html(state.input())
    );
    page.push_str("</div>\n");

    if let Some(target) = state.scroll_target() {
        let _ = writeln!(
            page,
            "<script>document.getElementById(\"{target}\").scrollIntoView({{behavior: \"smooth\"}});</script>"
        );
    }
    page.push_str("</body>\n</html>\n");
    page
}

/// Keeps an HTML rendering of the chat up to date on disk.
///
/// Write failures are logged once and otherwise ignored; the chat goes on.
#[derive(Debug)]
pub struct HtmlSnapshot {
    path: PathBuf,
    failing: bool,
}

impl HtmlSnapshot {
    /// Creates a snapshot view writing to `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            failing: false,
        }
    }

    /// Where the snapshot is written.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Render `state` and replace the file.
    pub fn write(&mut self, state: &ViewState<'_>) {
        match fs::write(&self.path, render_page(state)) {
            Ok(()) => self.failing = false,
            Err(err) => {
                if !self.failing {
                    tracing::warn!(path = %self.path.display(), error = %err, "cannot write HTML snapshot");
                }
                self.failing = true;
            }
        }
    }
}

impl ChatView for HtmlSnapshot {
    fn message_appended(&mut self, state: &ViewState<'_>, _: &Message) {
        self.write(state);
    }

    fn message_updated(&mut self, state: &ViewState<'_>, _: &Message, _: &str) {
        self.write(state);
    }

    fn message_finished(&mut self, state: &ViewState<'_>, _: &Message) {
        self.write(state);
    }

    fn busy_changed(&mut self, state: &ViewState<'_>) {
        self.write(state);
    }

    fn error_changed(&mut self, state: &ViewState<'_>) {
        self.write(state);
    }
}
