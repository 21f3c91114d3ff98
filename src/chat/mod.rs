//! The chat application built on top of the gemini_chat client library.
//!
//! It supports:
//!
//! - Streaming replies rendered fragment by fragment
//! - A single in-flight submission gated by a busy flag
//! - Terminal and HTML views of the same state
//! - Slash commands for inspecting the session
//!
//! # Architecture
//!
//! - [`config`]: CLI argument parsing and configuration
//! - [`controller`]: the chat session controller
//! - [`view`]: view state, the observer trait and the terminal view
//! - [`html`]: HTML rendering of the interface
//! - [`commands`]: slash command parsing

mod commands;
mod config;
mod controller;
mod html;
mod view;

pub use commands::{ChatCommand, help_text, parse_command};
pub use config::{ChatArgs, ChatConfig, DEFAULT_MODEL, DEFAULT_SYSTEM_INSTRUCTION};
pub use controller::{
    ChatController, GREETING, PendingReply, Rejection, SubmissionPhase, SubmitOutcome,
};
pub use html::{HtmlSnapshot, render_bubble, render_page};
pub use view::{BUSY_TEXT, ChatView, TerminalView, ViewState};
