//! Presentation of the chat state.
//!
//! [`ViewState`] is a read-only snapshot of everything an interface needs to
//! draw, with the interface rules expressed as methods.  [`ChatView`] is the
//! observer the controller notifies as the state changes.  [`TerminalView`]
//! renders to stdout with optional ANSI styling.

use std::io::{self, Stdout, Write};

use super::controller::SubmissionPhase;
use crate::transcript::{Message, MessageId, Sender, Transcript};

/// ANSI escape code for dim text (used for timestamps and the busy indicator).
const ANSI_DIM: &str = "\x1b[2m";

/// ANSI escape code for bold text (used for sender labels).
const ANSI_BOLD: &str = "\x1b[1m";

/// ANSI escape code to reset all styling.
const ANSI_RESET: &str = "\x1b[0m";

/// ANSI escape code for cyan text (used for the ai label).
const ANSI_CYAN: &str = "\x1b[36m";

/// ANSI escape code for red text (used for errors).
const ANSI_RED: &str = "\x1b[31m";

/// ANSI sequence that returns to column zero and erases the line.
const ANSI_CLEAR_LINE: &str = "\r\x1b[2K";

/// Text of the busy indicator.
pub const BUSY_TEXT: &str = "AI is thinking...";

/// A snapshot of the chat as an interface sees it.
#[derive(Debug, Clone, Copy)]
pub struct ViewState<'a> {
    transcript: &'a Transcript,
    input: &'a str,
    phase: SubmissionPhase,
    last_error: Option<&'a str>,
}

impl<'a> ViewState<'a> {
    pub(crate) fn new(
        transcript: &'a Transcript,
        input: &'a str,
        phase: SubmissionPhase,
        last_error: Option<&'a str>,
    ) -> Self {
        Self {
            transcript,
            input,
            phase,
            last_error,
        }
    }

    /// The message log.
    pub fn transcript(&self) -> &'a Transcript {
        self.transcript
    }

    /// The current input buffer.
    pub fn input(&self) -> &'a str {
        self.input
    }

    /// Where the current submission is, if any.
    pub fn phase(&self) -> SubmissionPhase {
        self.phase
    }

    /// True while a submission is in flight.
    pub fn is_busy(&self) -> bool {
        self.phase.is_busy()
    }

    /// The diagnostic of the most recent failure, if any.
    pub fn last_error(&self) -> Option<&'a str> {
        self.last_error
    }

    /// The text input accepts edits only while idle.
    pub fn input_enabled(&self) -> bool {
        !self.is_busy()
    }

    /// The submit control is enabled while idle with non-blank input.
    pub fn submit_enabled(&self) -> bool {
        !self.is_busy() && !self.input.trim().is_empty()
    }

    /// The busy indicator is shown iff a submission is in flight.
    pub fn show_busy_indicator(&self) -> bool {
        self.is_busy()
    }

    /// The error banner text; shown only when idle.
    pub fn error_banner(&self) -> Option<&'a str> {
        if self.is_busy() {
            None
        } else {
            self.last_error
        }
    }

    /// The entry the message log should be scrolled to.
    pub fn scroll_target(&self) -> Option<MessageId> {
        self.transcript.last().map(Message::id)
    }
}

/// Observer of chat state changes.
///
/// Every callback receives the state as it is after the change.
pub trait ChatView: Send {
    /// A message was added to the transcript.
    fn message_appended(&mut self, state: &ViewState<'_>, message: &Message);

    /// A fragment was applied to the streaming reply.
    ///
    /// Called once per fragment, in arrival order; `message` carries the
    /// accumulated text.
    fn message_updated(&mut self, state: &ViewState<'_>, message: &Message, fragment: &str);

    /// The streaming reply was finalized.
    fn message_finished(&mut self, state: &ViewState<'_>, message: &Message) {
        let _ = (state, message);
    }

    /// The busy flag flipped.
    fn busy_changed(&mut self, state: &ViewState<'_>) {
        let _ = state;
    }

    /// The last error was set or cleared.
    fn error_changed(&mut self, state: &ViewState<'_>) {
        let _ = state;
    }
}

impl ChatView for () {
    fn message_appended(&mut self, _: &ViewState<'_>, _: &Message) {}

    fn message_updated(&mut self, _: &ViewState<'_>, _: &Message, _: &str) {}
}

impl<V: ChatView> ChatView for Option<V> {
    fn message_appended(&mut self, state: &ViewState<'_>, message: &Message) {
        if let Some(view) = self {
            view.message_appended(state, message);
        }
    }

    fn message_updated(&mut self, state: &ViewState<'_>, message: &Message, fragment: &str) {
        if let Some(view) = self {
            view.message_updated(state, message, fragment);
        }
    }

    fn message_finished(&mut self, state: &ViewState<'_>, message: &Message) {
        if let Some(view) = self {
            view.message_finished(state, message);
        }
    }

    fn busy_changed(&mut self, state: &ViewState<'_>) {
        if let Some(view) = self {
            view.busy_changed(state);
        }
    }

    fn error_changed(&mut self, state: &ViewState<'_>) {
        if let Some(view) = self {
            view.error_changed(state);
        }
    }
}

impl<A: ChatView, B: ChatView> ChatView for (A, B) {
    fn message_appended(&mut self, state: &ViewState<'_>, message: &Message) {
        self.0.message_appended(state, message);
        self.1.message_appended(state, message);
    }

    fn message_updated(&mut self, state: &ViewState<'_>, message: &Message, fragment: &str) {
        self.0.message_updated(state, message, fragment);
        self.1.message_updated(state, message, fragment);
    }

    fn message_finished(&mut self, state: &ViewState<'_>, message: &Message) {
        self.0.message_finished(state, message);
        self.1.message_finished(state, message);
    }

    fn busy_changed(&mut self, state: &ViewState<'_>) {
        self.0.busy_changed(state);
        self.1.busy_changed(state);
    }

    fn error_changed(&mut self, state: &ViewState<'_>) {
        self.0.error_changed(state);
        self.1.error_changed(state);
    }
}

/// Terminal renderer with optional ANSI styling.
///
/// User messages are not echoed; the prompt line already shows them.  Reply
/// fragments are printed as they arrive.
pub struct TerminalView {
    stdout: Stdout,
    use_color: bool,
    indicator_shown: bool,
    reply_started: bool,
}

impl TerminalView {
    /// Creates a new TerminalView with ANSI colors enabled.
    pub fn new() -> Self {
        Self::with_color(true)
    }

    /// Creates a new TerminalView with specified color setting.
    pub fn with_color(use_color: bool) -> Self {
        Self {
            stdout: io::stdout(),
            use_color,
            indicator_shown: false,
            reply_started: false,
        }
    }

    /// Flushes stdout to ensure immediate display of streamed content.
    fn flush(&mut self) {
        let _ = self.stdout.flush();
    }

    fn clear_indicator(&mut self) {
        if self.indicator_shown {
            if self.use_color {
                print!("{ANSI_CLEAR_LINE}");
            } else {
                println!();
            }
            self.indicator_shown = false;
        }
    }

    fn print_label(&self, message: &Message) {
        let label = match message.sender() {
            Sender::User => "You",
            Sender::Ai => "AI",
            Sender::Error => "Error",
        };
        if self.use_color {
            let color = match message.sender() {
                Sender::Error => ANSI_RED,
                Sender::Ai => ANSI_CYAN,
                Sender::User => "",
            };
            println!(
                "{ANSI_BOLD}{color}{label}{ANSI_RESET} {ANSI_DIM}[{}]{ANSI_RESET}",
                message.timestamp()
            );
        } else {
            println!("{label} [{}]", message.timestamp());
        }
    }

    fn print_body(&self, message: &Message) {
        if self.use_color && message.sender() == Sender::Error {
            println!("{ANSI_RED}{}{ANSI_RESET}", message.text());
        } else {
            println!("{}", message.text());
        }
    }

    /// Print one complete message.
    pub fn print_message(&mut self, message: &Message) {
        self.print_label(message);
        self.print_body(message);
        self.flush();
    }

    /// Print every message in the transcript.
    pub fn print_transcript(&mut self, state: &ViewState<'_>) {
        for message in state.transcript().messages() {
            self.print_message(message);
            println!();
        }
        self.flush();
    }

    /// Print an informational message.
    pub fn print_info(&mut self, info: &str) {
        println!("{info}");
    }

    /// Print an error message that is not part of the transcript.
    pub fn print_error(&mut self, error: &str) {
        if self.use_color {
            eprintln!("{ANSI_RED}Error: {error}{ANSI_RESET}");
        } else {
            eprintln!("Error: {error}");
        }
    }
}

impl Default for TerminalView {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatView for TerminalView {
    fn message_appended(&mut self, _: &ViewState<'_>, message: &Message) {
        match message.sender() {
            Sender::User => {}
            // The streaming placeholder is announced by its first fragment.
            Sender::Ai if message.text().is_empty() => self.reply_started = false,
            Sender::Ai | Sender::Error => {
                self.clear_indicator();
                self.print_message(message);
            }
        }
    }

    fn message_updated(&mut self, _: &ViewState<'_>, message: &Message, fragment: &str) {
        if !self.reply_started {
            self.clear_indicator();
            self.print_label(message);
            self.reply_started = true;
        }
        print!("{fragment}");
        self.flush();
    }

    fn message_finished(&mut self, _: &ViewState<'_>, _: &Message) {
        if self.reply_started {
            println!();
            self.reply_started = false;
        }
        self.flush();
    }

    fn busy_changed(&mut self, state: &ViewState<'_>) {
        if state.show_busy_indicator() {
            if self.use_color {
                print!("{ANSI_DIM}{BUSY_TEXT}{ANSI_RESET}");
            } else {
                print!("{BUSY_TEXT}");
            }
            self.indicator_shown = true;
        } else {
            self.clear_indicator();
            if self.reply_started {
                println!();
                self.reply_started = false;
            }
        }
        self.flush();
    }

    fn error_changed(&mut self, state: &ViewState<'_>) {
        if let Some(banner) = state.error_banner() {
            self.clear_indicator();
            let banner = banner.lines().next().unwrap_or_default();
            if self.use_color {
                println!("{ANSI_BOLD}{ANSI_RED}! {banner}{ANSI_RESET}");
            } else {
                println!("! {banner}");
            }
            self.flush();
        }
    }
}
