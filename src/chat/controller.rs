//! The chat session controller.
//!
//! [`ChatController`] owns the transcript, the input buffer, the busy gate and
//! the session handle.  A submission is split in two so the gate is
//! observable: [`ChatController::begin_submit`] records the user message and
//! the reply placeholder and hands out a [`PendingReply`];
//! [`ChatController::finish_submit`] streams the reply into the placeholder.
//! While a `PendingReply` is outstanding every new submission is rejected.

use std::fmt;
use std::time::Instant;

use futures::StreamExt;

use super::config::ChatConfig;
use super::view::{ChatView, ViewState};
use crate::client::Gemini;
use crate::observability::{
    REPLY_DURATION, REPLY_FRAGMENTS, SUBMISSIONS, SUBMISSIONS_FAILED, SUBMISSIONS_REJECTED,
};
use crate::session::{GeminiChat, ModelService, ReplySession};
use crate::transcript::{MessageId, Sender, Transcript};
use crate::{Error, Result};

/// First message of every successfully initialized chat.
pub const GREETING: &str = "Hello! I'm your friendly AI assistant. How can I help you today?";

/// Where the current submission is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubmissionPhase {
    /// No submission in flight.
    #[default]
    Idle,
    /// The request is being sent; no fragment has arrived.
    Sending,
    /// The reply stream is open.
    Streaming,
}

impl SubmissionPhase {
    /// True for every phase but `Idle`.
    pub fn is_busy(self) -> bool {
        self != SubmissionPhase::Idle
    }
}

/// Why a submission was ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// The input is empty after trimming.
    EmptyInput,
    /// Another submission is in flight.
    Busy,
    /// Initialization failed; there is no session to send to.
    SessionUnavailable,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::EmptyInput => f.write_str("input is empty"),
            Rejection::Busy => f.write_str("a reply is still in progress"),
            Rejection::SessionUnavailable => f.write_str("the chat session is unavailable"),
        }
    }
}

/// A submission between [`ChatController::begin_submit`] and
/// [`ChatController::finish_submit`].
#[must_use = "the controller stays busy until the reply is finished"]
#[derive(Debug)]
pub struct PendingReply {
    user: MessageId,
    reply: MessageId,
    text: String,
}

impl PendingReply {
    /// The user message that was recorded.
    pub fn user_message(&self) -> MessageId {
        self.user
    }

    /// The placeholder the reply streams into.
    pub fn reply_message(&self) -> MessageId {
        self.reply
    }

    /// The text being sent.
    pub fn text(&self) -> &str {
        &self.text
    }
}

/// How a submission ended.
#[derive(Debug)]
pub enum SubmitOutcome {
    /// Nothing happened.
    Rejected(Rejection),
    /// The reply streamed to completion.
    Completed { reply: MessageId },
    /// The reply failed; the placeholder keeps any partial text.
    Failed { reply: MessageId, error: Error },
}

impl SubmitOutcome {
    /// True if the reply streamed to completion.
    pub fn is_completed(&self) -> bool {
        matches!(self, SubmitOutcome::Completed { .. })
    }

    /// The reply message, unless the submission was rejected.
    pub fn reply(&self) -> Option<MessageId> {
        match self {
            SubmitOutcome::Rejected(_) => None,
            SubmitOutcome::Completed { reply } | SubmitOutcome::Failed { reply, .. } => {
                Some(*reply)
            }
        }
    }
}

#[derive(Debug, Default)]
struct ChatState {
    transcript: Transcript,
    input: String,
    phase: SubmissionPhase,
    last_error: Option<String>,
}

impl ChatState {
    fn view(&self) -> ViewState<'_> {
        ViewState::new(
            &self.transcript,
            &self.input,
            self.phase,
            self.last_error.as_deref(),
        )
    }

    fn append(&mut self, sender: Sender, text: String, view: &mut dyn ChatView) -> MessageId {
        let id = self.transcript.push(sender, text);
        self.announce(id, view);
        id
    }

    fn announce(&self, id: MessageId, view: &mut dyn ChatView) {
        if let Some(message) = self.transcript.get(id) {
            view.message_appended(&self.view(), message);
        }
    }
}

/// Drives one chat: initialization, submissions and reply streaming.
pub struct ChatController<S: ReplySession = GeminiChat> {
    session: Option<S>,
    state: ChatState,
}

impl ChatController<GeminiChat> {
    /// Build the Gemini client and session described by `config`.
    ///
    /// Never fails: a failure is recorded in the transcript and every later
    /// submission is rejected with [`Rejection::SessionUnavailable`].
    pub fn initialize(config: &ChatConfig) -> Self {
        let session = Gemini::from_config(config)
            .and_then(|client| client.create_session(&config.model, &config.system_instruction))
            .map(|session| session.with_generation_config(config.generation.clone()));
        Self::from_session(session)
    }
}

impl<S: ReplySession> ChatController<S> {
    /// Initialize from any [`ModelService`].
    pub fn with_service<M>(service: &M, config: &ChatConfig) -> Self
    where
        M: ModelService<Session = S>,
    {
        Self::from_session(service.create_session(&config.model, &config.system_instruction))
    }

    /// Seed the transcript from the outcome of session creation.
    pub fn from_session(session: Result<S>) -> Self {
        let mut state = ChatState::default();
        let session = match session {
            Ok(session) => {
                state.transcript.push(Sender::Ai, GREETING);
                Some(session)
            }
            Err(err) => {
                tracing::error!(error = %err, "chat initialization failed");
                let diagnostic = format!(
                    "Initialization failed: {err}. Please ensure the API_KEY is correctly configured."
                );
                state.transcript.push(Sender::Error, diagnostic.clone());
                state.last_error = Some(diagnostic);
                None
            }
        };
        Self { session, state }
    }

    /// Replace the input buffer.  Ignored while busy.
    pub fn set_input(&mut self, text: impl Into<String>) {
        if !self.is_busy() {
            self.state.input = text.into();
        }
    }

    /// The input buffer.
    pub fn input(&self) -> &str {
        &self.state.input
    }

    /// Where the current submission is.
    pub fn phase(&self) -> SubmissionPhase {
        self.state.phase
    }

    /// True while a submission is in flight.
    pub fn is_busy(&self) -> bool {
        self.state.phase.is_busy()
    }

    /// The diagnostic of the most recent failure, if any.
    pub fn last_error(&self) -> Option<&str> {
        self.state.last_error.as_deref()
    }

    /// The message log.
    pub fn transcript(&self) -> &Transcript {
        &self.state.transcript
    }

    /// True if initialization produced a session.
    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    /// The session handle, if initialization succeeded.
    pub fn session(&self) -> Option<&S> {
        self.session.as_ref()
    }

    /// A snapshot for rendering.
    pub fn view_state(&self) -> ViewState<'_> {
        self.state.view()
    }

    fn check_ready(&self, text: &str) -> std::result::Result<(), Rejection> {
        if text.trim().is_empty() {
            Err(Rejection::EmptyInput)
        } else if self.is_busy() || self.state.transcript.streaming().is_some() {
            Err(Rejection::Busy)
        } else if self.session.is_none() {
            Err(Rejection::SessionUnavailable)
        } else {
            Ok(())
        }
    }

    /// Record the input buffer as a user message and open a reply placeholder.
    ///
    /// # Errors
    ///
    /// A [`Rejection`] leaves the controller untouched.
    pub fn begin_submit(
        &mut self,
        view: &mut dyn ChatView,
    ) -> std::result::Result<PendingReply, Rejection> {
        let text = self.state.input.clone();
        self.begin(text, view)
    }

    fn begin(
        &mut self,
        text: String,
        view: &mut dyn ChatView,
    ) -> std::result::Result<PendingReply, Rejection> {
        if let Err(rejection) = self.check_ready(&text) {
            SUBMISSIONS_REJECTED.click();
            tracing::debug!(%rejection, "submission ignored");
            return Err(rejection);
        }
        SUBMISSIONS.click();

        let user = self.state.append(Sender::User, text.clone(), view);

        self.state.input.clear();
        self.state.phase = SubmissionPhase::Sending;
        view.busy_changed(&self.state.view());
        if self.state.last_error.take().is_some() {
            view.error_changed(&self.state.view());
        }

        let reply = self
            .state
            .transcript
            .begin_reply()
            .map_err(|_| Rejection::Busy)?;
        self.state.announce(reply, view);

        Ok(PendingReply { user, reply, text })
    }

    /// Stream the reply for `pending` into its placeholder.
    ///
    /// Every fragment is applied in arrival order and reported through
    /// [`ChatView::message_updated`].  On failure the placeholder keeps the
    /// partial text and an error message is appended.
    pub async fn finish_submit(
        &mut self,
        pending: PendingReply,
        view: &mut dyn ChatView,
    ) -> SubmitOutcome {
        let PendingReply { reply, text, .. } = pending;
        let start = Instant::now();

        let result = match self.session.as_mut() {
            Some(session) => stream_into(session, &text, reply, &mut self.state, view).await,
            None => Err(Error::session_unavailable("no chat session")),
        };
        REPLY_DURATION.add(start.elapsed().as_secs_f64());

        match result {
            Ok(()) => {
                if let Ok(message) = self.state.transcript.finish_reply(reply, true) {
                    tracing::debug!(id = %reply, bytes = message.text().len(), "reply completed");
                }
                self.settle(reply, view);
                SubmitOutcome::Completed { reply }
            }
            Err(error) => {
                SUBMISSIONS_FAILED.click();
                tracing::error!(%error, id = %reply, "reply failed");
                let _ = self.state.transcript.finish_reply(reply, false);
                let diagnostic = format!(
                    "Sorry, I encountered an error processing your request: {error}. Please try again. \
If the problem persists, the API key might be invalid or there could be a network issue."
                );
                self.state.transcript.push(Sender::Error, diagnostic.clone());
                self.state.last_error = Some(diagnostic);
                let error_id = self.state.transcript.last().map(|message| message.id());
                self.settle(reply, view);
                if let Some(id) = error_id {
                    self.state.announce(id, view);
                }
                view.error_changed(&self.state.view());
                SubmitOutcome::Failed { reply, error }
            }
        }
    }

    fn settle(&mut self, reply: MessageId, view: &mut dyn ChatView) {
        self.state.phase = SubmissionPhase::Idle;
        if let Some(message) = self.state.transcript.get(reply) {
            view.message_finished(&self.state.view(), message);
        }
        view.busy_changed(&self.state.view());
    }

    /// Submit the input buffer and stream the reply.
    pub async fn submit(&mut self, view: &mut dyn ChatView) -> SubmitOutcome {
        match self.begin_submit(view) {
            Ok(pending) => self.finish_submit(pending, view).await,
            Err(rejection) => SubmitOutcome::Rejected(rejection),
        }
    }

    /// Submit `text` directly.  The input buffer is cleared only if the
    /// submission is accepted.
    pub async fn submit_text(
        &mut self,
        text: impl Into<String>,
        view: &mut dyn ChatView,
    ) -> SubmitOutcome {
        match self.begin(text.into(), view) {
            Ok(pending) => self.finish_submit(pending, view).await,
            Err(rejection) => SubmitOutcome::Rejected(rejection),
        }
    }
}

async fn stream_into<S: ReplySession>(
    session: &mut S,
    text: &str,
    reply: MessageId,
    state: &mut ChatState,
    view: &mut dyn ChatView,
) -> Result<()> {
    let mut fragments = session.stream_reply(text).await?;
    state.phase = SubmissionPhase::Streaming;

    let mut accumulated = String::new();
    while let Some(fragment) = fragments.next().await {
        let fragment = fragment?;
        REPLY_FRAGMENTS.click();
        accumulated.push_str(&fragment);
        state.transcript.set_reply_text(reply, &accumulated)?;
        if let Some(message) = state.transcript.get(reply) {
            view.message_updated(&state.view(), message, &fragment);
        }
    }
    Ok(())
}
