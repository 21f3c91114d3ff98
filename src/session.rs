//! The remote-service seams the chat controller talks through.
//!
//! [`ModelService`] creates sessions; a [`ReplySession`] turns one user
//! message into a lazy, finite stream of text fragments.  [`GeminiChat`] is
//! the implementation backed by the Gemini API.

use std::pin::Pin;

use futures::stream::{self, Stream, StreamExt};

use crate::client::{Gemini, ResponseStream};
use crate::observability::{SESSION_ERRORS, SESSIONS_CREATED};
use crate::types::{Content, GenerateContentRequest, GenerationConfig, Model, Role};
use crate::Result;

/// A boxed stream of reply fragments.
///
/// The stream ends with `None` on completion.  An `Err` item is terminal.
pub type FragmentStream<'a> = Pin<Box<dyn Stream<Item = Result<String>> + Send + 'a>>;

/// Something that can open chat sessions with a remote model.
pub trait ModelService {
    /// The session handle this service produces.
    type Session: ReplySession;

    /// Open a conversation scoped to `model` and `system_instruction`.
    fn create_session(&self, model: &Model, system_instruction: &str) -> Result<Self::Session>;
}

/// An established conversation with a remote model.
#[async_trait::async_trait]
pub trait ReplySession: Send {
    /// Send `text` as the next user turn and stream the reply.
    ///
    /// # Errors
    ///
    /// Returns an error if the request cannot be started.  Failures after the
    /// stream is open are reported as an `Err` item on the stream.
    async fn stream_reply<'a>(&'a mut self, text: &str) -> Result<FragmentStream<'a>>;
}

/// A multi-turn Gemini conversation.
///
/// Each reply request carries the whole history.  A turn is added to the
/// history only once its reply has streamed to completion.
#[derive(Debug)]
pub struct GeminiChat {
    client: Gemini,
    model: Model,
    system_instruction: String,
    generation_config: GenerationConfig,
    history: Vec<Content>,
}

impl GeminiChat {
    /// Creates a session without validating the client's credential.
    pub fn new(client: Gemini, model: Model, system_instruction: impl Into<String>) -> Self {
        Self {
            client,
            model,
            system_instruction: system_instruction.into(),
            generation_config: GenerationConfig::default(),
            history: Vec::new(),
        }
    }

    /// Sets the generation options sent with every request.
    pub fn with_generation_config(mut self, config: GenerationConfig) -> Self {
        self.generation_config = config;
        self
    }

    /// The model this session talks to.
    pub fn model(&self) -> &Model {
        &self.model
    }

    /// Completed turns, alternating user and model.
    pub fn history(&self) -> &[Content] {
        &self.history
    }
}

#[async_trait::async_trait]
impl ReplySession for GeminiChat {
    async fn stream_reply<'a>(&'a mut self, text: &str) -> Result<FragmentStream<'a>> {
        let user = Content::new_with_text(text, Role::User);
        let mut contents = self.history.clone();
        contents.push(user.clone());
        let request = GenerateContentRequest::new(contents)
            .with_system_instruction(self.system_instruction.clone())
            .with_generation_config(self.generation_config.clone());

        let chunks = self.client.stream(&self.model, &request).await?;
        Ok(Box::pin(record_turn(chunks, &mut self.history, user)))
    }
}

impl ModelService for Gemini {
    type Session = GeminiChat;

    fn create_session(&self, model: &Model, system_instruction: &str) -> Result<GeminiChat> {
        if let Err(err) = self.check_credential() {
            SESSION_ERRORS.click();
            return Err(err);
        }
        SESSIONS_CREATED.click();
        tracing::info!(model = model.as_str(), "chat session created");
        Ok(GeminiChat::new(
            self.clone(),
            model.clone(),
            system_instruction,
        ))
    }
}

struct TurnState<'a> {
    chunks: ResponseStream,
    history: &'a mut Vec<Content>,
    user: Option<Content>,
    reply: String,
    done: bool,
}

/// Map response chunks to text fragments, appending the turn to `history`
/// when the stream completes without error.  Chunks without text are skipped.
fn record_turn<'a>(
    chunks: ResponseStream,
    history: &'a mut Vec<Content>,
    user: Content,
) -> impl Stream<Item = Result<String>> + Send + 'a {
    let state = TurnState {
        chunks,
        history,
        user: Some(user),
        reply: String::new(),
        done: false,
    };
    stream::unfold(state, |mut state| async move {
        if state.done {
            return None;
        }
        loop {
            match state.chunks.next().await {
                Some(Ok(chunk)) => {
                    if let Err(err) = chunk.check_blocked() {
                        state.done = true;
                        return Some((Err(err), state));
                    }
                    let text = chunk.text();
                    if text.is_empty() {
                        continue;
                    }
                    state.reply.push_str(&text);
                    return Some((Ok(text), state));
                }
                Some(Err(err)) => {
                    state.done = true;
                    return Some((Err(err), state));
                }
                None => {
                    if let Some(user) = state.user.take() {
                        let reply = std::mem::take(&mut state.reply);
                        state.history.push(user);
                        state.history.push(Content::new_with_text(reply, Role::Model));
                    }
                    return None;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::PLACEHOLDER_API_KEY;
    use crate::types::{GenerateContentResponse, KnownModel};
    use crate::Error;

    fn chunk(json: serde_json::Value) -> Result<GenerateContentResponse> {
        Ok(serde_json::from_value(json).unwrap())
    }

    fn text_chunk(text: &str) -> Result<GenerateContentResponse> {
        chunk(serde_json::json!({
            "candidates": [{"content": {"role": "model", "parts": [{"text": text}]}}]
        }))
    }

    fn chunks(items: Vec<Result<GenerateContentResponse>>) -> ResponseStream {
        Box::pin(stream::iter(items))
    }

    #[tokio::test]
    async fn completed_turn_is_recorded() {
        let mut history = Vec::new();
        let fragments: Vec<String> = record_turn(
            chunks(vec![
                text_chunk("Hel"),
                chunk(serde_json::json!({"candidates": [{"finishReason": "STOP"}]})),
                text_chunk("lo"),
            ]),
            &mut history,
            Content::new_with_text("hi", Role::User),
        )
        .map(|fragment| fragment.unwrap())
        .collect()
        .await;

        assert_eq!(fragments, vec!["Hel".to_string(), "lo".to_string()]);
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, Some(Role::User));
        assert_eq!(history[1].role, Some(Role::Model));
        assert_eq!(history[1].text(), "Hello");
    }

    #[tokio::test]
    async fn failed_turn_is_not_recorded() {
        let mut history = Vec::new();
        let items: Vec<Result<String>> = record_turn(
            chunks(vec![
                text_chunk("Par"),
                Err(Error::streaming("connection reset", None)),
                text_chunk("never"),
            ]),
            &mut history,
            Content::new_with_text("hi", Role::User),
        )
        .collect()
        .await;

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap(), "Par");
        assert!(items[1].is_err());
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn blocked_prompt_fails_the_turn() {
        let mut history = Vec::new();
        let items: Vec<Result<String>> = record_turn(
            chunks(vec![chunk(
                serde_json::json!({"promptFeedback": {"blockReason": "SAFETY"}}),
            )]),
            &mut history,
            Content::new_with_text("hi", Role::User),
        )
        .collect()
        .await;

        assert_eq!(items.len(), 1);
        assert!(items[0].as_ref().unwrap_err().is_blocked());
        assert!(history.is_empty());
    }

    #[test]
    fn placeholder_key_cannot_create_session() {
        let client = Gemini::new(Some(PLACEHOLDER_API_KEY.to_string())).unwrap();
        let err = client
            .create_session(&KnownModel::Gemini25FlashPreview0417.into(), "Be brief")
            .unwrap_err();
        assert!(err.is_authentication());
    }

    #[test]
    fn valid_key_creates_empty_session() {
        let client = Gemini::new(Some("test-key".to_string())).unwrap();
        let session = client
            .create_session(&KnownModel::Gemini20Flash.into(), "Be brief")
            .unwrap();
        assert_eq!(session.model(), &Model::Known(KnownModel::Gemini20Flash));
        assert!(session.history().is_empty());
    }
}
