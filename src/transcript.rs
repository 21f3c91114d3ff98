//! The append-only message log shown to the user.
//!
//! A [`Transcript`] only ever grows.  Finalized messages are reachable only
//! through shared references; the single in-flight reply is tracked by the
//! transcript itself and is the only entry whose text can change.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;
use time::OffsetDateTime;
use time::macros::format_description;

use crate::{Error, Result};

/// Stable identifier of a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct MessageId(u64);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "msg-{}", self.0)
    }
}

/// Who produced a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    /// Text the user typed.
    User,
    /// Text the model produced.
    Ai,
    /// A diagnostic produced by the application.
    Error,
}

impl Sender {
    /// Lower-case name, as used for CSS classes and labels.
    pub fn as_str(self) -> &'static str {
        match self {
            Sender::User => "user",
            Sender::Ai => "ai",
            Sender::Error => "error",
        }
    }

    /// Whether the message text is markdown to be rendered.
    pub fn renders_markdown(self) -> bool {
        matches!(self, Sender::Ai | Sender::Error)
    }
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One transcript entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    id: MessageId,
    text: String,
    sender: Sender,
    timestamp: String,
}

impl Message {
    /// The message identifier.
    pub fn id(&self) -> MessageId {
        self.id
    }

    /// The message text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Who produced the message.
    pub fn sender(&self) -> Sender {
        self.sender
    }

    /// Display time of creation, or of completion for finished replies.
    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }
}

/// The current local wall-clock time as `HH:MM:SS`.
///
/// Falls back to UTC when the local offset cannot be determined.
pub fn display_time() -> String {
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    now.format(format_description!("[hour]:[minute]:[second]"))
        .unwrap_or_default()
}

/// Ordered, append-only log of messages.
#[derive(Debug, Default, Serialize)]
pub struct Transcript {
    messages: Vec<Message>,
    #[serde(skip)]
    index: HashMap<MessageId, usize>,
    #[serde(skip)]
    next_id: u64,
    #[serde(skip)]
    streaming: Option<MessageId>,
}

impl Transcript {
    /// Creates an empty transcript.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a finalized message and returns its identifier.
    pub fn push(&mut self, sender: Sender, text: impl Into<String>) -> MessageId {
        let id = MessageId(self.next_id);
        self.next_id += 1;
        self.index.insert(id, self.messages.len());
        self.messages.push(Message {
            id,
            text: text.into(),
            sender,
            timestamp: display_time(),
        });
        id
    }

    /// Appends an empty ai message that stays mutable until
    /// [`Transcript::finish_reply`].
    ///
    /// # Errors
    ///
    /// Fails if a reply is already in flight.
    pub fn begin_reply(&mut self) -> Result<MessageId> {
        if let Some(id) = self.streaming {
            return Err(Error::validation(
                format!("reply {id} is still streaming"),
                None,
            ));
        }
        let id = self.push(Sender::Ai, String::new());
        self.streaming = Some(id);
        Ok(id)
    }

    /// Overwrites the text of the in-flight reply.
    ///
    /// # Errors
    ///
    /// Fails if `id` is not the in-flight reply.
    pub fn set_reply_text(&mut self, id: MessageId, text: &str) -> Result<&Message> {
        let message = self.streaming_mut(id)?;
        message.text.clear();
        message.text.push_str(text);
        Ok(&*message)
    }

    /// Finalizes the in-flight reply, optionally refreshing its timestamp.
    ///
    /// # Errors
    ///
    /// Fails if `id` is not the in-flight reply.
    pub fn finish_reply(&mut self, id: MessageId, refresh_timestamp: bool) -> Result<&Message> {
        self.streaming_mut(id)?;
        self.streaming = None;
        let position = self.index[&id];
        let message = &mut self.messages[position];
        if refresh_timestamp {
            message.timestamp = display_time();
        }
        Ok(&*message)
    }

    fn streaming_mut(&mut self, id: MessageId) -> Result<&mut Message> {
        if self.streaming != Some(id) {
            return Err(Error::validation(
                format!("message {id} is not the streaming reply"),
                None,
            ));
        }
        let position = self.index[&id];
        Ok(&mut self.messages[position])
    }

    /// The in-flight reply, if any.
    pub fn streaming(&self) -> Option<MessageId> {
        self.streaming
    }

    /// Looks up a message by identifier.
    pub fn get(&self, id: MessageId) -> Option<&Message> {
        self.index.get(&id).map(|&position| &self.messages[position])
    }

    /// All messages in display order.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// The newest message.
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Number of messages.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Returns true if there are no messages.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Number of messages from the given sender.
    pub fn count(&self, sender: Sender) -> usize {
        self.messages
            .iter()
            .filter(|message| message.sender == sender)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_preserves_order_and_ids() {
        let mut transcript = Transcript::new();
        let a = transcript.push(Sender::User, "one");
        let b = transcript.push(Sender::Ai, "two");
        assert_ne!(a, b);
        let texts: Vec<&str> = transcript.messages().iter().map(Message::text).collect();
        assert_eq!(texts, vec!["one", "two"]);
        assert_eq!(transcript.get(b).unwrap().sender(), Sender::Ai);
        assert!(!transcript.get(a).unwrap().timestamp().is_empty());
    }

    #[test]
    fn ids_display_with_prefix() {
        let mut transcript = Transcript::new();
        let id = transcript.push(Sender::User, "x");
        assert_eq!(id.to_string(), "msg-0");
    }

    #[test]
    fn only_streaming_reply_is_mutable() {
        let mut transcript = Transcript::new();
        let user = transcript.push(Sender::User, "hi");
        let reply = transcript.begin_reply().unwrap();
        assert_eq!(transcript.streaming(), Some(reply));

        assert!(transcript.set_reply_text(user, "changed").is_err());
        transcript.set_reply_text(reply, "Hel").unwrap();
        transcript.set_reply_text(reply, "Hello").unwrap();
        assert_eq!(transcript.get(reply).unwrap().text(), "Hello");

        transcript.finish_reply(reply, true).unwrap();
        assert_eq!(transcript.streaming(), None);
        assert!(transcript.set_reply_text(reply, "late").is_err());
        assert_eq!(transcript.get(user).unwrap().text(), "hi");
    }

    #[test]
    fn one_reply_in_flight_at_a_time() {
        let mut transcript = Transcript::new();
        let first = transcript.begin_reply().unwrap();
        assert!(transcript.begin_reply().is_err());
        assert_eq!(transcript.len(), 1);
        transcript.finish_reply(first, false).unwrap();
        let second = transcript.begin_reply().unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn serializes_messages_only() {
        let mut transcript = Transcript::new();
        transcript.push(Sender::Error, "boom");
        let json = serde_json::to_value(&transcript).unwrap();
        assert_eq!(json["messages"][0]["sender"], "error");
        assert_eq!(json["messages"][0]["id"], 0);
        assert!(json.get("streaming").is_none());
    }

    #[test]
    fn display_time_has_clock_shape() {
        let time = display_time();
        assert_eq!(time.len(), 8);
        assert_eq!(time.as_bytes()[2], b':');
        assert_eq!(time.as_bytes()[5], b':');
    }
}
