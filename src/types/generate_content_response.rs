use serde::{Deserialize, Serialize};

use crate::Error;
use crate::types::Content;

/// Why the model stopped generating a candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FinishReason {
    /// Natural stop point or a stop sequence.
    Stop,
    /// The token limit was reached.
    MaxTokens,
    /// The candidate was flagged for safety.
    Safety,
    /// The candidate was flagged for recitation.
    Recitation,
    /// Any other reason.
    Other,
    /// A reason this crate does not know about.
    #[serde(other)]
    Unspecified,
}

/// A candidate response generated by the model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    /// Generated content; absent on some terminal chunks.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<Content>,

    /// Set on the final chunk of the candidate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<FinishReason>,

    /// Index of the candidate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<u32>,
}

/// Feedback about the prompt, present when the prompt was blocked.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    /// Why the prompt was blocked, if it was.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_reason: Option<String>,
}

/// Token accounting for a request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    /// Tokens in the prompt, history and system instruction included.
    #[serde(default)]
    pub prompt_token_count: u32,

    /// Tokens across generated candidates.
    #[serde(default)]
    pub candidates_token_count: u32,

    /// Total tokens for the request.
    #[serde(default)]
    pub total_token_count: u32,
}

/// One response, or one chunk of a streamed response, from the API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    /// Candidate responses.
    #[serde(default)]
    pub candidates: Vec<Candidate>,

    /// Prompt feedback.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_feedback: Option<PromptFeedback>,

    /// Token usage, typically only meaningful on the last chunk.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage_metadata: Option<UsageMetadata>,

    /// The model version that produced the response.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_version: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated answer text of the first candidate; empty when the chunk
    /// carries no text.
    pub fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|candidate| candidate.content.as_ref())
            .map(Content::text)
            .unwrap_or_default()
    }

    /// The finish reason of the first candidate, if this chunk carries one.
    pub fn finish_reason(&self) -> Option<&FinishReason> {
        self.candidates
            .first()
            .and_then(|candidate| candidate.finish_reason.as_ref())
    }

    /// Fails with [`Error::Blocked`] if the provider refused the prompt.
    pub fn check_blocked(&self) -> Result<(), Error> {
        match self
            .prompt_feedback
            .as_ref()
            .and_then(|feedback| feedback.block_reason.as_deref())
        {
            Some(reason) => Err(Error::blocked(
                "the prompt was blocked by the provider",
                reason,
            )),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_stream_chunk() {
        let chunk: GenerateContentResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"Hel"}],"role":"model"},"index":0}],
                "usageMetadata":{"promptTokenCount":4,"totalTokenCount":4},
                "modelVersion":"gemini-2.5-flash-preview-04-17"}"#,
        )
        .unwrap();
        assert_eq!(chunk.text(), "Hel");
        assert!(chunk.finish_reason().is_none());
        assert_eq!(chunk.usage_metadata.unwrap().prompt_token_count, 4);
        assert!(chunk.check_blocked().is_ok());
    }

    #[test]
    fn missing_text_is_empty() {
        let chunk: GenerateContentResponse =
            serde_json::from_str(r#"{"candidates":[{"finishReason":"STOP","index":0}]}"#).unwrap();
        assert_eq!(chunk.text(), "");
        assert_eq!(chunk.finish_reason(), Some(&FinishReason::Stop));
    }

    #[test]
    fn unknown_finish_reason_is_tolerated() {
        let chunk: GenerateContentResponse =
            serde_json::from_str(r#"{"candidates":[{"finishReason":"SPII"}]}"#).unwrap();
        assert_eq!(chunk.finish_reason(), Some(&FinishReason::Unspecified));
    }

    #[test]
    fn blocked_prompt_is_an_error() {
        let chunk: GenerateContentResponse =
            serde_json::from_str(r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#).unwrap();
        let err = chunk.check_blocked().unwrap_err();
        assert!(err.is_blocked());
        assert!(err.to_string().contains("SAFETY"));
    }
}
