use serde::{Deserialize, Serialize};

/// The producer of a piece of conversation content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Content written by the user.
    User,
    /// Content produced by the model.
    Model,
}

/// A single part of a multi-part content message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    /// Inline text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    /// Whether this part is model reasoning rather than answer text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thought: Option<bool>,
}

impl Part {
    /// Create a text part.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            thought: None,
        }
    }

    /// Returns true if the part carries model reasoning.
    pub fn is_thought(&self) -> bool {
        self.thought.unwrap_or(false)
    }
}

/// The base structured datatype containing multi-part content of a message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Content {
    /// The producer of the content; absent for system instructions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,

    /// Ordered parts that constitute a single message.
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Content {
    /// Create a single-part text content with the given role.
    pub fn new_with_text(text: impl Into<String>, role: Role) -> Self {
        Self {
            role: Some(role),
            parts: vec![Part::text(text)],
        }
    }

    /// Create role-less content, as used for system instructions.
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: None,
            parts: vec![Part::text(text)],
        }
    }

    /// Concatenates the non-thought text parts.
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter(|part| !part.is_thought())
            .filter_map(|part| part.text.as_deref())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_user_text() {
        let content = Content::new_with_text("Hi", Role::User);
        let json = serde_json::to_value(&content).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"role": "user", "parts": [{"text": "Hi"}]})
        );
    }

    #[test]
    fn system_content_has_no_role() {
        let json = serde_json::to_value(Content::system("Be brief")).unwrap();
        assert_eq!(json, serde_json::json!({"parts": [{"text": "Be brief"}]}));
    }

    #[test]
    fn text_skips_thoughts() {
        let content: Content = serde_json::from_value(serde_json::json!({
            "role": "model",
            "parts": [
                {"text": "pondering", "thought": true},
                {"text": "Hello"},
                {"text": ", world"}
            ]
        }))
        .unwrap();
        assert_eq!(content.text(), "Hello, world");
    }
}
