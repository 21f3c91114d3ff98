//! Configuration types for the chat application.
//!
//! This module provides CLI argument parsing via `arrrg` and configuration
//! structures for controlling chat behavior.

use std::path::PathBuf;
use std::time::Duration;

use arrrg_derive::CommandLine;

use crate::client::API_KEY_ENV;
use crate::types::{GenerationConfig, KnownModel, Model};
use crate::{Error, Result};

/// The model used when none is configured.
pub const DEFAULT_MODEL: KnownModel = KnownModel::Gemini25FlashPreview0417;

/// The system instruction every session is scoped with by default.
pub const DEFAULT_SYSTEM_INSTRUCTION: &str = "You are a helpful and friendly AI assistant. \
Keep your responses concise and informative. Use markdown for formatting when appropriate \
(e.g., lists, code blocks, bold, italics).";

/// Command-line arguments for the gemini-chat tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct ChatArgs {
    /// Model to use for chat.
    #[arrrg(optional, "Model to use (default: gemini-2.5-flash-preview-04-17)", "MODEL")]
    pub model: Option<String>,

    /// System instruction for the conversation.
    #[arrrg(optional, "System instruction for the conversation", "PROMPT")]
    pub system: Option<String>,

    /// Environment variable holding the API key.
    #[arrrg(optional, "Environment variable holding the API key (default: API_KEY)", "VAR")]
    pub api_key_env: Option<String>,

    /// Base URL of the API.
    #[arrrg(optional, "Base URL of the API", "URL")]
    pub base_url: Option<String>,

    /// Overall request timeout.
    #[arrrg(optional, "Overall request timeout in seconds (default: none)", "SECONDS")]
    pub timeout_secs: Option<u64>,

    /// Sampling temperature.
    #[arrrg(optional, "Sampling temperature (0.0-2.0)", "TEMP")]
    pub temperature: Option<String>,

    /// Maximum output tokens per reply.
    #[arrrg(optional, "Max output tokens per reply", "TOKENS")]
    pub max_output_tokens: Option<u32>,

    /// Path of an HTML snapshot kept in sync with the chat.
    #[arrrg(optional, "Keep an HTML rendering of the chat at this path", "PATH")]
    pub html: Option<String>,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,
}

/// Configuration for a chat session.
///
/// This struct holds the resolved configuration values after processing
/// command-line arguments with appropriate defaults.
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// The model to use for generating responses.
    pub model: Model,

    /// System instruction the session is scoped with.
    pub system_instruction: String,

    /// An explicit API key; when `None` the key is read from `api_key_env`.
    pub api_key: Option<String>,

    /// Environment variable the API key is read from.
    pub api_key_env: String,

    /// Override for the API base URL.
    pub base_url: Option<String>,

    /// Overall request timeout; `None` lets a reply stream indefinitely.
    pub timeout: Option<Duration>,

    /// Sampling and length options.
    pub generation: GenerationConfig,

    /// Whether to use ANSI colors and styles in output.
    pub use_color: bool,

    /// Where to keep an HTML rendering of the chat, if anywhere.
    pub html_path: Option<PathBuf>,
}

impl ChatConfig {
    /// Creates a new ChatConfig with default values.
    ///
    /// Defaults:
    /// - Model: gemini-2.5-flash-preview-04-17
    /// - System instruction: [`DEFAULT_SYSTEM_INSTRUCTION`]
    /// - API key: read from `API_KEY`
    /// - Timeout: none
    /// - Color: enabled
    pub fn new() -> Self {
        Self {
            model: Model::Known(DEFAULT_MODEL),
            system_instruction: DEFAULT_SYSTEM_INSTRUCTION.to_string(),
            api_key: None,
            api_key_env: API_KEY_ENV.to_string(),
            base_url: None,
            timeout: None,
            generation: GenerationConfig::default(),
            use_color: true,
            html_path: None,
        }
    }

    /// Sets the model to use.
    pub fn with_model(mut self, model: Model) -> Self {
        self.model = model;
        self
    }

    /// Sets the system instruction.
    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = instruction.into();
        self
    }

    /// Sets an explicit API key.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Sets the environment variable the API key is read from.
    pub fn with_api_key_env(mut self, var: impl Into<String>) -> Self {
        self.api_key_env = var.into();
        self
    }

    /// Sets the API base URL.
    pub fn with_base_url(mut self, base_url: Option<String>) -> Self {
        self.base_url = base_url;
        self
    }

    /// Sets the overall request timeout.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the generation options.
    pub fn with_generation(mut self, generation: GenerationConfig) -> Self {
        self.generation = generation;
        self
    }

    /// Disables ANSI color output.
    pub fn without_color(mut self) -> Self {
        self.use_color = false;
        self
    }

    /// Sets the HTML snapshot path.
    pub fn with_html_path(mut self, path: Option<PathBuf>) -> Self {
        self.html_path = path;
        self
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl TryFrom<ChatArgs> for ChatConfig {
    type Error = Error;

    fn try_from(args: ChatArgs) -> Result<Self> {
        let model = match args.model {
            Some(name) => name.parse::<Model>()?,
            None => Model::Known(DEFAULT_MODEL),
        };
        let temperature = args
            .temperature
            .as_deref()
            .map(parse_temperature)
            .transpose()?;

        let defaults = ChatConfig::new();
        Ok(ChatConfig {
            model,
            system_instruction: args.system.unwrap_or(defaults.system_instruction),
            api_key_env: args.api_key_env.unwrap_or(defaults.api_key_env),
            base_url: args.base_url,
            timeout: args.timeout_secs.map(Duration::from_secs),
            generation: GenerationConfig {
                temperature,
                max_output_tokens: args.max_output_tokens,
                ..GenerationConfig::default()
            },
            use_color: !args.no_color,
            html_path: args.html.map(PathBuf::from),
            ..defaults
        })
    }
}

fn parse_temperature(value: &str) -> Result<f32> {
    let temperature = value
        .trim()
        .parse::<f32>()
        .ok()
        .filter(|t| (0.0..=2.0).contains(t))
        .ok_or_else(|| {
            Error::validation(
                "temperature must be between 0.0 and 2.0",
                Some("temperature".to_string()),
            )
        })?;
    Ok(temperature)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ChatConfig::new();
        assert_eq!(
            config.model,
            Model::Known(KnownModel::Gemini25FlashPreview0417)
        );
        assert_eq!(config.system_instruction, DEFAULT_SYSTEM_INSTRUCTION);
        assert!(config.api_key.is_none());
        assert_eq!(config.api_key_env, "API_KEY");
        assert!(config.base_url.is_none());
        assert!(config.timeout.is_none());
        assert!(config.generation.is_empty());
        assert!(config.use_color);
        assert!(config.html_path.is_none());
    }

    #[test]
    fn config_from_args_defaults() {
        let config = ChatConfig::try_from(ChatArgs::default()).unwrap();
        assert_eq!(
            config.model,
            Model::Known(KnownModel::Gemini25FlashPreview0417)
        );
        assert_eq!(config.system_instruction, DEFAULT_SYSTEM_INSTRUCTION);
        assert!(config.use_color);
        assert!(config.generation.is_empty());
    }

    #[test]
    fn config_from_args_custom() {
        let args = ChatArgs {
            model: Some("gemini-2.0-flash".to_string()),
            system: Some("You are terse.".to_string()),
            api_key_env: Some("GEMINI_KEY".to_string()),
            base_url: Some("http://localhost:8080/v1beta".to_string()),
            timeout_secs: Some(90),
            temperature: Some("0.4".to_string()),
            max_output_tokens: Some(512),
            html: Some("chat.html".to_string()),
            no_color: true,
        };
        let config = ChatConfig::try_from(args).unwrap();
        assert_eq!(config.model, Model::Known(KnownModel::Gemini20Flash));
        assert_eq!(config.system_instruction, "You are terse.");
        assert_eq!(config.api_key_env, "GEMINI_KEY");
        assert_eq!(
            config.base_url.as_deref(),
            Some("http://localhost:8080/v1beta")
        );
        assert_eq!(config.timeout, Some(Duration::from_secs(90)));
        assert_eq!(config.generation.temperature, Some(0.4));
        assert_eq!(config.generation.max_output_tokens, Some(512));
        assert_eq!(config.html_path, Some(PathBuf::from("chat.html")));
        assert!(!config.use_color);
    }

    #[test]
    fn out_of_range_temperature_is_rejected() {
        let args = ChatArgs {
            temperature: Some("3.5".to_string()),
            ..ChatArgs::default()
        };
        assert!(ChatConfig::try_from(args).unwrap_err().is_validation());
    }

    #[test]
    fn unparseable_temperature_is_rejected() {
        for value in ["warm", "", "NaN"] {
            let args = ChatArgs {
                temperature: Some(value.to_string()),
                ..ChatArgs::default()
            };
            let err = ChatConfig::try_from(args).unwrap_err();
            assert!(
                matches!(&err, Error::Validation { param: Some(p), .. } if p == "temperature"),
                "{value:?}: {err:?}"
            );
        }
    }

    #[test]
    fn config_builder_pattern() {
        let config = ChatConfig::new()
            .with_model(Model::Known(KnownModel::Gemini25Pro))
            .with_system_instruction("Test prompt")
            .with_api_key("k")
            .with_api_key_env("OTHER_KEY")
            .with_timeout(Some(Duration::from_secs(5)))
            .without_color();
        assert_eq!(config.model, Model::Known(KnownModel::Gemini25Pro));
        assert_eq!(config.system_instruction, "Test prompt");
        assert_eq!(config.api_key.as_deref(), Some("k"));
        assert_eq!(config.api_key_env, "OTHER_KEY");
        assert_eq!(config.timeout, Some(Duration::from_secs(5)));
        assert!(!config.use_color);
    }

    #[test]
    fn missing_key_still_builds_a_client() {
        let config = ChatConfig::new().with_api_key_env("GEMINI_CHAT_TEST_SURELY_UNSET_KEY");
        let client = crate::client::Gemini::from_config(&config).unwrap();
        assert!(client.check_credential().unwrap_err().is_authentication());
    }
}
