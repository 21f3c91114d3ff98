// Public modules
pub mod content;
pub mod error_body;
pub mod generate_content_request;
pub mod generate_content_response;
pub mod generation_config;
pub mod model;

// Re-exports
pub use content::{Content, Part, Role};
pub use error_body::{ErrorBody, ErrorDetail};
pub use generate_content_request::GenerateContentRequest;
pub use generate_content_response::{
    Candidate, FinishReason, GenerateContentResponse, PromptFeedback, UsageMetadata,
};
pub use generation_config::GenerationConfig;
pub use model::{KnownModel, Model};
