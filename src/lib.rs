// Public modules
pub mod chat;
pub mod client;
pub mod error;
pub mod markdown;
pub mod session;
pub mod transcript;
pub mod types;

mod observability;
mod sse;

// Re-exports
pub use chat::{ChatConfig, ChatController, ChatView, SubmitOutcome, ViewState};
pub use client::Gemini;
pub use error::{Error, Result};
pub use observability::register_biometrics;
pub use session::{FragmentStream, GeminiChat, ModelService, ReplySession};
pub use transcript::{Message, MessageId, Sender, Transcript};
pub use types::*;
