//! Core of localchat: the conversation session, the transcript model, and the
//! HTTP client for the inference endpoint. Nothing in here knows about
//! terminals.

pub mod client;
pub mod error;
pub mod message;
pub mod session;

use async_trait::async_trait;

// Re-export main types for convenience
pub use client::ChatClient;
pub use error::ChatError;
pub use message::{Content, Message, Role};
pub use session::{
    Observer, Outbound, Record, RecordKind, SendState, Session, SessionEvent, IN_PROGRESS_TEXT,
};

/// The remote service that turns a prompt into a reply
#[async_trait]
pub trait InferenceEndpoint: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<Content, ChatError>;
}
