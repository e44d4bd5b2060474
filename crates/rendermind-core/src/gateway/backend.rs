//! Backend traits and request types.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::error::BackendError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// One chat message on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

/// A fully built generation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    /// The raw instruction, for backends that take it directly.
    pub instruction: String,
    /// System prompt, user instruction and optional scene context.
    pub messages: Vec<ChatMessage>,
}

/// Produces raw response text for a request.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Short provider name for logs.
    fn name(&self) -> &str;

    async fn complete(&self, request: &GenerationRequest) -> Result<String, BackendError>;
}

/// Speech-to-text for voice instructions.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio: Vec<u8>) -> Result<String, BackendError>;
}
