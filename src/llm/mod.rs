//! Generation client
//!
//! `Generator` is the seam between the orchestrator and the model
//! provider. The orchestrator only ever hands over a provider-agnostic
//! `GenerationRequest` and receives the raw JSON text of the reply.

mod gemini;

pub use gemini::GeminiClient;

use crate::memory::MessageRole;
use crate::Result;
use futures::future::BoxFuture;
use serde_json::Value;
use std::fmt;

/// Default model for dialogue replies
pub const DEFAULT_DIALOGUE_MODEL: &str = "gemini-3-pro-preview";

/// Default model for memory extraction
pub const DEFAULT_MEMORY_MODEL: &str = "gemini-3-flash-preview";

/// Default API root
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Which flow a request belongs to; selects the model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Purpose {
    Dialogue,
    MemoryExtraction,
}

/// Speaker of a turn on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnRole {
    User,
    Model,
}

impl TurnRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Model => "model",
        }
    }
}

impl From<MessageRole> for TurnRole {
    fn from(role: MessageRole) -> Self {
        match role {
            MessageRole::Human => TurnRole::User,
            MessageRole::Assistant | MessageRole::System => TurnRole::Model,
        }
    }
}

impl fmt::Display for TurnRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One `(speaker, text)` pair of the request history
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub role: TurnRole,
    pub text: String,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Model,
            text: text.into(),
        }
    }
}

/// A structured generation request
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub purpose: Purpose,
    pub system_instruction: Option<String>,
    pub turns: Vec<Turn>,
    /// Schema the reply JSON must follow
    pub response_schema: Value,
}

/// A model provider able to answer structured requests
pub trait Generator: Send + Sync {
    /// Send `request`; resolves to the raw JSON text of the reply
    fn generate<'a>(&'a self, request: &'a GenerationRequest) -> BoxFuture<'a, Result<String>>;
}
