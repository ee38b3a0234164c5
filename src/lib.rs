//! Srishti - Structured Dialogue Orchestrator
//!
//! Turns a rolling conversation plus a small amount of derived long-term
//! memory into a bounded, schema-constrained model request, and turns the
//! model's structured reply back into typed state:
//! - Conversation and memory stores
//! - Dialogue request building and reply handling
//! - Periodic background memory extraction
//! - Session state (persona, logic balance, kill switch)

pub mod auth;
pub mod commands;
pub mod config;
pub mod dialogue;
pub mod llm;
pub mod memory;
pub mod protocol;
pub mod relay;
pub mod session;

pub use dialogue::{Orchestrator, Refusal, SendOutcome};
pub use llm::{GeminiClient, Generator};
pub use memory::{ConversationStore, MemoryItem, MemoryLevel, MemoryStore, Message, MessageRole};
pub use relay::{RelayKind, RelayLog};
pub use session::{PersonalityMode, SessionState};

use std::path::PathBuf;

/// Default number of prior messages sent with each dialogue request
pub const DEFAULT_HISTORY_WINDOW: usize = 10;

/// Default number of memory notes embedded in the system directive
pub const DEFAULT_MEMORY_WINDOW: usize = 5;

/// Extraction fires whenever the conversation length is a multiple of this
pub const DEFAULT_EXTRACTION_INTERVAL: usize = 5;

/// Ring-buffer capacity of the memory store
pub const DEFAULT_MEMORY_CAPACITY: usize = 256;

/// Configuration for Srishti
#[derive(Debug, Clone)]
pub struct SrishtiConfig {
    /// Directory holding `config.toml`
    pub home: PathBuf,

    /// Model used for dialogue replies
    pub model: String,

    /// Model used for memory extraction
    pub memory_model: String,

    /// Base URL of the generation API
    pub base_url: String,

    /// API key, if one has been selected
    pub api_key: Option<String>,

    /// Prior messages included in each request
    pub history_window: usize,

    /// Memory notes included in each request
    pub memory_window: usize,

    /// Conversation length multiple that triggers extraction
    pub extraction_interval: usize,

    /// Maximum memory notes retained
    pub memory_capacity: usize,

    /// Whether background memory extraction starts enabled
    pub auto_learning: bool,

    /// Fail instead of proceeding when authorization errors
    pub strict_auth: bool,

    /// Attempts per generation call (1 = no retry)
    pub max_attempts: u32,

    /// Per-request HTTP timeout in seconds
    pub request_timeout_secs: u64,
}

impl SrishtiConfig {
    pub fn new(home: PathBuf) -> Self {
        Self {
            home,
            model: llm::DEFAULT_DIALOGUE_MODEL.to_string(),
            memory_model: llm::DEFAULT_MEMORY_MODEL.to_string(),
            base_url: llm::DEFAULT_BASE_URL.to_string(),
            api_key: None,
            history_window: DEFAULT_HISTORY_WINDOW,
            memory_window: DEFAULT_MEMORY_WINDOW,
            extraction_interval: DEFAULT_EXTRACTION_INTERVAL,
            memory_capacity: DEFAULT_MEMORY_CAPACITY,
            auto_learning: true,
            strict_auth: false,
            max_attempts: 1,
            request_timeout_secs: 60,
        }
    }

    /// Path of the config file inside `home`
    pub fn config_file(&self) -> PathBuf {
        self.home.join("config.toml")
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_memory_model(mut self, model: impl Into<String>) -> Self {
        self.memory_model = model.into();
        self
    }

    pub fn with_api_key(mut self, key: Option<String>) -> Self {
        self.api_key = key;
        self
    }

    pub fn with_auto_learning(mut self, enabled: bool) -> Self {
        self.auto_learning = enabled;
        self
    }

    pub fn with_strict_auth(mut self, strict: bool) -> Self {
        self.strict_auth = strict;
        self
    }

    pub fn with_windows(mut self, history: usize, memory: usize) -> Self {
        self.history_window = history;
        self.memory_window = memory;
        self
    }

    pub fn with_extraction_interval(mut self, interval: usize) -> Self {
        self.extraction_interval = interval;
        self
    }

    pub fn with_memory_capacity(mut self, capacity: usize) -> Self {
        self.memory_capacity = capacity;
        self
    }
}

/// Result type for Srishti operations
pub type Result<T> = std::result::Result<T, SrishtiError>;

/// Errors that can occur in Srishti
#[derive(Debug, thiserror::Error)]
pub enum SrishtiError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authorization error: {0}")]
    Auth(String),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Reply parse error: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("TOML edit error: {0}")]
    TomlEdit(#[from] toml_edit::TomlError),
}
