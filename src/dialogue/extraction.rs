//! Background memory extraction
//!
//! Every `interval` appends the most recent messages are re-summarized into
//! one categorized memory note. Extraction only ever writes to the memory
//! store and the relay log; failures are logged and dropped.

use super::prompts::MEMORY_EXTRACTION_PROMPT;
use super::responder::Responder;
use crate::llm::{GenerationRequest, Generator, Purpose, Turn};
use crate::memory::{MemoryItem, MemoryStore};
use crate::protocol;
use crate::relay::{RelayKind, RelayLog};
use crate::Result;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Length of the content preview in the LEARNING relay entry
const PREVIEW_CHARS: usize = 30;

/// Whether an append that brought the conversation to `len` should trigger extraction
pub fn should_extract(len: usize, interval: usize, auto_learning: bool) -> bool {
    auto_learning && interval > 0 && len > 0 && len % interval == 0
}

/// Issues extraction requests and records their results
#[derive(Clone)]
pub struct MemoryExtractor {
    generator: Arc<dyn Generator>,
    responder: Responder,
    memory: Arc<RwLock<MemoryStore>>,
    relay: Arc<RwLock<RelayLog>>,
}

impl MemoryExtractor {
    pub fn new(
        generator: Arc<dyn Generator>,
        memory: Arc<RwLock<MemoryStore>>,
        relay: Arc<RwLock<RelayLog>>,
    ) -> Self {
        Self {
            generator,
            responder: Responder::new(),
            memory,
            relay,
        }
    }

    /// The request sent for `recent_text` (newline-joined message texts)
    pub fn request_for(recent_text: &str) -> GenerationRequest {
        GenerationRequest {
            purpose: Purpose::MemoryExtraction,
            system_instruction: None,
            turns: vec![Turn::user(format!("{MEMORY_EXTRACTION_PROMPT}\n{recent_text}"))],
            response_schema: protocol::memory_note_schema(),
        }
    }

    /// Extract one note and store it
    pub async fn extract(&self, recent_text: &str) -> Result<MemoryItem> {
        let request = Self::request_for(recent_text);
        let raw = self.generator.generate(&request).await?;
        let note = self.responder.parse_memory_note(&raw)?;

        let item = MemoryItem::new(note.content, note.level, note.sentiment, note.impact);

        if let Some(evicted) = self.memory.write().await.push(item.clone()) {
            debug!("Memory store full, evicted {}", evicted.id);
        }
        self.relay
            .write()
            .await
            .push(RelayKind::Learning, learning_entry(&item));

        info!("Memory updated: {}", item.digest_line());
        Ok(item)
    }

    /// Run one extraction, logging instead of returning failures
    pub async fn run(self, recent_text: String) {
        if let Err(e) = self.extract(&recent_text).await {
            warn!("Memory extraction failed: {}", e);
        }
    }
}

/// `Memory Updated: <LEVEL> - <first 30 chars>...`
fn learning_entry(item: &MemoryItem) -> String {
    let preview: String = item.content.chars().take(PREVIEW_CHARS).collect();
    format!("Memory Updated: {} - {}...", item.level, preview)
}
