//! Dialogue request builder
//!
//! Assembles one bounded, schema-constrained request from the
//! conversation, the memory store and the session. Window sizes cap the
//! request: never more than `history_window` prior turns or
//! `memory_window` memory notes.

use super::prompts::PERSONA_DIRECTIVE;
use crate::llm::{GenerationRequest, Purpose, Turn};
use crate::memory::{ConversationStore, MemoryStore};
use crate::protocol;
use crate::session::PersonalityMode;

/// Builds dialogue requests with fixed window sizes
#[derive(Debug, Clone, Copy)]
pub struct RequestBuilder {
    history_window: usize,
    memory_window: usize,
}

impl Default for RequestBuilder {
    fn default() -> Self {
        Self::new(crate::DEFAULT_HISTORY_WINDOW, crate::DEFAULT_MEMORY_WINDOW)
    }
}

impl RequestBuilder {
    pub fn new(history_window: usize, memory_window: usize) -> Self {
        Self {
            history_window,
            memory_window,
        }
    }

    /// Trimmed input, or `None` if nothing is left
    pub fn normalize_input(input: &str) -> Option<&str> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed)
        }
    }

    /// Persona directive, active mode and the recent memory digest
    pub fn system_directive(&self, personality: PersonalityMode, memory: &MemoryStore) -> String {
        format!(
            "{}\nACTIVE_MODE: {}\nMEMORIES:\n{}",
            PERSONA_DIRECTIVE,
            personality,
            memory.digest(self.memory_window)
        )
    }

    /// Recent messages as `(speaker, text)` turns followed by the new input
    pub fn history(&self, conversation: &ConversationStore, input: &str) -> Vec<Turn> {
        let mut turns: Vec<Turn> = conversation
            .recent(self.history_window)
            .iter()
            .map(|m| Turn {
                role: m.role.into(),
                text: m.text.clone(),
            })
            .collect();
        turns.push(Turn::user(input));
        turns
    }

    /// Build the dialogue request for `input`.
    ///
    /// `input` must already be normalized and `conversation` must not yet
    /// contain it.
    pub fn build(
        &self,
        conversation: &ConversationStore,
        memory: &MemoryStore,
        personality: PersonalityMode,
        input: &str,
    ) -> GenerationRequest {
        GenerationRequest {
            purpose: Purpose::Dialogue,
            system_instruction: Some(self.system_directive(personality, memory)),
            turns: self.history(conversation, input),
            response_schema: protocol::dialogue_reply_schema(),
        }
    }
}
