//! Structured reply parsing
//!
//! Models are asked for JSON but do not always send bare JSON. Parsing
//! tries, in order: the whole text, a fenced ```json block, then the first
//! balanced `{...}` object in the text.

use crate::memory::{MemoryLevel, ReasoningTrace, SimulationPath};
use crate::session::PersonalityMode;
use crate::{Result, SrishtiError};
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::OnceLock;

/// A validated dialogue reply
#[derive(Debug, Clone, PartialEq)]
pub struct DialogueReply {
    pub text: String,
    pub personality: PersonalityMode,
    /// Unclamped; the session clamps when applying
    pub logic_balance: f64,
    pub reasoning: Option<ReasoningTrace>,
    pub simulations: Vec<SimulationPath>,
}

/// A validated memory note
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryNote {
    pub content: String,
    pub level: MemoryLevel,
    pub sentiment: Option<f64>,
    pub impact: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDialogueReply {
    text: String,
    personality: String,
    logic_balance: f64,
    #[serde(default)]
    reasoning: Option<ReasoningTrace>,
    #[serde(default)]
    simulations: Option<Vec<SimulationPath>>,
}

#[derive(Debug, Deserialize)]
struct RawMemoryNote {
    content: String,
    level: String,
    #[serde(default)]
    sentiment: Option<f64>,
    #[serde(default)]
    impact: Option<f64>,
}

/// Parses model replies into typed values
#[derive(Debug, Default, Clone, Copy)]
pub struct Responder;

impl Responder {
    pub fn new() -> Self {
        Self
    }

    /// Parse a dialogue reply. Missing required fields or an unknown persona fail.
    pub fn parse_dialogue_reply(&self, text: &str) -> Result<DialogueReply> {
        let raw: RawDialogueReply = Self::parse_json(text)?;
        let personality = raw
            .personality
            .parse::<PersonalityMode>()
            .map_err(SrishtiError::Parse)?;

        Ok(DialogueReply {
            text: raw.text,
            personality,
            logic_balance: raw.logic_balance,
            reasoning: raw.reasoning,
            simulations: raw
                .simulations
                .unwrap_or_default()
                .into_iter()
                .map(SimulationPath::normalized)
                .collect(),
        })
    }

    /// Parse a memory note. Blank content or an unknown level fail.
    pub fn parse_memory_note(&self, text: &str) -> Result<MemoryNote> {
        let raw: RawMemoryNote = Self::parse_json(text)?;
        let content = raw.content.trim();
        if content.is_empty() {
            return Err(SrishtiError::Parse("memory note has empty content".to_string()));
        }
        let level = raw
            .level
            .parse::<MemoryLevel>()
            .map_err(SrishtiError::Parse)?;

        Ok(MemoryNote {
            content: content.to_string(),
            level,
            sentiment: raw.sentiment,
            impact: raw.impact,
        })
    }

    fn parse_json<T: DeserializeOwned>(text: &str) -> Result<T> {
        let trimmed = text.trim();

        let first_err = match serde_json::from_str::<T>(trimmed) {
            Ok(v) => return Ok(v),
            Err(e) => e,
        };

        if let Some(block) = Self::fenced_block(trimmed) {
            if let Ok(v) = serde_json::from_str::<T>(block) {
                return Ok(v);
            }
        }

        if let Some(object) = Self::extract_json_object(trimmed) {
            if let Ok(v) = serde_json::from_str::<T>(object) {
                return Ok(v);
            }
        }

        Err(SrishtiError::Parse(first_err.to_string()))
    }

    /// Contents of the first ```json (or bare ```) fence
    fn fenced_block(text: &str) -> Option<&str> {
        static FENCE: OnceLock<Option<Regex>> = OnceLock::new();
        let re = FENCE
            .get_or_init(|| Regex::new(r"(?s)```(?:json|JSON)?\s*\n?(.*?)```").ok())
            .as_ref()?;
        re.captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim())
    }

    /// First balanced `{...}` in `text`, ignoring braces inside strings
    fn extract_json_object(text: &str) -> Option<&str> {
        let start = text.find('{')?;
        let mut depth = 0i32;
        let mut in_string = false;
        let mut escape_next = false;

        for (i, ch) in text[start..].char_indices() {
            if escape_next {
                escape_next = false;
                continue;
            }
            match ch {
                '\\' if in_string => escape_next = true,
                '"' => in_string = !in_string,
                '{' if !in_string => depth += 1,
                '}' if !in_string => {
                    depth -= 1;
                    if depth == 0 {
                        return text.get(start..start + i + 1);
                    }
                }
                _ => {}
            }
        }
        None
    }
}
