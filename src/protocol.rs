//! Wire definitions for the `generateContent` API
//!
//! Request/response bodies plus the response schemas that constrain the
//! model's JSON output for dialogue replies and memory notes.

use crate::memory::MemoryLevel;
use crate::session::PersonalityMode;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// JSON-constrained output
pub const JSON_MIME_TYPE: &str = "application/json";

/// `generateContent` request body
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,
    pub generation_config: GenerationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Content {
    pub fn text(role: Option<&str>, text: impl Into<String>) -> Self {
        Self {
            role: role.map(str::to_string),
            parts: vec![Part {
                text: Some(text.into()),
            }],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_mime_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_schema: Option<Value>,
}

/// `generateContent` response body (only the fields we read)
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default)]
    pub prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    #[serde(default)]
    pub block_reason: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate
    pub fn first_text(&self) -> Option<String> {
        let text: String = self
            .candidates
            .first()?
            .content
            .as_ref()?
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }

    /// Why no text came back, for error messages
    pub fn empty_reason(&self) -> String {
        if let Some(reason) = self
            .prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.as_deref())
        {
            return format!("prompt blocked: {reason}");
        }
        match self.candidates.first().and_then(|c| c.finish_reason.as_deref()) {
            Some(reason) => format!("empty candidate (finish reason {reason})"),
            None => "no candidates returned".to_string(),
        }
    }
}

/// Schema for a dialogue reply.
///
/// ```json
/// { "text": "...", "personality": "MENTOR", "logicBalance": 62,
///   "reasoning": { "logicalPath": "...", "emotionalContext": "...", "mediatorConclusion": "..." },
///   "simulations": [ { "label": "...", "description": "...", "riskScore": 30,
///                      "rewardScore": 70, "stressImpact": 40, "recommendation": "..." } ] }
/// ```
pub fn dialogue_reply_schema() -> Value {
    let personalities: Vec<&str> = PersonalityMode::all().iter().map(|p| p.as_str()).collect();
    json!({
        "type": "OBJECT",
        "properties": {
            "text": { "type": "STRING" },
            "personality": { "type": "STRING", "enum": personalities },
            "logicBalance": { "type": "NUMBER" },
            "reasoning": {
                "type": "OBJECT",
                "properties": {
                    "logicalPath": { "type": "STRING" },
                    "emotionalContext": { "type": "STRING" },
                    "mediatorConclusion": { "type": "STRING" }
                }
            },
            "simulations": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "label": { "type": "STRING" },
                        "description": { "type": "STRING" },
                        "riskScore": { "type": "NUMBER" },
                        "rewardScore": { "type": "NUMBER" },
                        "stressImpact": { "type": "NUMBER" },
                        "recommendation": { "type": "STRING" }
                    }
                }
            }
        },
        "required": ["text", "personality", "logicBalance"]
    })
}

/// Schema for a single extracted memory note
pub fn memory_note_schema() -> Value {
    let levels: Vec<&str> = MemoryLevel::all().iter().map(|l| l.as_str()).collect();
    json!({
        "type": "OBJECT",
        "properties": {
            "content": { "type": "STRING" },
            "level": { "type": "STRING", "enum": levels },
            "sentiment": { "type": "NUMBER" },
            "impact": { "type": "NUMBER" }
        },
        "required": ["content", "level"]
    })
}
