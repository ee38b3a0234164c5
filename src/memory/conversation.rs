//! Conversation store - ordered, append-only message log

use crate::session::PersonalityMode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Who authored a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    Human,
    Assistant,
    System,
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Human => write!(f, "human"),
            Self::Assistant => write!(f, "assistant"),
            Self::System => write!(f, "system"),
        }
    }
}

/// Delivery state of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    /// Shown immediately, reply not yet received
    Pending,
    /// Reply received (or the message is itself a reply)
    Committed,
    /// The request carrying this message failed
    Failed,
}

/// Reasoning attached to an assistant reply
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReasoningTrace {
    #[serde(default, deserialize_with = "null_as_default")]
    pub logical_path: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub emotional_context: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mediator_conclusion: Option<String>,
}

/// A hypothetical future scenario scored by the assistant
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationPath {
    #[serde(default, deserialize_with = "null_as_default")]
    pub label: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub risk_score: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub reward_score: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub stress_impact: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<String>,
}

impl SimulationPath {
    /// Clamp all scores into `[0, 100]`
    pub fn normalized(mut self) -> Self {
        self.risk_score = clamp_score(self.risk_score);
        self.reward_score = clamp_score(self.reward_score);
        self.stress_impact = clamp_score(self.stress_impact);
        self
    }
}

/// Treat an explicit `null` like a missing field
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn clamp_score(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 100.0)
    }
}

/// A single exchanged message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub role: MessageRole,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    pub status: DeliveryStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub personality: Option<PersonalityMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<ReasoningTrace>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub simulations: Vec<SimulationPath>,
}

impl Message {
    /// A human message awaiting its reply
    pub fn human(text: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role: MessageRole::Human,
            text: text.into(),
            timestamp: Utc::now(),
            status: DeliveryStatus::Pending,
            personality: None,
            reasoning: None,
            simulations: Vec::new(),
        }
    }

    /// An assistant reply
    pub fn assistant(
        text: impl Into<String>,
        personality: PersonalityMode,
        reasoning: Option<ReasoningTrace>,
        simulations: Vec<SimulationPath>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role: MessageRole::Assistant,
            text: text.into(),
            timestamp: Utc::now(),
            status: DeliveryStatus::Committed,
            personality: Some(personality),
            reasoning,
            simulations,
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role: MessageRole::System,
            text: text.into(),
            timestamp: Utc::now(),
            status: DeliveryStatus::Committed,
            personality: None,
            reasoning: None,
            simulations: Vec::new(),
        }
    }
}

/// Ordered message log. Messages are appended, never edited or removed
/// individually; only their delivery status may change.
#[derive(Debug, Clone, Default)]
pub struct ConversationStore {
    messages: Vec<Message>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message and return the new length
    pub fn append(&mut self, message: Message) -> usize {
        self.messages.push(message);
        self.messages.len()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// The most recent `n` messages, oldest first
    pub fn recent(&self, n: usize) -> &[Message] {
        let start = self.messages.len().saturating_sub(n);
        &self.messages[start..]
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn get(&self, id: &str) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    /// Update the delivery status of message `id`; false if unknown
    pub fn set_status(&mut self, id: &str, status: DeliveryStatus) -> bool {
        match self.messages.iter_mut().find(|m| m.id == id) {
            Some(message) => {
                message.status = status;
                true
            }
            None => false,
        }
    }

    /// Text of the most recent `n` messages joined by newlines
    pub fn recent_text(&self, n: usize) -> String {
        self.recent(n)
            .iter()
            .map(|m| m.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Drop every message
    pub fn clear(&mut self) {
        self.messages.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_returns_length() {
        let mut store = ConversationStore::new();
        assert_eq!(store.append(Message::human("hi")), 1);
        assert_eq!(store.append(Message::system("note")), 2);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_recent_window() {
        let mut store = ConversationStore::new();
        for i in 0..4 {
            store.append(Message::human(format!("m{i}")));
        }
        let recent: Vec<&str> = store.recent(2).iter().map(|m| m.text.as_str()).collect();
        assert_eq!(recent, vec!["m2", "m3"]);
        assert_eq!(store.recent(10).len(), 4);
        assert_eq!(store.recent_text(3), "m1\nm2\nm3");
    }

    #[test]
    fn test_status_flip() {
        let mut store = ConversationStore::new();
        let message = Message::human("pending");
        let id = message.id.clone();
        store.append(message);

        assert!(store.set_status(&id, DeliveryStatus::Failed));
        assert_eq!(store.get(&id).map(|m| m.status), Some(DeliveryStatus::Failed));
        assert!(!store.set_status("missing", DeliveryStatus::Committed));
    }

    #[test]
    fn test_simulation_null_fields_default() {
        let path: SimulationPath = serde_json::from_str(
            r#"{"label":"Wait","description":null,"riskScore":null,"rewardScore":40,"stressImpact":null}"#,
        )
        .unwrap();
        assert_eq!(path.description, "");
        assert_eq!(path.risk_score, 0.0);
        assert_eq!(path.reward_score, 40.0);
        assert_eq!(path.stress_impact, 0.0);
    }

    #[test]
    fn test_simulation_scores_clamped() {
        let path = SimulationPath {
            label: "Quit".to_string(),
            risk_score: 180.0,
            reward_score: -4.0,
            stress_impact: 55.0,
            ..Default::default()
        }
        .normalized();
        assert_eq!(path.risk_score, 100.0);
        assert_eq!(path.reward_score, 0.0);
        assert_eq!(path.stress_impact, 55.0);
    }
}
