//! Relay log - the user-visible side channel
//!
//! Short status lines emitted by the dialogue and memory flows
//! (simulations run, memories learned, link disruptions). Only the
//! newest entries are kept.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

/// Maximum relay entries retained
pub const RELAY_LOG_CAPACITY: usize = 50;

/// Kind of relay entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RelayKind {
    System,
    Learning,
    Action,
    Simulation,
    Audit,
    Security,
}

impl Default for RelayKind {
    fn default() -> Self {
        Self::System
    }
}

impl fmt::Display for RelayKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::System => write!(f, "SYSTEM"),
            Self::Learning => write!(f, "LEARNING"),
            Self::Action => write!(f, "ACTION"),
            Self::Simulation => write!(f, "SIMULATION"),
            Self::Audit => write!(f, "AUDIT"),
            Self::Security => write!(f, "SECURITY"),
        }
    }
}

/// A single relay entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayEntry {
    pub id: String,
    pub kind: RelayKind,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// Bounded relay log, newest first
#[derive(Debug, Clone, Default)]
pub struct RelayLog {
    entries: VecDeque<RelayEntry>,
}

impl RelayLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an entry, evicting the oldest past capacity
    pub fn push(&mut self, kind: RelayKind, content: impl Into<String>) -> &RelayEntry {
        self.entries.push_front(RelayEntry {
            id: uuid::Uuid::new_v4().to_string(),
            kind,
            content: content.into(),
            timestamp: Utc::now(),
        });
        self.entries.truncate(RELAY_LOG_CAPACITY);
        &self.entries[0]
    }

    /// Newest `n` entries, newest first
    pub fn recent(&self, n: usize) -> Vec<RelayEntry> {
        self.entries.iter().take(n).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of retained entries of `kind`
    pub fn count(&self, kind: RelayKind) -> usize {
        self.entries.iter().filter(|e| e.kind == kind).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_newest_first() {
        let mut log = RelayLog::new();
        log.push(RelayKind::System, "first");
        log.push(RelayKind::Security, "second");

        let recent = log.recent(2);
        assert_eq!(recent[0].content, "second");
        assert_eq!(recent[1].content, "first");
        assert_eq!(log.count(RelayKind::Security), 1);
    }

    #[test]
    fn test_capacity() {
        let mut log = RelayLog::new();
        for i in 0..(RELAY_LOG_CAPACITY + 7) {
            log.push(RelayKind::Audit, format!("entry {i}"));
        }
        assert_eq!(log.len(), RELAY_LOG_CAPACITY);
        assert_eq!(log.recent(1)[0].content, format!("entry {}", RELAY_LOG_CAPACITY + 6));
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(RelayKind::Learning.to_string(), "LEARNING");
        assert_eq!(RelayKind::Simulation.to_string(), "SIMULATION");
    }
}
