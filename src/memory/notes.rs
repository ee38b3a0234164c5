//! Memory store - derived long-term notes
//!
//! Notes are produced by the extraction pass and fed back into future
//! dialogue requests as a short digest. The store is a ring buffer: once
//! full, the oldest note is evicted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;

/// Provenance of a memory note
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MemoryLevel {
    /// Direct user statements
    Conscious,
    /// Patterns inferred from behavior
    Subconscious,
    /// Analysis of past successes or failures
    Reflection,
    /// Suppressed habits, burnout risks, negative loops
    Shadow,
}

impl MemoryLevel {
    pub fn all() -> &'static [MemoryLevel] {
        &[
            MemoryLevel::Conscious,
            MemoryLevel::Subconscious,
            MemoryLevel::Reflection,
            MemoryLevel::Shadow,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Conscious => "CONSCIOUS",
            Self::Subconscious => "SUBCONSCIOUS",
            Self::Reflection => "REFLECTION",
            Self::Shadow => "SHADOW",
        }
    }
}

impl fmt::Display for MemoryLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MemoryLevel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::all()
            .iter()
            .copied()
            .find(|level| level.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| format!("unknown memory level: {wanted}"))
    }
}

/// A derived long-term note
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryItem {
    pub id: String,
    pub content: String,
    pub level: MemoryLevel,
    pub timestamp: DateTime<Utc>,
    /// -1 (negative) to 1 (positive)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<f64>,
    /// 0 to 10
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub impact: Option<f64>,
}

impl MemoryItem {
    /// Build a note, clamping sentiment to [-1, 1] and impact to [0, 10]
    pub fn new(
        content: impl Into<String>,
        level: MemoryLevel,
        sentiment: Option<f64>,
        impact: Option<f64>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            content: content.into(),
            level,
            timestamp: Utc::now(),
            sentiment: sentiment.filter(|v| !v.is_nan()).map(|v| v.clamp(-1.0, 1.0)),
            impact: impact.filter(|v| !v.is_nan()).map(|v| v.clamp(0.0, 10.0)),
        }
    }

    /// `[LEVEL] content`
    pub fn digest_line(&self) -> String {
        format!("[{}] {}", self.level, self.content)
    }
}

/// Ring buffer of memory notes, oldest first
#[derive(Debug, Clone)]
pub struct MemoryStore {
    items: VecDeque<MemoryItem>,
    capacity: usize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::with_capacity(crate::DEFAULT_MEMORY_CAPACITY)
    }
}

impl MemoryStore {
    /// A store retaining at most `capacity` notes (minimum 1)
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: VecDeque::with_capacity(capacity.min(64)),
            capacity,
        }
    }

    /// Append a note; returns the evicted note if the store was full
    pub fn push(&mut self, item: MemoryItem) -> Option<MemoryItem> {
        let evicted = if self.items.len() >= self.capacity {
            self.items.pop_front()
        } else {
            None
        };
        self.items.push_back(item);
        evicted
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The most recent `k` notes, oldest first
    pub fn recent(&self, k: usize) -> Vec<MemoryItem> {
        let start = self.items.len().saturating_sub(k);
        self.items.iter().skip(start).cloned().collect()
    }

    /// The most recent `k` notes as `[LEVEL] content` lines
    pub fn digest(&self, k: usize) -> String {
        self.recent(k)
            .iter()
            .map(MemoryItem::digest_line)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Notes per level, in level order
    pub fn level_counts(&self) -> Vec<(MemoryLevel, usize)> {
        MemoryLevel::all()
            .iter()
            .map(|level| (*level, self.items.iter().filter(|i| i.level == *level).count()))
            .collect()
    }
}
