//! Memory module for Srishti
//!
//! Holds the conversation log and the derived long-term notes.

mod conversation;
mod notes;

pub use conversation::{
    ConversationStore, DeliveryStatus, Message, MessageRole, ReasoningTrace, SimulationPath,
};
pub use notes::{MemoryItem, MemoryLevel, MemoryStore};
