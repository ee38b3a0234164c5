//! Dialogue orchestration
//!
//! The orchestrator owns the conversation, memory store, session and relay
//! log, and drives one send from validated input to typed state:
//! build request, append the pending human message, call the model, apply
//! the reply (or record the disruption). Memory extraction is spawned in the
//! background whenever an append lands on the extraction interval.

mod extraction;
mod prompts;
mod request;
mod responder;

pub use extraction::{should_extract, MemoryExtractor};
pub use prompts::{MEMORY_EXTRACTION_PROMPT, PERSONA_DIRECTIVE};
pub use request::RequestBuilder;
pub use responder::{DialogueReply, MemoryNote, Responder};

use crate::llm::Generator;
use crate::memory::{ConversationStore, DeliveryStatus, MemoryItem, MemoryStore, Message};
use crate::relay::{RelayEntry, RelayKind, RelayLog};
use crate::session::{DispatchBlocked, DispatchTicket, SessionState};
use crate::SrishtiConfig;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Relay text for a failed dialogue request
pub const DISRUPTION_NOTICE: &str = "Neural link disruption detected.";

/// Relay text when a reply carries simulations
pub const SIMULATION_NOTICE: &str = "Executing Future Simulation path analysis.";

/// Why a send was refused before anything happened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refusal {
    EmptyInput,
    KillSwitched,
    /// A request is already in flight
    Busy,
}

/// Result of one `send`
#[derive(Debug, Clone, PartialEq)]
pub enum SendOutcome {
    /// The assistant message that was appended
    Replied(Message),
    /// Nothing was appended and no call was made
    Refused(Refusal),
    /// The call or its parsing failed; the human message is marked failed
    Disrupted(String),
    /// The conversation was reset while the request was in flight
    Discarded,
}

/// Drives the dialogue loop over shared stores
pub struct Orchestrator {
    generator: Arc<dyn Generator>,
    builder: RequestBuilder,
    responder: Responder,
    extraction_interval: usize,

    conversation: Arc<RwLock<ConversationStore>>,
    memory: Arc<RwLock<MemoryStore>>,
    session: Arc<RwLock<SessionState>>,
    relay: Arc<RwLock<RelayLog>>,

    /// Outstanding background extractions
    extractions: Mutex<JoinSet<()>>,
}

impl Orchestrator {
    pub fn new(generator: Arc<dyn Generator>, config: &SrishtiConfig) -> Self {
        Self {
            generator,
            builder: RequestBuilder::new(config.history_window, config.memory_window),
            responder: Responder::new(),
            extraction_interval: config.extraction_interval,
            conversation: Arc::new(RwLock::new(ConversationStore::new())),
            memory: Arc::new(RwLock::new(MemoryStore::with_capacity(config.memory_capacity))),
            session: Arc::new(RwLock::new(SessionState::new(config.auto_learning))),
            relay: Arc::new(RwLock::new(RelayLog::new())),
            extractions: Mutex::new(JoinSet::new()),
        }
    }

    /// Use an existing relay log (e.g. one that already holds the auth entry)
    pub fn with_relay(mut self, relay: Arc<RwLock<RelayLog>>) -> Self {
        self.relay = relay;
        self
    }

    pub fn conversation(&self) -> Arc<RwLock<ConversationStore>> {
        self.conversation.clone()
    }

    pub fn memory(&self) -> Arc<RwLock<MemoryStore>> {
        self.memory.clone()
    }

    pub fn session(&self) -> Arc<RwLock<SessionState>> {
        self.session.clone()
    }

    pub fn relay(&self) -> Arc<RwLock<RelayLog>> {
        self.relay.clone()
    }

    /// Copy of the current session state
    pub async fn session_snapshot(&self) -> SessionState {
        self.session.read().await.clone()
    }

    /// Copy of every message, oldest first
    pub async fn messages(&self) -> Vec<Message> {
        self.conversation.read().await.messages().to_vec()
    }

    /// The `k` most recent memory notes, oldest first
    pub async fn memories(&self, k: usize) -> Vec<MemoryItem> {
        self.memory.read().await.recent(k)
    }

    /// The `n` most recent relay entries, newest first
    pub async fn relay_entries(&self, n: usize) -> Vec<RelayEntry> {
        self.relay.read().await.recent(n)
    }

    /// Send one user input through the dialogue loop
    pub async fn send(&self, input: &str) -> SendOutcome {
        let Some(input) = RequestBuilder::normalize_input(input) else {
            return SendOutcome::Refused(Refusal::EmptyInput);
        };

        let ticket = match self.session.write().await.begin_dispatch() {
            Ok(ticket) => ticket,
            Err(DispatchBlocked::KillSwitched) => {
                debug!("Send refused: kill switch engaged");
                return SendOutcome::Refused(Refusal::KillSwitched);
            }
            Err(DispatchBlocked::Busy) => {
                debug!("Send refused: request already in flight");
                return SendOutcome::Refused(Refusal::Busy);
            }
        };

        let outcome = self.dispatch(ticket, input).await;
        self.session.write().await.finish_dispatch();
        outcome
    }

    async fn dispatch(&self, ticket: DispatchTicket, input: &str) -> SendOutcome {
        // Snapshot before the human message lands so it is sent exactly once
        let request = {
            let conversation = self.conversation.read().await;
            let memory = self.memory.read().await;
            self.builder
                .build(&conversation, &memory, ticket.personality, input)
        };

        let human = Message::human(input);
        let human_id = human.id.clone();
        self.append(human).await;

        debug!(
            "Dispatching dialogue request: {} turns, mode {}",
            request.turns.len(),
            ticket.personality
        );
        let result = match self.generator.generate(&request).await {
            Ok(raw) => self.responder.parse_dialogue_reply(&raw),
            Err(e) => Err(e),
        };

        if !self.session.read().await.is_current(&ticket) {
            info!("Conversation was reset while waiting; dropping reply");
            return SendOutcome::Discarded;
        }

        match result {
            Ok(reply) => self.apply_reply(&human_id, reply).await,
            Err(e) => {
                warn!("Dialogue request failed: {}", e);
                self.conversation
                    .write()
                    .await
                    .set_status(&human_id, DeliveryStatus::Failed);
                self.relay
                    .write()
                    .await
                    .push(RelayKind::Security, DISRUPTION_NOTICE);
                SendOutcome::Disrupted(e.to_string())
            }
        }
    }

    async fn apply_reply(&self, human_id: &str, reply: DialogueReply) -> SendOutcome {
        let has_simulations = !reply.simulations.is_empty();
        let message = Message::assistant(
            reply.text,
            reply.personality,
            reply.reasoning,
            reply.simulations,
        );

        self.append(message.clone()).await;
        self.conversation
            .write()
            .await
            .set_status(human_id, DeliveryStatus::Committed);
        self.session
            .write()
            .await
            .apply_reply(reply.personality, reply.logic_balance);

        if has_simulations {
            self.relay
                .write()
                .await
                .push(RelayKind::Simulation, SIMULATION_NOTICE);
        }

        SendOutcome::Replied(message)
    }

    /// Append and, if the new length lands on the interval, spawn extraction
    async fn append(&self, message: Message) {
        let auto_learning = self.session.read().await.is_auto_learning();

        let pending = {
            let mut conversation = self.conversation.write().await;
            let len = conversation.append(message);
            should_extract(len, self.extraction_interval, auto_learning)
                .then(|| (len, conversation.recent_text(self.extraction_interval)))
        };

        if let Some((len, recent_text)) = pending {
            debug!("Conversation reached {} messages; extracting memory", len);
            let extractor =
                MemoryExtractor::new(self.generator.clone(), self.memory.clone(), self.relay.clone());
            let mut extractions = self.extractions.lock().await;
            while extractions.try_join_next().is_some() {}
            extractions.spawn(extractor.run(recent_text));
        }
    }

    /// Flip the kill switch; returns the new value
    pub async fn toggle_kill_switch(&self) -> bool {
        let engaged = self.session.write().await.toggle_kill_switch();
        info!("Kill switch {}", if engaged { "engaged" } else { "released" });
        engaged
    }

    pub async fn set_auto_learning(&self, enabled: bool) {
        self.session.write().await.set_auto_learning(enabled);
        info!("Auto-learning {}", if enabled { "on" } else { "off" });
    }

    /// Clear the conversation. Memory and relay log are kept.
    pub async fn reset(&self) {
        let generation = self.session.write().await.reset();
        self.conversation.write().await.clear();
        info!("Conversation reset (generation {})", generation);
    }

    /// Wait until every spawned extraction has finished
    pub async fn wait_for_extractions(&self) {
        let mut extractions = std::mem::take(&mut *self.extractions.lock().await);
        while let Some(joined) = extractions.join_next().await {
            if let Err(e) = joined {
                warn!("Memory extraction task failed: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::GenerationRequest;
    use crate::{Result, SrishtiError};
    use futures::future::BoxFuture;
    use std::path::PathBuf;

    /// Echoes a fixed dialogue reply, fails memory extraction
    struct EchoGenerator;

    impl Generator for EchoGenerator {
        fn generate<'a>(&'a self, request: &'a GenerationRequest) -> BoxFuture<'a, Result<String>> {
            let reply = match request.purpose {
                crate::llm::Purpose::Dialogue => Ok(
                    r#"{"text":"ok","personality":"COMMANDER","logicBalance":80}"#.to_string(),
                ),
                crate::llm::Purpose::MemoryExtraction => {
                    Err(SrishtiError::Generation("offline".to_string()))
                }
            };
            Box::pin(async move { reply })
        }
    }

    fn orchestrator() -> Orchestrator {
        Orchestrator::new(Arc::new(EchoGenerator), &SrishtiConfig::new(PathBuf::from("/tmp")))
    }

    #[tokio::test]
    async fn test_send_commits_human_message() {
        let orch = orchestrator();
        let outcome = orch.send("plan my week").await;
        assert!(matches!(outcome, SendOutcome::Replied(_)));

        let messages = orch.messages().await;
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].status, DeliveryStatus::Committed);
        assert_eq!(messages[1].text, "ok");

        let session = orch.session_snapshot().await;
        assert_eq!(session.personality_mode(), crate::PersonalityMode::Commander);
        assert_eq!(session.logic_balance(), 80.0);
        assert!(!session.is_thinking());
    }

    #[tokio::test]
    async fn test_busy_send_refused() {
        let orch = orchestrator();
        orch.session.write().await.begin_dispatch().unwrap();
        assert_eq!(orch.send("hi").await, SendOutcome::Refused(Refusal::Busy));
        assert!(orch.messages().await.is_empty());
    }

    #[tokio::test]
    async fn test_reset_keeps_memory_and_relay() {
        let orch = orchestrator();
        orch.relay.write().await.push(RelayKind::System, "boot");
        orch.send("one").await;
        orch.reset().await;

        assert!(orch.messages().await.is_empty());
        assert_eq!(orch.relay.read().await.len(), 1);
        assert_eq!(orch.session_snapshot().await.generation(), 1);
    }

    #[tokio::test]
    async fn test_failed_extraction_is_silent() {
        let orch = orchestrator();
        for input in ["a", "b", "c"] {
            orch.send(input).await;
        }
        orch.wait_for_extractions().await;
        assert_eq!(orch.messages().await.len(), 6);
        assert!(orch.memories(10).await.is_empty());
        assert!(orch.relay.read().await.is_empty());
    }
}
