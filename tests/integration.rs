//! Integration tests for Srishti

use futures::future::BoxFuture;
use pretty_assertions::assert_eq;
use srishti::llm::{GenerationRequest, Generator, Purpose, TurnRole};
use srishti::memory::{DeliveryStatus, MemoryLevel};
use srishti::{
    config, Orchestrator, PersonalityMode, Refusal, RelayKind, SendOutcome, SrishtiConfig,
    SrishtiError,
};
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use tokio_test::{assert_err, assert_ok};

const MENTOR_REPLY: &str = r#"{"text":"Let's break it down.","personality":"MENTOR","logicBalance":55}"#;
const SHADOW_NOTE: &str = r#"{"content":"Panics close to deadlines","level":"SHADOW","sentiment":-0.6}"#;

/// Generator double: queued dialogue replies (falling back to a default) and
/// a fixed memory-extraction reply. Records every request.
struct ScriptedGenerator {
    dialogue: Mutex<VecDeque<Result<String, String>>>,
    memory: Result<String, String>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedGenerator {
    fn new() -> Arc<Self> {
        Self::with_memory(Ok(SHADOW_NOTE))
    }

    fn with_memory(memory: Result<&str, &str>) -> Arc<Self> {
        Arc::new(Self {
            dialogue: Mutex::new(VecDeque::new()),
            memory: memory.map(str::to_string).map_err(str::to_string),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn queue(&self, reply: Result<&str, &str>) {
        self.dialogue
            .lock()
            .unwrap()
            .push_back(reply.map(str::to_string).map_err(str::to_string));
    }

    fn requests(&self, purpose: Purpose) -> Vec<GenerationRequest> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.purpose == purpose)
            .cloned()
            .collect()
    }
}

impl Generator for ScriptedGenerator {
    fn generate<'a>(&'a self, request: &'a GenerationRequest) -> BoxFuture<'a, srishti::Result<String>> {
        self.requests.lock().unwrap().push(request.clone());
        let reply = match request.purpose {
            Purpose::Dialogue => self
                .dialogue
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(MENTOR_REPLY.to_string())),
            Purpose::MemoryExtraction => self.memory.clone(),
        };
        Box::pin(async move { reply.map_err(SrishtiError::Generation) })
    }
}

/// Generator double whose dialogue replies wait for `release`
struct GatedGenerator {
    gate: Notify,
}

impl GatedGenerator {
    fn new() -> Arc<Self> {
        Arc::new(Self { gate: Notify::new() })
    }

    fn release(&self) {
        self.gate.notify_one();
    }
}

impl Generator for GatedGenerator {
    fn generate<'a>(&'a self, request: &'a GenerationRequest) -> BoxFuture<'a, srishti::Result<String>> {
        Box::pin(async move {
            match request.purpose {
                Purpose::Dialogue => {
                    self.gate.notified().await;
                    Ok(MENTOR_REPLY.to_string())
                }
                Purpose::MemoryExtraction => Ok(SHADOW_NOTE.to_string()),
            }
        })
    }
}

/// Yield until the orchestrator has a request in flight
async fn wait_until_thinking(orch: &Orchestrator) {
    while !orch.session_snapshot().await.is_thinking() {
        tokio::task::yield_now().await;
    }
}

fn test_config() -> SrishtiConfig {
    SrishtiConfig::new(PathBuf::from("/tmp/srishti-test"))
}

fn orchestrator(generator: &Arc<ScriptedGenerator>, config: &SrishtiConfig) -> Orchestrator {
    Orchestrator::new(generator.clone(), config)
}

#[tokio::test]
async fn test_blank_input_makes_no_call() {
    let generator = ScriptedGenerator::new();
    let orch = orchestrator(&generator, &test_config());

    for input in ["", "   ", "\n\t"] {
        assert_eq!(orch.send(input).await, SendOutcome::Refused(Refusal::EmptyInput));
    }
    assert!(orch.messages().await.is_empty());
    assert!(generator.requests.lock().unwrap().is_empty());
    assert!(orch.relay_entries(10).await.is_empty());
}

#[tokio::test]
async fn test_kill_switch_blocks_until_released() {
    let generator = ScriptedGenerator::new();
    let orch = orchestrator(&generator, &test_config());

    assert!(orch.toggle_kill_switch().await);
    assert_eq!(orch.send("hello").await, SendOutcome::Refused(Refusal::KillSwitched));
    assert!(orch.messages().await.is_empty());
    assert!(generator.requests.lock().unwrap().is_empty());

    assert!(!orch.toggle_kill_switch().await);
    assert!(matches!(orch.send("hello").await, SendOutcome::Replied(_)));
    assert_eq!(orch.messages().await.len(), 2);
}

#[tokio::test]
async fn test_upstream_failure_records_disruption() {
    let generator = ScriptedGenerator::new();
    let orch = orchestrator(&generator, &test_config());
    orch.send("first").await;

    generator.queue(Err("503 unavailable"));
    let outcome = orch.send("second").await;
    assert!(matches!(outcome, SendOutcome::Disrupted(_)));

    let messages = orch.messages().await;
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[2].text, "second");
    assert_eq!(messages[2].status, DeliveryStatus::Failed);

    let relay = orch.relay();
    let relay = relay.read().await;
    assert_eq!(relay.count(RelayKind::Security), 1);
    assert_eq!(relay.len(), 1);
    drop(relay);

    let session = orch.session_snapshot().await;
    assert!(!session.is_thinking());
    assert_eq!(session.logic_balance(), 55.0);
}

#[tokio::test]
async fn test_malformed_reply_is_a_disruption() {
    let generator = ScriptedGenerator::new();
    let orch = orchestrator(&generator, &test_config());

    generator.queue(Ok("I'd rather not answer in JSON."));
    assert!(matches!(orch.send("hi").await, SendOutcome::Disrupted(_)));

    generator.queue(Ok(r#"{"text":"hi","personality":"JESTER","logicBalance":50}"#));
    assert!(matches!(orch.send("hi again").await, SendOutcome::Disrupted(_)));

    assert_eq!(orch.messages().await.len(), 2);
    assert_eq!(orch.relay().read().await.count(RelayKind::Security), 2);
    assert!(!orch.session_snapshot().await.is_thinking());
}

#[tokio::test]
async fn test_logic_balance_clamped() {
    let generator = ScriptedGenerator::new();
    let orch = orchestrator(&generator, &test_config());

    generator.queue(Ok(r#"{"text":"Execute.","personality":"COMMANDER","logicBalance":140}"#));
    orch.send("what now").await;
    let session = orch.session_snapshot().await;
    assert_eq!(session.logic_balance(), 100.0);
    assert_eq!(session.personality_mode(), PersonalityMode::Commander);

    generator.queue(Ok(r#"{"text":"Feel it.","personality":"THERAPIST","logicBalance":-20}"#));
    orch.send("and now").await;
    assert_eq!(orch.session_snapshot().await.logic_balance(), 0.0);
}

#[tokio::test]
async fn test_reply_is_committed_with_persona() {
    let generator = ScriptedGenerator::new();
    let orch = orchestrator(&generator, &test_config());

    let reply = match orch.send("help me plan").await {
        SendOutcome::Replied(message) => message,
        other => panic!("expected a reply, got {other:?}"),
    };
    assert_eq!(reply.text, "Let's break it down.");
    assert_eq!(reply.personality, Some(PersonalityMode::Mentor));

    let messages = orch.messages().await;
    assert_eq!(messages[0].status, DeliveryStatus::Committed);
    assert_eq!(messages[1].id, reply.id);
    assert!(!orch.session_snapshot().await.is_thinking());
}

#[tokio::test]
async fn test_simulations_emit_relay_entry() {
    let generator = ScriptedGenerator::new();
    let orch = orchestrator(&generator, &test_config());

    generator.queue(Ok(r#"{
        "text": "Two paths.",
        "personality": "ULTRON",
        "logicBalance": 90,
        "simulations": [
            {"label": "Quit", "description": "leave now", "riskScore": 80, "rewardScore": 60, "stressImpact": 70},
            {"label": "Stay", "description": "negotiate", "riskScore": 30, "rewardScore": 40, "stressImpact": 35}
        ]
    }"#));
    let reply = match orch.send("should I quit my job?").await {
        SendOutcome::Replied(message) => message,
        other => panic!("expected a reply, got {other:?}"),
    };
    assert_eq!(reply.simulations.len(), 2);

    let entries = orch.relay_entries(5).await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].kind, RelayKind::Simulation);
}

#[tokio::test]
async fn test_request_window_and_order() {
    let generator = ScriptedGenerator::new();
    let config = test_config().with_auto_learning(false);
    let orch = orchestrator(&generator, &config);

    for i in 0..6 {
        orch.send(&format!("message {i}")).await;
    }
    orch.send("latest").await;

    let requests = generator.requests(Purpose::Dialogue);
    let last = requests.last().unwrap();
    assert_eq!(last.turns.len(), 11);
    assert_eq!(last.turns[0].text, "message 1");
    assert_eq!(last.turns[0].role, TurnRole::User);
    assert_eq!(last.turns[1].role, TurnRole::Model);
    assert_eq!(last.turns[10].text, "latest");

    // First request carries only the new input
    assert_eq!(requests[0].turns.len(), 1);
}

#[tokio::test]
async fn test_extraction_fires_on_interval() {
    let generator = ScriptedGenerator::new();
    let orch = orchestrator(&generator, &test_config());

    let mut fired_at = Vec::new();
    for i in 0..8 {
        orch.send(&format!("turn {i}")).await;
        orch.wait_for_extractions().await;
        let count = generator.requests(Purpose::MemoryExtraction).len();
        if count > fired_at.len() {
            fired_at.push(orch.messages().await.len());
        }
    }

    // Each send appends two messages; the append reaching 5 happens mid-send
    assert_eq!(fired_at, vec![6, 10, 16]);
    assert_eq!(generator.requests(Purpose::MemoryExtraction).len(), 3);
    assert_eq!(orch.memories(10).await.len(), 3);
    assert_eq!(orch.relay().read().await.count(RelayKind::Learning), 3);
}

#[tokio::test]
async fn test_no_extraction_when_learning_off() {
    let generator = ScriptedGenerator::new();
    let orch = orchestrator(&generator, &test_config());
    orch.set_auto_learning(false).await;

    for i in 0..6 {
        orch.send(&format!("turn {i}")).await;
    }
    orch.wait_for_extractions().await;

    assert_eq!(orch.messages().await.len(), 12);
    assert!(generator.requests(Purpose::MemoryExtraction).is_empty());
    assert!(orch.memories(10).await.is_empty());
}

#[tokio::test]
async fn test_failed_extraction_leaves_state_alone() {
    let generator = ScriptedGenerator::with_memory(Err("quota exceeded"));
    let orch = orchestrator(&generator, &test_config());

    for i in 0..3 {
        orch.send(&format!("turn {i}")).await;
    }
    orch.wait_for_extractions().await;

    assert_eq!(generator.requests(Purpose::MemoryExtraction).len(), 1);
    assert!(orch.memories(10).await.is_empty());
    assert!(orch.relay_entries(10).await.is_empty());
    assert_eq!(orch.messages().await.len(), 6);
}

#[tokio::test]
async fn test_stressed_user_end_to_end() {
    let generator = ScriptedGenerator::new();
    let orch = orchestrator(&generator, &test_config());

    orch.send("Morning!").await;
    orch.send("I have a launch on Friday").await;
    assert_eq!(orch.messages().await.len(), 4);

    generator.queue(Ok(
        r#"{"text":"Saans lo. We'll split it into three chunks.","personality":"THERAPIST","logicBalance":35}"#,
    ));
    let outcome = orch.send("I'm stressed about my deadline").await;
    assert!(matches!(outcome, SendOutcome::Replied(_)));
    orch.wait_for_extractions().await;

    let messages = orch.messages().await;
    assert_eq!(messages.len(), 6);

    let extractions = generator.requests(Purpose::MemoryExtraction);
    assert_eq!(extractions.len(), 1);
    let sent = &extractions[0].turns[0].text;
    let expected_tail: Vec<&str> = messages[..5].iter().map(|m| m.text.as_str()).collect();
    assert!(sent.ends_with(&expected_tail.join("\n")));
    assert!(sent.ends_with("I'm stressed about my deadline"));

    let memories = orch.memories(10).await;
    assert_eq!(memories.len(), 1);
    assert!(MemoryLevel::all().contains(&memories[0].level));
    assert_eq!(memories[0].level, MemoryLevel::Shadow);

    let session = orch.session_snapshot().await;
    assert_eq!(session.personality_mode(), PersonalityMode::Therapist);
    assert!(!session.is_thinking());
}

#[tokio::test]
async fn test_memory_digest_in_later_requests() {
    let generator = ScriptedGenerator::new();
    let orch = orchestrator(&generator, &test_config());

    for i in 0..3 {
        orch.send(&format!("turn {i}")).await;
    }
    orch.wait_for_extractions().await;
    orch.send("next").await;

    let last = generator.requests(Purpose::Dialogue).pop().unwrap();
    let directive = last.system_instruction.unwrap();
    assert!(directive.contains("ACTIVE_MODE: MENTOR"));
    assert!(directive.ends_with("MEMORIES:\n[SHADOW] Panics close to deadlines"));
}

#[tokio::test]
async fn test_config_file_roundtrip() {
    let dir = tempfile::TempDir::new().unwrap();
    tokio::fs::write(
        dir.path().join("config.toml"),
        "history_window = 4\nextraction_interval = 3\n",
    )
    .await
    .unwrap();

    let loaded = assert_ok!(config::load(dir.path()).await);
    assert_eq!(loaded.history_window, 4);
    assert_eq!(loaded.extraction_interval, 3);

    tokio::fs::write(dir.path().join("config.toml"), "extraction_interval = 0\n")
        .await
        .unwrap();
    assert_err!(config::load(dir.path()).await);
}

#[tokio::test]
async fn test_custom_windows_respected() {
    let generator = ScriptedGenerator::new();
    let config = test_config().with_windows(2, 1).with_extraction_interval(3);
    let orch = orchestrator(&generator, &config);

    for i in 0..3 {
        orch.send(&format!("turn {i}")).await;
    }
    orch.wait_for_extractions().await;

    // lengths 1..6: extraction at 3 and 6
    assert_eq!(generator.requests(Purpose::MemoryExtraction).len(), 2);
    let last = generator.requests(Purpose::Dialogue).pop().unwrap();
    assert_eq!(last.turns.len(), 3);
}

#[tokio::test]
async fn test_kill_switch_does_not_cancel_in_flight_request() {
    let generator = GatedGenerator::new();
    let orch = Orchestrator::new(generator.clone(), &test_config());

    let (outcome, engaged) = tokio::join!(orch.send("hold on"), async {
        wait_until_thinking(&orch).await;
        let engaged = orch.toggle_kill_switch().await;
        generator.release();
        engaged
    });

    assert!(engaged);
    assert!(matches!(outcome, SendOutcome::Replied(_)));
    let messages = orch.messages().await;
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].status, DeliveryStatus::Committed);

    let session = orch.session_snapshot().await;
    assert!(!session.is_thinking());
    assert!(session.is_kill_switched());
    assert_eq!(orch.send("again").await, SendOutcome::Refused(Refusal::KillSwitched));
}

#[tokio::test]
async fn test_reset_discards_in_flight_reply() {
    let generator = GatedGenerator::new();
    let orch = Orchestrator::new(generator.clone(), &test_config());

    let (outcome, ()) = tokio::join!(orch.send("hold on"), async {
        wait_until_thinking(&orch).await;
        orch.reset().await;
        generator.release();
    });

    assert_eq!(outcome, SendOutcome::Discarded);
    assert!(orch.messages().await.is_empty());
    assert!(orch.relay_entries(10).await.is_empty());

    let session = orch.session_snapshot().await;
    assert!(!session.is_thinking());
    assert_eq!(session.generation(), 1);
    assert_eq!(session.logic_balance(), 50.0);
}
