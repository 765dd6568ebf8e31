//! Integration tests for Refiner
//!
//! These tests drive a full refinement through the public API with a scripted
//! transport and a real on-disk history store.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use refiner::collab::{HistoryStore, JsonHistoryStore, StaticCredentials};
use refiner::domain::AnswerSubmission;
use refiner::events::{Event, EventBus, read_session_events, spawn_event_logger};
use refiner::llm::{GenerationRequest, LlmClient, LlmError};
use refiner::retry::Sleeper;
use refiner::session::{RefinementSession, SessionOptions, SessionState};
use refiner::{ErrorKind, NullTelemetry};
use tempfile::TempDir;

/// Transport double replaying canned outcomes
struct ScriptedClient {
    script: Mutex<VecDeque<Result<String, LlmError>>>,
    seen: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedClient {
    fn new(script: Vec<Result<String, LlmError>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            seen: Mutex::new(Vec::new()),
        })
    }

    fn seen(&self) -> Vec<GenerationRequest> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmClient for ScriptedClient {
    async fn complete(&self, _credential: &str, request: &GenerationRequest) -> Result<String, LlmError> {
        self.seen.lock().unwrap().push(request.clone());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::InvalidResponse("script exhausted".to_string())))
    }
}

/// Sleeper that returns at once
struct NoSleep;

#[async_trait]
impl Sleeper for NoSleep {
    async fn sleep(&self, _duration: Duration) {}
}

const ROUND_ONE: &str = r#"Here you go:
```json
{"status":"refining","questions":[{"id":"lang","type":"specification","question":"Which language?","answers":["Python","Rust"],"required":true}]}
```"#;

const FINAL: &str = r#"{"status":"complete","finalPrompts":["Write pytest unit tests for the parser module."],"confidence":"88","approach":"concise","nextSteps":["Run the suite"]}"#;

fn session(client: Arc<ScriptedClient>, store: Arc<JsonHistoryStore>) -> RefinementSession {
    RefinementSession::new(
        client,
        Arc::new(StaticCredentials::new("key")),
        store,
        Arc::new(NullTelemetry),
        SessionOptions::default(),
    )
    .expect("Failed to open session")
    .with_sleeper(Arc::new(NoSleep))
}

// =============================================================================
// Full refinement
// =============================================================================

#[tokio::test]
async fn test_refinement_round_trip_persists_history() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let store = Arc::new(JsonHistoryStore::new(temp_dir.path().join("history.json")));
    let client = ScriptedClient::new(vec![
        Err(LlmError::ApiError {
            status: 503,
            message: "overloaded".to_string(),
        }),
        Ok(ROUND_ONE.to_string()),
        Ok(FINAL.to_string()),
    ]);

    let mut session = session(client.clone(), store.clone());
    let state = session.start("write unit tests").await.unwrap();
    assert_eq!(state.label(), "refining");

    let state = session
        .submit(vec![AnswerSubmission::new("lang", "Python")])
        .await
        .unwrap()
        .clone();
    let SessionState::Final {
        prompts, confidence, ..
    } = state
    else {
        panic!("expected final prompts");
    };
    assert_eq!(prompts.len(), 1);
    assert_eq!(confidence, 88);

    let seen = client.seen();
    assert_eq!(seen.len(), 3);
    assert!(seen[2].contents.contains("Q: Which language?\nA: Python"));

    let stored = store.load().unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].idea, "write unit tests");
    assert_eq!(stored[0].turns.len(), 1);

    // A fresh session sees what the last one saved
    let reopened = self::session(ScriptedClient::new(vec![]), store.clone());
    assert_eq!(reopened.history().len(), 1);
}

#[tokio::test]
async fn test_unparseable_reply_still_yields_a_result() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let store = Arc::new(JsonHistoryStore::new(temp_dir.path().join("history.json")));
    let client = ScriptedClient::new(vec![Ok("I would be glad to help with that.".to_string())]);

    let mut session = session(client, store.clone());
    let state = session.start("a landing page").await.unwrap();

    match state {
        SessionState::Final { prompts, .. } => {
            assert!(prompts.iter().any(|p| p.contains("a landing page")));
        }
        other => panic!("expected synthesized prompts, got {:?}", other),
    }
    assert_eq!(store.load().unwrap().len(), 1);
}

#[tokio::test]
async fn test_rejected_key_surfaces_without_retry() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let store = Arc::new(JsonHistoryStore::new(temp_dir.path().join("history.json")));
    let client = ScriptedClient::new(vec![Err(LlmError::ApiError {
        status: 403,
        message: "PERMISSION_DENIED".to_string(),
    })]);

    let mut session = session(client.clone(), store);
    let state = session.start("idea").await.unwrap();
    assert!(matches!(
        state,
        SessionState::Error {
            kind: ErrorKind::AuthInvalid,
            ..
        }
    ));
    assert_eq!(client.seen().len(), 1);
}

// =============================================================================
// Event log
// =============================================================================

#[tokio::test]
async fn test_events_reach_jsonl_log() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let events_dir = temp_dir.path().join("events");
    let store = Arc::new(JsonHistoryStore::new(temp_dir.path().join("history.json")));

    let bus = Arc::new(EventBus::new(64));
    let handle = spawn_event_logger(bus.clone(), &events_dir).unwrap();
    while bus.subscriber_count() == 0 {
        tokio::task::yield_now().await;
    }

    let mut session = RefinementSession::new(
        ScriptedClient::new(vec![Ok(FINAL.to_string())]),
        Arc::new(StaticCredentials::new("key")),
        store,
        bus.clone(),
        SessionOptions::default(),
    )
    .unwrap();
    let session_id = session.session_id().to_string();
    session.start("idea").await.unwrap();
    session.acknowledge().unwrap();

    drop(session);
    drop(bus);
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("logger did not stop")
        .unwrap();

    let entries = read_session_events(&events_dir, &session_id).unwrap();
    let states: Vec<String> = entries
        .iter()
        .filter_map(|e| match &e.event {
            Event::SessionChanged { state, .. } => Some(state.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(states, vec!["loading", "final", "idle"]);
    assert!(entries.iter().any(|e| matches!(e.event, Event::HistorySaved { .. })));
}
