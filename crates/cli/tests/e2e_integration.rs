//! End-to-end integration tests for Murmur.
//!
//! These tests wire the real crates together the way the binary does
//! (config → engine → gateway) with only the model swapped for a script,
//! and check what ends up on disk.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use murmur_agent::ConversationEngine;
use murmur_config::AppConfig;
use murmur_core::error::ProviderError;
use murmur_core::message::Role;
use murmur_core::provider::{GenerationRequest, GenerationResponse, Provider, Usage};
use murmur_memory::SessionHistory;
use tower::ServiceExt;

// ── Mock Provider ────────────────────────────────────────────────────────

/// A mock provider that returns scripted completions in sequence and
/// remembers every prompt it was given.
struct ScriptedProvider {
    responses: std::sync::Mutex<Vec<Result<String, ProviderError>>>,
    prompts: std::sync::Mutex<Vec<String>>,
}

impl ScriptedProvider {
    fn new(responses: Vec<Result<String, ProviderError>>) -> Self {
        Self {
            responses: std::sync::Mutex::new(responses),
            prompts: std::sync::Mutex::new(Vec::new()),
        }
    }

    fn texts(responses: &[&str]) -> Self {
        Self::new(responses.iter().map(|r| Ok(r.to_string())).collect())
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "e2e_mock"
    }

    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse, ProviderError> {
        let call = {
            let mut prompts = self.prompts.lock().unwrap();
            prompts.push(request.prompt.clone());
            prompts.len() - 1
        };
        let next = {
            let responses = self.responses.lock().unwrap();
            responses.get(call).cloned().unwrap_or_else(|| {
                panic!("ScriptedProvider exhausted: call #{call}, have {}", responses.len())
            })
        };
        Ok(GenerationResponse {
            text: next?,
            usage: Some(Usage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            }),
            model: "mock".into(),
        })
    }
}

// ── Fixture ──────────────────────────────────────────────────────────────

struct Workspace {
    _tmp: tempfile::TempDir,
    config: AppConfig,
}

impl Workspace {
    fn new() -> Self {
        let tmp = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.session.history_path = Some(tmp.path().join("history.txt"));
        config.transcript.log_dir = Some(tmp.path().join("logs"));
        config.session.window_size = 4;
        Self { _tmp: tmp, config }
    }

    fn history_path(&self) -> PathBuf {
        self.config.history_path()
    }

    fn log_dir(&self) -> PathBuf {
        self.config.log_dir()
    }

    fn engine(&self, provider: Arc<ScriptedProvider>) -> Arc<ConversationEngine> {
        Arc::new(ConversationEngine::from_config(&self.config, provider).unwrap())
    }
}

fn snapshot_dir(dir: &Path) -> Vec<(PathBuf, Vec<u8>)> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut files: Vec<_> = entries
        .map(|e| {
            let path = e.unwrap().path();
            let bytes = std::fs::read(&path).unwrap();
            (path, bytes)
        })
        .collect();
    files.sort();
    files
}

fn chat_request(prompt: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/chat")
        .header("content-type", "application/json")
        .body(Body::from(serde_json::json!({ "prompt": prompt }).to_string()))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

// ── E2E: Conversation survives a restart ─────────────────────────────────

#[tokio::test]
async fn e2e_history_carries_across_restart() {
    let ws = Workspace::new();

    let first_run = ScriptedProvider::texts(&[" Nice to meet you, Ada."]);
    let engine = ws.engine(Arc::new(first_run));
    engine.submit("my name is Ada").await.unwrap();
    let before = engine.history_snapshot().await;
    drop(engine);

    let second_run = Arc::new(ScriptedProvider::texts(&[" Your name is Ada."]));
    let engine = ws.engine(second_run.clone());
    assert_eq!(engine.history_snapshot().await, before);

    let reply = engine.submit("what is my name?").await.unwrap();
    assert_eq!(reply.text, "Your name is Ada.");
    assert_eq!(
        second_run.prompts()[0],
        "User: my name is Ada\nAI: Nice to meet you, Ada.\nUser: what is my name?\nAI:"
    );

    let reloaded = SessionHistory::load(ws.history_path(), 0).unwrap();
    assert_eq!(reloaded.len(), 4);
    assert_eq!(reloaded.utterances(), engine.history_snapshot().await.as_slice());
}

// ── E2E: HTTP turn writes history and transcript ─────────────────────────

#[tokio::test]
async fn e2e_http_chat_records_history_and_transcript() {
    let ws = Workspace::new();
    let engine = ws.engine(Arc::new(ScriptedProvider::texts(&[
        " Hello from the model.\nUser: and then?",
    ])));
    let app = murmur_gateway::build_router(engine);

    let response = app.oneshot(chat_request("hi there")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["response"], "Hello from the model.");

    let history = std::fs::read_to_string(ws.history_path()).unwrap();
    let lines: Vec<&str> = history.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].ends_with("] User: hi there"));
    assert!(lines[1].ends_with("] AI: Hello from the model."));

    let logs = snapshot_dir(&ws.log_dir());
    assert_eq!(logs.len(), 1);
    assert!(logs[0].0.extension().is_some_and(|e| e == "log"));
    let transcript = String::from_utf8(logs[0].1.clone()).unwrap();
    assert!(transcript.contains("] User: hi there\n"));
    assert!(transcript.ends_with("] AI: Hello from the model.\n\n"));
}

// ── E2E: Failed generation changes nothing on disk ───────────────────────

#[tokio::test]
async fn e2e_generation_failure_is_side_effect_free() {
    let ws = Workspace::new();
    let engine = ws.engine(Arc::new(ScriptedProvider::new(vec![
        Ok(" first".into()),
        Err(ProviderError::ApiError {
            status_code: 503,
            message: "model is loading".into(),
        }),
    ])));
    let app = murmur_gateway::build_router(engine.clone());

    let ok = app.clone().oneshot(chat_request("one")).await.unwrap();
    assert_eq!(ok.status(), StatusCode::OK);

    let history_before = std::fs::read(ws.history_path()).unwrap();
    let logs_before = snapshot_dir(&ws.log_dir());

    let failed = app.oneshot(chat_request("two")).await.unwrap();
    assert_eq!(failed.status(), StatusCode::BAD_GATEWAY);
    assert!(json_body(failed).await["error"]
        .as_str()
        .unwrap()
        .contains("model is loading"));

    assert_eq!(std::fs::read(ws.history_path()).unwrap(), history_before);
    assert_eq!(snapshot_dir(&ws.log_dir()), logs_before);
    assert_eq!(engine.history_snapshot().await.len(), 2);
}

// ── E2E: Concurrent HTTP turns are serialized ────────────────────────────

#[tokio::test]
async fn e2e_concurrent_requests_add_whole_pairs() {
    let ws = Workspace::new();
    let engine = ws.engine(Arc::new(ScriptedProvider::texts(&[" reply A", " reply B"])));
    let app = murmur_gateway::build_router(engine.clone());

    let (a, b) = tokio::join!(
        app.clone().oneshot(chat_request("question A")),
        app.clone().oneshot(chat_request("question B")),
    );
    assert_eq!(a.unwrap().status(), StatusCode::OK);
    assert_eq!(b.unwrap().status(), StatusCode::OK);

    let reloaded = SessionHistory::load(ws.history_path(), 0).unwrap();
    let roles: Vec<Role> = reloaded.utterances().iter().map(|u| u.role()).collect();
    assert_eq!(roles, vec![Role::User, Role::Assistant, Role::User, Role::Assistant]);
}

// ── E2E: Legacy and damaged history files ────────────────────────────────

#[tokio::test]
async fn e2e_legacy_history_is_used_as_context() {
    let ws = Workspace::new();
    std::fs::write(ws.history_path(), "User: hi\nAI: hello\n").unwrap();

    let provider = Arc::new(ScriptedProvider::texts(&[" I'm well."]));
    let engine = ws.engine(provider.clone());
    engine.submit("how are you").await.unwrap();

    assert_eq!(
        provider.prompts()[0],
        "User: hi\nAI: hello\nUser: how are you\nAI:"
    );

    let rewritten = std::fs::read_to_string(ws.history_path()).unwrap();
    assert!(rewritten.lines().all(|l| l.starts_with('[')));
    assert_eq!(rewritten.lines().count(), 4);
}

#[tokio::test]
async fn e2e_damaged_history_keeps_readable_prefix() {
    let ws = Workspace::new();
    std::fs::write(
        ws.history_path(),
        "User: kept\nAI: also kept\n@@ garbage from a crash\nUser: lost\n",
    )
    .unwrap();

    let engine = ws.engine(Arc::new(ScriptedProvider::texts(&[])));
    let history = engine.history_snapshot().await;
    assert_eq!(history.len(), 2);
    assert_eq!(history[1].text(), "also kept");
}

// ── E2E: Empty prompts are rejected before anything happens ──────────────

#[tokio::test]
async fn e2e_empty_prompt_rejected_without_mutation() {
    let ws = Workspace::new();
    let provider = Arc::new(ScriptedProvider::texts(&[]));
    let app = murmur_gateway::build_router(ws.engine(provider.clone()));

    let response = app.oneshot(chat_request("")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "No prompt provided");

    assert!(provider.prompts().is_empty());
    assert!(!ws.history_path().exists());
    assert!(!ws.log_dir().exists());
}
