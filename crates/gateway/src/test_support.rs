//! Engine fixtures for gateway tests.

use murmur_agent::ConversationEngine;
use murmur_core::error::ProviderError;
use murmur_core::provider::{GenerationRequest, GenerationResponse, Provider};
use murmur_memory::{SessionHistory, TranscriptStore};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Answers every request with the same text, or the same error.
pub struct StubProvider {
    outcome: Result<String, ProviderError>,
    calls: AtomicUsize,
}

impl StubProvider {
    pub fn replying(text: &str) -> Self {
        Self {
            outcome: Ok(text.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(error: ProviderError) -> Self {
        Self {
            outcome: Err(error),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Provider for StubProvider {
    fn name(&self) -> &str {
        "stub"
    }

    async fn generate(&self, _request: GenerationRequest) -> Result<GenerationResponse, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let text = self.outcome.clone()?;
        Ok(GenerationResponse {
            text,
            usage: None,
            model: "stub-model".into(),
        })
    }
}

/// An engine writing into a private temporary directory.
pub struct Harness {
    pub engine: Arc<ConversationEngine>,
    pub provider: Arc<StubProvider>,
    pub history_path: PathBuf,
    pub log_dir: PathBuf,
    _tmp: tempfile::TempDir,
}

impl Harness {
    pub fn new(provider: StubProvider) -> Self {
        let tmp = tempfile::tempdir().unwrap();
        let history_path = tmp.path().join("history.txt");
        let log_dir = tmp.path().join("logs");
        let provider = Arc::new(provider);

        let engine = ConversationEngine::new(
            provider.clone(),
            SessionHistory::new(&history_path, 0),
            TranscriptStore::new(&log_dir),
        );

        Self {
            engine: Arc::new(engine),
            provider,
            history_path,
            log_dir,
            _tmp: tmp,
        }
    }
}
