//! Shared test helpers for engine tests.

use murmur_core::error::ProviderError;
use murmur_core::provider::{GenerationRequest, GenerationResponse, Provider, Usage};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

/// A mock provider that plays back scripted completions.
///
/// Once the script runs out it echoes the newest user line of the prompt
/// (`"echo: <text>"`), which lets tests match replies to their requests.
pub struct MockProvider {
    script: Mutex<VecDeque<Result<String, ProviderError>>>,
    delay: Duration,
    prompts: Mutex<Vec<String>>,
}

impl MockProvider {
    pub fn new(script: Vec<Result<String, ProviderError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            delay: Duration::ZERO,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn echo() -> Self {
        Self::new(Vec::new())
    }

    pub fn replying(texts: &[&str]) -> Self {
        Self::new(texts.iter().map(|t| Ok(t.to_string())).collect())
    }

    /// Sleep this long inside every `generate` call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse, ProviderError> {
        self.prompts.lock().unwrap().push(request.prompt.clone());

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let scripted = self.script.lock().unwrap().pop_front();
        let text = match scripted {
            Some(result) => result?,
            None => {
                let last_user = request
                    .prompt
                    .lines()
                    .rev()
                    .find_map(|l| l.strip_prefix("User: "))
                    .unwrap_or_default();
                format!(" echo: {last_user}")
            }
        };

        Ok(GenerationResponse {
            text,
            usage: Some(Usage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            }),
            model: "mock-model".into(),
        })
    }
}
