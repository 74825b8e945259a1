//! OpenAI-compatible completion provider.
//!
//! Works with any local server exposing the text `/v1/completions`
//! endpoint: Ollama, llama.cpp `llama-server`, vLLM, LM Studio. The prompt
//! is sent verbatim; no chat template is applied on our side.

use async_trait::async_trait;
use murmur_core::error::ProviderError;
use murmur_core::provider::{GenerationRequest, GenerationResponse, Usage};
use serde::Deserialize;
use tracing::{debug, warn};

/// A provider backed by an OpenAI-compatible HTTP completion server.
pub struct OpenAiCompatProvider {
    name: String,
    base_url: String,
    api_key: Option<String>,
    model: String,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    /// Create a new OpenAI-compatible provider.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
    ) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| ProviderError::NotConfigured(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.is_empty()),
            model: model.into(),
            client,
        })
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => builder.header("Authorization", format!("Bearer {key}")),
            None => builder,
        }
    }
}

fn map_reqwest_err(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Timeout(e.to_string())
    } else {
        ProviderError::Network(e.to_string())
    }
}

#[async_trait]
impl murmur_core::Provider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(
        &self,
        request: GenerationRequest,
    ) -> std::result::Result<GenerationResponse, ProviderError> {
        let url = format!("{}/completions", self.base_url);

        let mut body = serde_json::json!({
            "model": self.model,
            "prompt": request.prompt,
            "max_tokens": request.max_tokens,
            "temperature": request.temperature,
            "stream": false,
        });

        if !request.stop.is_empty() {
            body["stop"] = serde_json::json!(request.stop);
        }

        debug!(provider = %self.name, model = %self.model, "Sending completion request");

        let response = self
            .authorized(self.client.post(&url))
            .json(&body)
            .send()
            .await
            .map_err(map_reqwest_err)?;

        let status = response.status().as_u16();

        if status == 429 {
            return Err(ProviderError::RateLimited {
                retry_after_secs: 5,
            });
        }

        if status == 404 {
            return Err(ProviderError::ModelNotFound(format!(
                "'{}' is not served at {}",
                self.model, self.base_url
            )));
        }

        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Model server returned error");
            return Err(ProviderError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        let api_response: ApiResponse =
            response.json().await.map_err(|e| ProviderError::ApiError {
                status_code: 200,
                message: format!("Failed to parse response: {e}"),
            })?;

        let choice = api_response
            .choices
            .into_iter()
            .next()
            .ok_or(ProviderError::EmptyCompletion)?;

        let usage = api_response.usage.map(|u| Usage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });

        Ok(GenerationResponse {
            text: choice.text,
            usage,
            model: api_response.model.unwrap_or_else(|| self.model.clone()),
        })
    }

    async fn health_check(&self) -> std::result::Result<bool, ProviderError> {
        let url = format!("{}/models", self.base_url);
        let response = self
            .authorized(self.client.get(&url))
            .send()
            .await
            .map_err(map_reqwest_err)?;

        Ok(response.status().is_success())
    }
}

// --- OpenAI completion wire types ---

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    model: Option<String>,
    choices: Vec<ApiChoice>,
    #[serde(default)]
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Json, Router, http::StatusCode, routing::post};
    use murmur_core::Provider;

    /// Serve `router` on an ephemeral port and return its base URL.
    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}/v1")
    }

    #[test]
    fn trailing_slash_trimmed() {
        let p = OpenAiCompatProvider::new("llamacpp", "http://localhost:8080/v1/", "m", None).unwrap();
        assert_eq!(p.base_url, "http://localhost:8080/v1");
    }

    #[test]
    fn parse_completion_response() {
        let json = r#"{
            "model": "llama3.2",
            "choices": [{"text": " hello there", "index": 0, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 12, "completion_tokens": 3, "total_tokens": 15}
        }"#;
        let parsed: ApiResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.choices[0].text, " hello there");
        assert_eq!(parsed.usage.unwrap().total_tokens, 15);
    }

    #[tokio::test]
    async fn generate_sends_prompt_and_stop() {
        let router = Router::new().route(
            "/v1/completions",
            post(|Json(body): Json<serde_json::Value>| async move {
                assert_eq!(body["prompt"], "User: hi\nAI:");
                assert_eq!(body["stop"][0], "\nUser:");
                Json(serde_json::json!({
                    "model": "tiny",
                    "choices": [{"text": " hello"}]
                }))
            }),
        );
        let base = serve(router).await;

        let provider = OpenAiCompatProvider::new("ollama", base, "tiny", None).unwrap();
        let request = GenerationRequest::new("User: hi\nAI:", 16).with_stop(vec!["\nUser:".into()]);
        let response = provider.generate(request).await.unwrap();
        assert_eq!(response.text, " hello");
        assert_eq!(response.model, "tiny");
    }

    #[tokio::test]
    async fn server_error_maps_to_api_error() {
        let router = Router::new().route(
            "/v1/completions",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "out of memory") }),
        );
        let base = serve(router).await;

        let provider = OpenAiCompatProvider::new("ollama", base, "tiny", None).unwrap();
        let err = provider
            .generate(GenerationRequest::new("p", 4))
            .await
            .unwrap_err();
        match err {
            ProviderError::ApiError { status_code, message } => {
                assert_eq!(status_code, 500);
                assert!(message.contains("out of memory"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn empty_choices_is_empty_completion() {
        let router = Router::new().route(
            "/v1/completions",
            post(|| async { Json(serde_json::json!({"choices": []})) }),
        );
        let base = serve(router).await;

        let provider = OpenAiCompatProvider::new("ollama", base, "tiny", None).unwrap();
        let err = provider
            .generate(GenerationRequest::new("p", 4))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::EmptyCompletion));
    }

    #[tokio::test]
    async fn unreachable_server_is_network_error() {
        // Port 9 (discard) is almost never listening locally
        let provider =
            OpenAiCompatProvider::new("ollama", "http://127.0.0.1:9/v1", "tiny", None).unwrap();
        let err = provider
            .generate(GenerationRequest::new("p", 4))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Network(_)));
    }
}
