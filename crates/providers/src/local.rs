//! Local inference provider — runs the language model in-process.
//!
//! Uses [Candle](https://github.com/huggingface/candle) (Rust-native ML) to run
//! GGUF-quantized Llama-family models with no network and no API keys once
//! the weights are cached.
//!
//! `model.name` may be a preset alias (`tinyllama`, `smollm:360m`, `qwen:0.5b`)
//! or a path to a `.gguf` file with a `tokenizer.json` next to it.

use async_trait::async_trait;
use candle_core::quantized::gguf_file;
use candle_core::{Device, Tensor};
use candle_transformers::generation::LogitsProcessor;
use candle_transformers::models::quantized_llama as qlm;
use hf_hub::api::sync::Api;
use murmur_core::error::ProviderError;
use murmur_core::provider::{GenerationRequest, GenerationResponse, Usage};
use std::path::Path;
use std::sync::Arc;
use tokenizers::Tokenizer;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

// ── Well-known model aliases ───────────────────────────────────────────

/// Friendly aliases that resolve to HuggingFace repos + filenames.
struct ModelPreset {
    repo: &'static str,
    gguf_file: &'static str,
    tokenizer_repo: &'static str,
}

fn resolve_preset(alias: &str) -> Option<ModelPreset> {
    match alias.to_lowercase().as_str() {
        "tinyllama" | "tiny-llama" | "tinyllama-1.1b" => Some(ModelPreset {
            repo: "TheBloke/TinyLlama-1.1B-Chat-v1.0-GGUF",
            gguf_file: "tinyllama-1.1b-chat-v1.0.Q4_K_M.gguf",
            tokenizer_repo: "TinyLlama/TinyLlama-1.1B-Chat-v1.0",
        }),
        "smollm" | "smollm:360m" | "smollm-360m" => Some(ModelPreset {
            repo: "TheBloke/SmolLM-360M-Instruct-GGUF",
            gguf_file: "smollm-360m-instruct.Q4_K_M.gguf",
            tokenizer_repo: "HuggingFaceTB/SmolLM-360M-Instruct",
        }),
        "smollm:1.7b" | "smollm-1.7b" => Some(ModelPreset {
            repo: "TheBloke/SmolLM-1.7B-Instruct-GGUF",
            gguf_file: "smollm-1.7b-instruct.Q4_K_M.gguf",
            tokenizer_repo: "HuggingFaceTB/SmolLM-1.7B-Instruct",
        }),
        "qwen:0.5b" | "qwen-0.5b" | "qwen2-0.5b" => Some(ModelPreset {
            repo: "Qwen/Qwen2-0.5B-Instruct-GGUF",
            gguf_file: "qwen2-0_5b-instruct-q4_k_m.gguf",
            tokenizer_repo: "Qwen/Qwen2-0.5B-Instruct",
        }),
        _ => None,
    }
}

// ── Local Provider ─────────────────────────────────────────────────────

/// A provider that runs a GGUF-quantized model locally via Candle.
///
/// The model sits behind a Mutex: Candle inference on CPU is
/// single-threaded and the KV cache is per-model state.
pub struct LocalProvider {
    inner: Arc<Mutex<Option<LocalModelState>>>,
    model_name: String,
}

/// The loaded model state (tokenizer + weights).
struct LocalModelState {
    model: qlm::ModelWeights,
    tokenizer: Tokenizer,
    device: Device,
    eos_token_id: u32,
}

impl LocalProvider {
    /// Create a provider; the model is loaded lazily on first request.
    pub fn new(model_name: &str) -> Self {
        Self {
            inner: Arc::new(Mutex::new(None)),
            model_name: model_name.to_string(),
        }
    }
}

impl LocalModelState {
    /// Load a model by alias or path.
    fn load(model_name: &str) -> Result<Self, ProviderError> {
        let device = Device::Cpu;

        if Path::new(model_name).exists() && model_name.ends_with(".gguf") {
            return Self::load_from_path(Path::new(model_name), &device);
        }

        let preset = resolve_preset(model_name).ok_or_else(|| {
            ProviderError::ModelNotFound(format!(
                "Unknown local model '{model_name}'. Available presets: tinyllama, \
                 smollm:360m, smollm:1.7b, qwen:0.5b. Or provide a path to a .gguf file."
            ))
        })?;

        info!(
            model = model_name,
            repo = preset.repo,
            file = preset.gguf_file,
            "Downloading/loading local model"
        );

        let api = Api::new().map_err(|e| {
            ProviderError::Network(format!("Failed to initialize HuggingFace Hub API: {e}"))
        })?;

        let model_path = api.model(preset.repo.to_string()).get(preset.gguf_file).map_err(|e| {
            ProviderError::Network(format!(
                "Failed to download model '{}' from '{}': {e}",
                preset.gguf_file, preset.repo
            ))
        })?;

        let tokenizer_path = api
            .model(preset.tokenizer_repo.to_string())
            .get("tokenizer.json")
            .map_err(|e| {
                ProviderError::Network(format!(
                    "Failed to download tokenizer from '{}': {e}",
                    preset.tokenizer_repo
                ))
            })?;

        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| ProviderError::NotConfigured(format!("Failed to load tokenizer: {e}")))?;

        Self::from_files(&model_path, tokenizer, &device)
    }

    /// Load from an explicit GGUF file path with a sibling `tokenizer.json`.
    fn load_from_path(path: &Path, device: &Device) -> Result<Self, ProviderError> {
        info!(path = %path.display(), "Loading local GGUF model");

        let tokenizer_path = path.with_file_name("tokenizer.json");
        if !tokenizer_path.exists() {
            return Err(ProviderError::NotConfigured(format!(
                "No tokenizer.json found next to {}",
                path.display()
            )));
        }
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| ProviderError::NotConfigured(format!("Failed to load tokenizer: {e}")))?;

        Self::from_files(path, tokenizer, device)
    }

    fn from_files(path: &Path, tokenizer: Tokenizer, device: &Device) -> Result<Self, ProviderError> {
        let mut file = std::fs::File::open(path)
            .map_err(|e| ProviderError::NotConfigured(format!("Failed to open model file: {e}")))?;

        let gguf = gguf_file::Content::read(&mut file)
            .map_err(|e| ProviderError::NotConfigured(format!("Failed to parse GGUF file: {e}")))?;

        let model = qlm::ModelWeights::from_gguf(gguf, &mut file, device).map_err(|e| {
            ProviderError::NotConfigured(format!("Failed to load model weights: {e}"))
        })?;

        let eos_token_id = tokenizer
            .token_to_id("</s>")
            .or_else(|| tokenizer.token_to_id("<|endoftext|>"))
            .or_else(|| tokenizer.token_to_id("<|im_end|>"))
            .or_else(|| tokenizer.token_to_id("<|eot_id|>"))
            .unwrap_or(2);

        info!(eos_token_id, "Local model loaded successfully");

        Ok(Self {
            model,
            tokenizer,
            device: device.clone(),
            eos_token_id,
        })
    }

    /// Run inference: tokenize → sample until EOS, a stop sequence, or
    /// `max_tokens` → decode.
    fn generate(
        &mut self,
        prompt: &str,
        max_tokens: u32,
        temperature: f32,
        stop: &[String],
    ) -> Result<(String, u32, u32), ProviderError> {
        let encoding = self
            .tokenizer
            .encode(prompt, true)
            .map_err(|e| ProviderError::ApiError {
                status_code: 500,
                message: format!("Tokenization failed: {e}"),
            })?;

        let prompt_tokens = encoding.get_ids();
        let prompt_token_count = prompt_tokens.len() as u32;

        debug!(
            prompt_tokens = prompt_token_count,
            max_tokens, temperature, "Starting local generation"
        );

        let mut next_input = Tensor::new(prompt_tokens, &self.device)
            .and_then(|t| t.unsqueeze(0))
            .map_err(map_candle_err)?;

        let mut logits_processor = if temperature <= 0.0 {
            LogitsProcessor::new(42, None, None)
        } else {
            LogitsProcessor::new(42, Some(temperature as f64), None)
        };

        let mut generated: Vec<u32> = Vec::new();
        let mut position = 0usize;
        let mut output = String::new();

        for _ in 0..max_tokens {
            let seq_len = next_input.dim(1).map_err(map_candle_err)?;
            let logits = self
                .model
                .forward(&next_input, position)
                .and_then(|l| l.squeeze(0))
                .map_err(map_candle_err)?;
            position += seq_len;

            let next_token = logits_processor.sample(&logits).map_err(map_candle_err)?;
            if next_token == self.eos_token_id {
                break;
            }
            generated.push(next_token);

            if !stop.is_empty() {
                output = self.decode(&generated)?;
                if let Some(cut) = stop.iter().filter_map(|s| output.find(s.as_str())).min() {
                    output.truncate(cut);
                    break;
                }
            }

            next_input = Tensor::new(&[next_token][..], &self.device)
                .and_then(|t| t.unsqueeze(0))
                .map_err(map_candle_err)?;
        }

        if stop.is_empty() {
            output = self.decode(&generated)?;
        }

        let completion_token_count = generated.len() as u32;
        debug!(completion_tokens = completion_token_count, "Generation complete");

        Ok((output, prompt_token_count, completion_token_count))
    }

    fn decode(&self, tokens: &[u32]) -> Result<String, ProviderError> {
        self.tokenizer
            .decode(tokens, true)
            .map_err(|e| ProviderError::ApiError {
                status_code: 500,
                message: format!("Detokenization failed: {e}"),
            })
    }
}

/// Map Candle errors to ProviderError.
fn map_candle_err(e: candle_core::Error) -> ProviderError {
    ProviderError::ApiError {
        status_code: 500,
        message: format!("Candle inference error: {e}"),
    }
}

// ── Provider trait implementation ──────────────────────────────────────

#[async_trait]
impl murmur_core::provider::Provider for LocalProvider {
    fn name(&self) -> &str {
        "local"
    }

    async fn generate(
        &self,
        request: GenerationRequest,
    ) -> std::result::Result<GenerationResponse, ProviderError> {
        {
            let mut state = self.inner.lock().await;
            if state.is_none() {
                info!(model = %self.model_name, "Loading local model on first request...");
                let name = self.model_name.clone();
                let loaded = tokio::task::spawn_blocking(move || LocalModelState::load(&name))
                    .await
                    .map_err(|e| ProviderError::ApiError {
                        status_code: 500,
                        message: format!("Model loading task failed: {e}"),
                    })??;
                *state = Some(loaded);
            }
        }

        let inner = self.inner.clone();
        let (output, prompt_tokens, completion_tokens) = tokio::task::spawn_blocking(move || {
            let mut guard = inner.blocking_lock();
            match guard.as_mut() {
                Some(state) => state.generate(
                    &request.prompt,
                    request.max_tokens,
                    request.temperature,
                    &request.stop,
                ),
                None => Err(ProviderError::NotConfigured("local model is not loaded".into())),
            }
        })
        .await
        .map_err(|e| ProviderError::ApiError {
            status_code: 500,
            message: format!("Inference task panicked: {e}"),
        })??;

        let clean = output
            .trim_end_matches("</s>")
            .trim_end_matches("<|im_end|>")
            .trim_end_matches("<|eot_id|>")
            .to_string();

        if clean.trim().is_empty() {
            warn!(model = %self.model_name, "Local model produced no text");
        }

        Ok(GenerationResponse {
            text: clean,
            usage: Some(Usage {
                prompt_tokens,
                completion_tokens,
                total_tokens: prompt_tokens + completion_tokens,
            }),
            model: format!("local/{}", self.model_name),
        })
    }
}
