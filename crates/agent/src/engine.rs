//! The conversation engine — one turn at a time, from raw text to recorded reply.

use crate::composer::{compose, extract_reply};
use murmur_config::AppConfig;
use murmur_core::error::{Error, ProviderError};
use murmur_core::message::Utterance;
use murmur_core::provider::{GenerationRequest, Provider};
use murmur_memory::{SessionHistory, TranscriptStore};
use murmur_voice::{CommandSynthesizer, SpeechDispatcher, SpeechPolicy};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Stop sequence that keeps the model from writing the user's next line.
const USER_TURN_STOP: &str = "\nUser:";

/// Turn parameters, fixed at construction.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Prior utterances included in each prompt
    pub window_size: usize,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Upper bound on one generation call (unbounded when `None`)
    pub timeout: Option<Duration>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            window_size: 20,
            max_tokens: 256,
            temperature: 0.7,
            timeout: None,
        }
    }
}

impl EngineConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            window_size: config.session.window_size,
            max_tokens: config.model.max_tokens,
            temperature: config.model.temperature,
            timeout: config.model.timeout_secs.map(Duration::from_secs),
        }
    }
}

/// Per-turn options chosen by the front-end.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubmitOptions {
    /// Voice the reply through the speech dispatcher
    pub speak: bool,
}

/// The outcome of a successful turn.
///
/// A turn succeeds once the model has replied; the flags report side
/// effects that failed without failing the turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssistantReply {
    pub text: String,
    pub history_persisted: bool,
    pub transcript_logged: bool,
    pub speech_dispatched: bool,
}

/// Whether a turn is currently in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Processing,
}

/// Owns the session and serializes every turn against it.
pub struct ConversationEngine {
    provider: Arc<dyn Provider>,
    history: Mutex<SessionHistory>,
    transcript: TranscriptStore,
    speech: SpeechDispatcher,
    config: EngineConfig,
    turn_in_flight: AtomicBool,
}

/// Marks a turn as in flight until dropped, including on early return or
/// when the turn's future is cancelled.
struct TurnMark<'a>(&'a AtomicBool);

impl<'a> TurnMark<'a> {
    fn enter(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::Release);
        Self(flag)
    }
}

impl Drop for TurnMark<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl ConversationEngine {
    /// Create an engine with default turn parameters and no speech.
    pub fn new(
        provider: Arc<dyn Provider>,
        history: SessionHistory,
        transcript: TranscriptStore,
    ) -> Self {
        Self {
            provider,
            history: Mutex::new(history),
            transcript,
            speech: SpeechDispatcher::disabled(),
            config: EngineConfig::default(),
            turn_in_flight: AtomicBool::new(false),
        }
    }

    /// Build the engine described by `config`: loads the session history,
    /// opens the transcript directory and sets up speech output.
    pub fn from_config(config: &AppConfig, provider: Arc<dyn Provider>) -> Result<Self, Error> {
        let history = SessionHistory::load(config.history_path(), config.session.max_retained)?;
        info!(
            path = %history.path().display(),
            utterances = history.len(),
            "Session history ready"
        );

        let transcript = if config.transcript.enabled {
            TranscriptStore::new(config.log_dir())
        } else {
            TranscriptStore::disabled()
        };

        Ok(Self::new(provider, history, transcript)
            .with_config(EngineConfig::from_app_config(config))
            .with_speech(speech_from_config(config)))
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_speech(mut self, speech: SpeechDispatcher) -> Self {
        self.speech = speech;
        self
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The speech dispatcher, for front-ends that speak arbitrary text.
    pub fn speech(&self) -> &SpeechDispatcher {
        &self.speech
    }

    /// `Processing` from the moment a turn holds the session until it has
    /// recorded its reply. Snapshots and resets do not count as turns.
    pub fn state(&self) -> EngineState {
        if self.turn_in_flight.load(Ordering::Acquire) {
            EngineState::Processing
        } else {
            EngineState::Idle
        }
    }

    /// Run one turn without speech output.
    pub async fn submit(&self, raw_text: &str) -> Result<AssistantReply, Error> {
        self.submit_with(raw_text, SubmitOptions::default()).await
    }

    /// Run one turn.
    ///
    /// Fails only with [`Error::EmptyInput`] (nothing touched) or
    /// [`Error::GenerationFailed`] (history and transcript untouched).
    pub async fn submit_with(
        &self,
        raw_text: &str,
        options: SubmitOptions,
    ) -> Result<AssistantReply, Error> {
        let text = raw_text.trim();
        if text.is_empty() {
            return Err(Error::EmptyInput);
        }

        let mut history = self.history.lock().await;
        let _turn = TurnMark::enter(&self.turn_in_flight);
        let started = Instant::now();
        let user = Utterance::user(text);

        let prompt = compose(history.utterances(), text, self.config.window_size);
        debug!(
            prior = history.len().min(self.config.window_size),
            chars = prompt.as_str().len(),
            "Prompt composed"
        );

        let reply_text = match self.generate(prompt.into_string()).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(provider = self.provider.name(), error = %e, "Generation failed, turn abandoned");
                return Err(Error::GenerationFailed(e));
            }
        };

        history.append(user);
        history.append(Utterance::assistant(reply_text.clone()));

        let history_persisted = match history.persist() {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Failed to persist session history");
                false
            }
        };

        let transcript_logged = match self.transcript.append(text, &reply_text) {
            Ok(_) => true,
            Err(e) => {
                warn!(error = %e, "Failed to write transcript log");
                false
            }
        };

        let speech_dispatched = options.speak && self.speech.speak(&reply_text);

        info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            utterances = history.len(),
            history_persisted,
            transcript_logged,
            speech_dispatched,
            "Turn complete"
        );

        Ok(AssistantReply {
            text: reply_text,
            history_persisted,
            transcript_logged,
            speech_dispatched,
        })
    }

    /// A copy of the current utterances (waits for any in-flight turn).
    pub async fn history_snapshot(&self) -> Vec<Utterance> {
        self.history.lock().await.utterances().to_vec()
    }

    /// Forget the conversation and rewrite the history file empty.
    pub async fn reset_history(&self) -> Result<(), Error> {
        let mut history = self.history.lock().await;
        history.clear();
        history.persist()?;
        info!(path = %history.path().display(), "Session history cleared");
        Ok(())
    }

    async fn generate(&self, prompt: String) -> Result<String, ProviderError> {
        let request = GenerationRequest::new(prompt, self.config.max_tokens)
            .with_temperature(self.config.temperature)
            .with_stop(vec![USER_TURN_STOP.to_string()]);

        let call = self.provider.generate(request);
        let response = match self.config.timeout {
            Some(limit) => tokio::time::timeout(limit, call).await.map_err(|_| {
                ProviderError::Timeout(format!("no completion within {}s", limit.as_secs()))
            })??,
            None => call.await?,
        };

        debug!(model = %response.model, usage = ?response.usage, "Completion received");

        let reply = extract_reply(&response.text);
        if reply.is_empty() {
            return Err(ProviderError::EmptyCompletion);
        }
        Ok(reply)
    }
}

/// Speech output as configured; falls back to silence when the backend
/// cannot be set up.
fn speech_from_config(config: &AppConfig) -> SpeechDispatcher {
    if !config.speech.enabled {
        return SpeechDispatcher::disabled();
    }

    let policy = if config.speech.interrupt_previous {
        SpeechPolicy::Interrupt
    } else {
        SpeechPolicy::Overlap
    };

    match CommandSynthesizer::new(&config.speech.tts_command) {
        Ok(synth) => SpeechDispatcher::new(Arc::new(synth), policy),
        Err(e) => {
            warn!(error = %e, "Speech output disabled");
            SpeechDispatcher::disabled()
        }
    }
}
