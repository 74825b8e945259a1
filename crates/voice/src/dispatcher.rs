//! Fire-and-forget speech output.
//!
//! `speak` hands the text to a Tokio task and returns at once. Whatever
//! happens inside the synthesizer is logged here and never reaches the
//! caller.

use murmur_core::speech::Synthesizer;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// What happens to a job still speaking when a new one arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpeechPolicy {
    /// Cancel the previous job; only the newest reply is heard.
    #[default]
    Interrupt,
    /// Let jobs run side by side (overlapping audio).
    Overlap,
}

/// Schedules synthesis jobs independently of the conversation turn.
pub struct SpeechDispatcher {
    synthesizer: Arc<dyn Synthesizer>,
    policy: SpeechPolicy,
    current: Mutex<Option<JoinHandle<()>>>,
}

impl SpeechDispatcher {
    pub fn new(synthesizer: Arc<dyn Synthesizer>, policy: SpeechPolicy) -> Self {
        Self {
            synthesizer,
            policy,
            current: Mutex::new(None),
        }
    }

    /// A dispatcher backed by the silent synthesizer.
    pub fn disabled() -> Self {
        Self::new(Arc::new(crate::noop::NoopSynthesizer), SpeechPolicy::Overlap)
    }

    /// Name of the synthesis backend.
    pub fn backend(&self) -> &str {
        self.synthesizer.name()
    }

    /// Schedule `text` to be spoken and return immediately.
    ///
    /// Returns `false` when nothing was scheduled: blank text, or no Tokio
    /// runtime to run the job on.
    pub fn speak(&self, text: &str) -> bool {
        if text.trim().is_empty() {
            return false;
        }

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                warn!("Speech requested outside the async runtime, dropping job");
                return false;
            }
        };

        let synthesizer = self.synthesizer.clone();
        let text = text.to_string();
        let job = runtime.spawn(async move {
            debug!(backend = synthesizer.name(), chars = text.len(), "Speech job started");
            match synthesizer.speak(&text).await {
                Ok(()) => debug!("Speech job finished"),
                Err(e) => warn!(error = %e, "Speech synthesis failed"),
            }
        });

        let mut slot = self.current.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = slot.replace(job) {
            if self.policy == SpeechPolicy::Interrupt && !previous.is_finished() {
                debug!("Interrupting previous speech job");
                previous.abort();
            }
        }
        true
    }

    /// Cancel the job currently speaking, if any.
    pub fn stop(&self) {
        let mut slot = self.current.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(job) = slot.take() {
            job.abort();
        }
    }

    /// Wait for the most recent job to finish playing.
    pub async fn finish(&self) {
        let job = {
            let mut slot = self.current.lock().unwrap_or_else(|e| e.into_inner());
            slot.take()
        };
        if let Some(job) = job {
            let _ = job.await;
        }
    }

    /// Whether the most recently scheduled job is still running.
    pub fn is_speaking(&self) -> bool {
        let slot = self.current.lock().unwrap_or_else(|e| e.into_inner());
        slot.as_ref().is_some_and(|job| !job.is_finished())
    }
}
