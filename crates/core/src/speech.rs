//! Speech traits — synthesis (text → audio) and capture (audio → text).
//!
//! Both are external collaborators. Synthesis is only ever driven through
//! the fire-and-forget dispatcher; capture blocks the caller until the
//! microphone recording has been transcribed.

use async_trait::async_trait;
use crate::error::SpeechError;

/// Speaks text aloud.
#[async_trait]
pub trait Synthesizer: Send + Sync {
    /// The backend name (e.g., "command", "none").
    fn name(&self) -> &str;

    /// Speak `text`, resolving once playback has finished.
    async fn speak(&self, text: &str) -> std::result::Result<(), SpeechError>;
}

/// Captures one spoken utterance and returns its transcription.
#[async_trait]
pub trait Recognizer: Send + Sync {
    fn name(&self) -> &str;

    /// Record until the speaker stops, then return the recognized text.
    async fn listen(&self) -> std::result::Result<String, SpeechError>;
}
