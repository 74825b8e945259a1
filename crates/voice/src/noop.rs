//! No-op synthesizer — speech output disabled.

use async_trait::async_trait;
use murmur_core::error::SpeechError;
use murmur_core::speech::Synthesizer;

/// A synthesizer that stays silent.
pub struct NoopSynthesizer;

#[async_trait]
impl Synthesizer for NoopSynthesizer {
    fn name(&self) -> &str { "none" }

    async fn speak(&self, _text: &str) -> Result<(), SpeechError> {
        Ok(())
    }
}
