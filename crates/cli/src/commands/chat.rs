//! `murmur chat` — Interactive or single-message conversation.

use super::{CommandResult, build_engine, load_config};
use murmur_agent::{ConversationEngine, SubmitOptions};
use murmur_channels::{CliChannel, CliInput};
use murmur_core::error::ChannelError;
use murmur_core::speech::Recognizer;
use murmur_voice::CommandRecognizer;
use std::io::Write;
use tokio::sync::mpsc;
use tracing::warn;

pub async fn run(message: Option<String>, speak: bool) -> CommandResult {
    let mut config = load_config()?;
    if speak {
        config.speech.enabled = true;
    }
    let engine = build_engine(&config).await?;
    let options = SubmitOptions {
        speak: config.speech.enabled,
    };

    if let Some(msg) = message {
        let mut out = std::io::stdout();
        respond(&engine, &msg, options, &mut out).await?;
        engine.speech().finish().await;
        return Ok(());
    }

    let recognizer: Option<Box<dyn Recognizer>> = if config.speech.stt_command.is_empty() {
        None
    } else {
        match CommandRecognizer::new(&config.speech.stt_command) {
            Ok(r) => Some(Box::new(r) as Box<dyn Recognizer>),
            Err(e) => {
                warn!(error = %e, "Speech capture disabled");
                None
            }
        }
    };

    println!();
    println!("  Murmur — interactive chat");
    println!();
    println!("  Model:    {} ({})", config.model.name, engine.provider_name());
    println!("  History:  {}", config.history_path().display());
    println!("  Speech:   {}", if options.speak { engine.speech().backend() } else { "off" });
    println!();
    println!("  Type your message and press Enter.");
    if recognizer.is_some() {
        println!("  Type '{}' to speak instead.", config.speech.voice_keyword);
    }
    println!("  Type 'exit' or press Ctrl+D to quit.");
    println!();

    let channel = CliChannel::new(config.speech.voice_keyword.clone());
    let rx = channel.start();
    let mut out = std::io::stdout();
    converse(&engine, recognizer.as_deref(), rx, options, &mut out).await?;

    engine.speech().stop();
    println!();
    println!("  Goodbye!");
    Ok(())
}

/// Drive the conversation until the input stream ends or asks to exit.
pub async fn converse<W: Write>(
    engine: &ConversationEngine,
    recognizer: Option<&dyn Recognizer>,
    mut inputs: mpsc::Receiver<Result<CliInput, ChannelError>>,
    options: SubmitOptions,
    out: &mut W,
) -> std::io::Result<()> {
    write!(out, "You: ")?;
    out.flush()?;

    while let Some(input) = inputs.recv().await {
        match input {
            Ok(CliInput::Exit) => break,
            Ok(CliInput::Message(text)) => respond(engine, &text, options, out).await?,
            Ok(CliInput::Voice) => match recognizer {
                Some(recognizer) => {
                    writeln!(out, "Listening...")?;
                    out.flush()?;
                    match recognizer.listen().await {
                        Ok(text) => {
                            writeln!(out, "You said: {text}")?;
                            respond(engine, &text, options, out).await?;
                        }
                        Err(e) => writeln!(out, "[Voice] {e}")?,
                    }
                }
                None => writeln!(
                    out,
                    "[Voice] Speech capture is not configured (set speech.stt_command)."
                )?,
            },
            Err(e) => {
                writeln!(out, "[Input] {e}")?;
                break;
            }
        }

        write!(out, "You: ")?;
        out.flush()?;
    }

    writeln!(out)?;
    Ok(())
}

/// Run one turn and print the outcome.
async fn respond<W: Write>(
    engine: &ConversationEngine,
    text: &str,
    options: SubmitOptions,
    out: &mut W,
) -> std::io::Result<()> {
    match engine.submit_with(text, options).await {
        Ok(reply) => {
            writeln!(out, "AI: {}", reply.text)?;
            if !reply.history_persisted {
                writeln!(out, "[Warning] This exchange could not be saved to history.")?;
            }
        }
        Err(e) => writeln!(out, "[Error] {e}")?,
    }
    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use murmur_core::error::{ProviderError, SpeechError};
    use murmur_core::provider::{GenerationRequest, GenerationResponse, Provider};
    use murmur_memory::{SessionHistory, TranscriptStore};
    use std::sync::Arc;

    /// Replies with the newest user line, upper-cased.
    struct ShoutingProvider;

    #[async_trait::async_trait]
    impl Provider for ShoutingProvider {
        fn name(&self) -> &str {
            "shouting"
        }

        async fn generate(
            &self,
            request: GenerationRequest,
        ) -> Result<GenerationResponse, ProviderError> {
            let last = request
                .prompt
                .lines()
                .rev()
                .find_map(|l| l.strip_prefix("User: "))
                .unwrap_or_default();
            Ok(GenerationResponse {
                text: last.to_uppercase(),
                usage: None,
                model: "shouting".into(),
            })
        }
    }

    struct FixedRecognizer(Result<String, SpeechError>);

    #[async_trait::async_trait]
    impl Recognizer for FixedRecognizer {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn listen(&self) -> Result<String, SpeechError> {
            self.0.clone()
        }
    }

    fn engine(dir: &std::path::Path) -> ConversationEngine {
        ConversationEngine::new(
            Arc::new(ShoutingProvider),
            SessionHistory::new(dir.join("history.txt"), 0),
            TranscriptStore::disabled(),
        )
    }

    fn inputs(items: Vec<CliInput>) -> mpsc::Receiver<Result<CliInput, ChannelError>> {
        let (tx, rx) = mpsc::channel(items.len().max(1));
        for item in items {
            tx.try_send(Ok(item)).unwrap();
        }
        rx
    }

    async fn transcript(
        engine: &ConversationEngine,
        recognizer: Option<&dyn Recognizer>,
        items: Vec<CliInput>,
    ) -> String {
        let mut out = Vec::new();
        converse(engine, recognizer, inputs(items), SubmitOptions::default(), &mut out)
            .await
            .unwrap();
        String::from_utf8(out).unwrap()
    }

    #[tokio::test]
    async fn replies_are_prefixed_and_exit_stops() {
        let tmp = tempfile::tempdir().unwrap();
        let engine = engine(tmp.path());

        let output = transcript(
            &engine,
            None,
            vec![
                CliInput::Message("hello".into()),
                CliInput::Exit,
                CliInput::Message("ignored".into()),
            ],
        )
        .await;

        assert!(output.contains("AI: HELLO\n"));
        assert!(!output.contains("IGNORED"));
        assert_eq!(engine.history_snapshot().await.len(), 2);
    }

    #[tokio::test]
    async fn voice_input_goes_through_recognizer() {
        let tmp = tempfile::tempdir().unwrap();
        let engine = engine(tmp.path());
        let recognizer = FixedRecognizer(Ok("what time is it".into()));

        let output = transcript(&engine, Some(&recognizer), vec![CliInput::Voice]).await;

        assert!(output.contains("You said: what time is it"));
        assert!(output.contains("AI: WHAT TIME IS IT"));
        let history = engine.history_snapshot().await;
        assert_eq!(history[0].text(), "what time is it");
    }

    #[tokio::test]
    async fn failed_capture_skips_the_turn() {
        let tmp = tempfile::tempdir().unwrap();
        let engine = engine(tmp.path());
        let recognizer = FixedRecognizer(Err(SpeechError::CaptureFailed("no microphone".into())));

        let output = transcript(&engine, Some(&recognizer), vec![CliInput::Voice]).await;

        assert!(output.contains("no microphone"));
        assert!(engine.history_snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn voice_without_recognizer_is_explained() {
        let tmp = tempfile::tempdir().unwrap();
        let engine = engine(tmp.path());

        let output = transcript(&engine, None, vec![CliInput::Voice]).await;
        assert!(output.contains("not configured"));
    }
}
