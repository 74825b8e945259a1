//! Speech backends that shell out to host programs.
//!
//! Synthesis runs `<program> <args..>` (e.g. `espeak`, `say`, `piper-say`)
//! with the text on stdin, or substituted for a `{text}` argument when the
//! command has one. Capture runs `<program> <args..>` and reads the
//! transcription from its stdout (e.g. a `whisper.cpp` wrapper script).
//! Child processes are killed when their job is dropped, which is what makes
//! aborting a speech job actually silence the speaker.

use async_trait::async_trait;
use murmur_core::error::SpeechError;
use murmur_core::speech::{Recognizer, Synthesizer};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

/// Argument replaced by the text to speak.
pub const TEXT_PLACEHOLDER: &str = "{text}";

/// Split a configured argv into program and leading arguments.
fn split_argv(argv: &[String]) -> Result<(String, Vec<String>), SpeechError> {
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| SpeechError::NotConfigured("empty speech command".into()))?;
    if program.trim().is_empty() {
        return Err(SpeechError::NotConfigured("empty speech command".into()));
    }
    Ok((program.clone(), args.to_vec()))
}

/// Speaks by running an external TTS program.
///
/// The text never lands in option position: it goes to stdin unless an
/// argument is exactly `{text}`.
#[derive(Debug, Clone)]
pub struct CommandSynthesizer {
    program: String,
    args: Vec<String>,
}

impl CommandSynthesizer {
    pub fn new(argv: &[String]) -> Result<Self, SpeechError> {
        let (program, args) = split_argv(argv)?;
        Ok(Self { program, args })
    }
}

#[async_trait]
impl Synthesizer for CommandSynthesizer {
    fn name(&self) -> &str {
        &self.program
    }

    async fn speak(&self, text: &str) -> Result<(), SpeechError> {
        debug!(program = %self.program, "Launching speech synthesizer");
        let inline = self.args.iter().any(|a| a == TEXT_PLACEHOLDER);
        let args = self
            .args
            .iter()
            .map(|a| if a == TEXT_PLACEHOLDER { text } else { a.as_str() });

        let mut child = Command::new(&self.program)
            .args(args)
            .stdin(if inline { Stdio::null() } else { Stdio::piped() })
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                SpeechError::SynthesisFailed(format!("failed to launch '{}': {e}", self.program))
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            let written = async {
                stdin.write_all(text.as_bytes()).await?;
                stdin.write_all(b"\n").await?;
                stdin.shutdown().await?;
                Ok::<_, std::io::Error>(())
            }
            .await;
            // A program that exits without reading stdin is judged by its status.
            if let Err(e) = written {
                if e.kind() != std::io::ErrorKind::BrokenPipe {
                    return Err(SpeechError::SynthesisFailed(format!(
                        "failed to send text to '{}': {e}",
                        self.program
                    )));
                }
            }
        }

        let output = child.wait_with_output().await.map_err(|e| {
            SpeechError::SynthesisFailed(format!("'{}' did not finish: {e}", self.program))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SpeechError::SynthesisFailed(format!(
                "'{}' exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }
        Ok(())
    }
}

/// Captures speech by running an external recorder/transcriber.
#[derive(Debug, Clone)]
pub struct CommandRecognizer {
    program: String,
    args: Vec<String>,
}

impl CommandRecognizer {
    pub fn new(argv: &[String]) -> Result<Self, SpeechError> {
        let (program, args) = split_argv(argv)?;
        Ok(Self { program, args })
    }
}

#[async_trait]
impl Recognizer for CommandRecognizer {
    fn name(&self) -> &str {
        &self.program
    }

    async fn listen(&self) -> Result<String, SpeechError> {
        debug!(program = %self.program, "Listening for speech");
        let output = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                SpeechError::CaptureFailed(format!("failed to launch '{}': {e}", self.program))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SpeechError::CaptureFailed(format!(
                "'{}' exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if text.is_empty() {
            return Err(SpeechError::CaptureFailed("no speech recognized".into()));
        }
        Ok(text)
    }
}
