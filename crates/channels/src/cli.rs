//! CLI channel — interactive terminal-based chat.
//!
//! Reads lines from stdin (or any async reader) on a background task and
//! delivers them as [`CliInput`] events. Used for `murmur chat`.

use murmur_core::error::ChannelError;
use tokio::io::{self, AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::debug;

/// One line of console input, classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliInput {
    /// An utterance for the conversation engine
    Message(String),
    /// Capture the next utterance through speech recognition
    Voice,
    /// Leave the session
    Exit,
}

/// Interactive CLI channel for terminal-based chat.
#[derive(Debug, Clone)]
pub struct CliChannel {
    voice_keyword: String,
}

impl CliChannel {
    pub fn new(voice_keyword: impl Into<String>) -> Self {
        Self {
            voice_keyword: voice_keyword.into(),
        }
    }

    /// Classify one raw line. Blank lines yield nothing.
    pub fn classify(&self, line: &str) -> Option<CliInput> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let lowered = line.to_lowercase();
        if matches!(lowered.as_str(), "exit" | "quit" | "/exit" | "/quit" | ":q") {
            return Some(CliInput::Exit);
        }
        if !self.voice_keyword.is_empty() && lowered == self.voice_keyword.to_lowercase() {
            return Some(CliInput::Voice);
        }
        Some(CliInput::Message(line.to_string()))
    }

    /// Start reading stdin.
    pub fn start(&self) -> mpsc::Receiver<Result<CliInput, ChannelError>> {
        self.start_from(BufReader::new(io::stdin()))
    }

    /// Start reading from `reader`. The stream ends after `Exit` or EOF.
    pub fn start_from<R>(&self, reader: R) -> mpsc::Receiver<Result<CliInput, ChannelError>>
    where
        R: AsyncBufRead + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(32);
        let channel = self.clone();

        tokio::spawn(async move {
            let mut lines = reader.lines();

            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        let Some(input) = channel.classify(&line) else {
                            continue;
                        };
                        let exit = input == CliInput::Exit;
                        if tx.send(Ok(input)).await.is_err() || exit {
                            break;
                        }
                    }
                    Ok(None) => {
                        debug!("Console input closed");
                        break;
                    }
                    Err(e) => {
                        let _ = tx.send(Err(ChannelError::ConnectionLost(e.to_string()))).await;
                        break;
                    }
                }
            }
        });

        rx
    }
}

impl Default for CliChannel {
    fn default() -> Self {
        Self::new("voice")
    }
}
