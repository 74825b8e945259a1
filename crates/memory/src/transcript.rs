//! Daily transcript logs — the append-only audit trail of every exchange.
//!
//! One human-readable file per local calendar day (`2026-10-19.log`).
//! The core only ever appends; rotation and inspection happen elsewhere.

use chrono::{DateTime, Local};
use murmur_core::error::StorageError;
use murmur_core::message::TranscriptEntry;
use std::io::Write;
use std::path::PathBuf;
use tracing::debug;

/// Writes exchanges to `<log_dir>/<YYYY-MM-DD>.log`.
#[derive(Debug, Clone)]
pub struct TranscriptStore {
    log_dir: Option<PathBuf>,
}

impl TranscriptStore {
    pub fn new(log_dir: impl Into<PathBuf>) -> Self {
        Self {
            log_dir: Some(log_dir.into()),
        }
    }

    /// A store that accepts entries and writes nothing.
    pub fn disabled() -> Self {
        Self { log_dir: None }
    }

    /// Record one exchange, stamped with the current wall-clock time.
    pub fn append(
        &self,
        user_text: &str,
        assistant_text: &str,
    ) -> Result<TranscriptEntry, StorageError> {
        let entry = TranscriptEntry::new(user_text, assistant_text);
        self.write_entry(&entry)?;
        Ok(entry)
    }

    /// Write an already-built entry to the file for its calendar day.
    pub fn write_entry(&self, entry: &TranscriptEntry) -> Result<(), StorageError> {
        let Some(dir) = &self.log_dir else {
            return Ok(());
        };

        let local: DateTime<Local> = entry.timestamp.with_timezone(&Local);
        let path = dir.join(format!("{}.log", local.format("%Y-%m-%d")));
        let write_failed = |e: std::io::Error| StorageError::LogWriteFailed {
            path: path.clone(),
            reason: e.to_string(),
        };

        std::fs::create_dir_all(dir).map_err(write_failed)?;

        let stamp = local.format("%Y-%m-%d %H:%M:%S");
        let record = format!(
            "[{stamp}] User: {}\n[{stamp}] AI: {}\n\n",
            continuation_indented(&entry.user_text),
            continuation_indented(&entry.assistant_text)
        );

        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(write_failed)?;
        file.write_all(record.as_bytes()).map_err(write_failed)?;

        debug!(path = %path.display(), "Transcript entry appended");
        Ok(())
    }
}

const CONTINUATION: &str = "\n    ";

/// Indent every line after the first so each record line still starts
/// with a timestamp.
fn continuation_indented(text: &str) -> String {
    text.lines().collect::<Vec<_>>().join(CONTINUATION)
}
