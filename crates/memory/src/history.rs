//! File-backed session history — the conversation's rewritable memory.
//!
//! The backing file is plain text, one utterance per line:
//!
//! ```text
//! [2026-10-19T14:03:22.123456789Z] User: hi
//! [2026-10-19T14:03:23.987654321Z] AI: hello\nhow can I help?
//! ```
//!
//! Backslashes and line breaks inside the text are escaped so every record
//! stays on one line. Lines without the bracketed timestamp (`User: hi`) are
//! accepted on load and stamped with the load time.
//!
//! The whole file is rewritten after every turn through a sibling temporary
//! file and a rename, so a reader never observes a half-written history.

use chrono::{DateTime, SecondsFormat, Utc};
use murmur_core::error::StorageError;
use murmur_core::message::{Role, Utterance};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// The ordered utterances of one conversation plus their backing file.
#[derive(Debug)]
pub struct SessionHistory {
    path: PathBuf,
    utterances: Vec<Utterance>,
    max_retained: usize,
}

impl SessionHistory {
    /// Create an empty history that will persist to `path`.
    ///
    /// `max_retained` caps the number of kept utterances (0 = unbounded).
    pub fn new(path: impl Into<PathBuf>, max_retained: usize) -> Self {
        Self {
            path: path.into(),
            utterances: Vec::new(),
            max_retained,
        }
    }

    /// Load the history stored at `path`.
    ///
    /// A missing file yields an empty history. A malformed line ends the
    /// readable prefix: it and everything after it are discarded with a
    /// warning, so a history damaged by an interrupted write stays usable.
    pub fn load(path: impl Into<PathBuf>, max_retained: usize) -> Result<Self, StorageError> {
        let path = path.into();
        let bytes = match std::fs::read(&path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No session history yet, starting empty");
                return Ok(Self::new(path, max_retained));
            }
            Err(e) => {
                return Err(StorageError::HistoryReadFailed {
                    path,
                    reason: e.to_string(),
                });
            }
        };

        let (content, undecodable) = decode_lines(&bytes);
        let (utterances, failure) = match parse_lines(content) {
            (utterances, None) => (
                utterances,
                undecodable.map(|line| (line, "invalid UTF-8".to_string())),
            ),
            parsed => parsed,
        };

        if let Some((line, reason)) = failure {
            let total = bytes.split(|&b| b == b'\n').count() - usize::from(bytes.ends_with(b"\n"));
            let discarded = total.saturating_sub(line - 1);
            let err = StorageError::CorruptHistory {
                path: path.clone(),
                line,
                reason,
            };
            warn!(error = %err, discarded, "Recovered session history by dropping unreadable tail");
        }

        let mut history = Self {
            path,
            utterances,
            max_retained,
        };
        history.enforce_cap();
        debug!(
            path = %history.path.display(),
            count = history.utterances.len(),
            "Session history loaded"
        );
        Ok(history)
    }

    /// Strictly parse history file content.
    ///
    /// Unlike [`SessionHistory::load`], the first malformed line is an error.
    pub fn parse(path: &Path, content: &str) -> Result<Vec<Utterance>, StorageError> {
        match parse_lines(content) {
            (utterances, None) => Ok(utterances),
            (_, Some((line, reason))) => Err(StorageError::CorruptHistory {
                path: path.to_path_buf(),
                line,
                reason,
            }),
        }
    }

    /// Append an utterance to the in-memory sequence.
    pub fn append(&mut self, utterance: Utterance) {
        self.utterances.push(utterance);
        self.enforce_cap();
    }

    /// Atomically rewrite the backing file from the in-memory sequence.
    pub fn persist(&self) -> Result<(), StorageError> {
        let write_failed = |reason: String| StorageError::HistoryWriteFailed {
            path: self.path.clone(),
            reason,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| write_failed(format!("cannot create directory: {e}")))?;
        }

        let tmp = self.temp_path();
        let result = (|| -> std::io::Result<()> {
            let mut file = std::fs::File::create(&tmp)?;
            file.write_all(render(&self.utterances).as_bytes())?;
            file.sync_all()?;
            std::fs::rename(&tmp, &self.path)
        })();

        if let Err(e) = result {
            let _ = std::fs::remove_file(&tmp);
            return Err(write_failed(e.to_string()));
        }

        debug!(path = %self.path.display(), count = self.utterances.len(), "Session history persisted");
        Ok(())
    }

    /// Drop every utterance from memory (call `persist` to clear the file).
    pub fn clear(&mut self) {
        self.utterances.clear();
    }

    pub fn utterances(&self) -> &[Utterance] {
        &self.utterances
    }

    pub fn len(&self) -> usize {
        self.utterances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.utterances.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn enforce_cap(&mut self) {
        if self.max_retained > 0 && self.utterances.len() > self.max_retained {
            let excess = self.utterances.len() - self.max_retained;
            self.utterances.drain(..excess);
        }
    }

    fn temp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "history".into());
        self.path.with_file_name(format!(".{name}.tmp"))
    }
}

/// Render utterances into the on-disk format.
fn render(utterances: &[Utterance]) -> String {
    let mut out = String::new();
    for u in utterances {
        out.push('[');
        out.push_str(&u.timestamp().to_rfc3339_opts(SecondsFormat::Nanos, true));
        out.push_str("] ");
        out.push_str(u.role().label());
        out.push_str(": ");
        out.push_str(&escape(u.text()));
        out.push('\n');
    }
    out
}

/// Parse lines until the first malformed one.
///
/// Returns the well-formed prefix and, if parsing stopped early, the
/// 1-based line number and reason.
/// Longest prefix of whole lines that is valid UTF-8, plus the 1-based
/// number of the first line that is not.
fn decode_lines(bytes: &[u8]) -> (&str, Option<usize>) {
    match std::str::from_utf8(bytes) {
        Ok(text) => (text, None),
        Err(e) => {
            let valid = &bytes[..e.valid_up_to()];
            let cut = valid.iter().rposition(|&b| b == b'\n').map_or(0, |i| i + 1);
            let line = valid[..cut].iter().filter(|&&b| b == b'\n').count() + 1;
            (std::str::from_utf8(&valid[..cut]).unwrap_or_default(), Some(line))
        }
    }
}

fn parse_lines(content: &str) -> (Vec<Utterance>, Option<(usize, String)>) {
    let loaded_at = Utc::now();
    let mut utterances = Vec::new();

    for (idx, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match parse_line(line, loaded_at) {
            Ok(u) => utterances.push(u),
            Err(reason) => return (utterances, Some((idx + 1, reason))),
        }
    }

    (utterances, None)
}

fn parse_line(line: &str, default_ts: DateTime<Utc>) -> Result<Utterance, String> {
    let (timestamp, rest) = match line.strip_prefix('[') {
        Some(stamped) => {
            let (ts, rest) = stamped
                .split_once("] ")
                .ok_or_else(|| "unterminated timestamp".to_string())?;
            let ts = DateTime::parse_from_rfc3339(ts)
                .map_err(|e| format!("bad timestamp '{ts}': {e}"))?
                .with_timezone(&Utc);
            (ts, rest)
        }
        None => (default_ts, line),
    };

    let (label, text) = rest
        .split_once(':')
        .ok_or_else(|| "missing speaker label".to_string())?;
    let role = Role::from_label(label).ok_or_else(|| format!("unknown speaker '{label}'"))?;
    let text = text.strip_prefix(' ').unwrap_or(text);

    Ok(Utterance::with_timestamp(role, unescape(text)?, timestamp))
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out
}

fn unescape(text: &str) -> Result<String, String> {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some(other) => return Err(format!("invalid escape '\\{other}'")),
            None => return Err("dangling escape at end of line".into()),
        }
    }
    Ok(out)
}
