//! Error types for the Murmur domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum; only [`Error::EmptyInput`]
//! and [`Error::GenerationFailed`] ever fail a conversation turn.

use std::path::PathBuf;
use thiserror::Error;

/// The top-level error type for all Murmur operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Turn errors ---
    #[error("Input is empty")]
    EmptyInput,

    #[error("Generation failed: {0}")]
    GenerationFailed(#[from] ProviderError),

    // --- Side-effect errors ---
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by model server, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Model returned an empty completion")]
    EmptyCompletion,
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Corrupt history file {path} at line {line}: {reason}")]
    CorruptHistory {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("Failed to read history file {path}: {reason}")]
    HistoryReadFailed { path: PathBuf, reason: String },

    #[error("Failed to write history file {path}: {reason}")]
    HistoryWriteFailed { path: PathBuf, reason: String },

    #[error("Failed to write transcript log {path}: {reason}")]
    LogWriteFailed { path: PathBuf, reason: String },
}

#[derive(Debug, Clone, Error)]
pub enum SpeechError {
    #[error("Speech synthesis failed: {0}")]
    SynthesisFailed(String),

    #[error("Speech capture failed: {0}")]
    CaptureFailed(String),

    #[error("Speech backend not configured: {0}")]
    NotConfigured(String),
}

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("Channel connection lost: {0}")]
    ConnectionLost(String),
}
