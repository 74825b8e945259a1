//! Utterance and transcript domain types.
//!
//! These are the value objects that flow through the whole system:
//! user types or speaks → engine composes a prompt → model replies →
//! both sides are recorded as utterances.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who produced an utterance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The person at the console or browser
    User,
    /// The language model
    Assistant,
}

impl Role {
    /// The speaker label used in prompts and in the history file.
    pub fn label(self) -> &'static str {
        match self {
            Role::User => "User",
            Role::Assistant => "AI",
        }
    }

    /// Parse a speaker label back into a role.
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "User" => Some(Role::User),
            "AI" => Some(Role::Assistant),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// One turn's text attributed to either the user or the assistant.
///
/// Immutable once created: fields are only reachable through accessors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utterance {
    role: Role,
    text: String,
    timestamp: DateTime<Utc>,
}

impl Utterance {
    /// Create an utterance stamped with the current time.
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self::with_timestamp(role, text, Utc::now())
    }

    /// Create an utterance with an explicit timestamp (used when reloading).
    pub fn with_timestamp(role: Role, text: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            role,
            text: text.into(),
            timestamp,
        }
    }

    /// Create a new user utterance.
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, text)
    }

    /// Create a new assistant utterance.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, text)
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// A single exchange recorded in the daily transcript log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub timestamp: DateTime<Utc>,
    pub user_text: String,
    pub assistant_text: String,
}

impl TranscriptEntry {
    pub fn new(user_text: impl Into<String>, assistant_text: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            user_text: user_text.into(),
            assistant_text: assistant_text.into(),
        }
    }
}
