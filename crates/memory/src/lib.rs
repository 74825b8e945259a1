//! Conversation persistence for Murmur.
//!
//! Two stores with very different contracts:
//! - [`SessionHistory`]: the rewritable memory of the running conversation,
//!   reloaded at startup and atomically replaced after every turn.
//! - [`TranscriptStore`]: the write-only audit log, one file per day.

pub mod history;
pub mod transcript;

pub use history::SessionHistory;
pub use transcript::TranscriptStore;
