//! The conversation core of Murmur.
//!
//! One turn follows a fixed sequence:
//!
//! 1. **Receive** raw text from a front-end (console or browser)
//! 2. **Compose** a prompt from the tail of the session history
//! 3. **Generate** a continuation via the configured provider
//! 4. **Record** both utterances: history file, then daily transcript
//! 5. **Speak** the reply on the side, if asked to
//!
//! The whole sequence runs under one lock, so concurrent callers never
//! interleave their turns.

pub mod composer;
pub mod engine;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use composer::{Prompt, compose, extract_reply};
pub use engine::{AssistantReply, ConversationEngine, EngineConfig, EngineState, SubmitOptions};
