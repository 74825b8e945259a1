//! Voice side channel for Murmur.
//!
//! The [`SpeechDispatcher`] runs synthesis jobs off the request path so a
//! slow or broken speech backend can never delay or fail a text exchange.
//! Backends shell out to whatever TTS/STT programs the host provides.

pub mod command;
pub mod dispatcher;
pub mod noop;

pub use command::{CommandRecognizer, CommandSynthesizer};
pub use dispatcher::{SpeechDispatcher, SpeechPolicy};
pub use noop::NoopSynthesizer;
