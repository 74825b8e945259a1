//! Input channels for Murmur.
//!
//! A channel turns a raw input stream into [`CliInput`] events for the
//! front-end loop. Reserved words are recognized here so the conversation
//! engine only ever sees real utterances.

pub mod cli;

pub use cli::{CliChannel, CliInput};
