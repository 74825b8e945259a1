//! # Murmur Core
//!
//! Domain types, traits, and error definitions for the Murmur local
//! conversational assistant. This crate has **zero framework dependencies**:
//! it defines the domain model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator (text generation, speech synthesis, speech
//! capture) is defined as a trait here. Implementations live in their
//! respective crates, so the conversation engine can be driven by mock
//! backends in tests and by real ones in the binary.

pub mod error;
pub mod message;
pub mod provider;
pub mod speech;

// Re-export key types at crate root for ergonomics
pub use error::{ChannelError, Error, ProviderError, Result, SpeechError, StorageError};
pub use message::{Role, TranscriptEntry, Utterance};
pub use provider::{GenerationRequest, GenerationResponse, Provider, Usage};
pub use speech::{Recognizer, Synthesizer};
