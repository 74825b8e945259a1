//! Prompt composition — turns recent history into a completion prompt.
//!
//! The format is a plain transcript the model is asked to continue:
//!
//! ```text
//! User: hi
//! AI: hello
//! User: how are you
//! AI:
//! ```

use murmur_core::message::{Role, Utterance};

/// Speaker cue the model continues from.
const ASSISTANT_CUE: &str = "AI:";

/// A composed prompt, ready to hand to a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt(String);

impl Prompt {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for Prompt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Build the prompt for `new_utterance` from the last `window_size`
/// utterances of `history`, oldest first.
///
/// Pure: the same inputs always produce the same prompt.
pub fn compose(history: &[Utterance], new_utterance: &str, window_size: usize) -> Prompt {
    let start = history.len().saturating_sub(window_size);
    let window = &history[start..];

    let mut lines: Vec<String> = Vec::with_capacity(window.len() + 2);
    lines.extend(
        window
            .iter()
            .map(|u| format!("{}: {}", u.role().label(), u.text())),
    );
    lines.push(format!("{}: {}", Role::User.label(), new_utterance));
    lines.push(ASSISTANT_CUE.to_string());

    Prompt(lines.join("\n"))
}

/// Clean a raw model completion into the assistant's reply.
///
/// Small models often keep writing the dialogue for both sides; everything
/// from the first line that opens a new user turn is dropped.
pub fn extract_reply(raw: &str) -> String {
    let user_prefix = format!("{}:", Role::User.label());

    let mut kept: Vec<&str> = Vec::new();
    for line in raw.lines() {
        if line.trim_start().starts_with(&user_prefix) {
            break;
        }
        kept.push(line);
    }

    kept.join("\n").trim().to_string()
}
