//! `murmur history` — Inspect or clear the session history.

use super::{CommandResult, load_config};
use chrono::Local;
use murmur_core::message::Utterance;
use murmur_memory::SessionHistory;
use std::io::Write;

pub fn show(limit: usize) -> CommandResult {
    let config = load_config()?;
    let history = SessionHistory::load(config.history_path(), 0)?;

    if history.is_empty() {
        println!("No conversation yet ({}).", history.path().display());
        return Ok(());
    }

    println!("History: {} ({} utterances)", history.path().display(), history.len());
    println!();
    print_tail(history.utterances(), limit, &mut std::io::stdout())?;
    Ok(())
}

pub fn clear() -> CommandResult {
    let config = load_config()?;
    let mut history = SessionHistory::load(config.history_path(), 0)?;
    let removed = history.len();
    history.clear();
    history.persist()?;
    println!("Cleared {removed} utterances from {}", history.path().display());
    Ok(())
}

/// Print the last `limit` utterances (all of them when `limit` is 0).
fn print_tail<W: Write>(utterances: &[Utterance], limit: usize, out: &mut W) -> std::io::Result<()> {
    let start = match limit {
        0 => 0,
        n => utterances.len().saturating_sub(n),
    };
    for u in &utterances[start..] {
        let stamp = u.timestamp().with_timezone(&Local).format("%Y-%m-%d %H:%M:%S");
        writeln!(out, "[{stamp}] {}: {}", u.role(), u.text())?;
    }
    Ok(())
}
