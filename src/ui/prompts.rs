//! ui::prompts
//!
//! Interactive prompts and confirmations.
//!
//! # Design
//!
//! Prompts are only shown in interactive mode. In non-interactive mode a
//! question is answered with its default, so nothing in the cache is ever
//! overwritten without an explicit `--force`.

use std::io::{self, BufRead, Write};

use crate::engine::Confirm;

/// Ask a yes/no question on the terminal.
///
/// Returns `default` when not interactive, on an empty answer or when stdin
/// is closed.
pub fn confirm(message: &str, default: bool, interactive: bool) -> bool {
    if !interactive {
        return default;
    }
    let hint = if default { "[Y/n]" } else { "[y/N]" };
    eprint!("{} {} ", message, hint);
    let _ = io::stderr().flush();

    let mut answer = String::new();
    match io::stdin().lock().read_line(&mut answer) {
        Ok(0) | Err(_) => default,
        Ok(_) => parse_answer(&answer).unwrap_or(default),
    }
}

fn parse_answer(answer: &str) -> Option<bool> {
    match answer.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" => Some(true),
        "n" | "no" => Some(false),
        _ => None,
    }
}

/// [`Confirm`] backed by the terminal, declining by default.
#[derive(Debug, Clone, Copy)]
pub struct TerminalConfirm {
    pub interactive: bool,
}

impl Confirm for TerminalConfirm {
    fn confirm(&self, question: &str) -> bool {
        confirm(question, false, self.interactive)
    }
}
