//! Helper functions for CLI operations.
//!
//! Exit code mapping, the load confirmation prompt and the progress
//! spinner.

use std::{
    io::{self, BufRead, Write},
    time::Duration
};

use indicatif::{ProgressBar, ProgressStyle};

use crate::error::{AppError, AppResult};

/// Exit code for an operation envelope: `0` on success, `1` otherwise.
pub fn envelope_exit_code(success: bool) -> i32 {
    if success { 0 } else { 1 }
}

/// Whether a prompt answer means yes.
///
/// Accepts `y` and `yes` in any case; anything else, including an empty
/// line, is a no.
pub fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

/// Asks a yes/no question on stdout and reads the answer from `input`.
pub fn confirm_with<R: BufRead>(question: &str, input: &mut R) -> AppResult<bool> {
    print!("{} (y/n): ", question);
    io::stdout()
        .flush()
        .map_err(|e| AppError::internal(format!("Failed to write prompt: {}", e)))?;
    let mut answer = String::new();
    input
        .read_line(&mut answer)
        .map_err(|e| AppError::internal(format!("Failed to read answer: {}", e)))?;
    Ok(is_affirmative(&answer))
}

/// Asks a yes/no question on stdin.
pub fn confirm(question: &str) -> AppResult<bool> {
    confirm_with(question, &mut io::stdin().lock())
}

/// Steady-ticking spinner with a message.
pub fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}
