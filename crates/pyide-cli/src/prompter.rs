//! Terminal prompts for confirmations and names.

use std::io::{self, BufRead, Write};

use colored::Colorize;
use pyide_core::prompt::Prompter;

/// Asks on stdin. With `assume_yes`, confirmations are granted without asking.
pub struct StdinPrompter {
    assume_yes: bool,
}

impl StdinPrompter {
    pub fn new(assume_yes: bool) -> Self {
        Self { assume_yes }
    }

    fn ask(&self, prompt: &str) -> Option<String> {
        print!("{} ", prompt.bright_yellow());
        io::stdout().flush().ok()?;
        let mut line = String::new();
        match io::stdin().lock().read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line.trim().to_string()),
        }
    }
}

impl Prompter for StdinPrompter {
    fn request_confirmation(&self, question: &str) -> bool {
        if self.assume_yes {
            return true;
        }
        self.ask(&format!("{} [y/N]", question))
            .map(|answer| matches!(answer.to_lowercase().as_str(), "y" | "yes"))
            .unwrap_or(false)
    }

    fn request_name(&self, prompt: &str) -> Option<String> {
        self.ask(prompt).filter(|name| !name.is_empty())
    }
}
