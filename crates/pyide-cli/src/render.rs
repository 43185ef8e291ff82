//! Prints console entries to the terminal.

use std::sync::{Arc, Mutex, PoisonError};

use colored::Colorize;
use pyide_core::console::{ConsoleEntry, ConsoleKind, ConsoleSink};
use tokio::task::JoinHandle;

pub fn print_entry(entry: &ConsoleEntry) {
    match entry.kind {
        ConsoleKind::Normal => println!("{}", entry.text),
        ConsoleKind::Error => println!("{}", entry.text.red()),
        ConsoleKind::System => println!("{}", entry.text.cyan().dimmed()),
    }
}

/// Prints each console entry once, in order, even when several tasks flush.
#[derive(Clone)]
pub struct ConsolePrinter {
    console: Arc<ConsoleSink>,
    next: Arc<Mutex<u64>>,
}

impl ConsolePrinter {
    /// Starts printing at entry `from`.
    pub fn new(console: Arc<ConsoleSink>, from: u64) -> Self {
        Self {
            console,
            next: Arc::new(Mutex::new(from)),
        }
    }

    /// Prints everything appended since the last call.
    pub fn flush(&self) {
        let mut next = self.next.lock().unwrap_or_else(PoisonError::into_inner);
        for entry in self.console.entries_since(*next) {
            print_entry(&entry);
            *next = entry.sequence + 1;
        }
    }

    /// Prints entries as they arrive until the returned task is aborted.
    ///
    /// Call [`ConsolePrinter::flush`] after aborting to catch the tail.
    pub fn follow(&self) -> JoinHandle<()> {
        let mut live = self.console.subscribe();
        self.flush();
        let printer = self.clone();
        tokio::spawn(async move {
            loop {
                match live.recv().await {
                    // The received entry is only a wake-up; the log is the source of truth.
                    Ok(_) | Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => printer.flush(),
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    /// Stops a follow task and prints what it did not get to.
    pub async fn stop(&self, task: JoinHandle<()>) {
        task.abort();
        let _ = task.await;
        self.flush();
    }
}
