//! Console sink: the ordered, append-only record of run output.

use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};
use tokio::sync::broadcast;

/// Capacity of the live subscriber channel. Slow subscribers lag; the log
/// itself keeps every entry.
const SUBSCRIBER_CAPACITY: usize = 1024;

/// Kind of a console line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ConsoleKind {
    /// Program output (stdout).
    Normal,
    /// Program errors (stderr, runtime failures).
    Error,
    /// Messages from the workspace itself.
    System,
}

/// One console line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsoleEntry {
    /// Position in the log, starting at 0.
    pub sequence: u64,
    pub kind: ConsoleKind,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

/// Append-only console log.
///
/// Entries are numbered under the same lock that stores them, so the sequence
/// always matches the order of `append` calls.
pub struct ConsoleSink {
    entries: Mutex<Vec<ConsoleEntry>>,
    live: broadcast::Sender<ConsoleEntry>,
}

impl Default for ConsoleSink {
    fn default() -> Self {
        let (live, _) = broadcast::channel(SUBSCRIBER_CAPACITY);
        Self {
            entries: Mutex::new(Vec::new()),
            live,
        }
    }
}

impl ConsoleSink {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<ConsoleEntry>> {
        // Appends cannot leave the vector half-written, so a poisoned lock is still usable.
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Appends a line and returns its sequence number.
    pub fn append(&self, text: impl Into<String>, kind: ConsoleKind) -> u64 {
        let mut entries = self.lock();
        let entry = ConsoleEntry {
            sequence: entries.len() as u64,
            kind,
            text: text.into(),
            timestamp: Utc::now(),
        };
        let sequence = entry.sequence;
        // No subscribers is fine.
        let _ = self.live.send(entry.clone());
        entries.push(entry);
        sequence
    }

    pub fn normal(&self, text: impl Into<String>) -> u64 {
        self.append(text, ConsoleKind::Normal)
    }

    pub fn error(&self, text: impl Into<String>) -> u64 {
        self.append(text, ConsoleKind::Error)
    }

    pub fn system(&self, text: impl Into<String>) -> u64 {
        self.append(text, ConsoleKind::System)
    }

    /// Copy of every entry so far.
    pub fn entries(&self) -> Vec<ConsoleEntry> {
        self.lock().clone()
    }

    /// Entries with `sequence >= from`.
    pub fn entries_since(&self, from: u64) -> Vec<ConsoleEntry> {
        let entries = self.lock();
        let start = (from as usize).min(entries.len());
        entries[start..].to_vec()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Receives entries as they are appended.
    pub fn subscribe(&self) -> broadcast::Receiver<ConsoleEntry> {
        self.live.subscribe()
    }
}
