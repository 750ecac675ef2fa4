//! Progress and result sinks: the two collaborator seams of a run.
//!
//! [`ProgressSink`] is the one-way status channel consumed by a log view or
//! terminal; warnings and errors share it with normal status lines (prefixed
//! `[!]` / `[i]`), so the channel doubles as the audit trail of a run.
//! [`ResultSink`] abstracts the save-as prompt: given a suggested filename
//! it either returns a destination or reports that the user declined.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// One-way channel for human-readable status lines.
///
/// Implementations must preserve emission order; `report` is fire-and-forget.
pub trait ProgressSink: Send + Sync {
    /// Delivers one status line.
    fn report(&self, line: &str);
}

/// Prompt for an export destination.
pub trait ResultSink: Send + Sync {
    /// Returns the path to write results to, or `None` when the user
    /// declined the prompt (skip export, informational only).
    fn save_path(&self, default_name: &str) -> Option<PathBuf>;
}

/// Progress sink that prints each line to stdout.
#[derive(Debug, Default)]
pub struct ConsoleProgress;

impl ProgressSink for ConsoleProgress {
    fn report(&self, line: &str) {
        println!("{line}");
    }
}

/// Progress sink that captures lines in memory, for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryProgress {
    lines: Mutex<Vec<String>>,
}

impl MemoryProgress {
    /// Creates an empty capture sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of every line reported so far, in emission order.
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().map(|l| l.clone()).unwrap_or_default()
    }

    /// True when any captured line contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.lines().iter().any(|l| l.contains(needle))
    }
}

impl ProgressSink for MemoryProgress {
    fn report(&self, line: &str) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(line.to_string());
        }
    }
}

/// Result sink with a predetermined destination, no interactive prompt.
///
/// `File` always answers with the same path; `Dir` joins the suggested
/// default filename onto a directory. This is what the CLI uses.
#[derive(Debug, Clone)]
pub enum FixedPathSink {
    /// Always save to exactly this file.
    File(PathBuf),
    /// Save under this directory using the suggested default name.
    Dir(PathBuf),
}

impl FixedPathSink {
    /// Sink that writes to exactly `path`.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::File(path.into())
    }

    /// Sink that writes the default filename under `dir`.
    pub fn dir(dir: impl AsRef<Path>) -> Self {
        Self::Dir(dir.as_ref().to_path_buf())
    }
}

impl ResultSink for FixedPathSink {
    fn save_path(&self, default_name: &str) -> Option<PathBuf> {
        match self {
            Self::File(path) => Some(path.clone()),
            Self::Dir(dir) => Some(dir.join(default_name)),
        }
    }
}

/// Result sink that always declines, as a cancelled save dialog would.
#[derive(Debug, Default)]
pub struct DeclineSink;

impl ResultSink for DeclineSink {
    fn save_path(&self, _default_name: &str) -> Option<PathBuf> {
        None
    }
}
