//! File-tree traversal with extension filtering and per-line keyword
//! matching.
//!
//! The walk is depth-first and strictly sequential. Enumeration and read
//! errors are reported as warnings on the progress channel and never abort
//! the walk — a failure in one subtree must not stop its siblings. Files
//! are read line by line so a multi-gigabyte log does not end up in memory
//! as one blob, and lines that are not valid UTF-8 are decoded lossily
//! rather than skipped.

use crate::models::FileMatch;
use crate::progress::ProgressSink;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tokio_util::sync::CancellationToken;
use walkdir::WalkDir;

/// Recursive directory scanner for one set of extensions and keywords.
///
/// Cheap to clone; the orchestrator clones one per configured root when it
/// moves the walk onto the blocking pool.
#[derive(Debug, Clone)]
pub struct FileTraversal {
    /// Lower-cased suffixes a file name must end with.
    extensions: Vec<String>,
    /// `(lowercase, original)` keyword pairs; matching uses the first,
    /// results carry the second.
    keywords: Vec<(String, String)>,
    recurse: bool,
}

impl FileTraversal {
    /// Builds a scanner; extension and keyword comparisons are prepared
    /// lower-cased once here instead of per line.
    pub fn new(extensions: &[String], keywords: &[String], recurse: bool) -> Self {
        Self {
            extensions: extensions.iter().map(|e| e.to_lowercase()).collect(),
            keywords: keywords
                .iter()
                .map(|k| (k.to_lowercase(), k.clone()))
                .collect(),
            recurse,
        }
    }

    /// Walks `root`, appending one [`FileMatch`] per (keyword, line) pair.
    ///
    /// Cancellation is checked at every directory and before every file; a
    /// cancelled walk stops without touching further entries. Blocking; run
    /// it on the blocking pool from async contexts.
    pub fn scan(
        &self,
        root: &Path,
        progress: &dyn ProgressSink,
        token: &CancellationToken,
        out: &mut Vec<FileMatch>,
    ) {
        let mut walker = WalkDir::new(root).follow_links(false);
        if !self.recurse {
            walker = walker.max_depth(1);
        }

        for entry in walker {
            if token.is_cancelled() {
                return;
            }
            let entry = match entry {
                Ok(entry) => entry,
                Err(error) => {
                    let location = error
                        .path()
                        .unwrap_or(root)
                        .display()
                        .to_string();
                    progress.report(&format!("[!] Could not enumerate {location}: {error}"));
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_lowercase();
            if !self.extensions.iter().any(|ext| name.ends_with(ext)) {
                continue;
            }
            self.scan_file(entry.path(), progress, out);
        }
    }

    /// Reads one file line-oriented and records every keyword hit.
    fn scan_file(&self, path: &Path, progress: &dyn ProgressSink, out: &mut Vec<FileMatch>) {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(error) => {
                progress.report(&format!("[!] Could not read file {}: {error}", path.display()));
                return;
            }
        };

        let mut reader = BufReader::new(file);
        let mut buffer = Vec::new();
        let mut line_number: u64 = 0;
        loop {
            buffer.clear();
            match reader.read_until(b'\n', &mut buffer) {
                Ok(0) => break,
                Ok(_) => {}
                Err(error) => {
                    progress.report(&format!(
                        "[!] Error while reading {}: {error}",
                        path.display()
                    ));
                    return;
                }
            }
            line_number += 1;

            let decoded = String::from_utf8_lossy(&buffer);
            let line = decoded.trim_end_matches(['\n', '\r']);
            let line_lower = line.to_lowercase();
            for (keyword_lower, keyword) in &self.keywords {
                if line_lower.contains(keyword_lower) {
                    out.push(FileMatch {
                        path: path.display().to_string(),
                        line: line_number,
                        keyword: keyword.clone(),
                        text: line.trim().to_string(),
                    });
                    progress.report(&format!(
                        "    FOUND: keyword '{keyword}' in {} (line {line_number})",
                        path.display()
                    ));
                }
            }
        }
    }
}
