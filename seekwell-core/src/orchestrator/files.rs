//! Orchestrator for the file-tree search, local or over remote shares.

use crate::export;
use crate::fswalk::FileTraversal;
use crate::models::{FileMatch, FileRunReport, FileSearchParameters, RunStatus};
use crate::progress::{ProgressSink, ResultSink};
use crate::share::{
    admin_share, group_by_drive_root, to_unc_path, ConnectAttempt, ConnectionGate, ShareConnector,
};
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Coordinates the file search: folder enumeration, share sessions, the
/// traversal itself, and the export prompt.
pub struct FileSearchOrchestrator {
    gate: ConnectionGate,
}

impl FileSearchOrchestrator {
    /// Creates an orchestrator over the given share connector with the
    /// standard connection timeout.
    pub fn new(connector: Arc<dyn ShareConnector>) -> Self {
        Self {
            gate: ConnectionGate::new(connector),
        }
    }

    /// Creates an orchestrator over a preconfigured gate (tests shorten the
    /// timeout this way).
    pub fn with_gate(gate: ConnectionGate) -> Self {
        Self { gate }
    }

    /// Runs one search to a terminal state.
    ///
    /// Per-folder and per-file failures are downgraded to warnings;
    /// cancellation is terminal at the next checkpoint. The export prompt is
    /// only issued when at least one match exists and the run was not
    /// cancelled.
    pub async fn run(
        &self,
        params: &FileSearchParameters,
        progress: Arc<dyn ProgressSink>,
        sink: Arc<dyn ResultSink>,
        token: CancellationToken,
    ) -> FileRunReport {
        let violations = params.validate();
        if !violations.is_empty() {
            for violation in &violations {
                progress.report(&format!("[!] Invalid parameters - {violation}"));
            }
            return FileRunReport {
                status: RunStatus::Failed,
                results: Vec::new(),
            };
        }

        let mut results = Vec::new();
        let status = self
            .run_inner(params, &progress, &token, &mut results)
            .await;
        debug!(?status, results = results.len(), "file search finished");

        match status {
            RunStatus::Cancelled => {
                progress.report("[!] Search was cancelled by the user.");
            }
            _ if !results.is_empty() => {
                progress.report(&format!(
                    "[*] Found {} results. Prompting to save file...",
                    results.len()
                ));
                let default_name = if params.is_local() {
                    export::default_file_name("LocalSearchResults", None)
                } else {
                    export::default_file_name("RemoteSearchResults", Some(&params.address))
                };
                export::save_report(
                    &export::render_file_results(&results),
                    &default_name,
                    sink.as_ref(),
                    progress.as_ref(),
                );
            }
            _ => {
                progress.report("[*] Search complete. No keywords found.");
            }
        }

        FileRunReport { status, results }
    }

    async fn run_inner(
        &self,
        params: &FileSearchParameters,
        progress: &Arc<dyn ProgressSink>,
        token: &CancellationToken,
        results: &mut Vec<FileMatch>,
    ) -> RunStatus {
        if token.is_cancelled() {
            return RunStatus::Cancelled;
        }

        let traversal = FileTraversal::new(&params.extensions, &params.keywords, params.recurse);

        if params.is_local() {
            self.run_local(params, &traversal, progress, token, results)
                .await
        } else {
            self.run_remote(params, &traversal, progress, token, results)
                .await
        }
    }

    async fn run_local(
        &self,
        params: &FileSearchParameters,
        traversal: &FileTraversal,
        progress: &Arc<dyn ProgressSink>,
        token: &CancellationToken,
        results: &mut Vec<FileMatch>,
    ) -> RunStatus {
        progress.report("[*] Performing local search...");
        for folder in &params.local_folders {
            if token.is_cancelled() {
                return RunStatus::Cancelled;
            }
            progress.report(&format!("[*] Searching in local folder: {folder}"));
            if !Path::new(folder).is_dir() {
                progress.report(&format!("[!] Folder not found or inaccessible: {folder}"));
                continue;
            }
            scan_root(traversal, folder.clone(), progress, token, results).await;
        }
        if token.is_cancelled() {
            RunStatus::Cancelled
        } else {
            RunStatus::Completed
        }
    }

    async fn run_remote(
        &self,
        params: &FileSearchParameters,
        traversal: &FileTraversal,
        progress: &Arc<dyn ProgressSink>,
        token: &CancellationToken,
        results: &mut Vec<FileMatch>,
    ) -> RunStatus {
        let (groups, skipped) = group_by_drive_root(&params.remote_folders);
        for path in &skipped {
            progress.report(&format!("[!] Ignoring path without a drive root: {path}"));
        }
        if groups.is_empty() {
            progress.report("[!] No valid remote paths with drive letters provided.");
            return RunStatus::Completed;
        }

        for group in groups {
            if token.is_cancelled() {
                return RunStatus::Cancelled;
            }

            let share = admin_share(&params.address, group.letter);
            progress.report(&format!("--- Processing drive {}: ---", group.letter));

            let connected = self
                .connect_two_phase(params, &share, group.letter, progress, token)
                .await;

            if connected {
                for folder in &group.folders {
                    if token.is_cancelled() {
                        break;
                    }
                    let unc = to_unc_path(&share, folder);
                    progress.report(&format!("[*] Searching in: {unc}"));
                    if !Path::new(&unc).is_dir() {
                        progress.report(&format!("[!] Folder not found or inaccessible: {unc}"));
                        continue;
                    }
                    scan_root(traversal, unc, progress, token, results).await;
                }

                // Scoped teardown: a confirmed session is always released
                // before the next drive, cancelled or not.
                progress.report(&format!("[*] Disconnecting from {share}..."));
                self.gate.disconnect(&share).await;
            } else if token.is_cancelled() {
                // The run was cancelled between the two attempts; the
                // cancellation notice is the only message owed here.
                return RunStatus::Cancelled;
            } else {
                progress.report(&format!(
                    "[!] Could not connect to share {share}. Skipping all paths for drive {}:.",
                    group.letter
                ));
            }

            if token.is_cancelled() {
                return RunStatus::Cancelled;
            }
        }
        RunStatus::Completed
    }

    /// Implicit attempt first, explicit credentials second. Returns whether
    /// a session was confirmed for this drive.
    async fn connect_two_phase(
        &self,
        params: &FileSearchParameters,
        share: &str,
        letter: char,
        progress: &Arc<dyn ProgressSink>,
        token: &CancellationToken,
    ) -> bool {
        progress.report(&format!(
            "[*] Step 1: Attempting implicit connection to {share}..."
        ));
        match self.gate.try_connect(share, None).await {
            ConnectAttempt::Success => {
                progress.report(&format!("[+] Connected implicitly to {letter}$."));
                return true;
            }
            ConnectAttempt::TimedOut => {
                progress.report(&format!(
                    "[!] Timed out connecting to {share}. The server is likely offline or \
                     unreachable."
                ));
            }
            ConnectAttempt::Failed(code) => {
                progress.report(&format!(
                    "[i] Implicit connection to {letter}$ failed{}.",
                    error_code_suffix(code)
                ));
            }
        }

        if token.is_cancelled() {
            return false;
        }

        progress.report(&format!(
            "[*] Step 2: Attempting connection to {letter}$ with provided credentials..."
        ));
        match self
            .gate
            .try_connect(share, params.credentials.as_ref())
            .await
        {
            ConnectAttempt::Success => {
                progress.report(&format!(
                    "[+] Connected to {letter}$ using provided credentials."
                ));
                true
            }
            ConnectAttempt::TimedOut => {
                progress.report(&format!(
                    "[!] Timed out connecting to {share}. The server is likely offline or \
                     unreachable."
                ));
                false
            }
            ConnectAttempt::Failed(code) => {
                progress.report(&format!(
                    "[!] Provided credentials for {letter}$ failed{}.",
                    error_code_suffix(code)
                ));
                false
            }
        }
    }
}

fn error_code_suffix(code: Option<i32>) -> String {
    code.map(|c| format!(" (error {c})")).unwrap_or_default()
}

/// Moves one root's walk onto the blocking pool and collects its matches.
async fn scan_root(
    traversal: &FileTraversal,
    root: String,
    progress: &Arc<dyn ProgressSink>,
    token: &CancellationToken,
    results: &mut Vec<FileMatch>,
) {
    let traversal = traversal.clone();
    let walk_progress = Arc::clone(progress);
    let walk_token = token.clone();
    let display = root.clone();
    let outcome = tokio::task::spawn_blocking(move || {
        let mut found = Vec::new();
        traversal.scan(
            Path::new(&root),
            walk_progress.as_ref(),
            &walk_token,
            &mut found,
        );
        found
    })
    .await;

    match outcome {
        Ok(found) => results.extend(found),
        Err(error) => {
            progress.report(&format!("[!] Traversal task failed for {display}: {error}"));
        }
    }
}
