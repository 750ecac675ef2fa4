//! Remote share sessions: drive-root grouping, the connection gate, and the
//! platform share connectors.
//!
//! A remote file search talks to administrative shares (`\\host\C$`). The
//! [`ConnectionGate`] wraps the blocking mount call in a timeout race: the
//! connect attempt runs on the blocking pool while a 7 second timer runs
//! beside it, and whichever finishes first wins. A timed-out attempt is
//! abandoned, not rolled back. The gate only ever disconnects shares it
//! confirmed, so an attempt that succeeds after its timer fired can leave an
//! OS-level mapping behind; rolling it back would mean racing a disconnect
//! against its own still-running connect, and the mapping is reclaimed on
//! logoff anyway.

use crate::models::Credentials;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Fixed bound on a single share connection attempt.
pub const SHARE_CONNECT_TIMEOUT: Duration = Duration::from_secs(7);

/// Failure of a single blocking share operation.
#[derive(Debug, Error)]
pub enum ShareError {
    /// The OS rejected the mount with a native error code.
    #[error("share operation failed with OS error {0}")]
    Os(i32),
    /// The share name could not be passed to the OS.
    #[error("share name is not a valid OS string")]
    InvalidName,
    /// This build has no share-mount support.
    #[error("share mounts are not supported on this platform")]
    Unsupported,
}

/// Capability for mounting and unmounting a UNC share.
///
/// Both operations are blocking; the [`ConnectionGate`] offloads them to the
/// blocking pool. `disconnect` is best-effort and must not fail loudly — it
/// runs on every scope exit, including error paths.
pub trait ShareConnector: Send + Sync {
    /// Establishes a session to `share`, with explicit credentials or the
    /// ambient/cached session when `credentials` is `None`.
    fn connect(
        &self,
        share: &str,
        credentials: Option<&Credentials>,
    ) -> std::result::Result<(), ShareError>;

    /// Tears down a previously confirmed session. Best-effort.
    fn disconnect(&self, share: &str);
}

/// Outcome of one bounded connection attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectAttempt {
    /// The session is established; the caller now owns it and must
    /// disconnect it on scope exit.
    Success,
    /// The OS rejected the attempt, with its error code when one exists.
    Failed(Option<i32>),
    /// The 7 second bound elapsed first; the attempt was abandoned.
    TimedOut,
}

/// Establishes and tears down share sessions with bounded-time attempts.
pub struct ConnectionGate {
    connector: Arc<dyn ShareConnector>,
    timeout: Duration,
}

impl ConnectionGate {
    /// Creates a gate over the given connector with the standard timeout.
    pub fn new(connector: Arc<dyn ShareConnector>) -> Self {
        Self {
            connector,
            timeout: SHARE_CONNECT_TIMEOUT,
        }
    }

    /// Overrides the attempt timeout. Tests use this to race quickly.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Races one connection attempt against the timeout.
    ///
    /// First to finish wins; the losing attempt keeps running on the
    /// blocking pool and its eventual outcome is only logged at debug level.
    pub async fn try_connect(
        &self,
        share: &str,
        credentials: Option<&Credentials>,
    ) -> ConnectAttempt {
        let connector = Arc::clone(&self.connector);
        let share_owned = share.to_string();
        let creds = credentials.cloned();
        let attempt = tokio::task::spawn_blocking(move || {
            let outcome = connector.connect(&share_owned, creds.as_ref());
            if let Err(ref e) = outcome {
                debug!(share = %share_owned, "share connect attempt failed: {e}");
            }
            outcome
        });

        match tokio::time::timeout(self.timeout, attempt).await {
            Ok(Ok(Ok(()))) => ConnectAttempt::Success,
            Ok(Ok(Err(ShareError::Os(code)))) => ConnectAttempt::Failed(Some(code)),
            Ok(Ok(Err(_))) => ConnectAttempt::Failed(None),
            Ok(Err(join_error)) => {
                debug!("share connect task aborted: {join_error}");
                ConnectAttempt::Failed(None)
            }
            Err(_) => ConnectAttempt::TimedOut,
        }
    }

    /// Tears down a confirmed session.
    pub async fn disconnect(&self, share: &str) {
        let connector = Arc::clone(&self.connector);
        let share_owned = share.to_string();
        if let Err(join_error) =
            tokio::task::spawn_blocking(move || connector.disconnect(&share_owned)).await
        {
            debug!("share disconnect task aborted: {join_error}");
        }
    }
}

/// Folders that share one drive root, in first-seen order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriveGroup {
    /// Upper-cased drive letter.
    pub letter: char,
    /// The configured folder paths under this root, original order kept.
    pub folders: Vec<String>,
}

/// Groups drive-rooted paths by their drive letter, case-insensitively.
///
/// Each physical drive is connected to exactly once regardless of how many
/// configured paths share its root. Paths without a recognizable drive root
/// come back in the second list so the caller can warn about them.
pub fn group_by_drive_root(paths: &[String]) -> (Vec<DriveGroup>, Vec<String>) {
    let mut groups: Vec<DriveGroup> = Vec::new();
    let mut skipped = Vec::new();
    for path in paths {
        let Some(letter) = drive_letter(path) else {
            skipped.push(path.clone());
            continue;
        };
        match groups.iter_mut().find(|g| g.letter == letter) {
            Some(group) => group.folders.push(path.clone()),
            None => groups.push(DriveGroup {
                letter,
                folders: vec![path.clone()],
            }),
        }
    }
    (groups, skipped)
}

/// Extracts the upper-cased drive letter from a `X:\...` path.
pub fn drive_letter(path: &str) -> Option<char> {
    let mut chars = path.chars();
    let letter = chars.next()?;
    if !letter.is_ascii_alphabetic() || chars.next()? != ':' {
        return None;
    }
    Some(letter.to_ascii_uppercase())
}

/// Builds the administrative share UNC for a drive (`\\host\C$`).
pub fn admin_share(address: &str, letter: char) -> String {
    format!(r"\\{address}\{letter}$")
}

/// Rebases a drive-rooted path onto its administrative share.
///
/// `C:\HMI\logs` on `\\host\C$` becomes `\\host\C$\HMI\logs`.
pub fn to_unc_path(share: &str, path: &str) -> String {
    let relative = path
        .get(2..)
        .unwrap_or("")
        .trim_start_matches(['\\', '/']);
    if relative.is_empty() {
        share.to_string()
    } else {
        format!(r"{share}\{relative}")
    }
}

/// Returns the share connector for the current platform.
pub fn platform_connector() -> Arc<dyn ShareConnector> {
    #[cfg(windows)]
    {
        Arc::new(native::WNetShareConnector)
    }
    #[cfg(not(windows))]
    {
        Arc::new(UnsupportedShareConnector)
    }
}

/// Stub connector for platforms without drive-letter share semantics.
///
/// Remote mode on these platforms reports every drive as unreachable; local
/// mode is unaffected.
#[derive(Debug, Default)]
pub struct UnsupportedShareConnector;

impl ShareConnector for UnsupportedShareConnector {
    fn connect(
        &self,
        _share: &str,
        _credentials: Option<&Credentials>,
    ) -> std::result::Result<(), ShareError> {
        Err(ShareError::Unsupported)
    }

    fn disconnect(&self, _share: &str) {}
}

/// WNet-based connector, the native Windows share-mount path.
#[cfg(windows)]
pub mod native {
    use super::{Credentials, ShareConnector, ShareError};
    use std::ffi::CString;
    use windows_sys::Win32::NetworkManagement::WNet::{
        NETRESOURCEA, RESOURCETYPE_DISK, WNetAddConnection2A, WNetCancelConnection2A,
    };

    /// Mounts shares through `WNetAddConnection2A`.
    #[derive(Debug, Default)]
    pub struct WNetShareConnector;

    #[allow(unsafe_code)]
    impl ShareConnector for WNetShareConnector {
        fn connect(
            &self,
            share: &str,
            credentials: Option<&Credentials>,
        ) -> std::result::Result<(), ShareError> {
            let remote = CString::new(share).map_err(|_| ShareError::InvalidName)?;
            let username = match credentials {
                Some(c) => Some(CString::new(c.username.as_str()).map_err(|_| ShareError::InvalidName)?),
                None => None,
            };
            let password = match credentials {
                Some(c) => Some(CString::new(c.password.as_str()).map_err(|_| ShareError::InvalidName)?),
                None => None,
            };

            // SAFETY: the NETRESOURCEA only borrows `remote`, and all three
            // CStrings outlive the call.
            let result = unsafe {
                let mut resource: NETRESOURCEA = std::mem::zeroed();
                resource.dwType = RESOURCETYPE_DISK;
                resource.lpRemoteName = remote.as_ptr() as *mut u8;
                WNetAddConnection2A(
                    &resource,
                    password
                        .as_ref()
                        .map_or(std::ptr::null(), |p| p.as_ptr().cast()),
                    username
                        .as_ref()
                        .map_or(std::ptr::null(), |u| u.as_ptr().cast()),
                    0,
                )
            };

            if result == 0 {
                Ok(())
            } else {
                Err(ShareError::Os(result as i32))
            }
        }

        fn disconnect(&self, share: &str) {
            let Ok(remote) = CString::new(share) else {
                return;
            };
            // SAFETY: `remote` outlives the call; force-close mirrors the
            // scoped-teardown guarantee.
            unsafe {
                WNetCancelConnection2A(remote.as_ptr().cast(), 0, 1);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingConnector {
        calls: Mutex<Vec<String>>,
        fail_without_credentials: bool,
        delay: Option<Duration>,
    }

    impl ShareConnector for RecordingConnector {
        fn connect(
            &self,
            share: &str,
            credentials: Option<&Credentials>,
        ) -> std::result::Result<(), ShareError> {
            if let Some(delay) = self.delay {
                std::thread::sleep(delay);
            }
            if let Ok(mut calls) = self.calls.lock() {
                calls.push(format!(
                    "connect {share} {}",
                    if credentials.is_some() { "explicit" } else { "implicit" }
                ));
            }
            if self.fail_without_credentials && credentials.is_none() {
                return Err(ShareError::Os(1326));
            }
            Ok(())
        }

        fn disconnect(&self, share: &str) {
            if let Ok(mut calls) = self.calls.lock() {
                calls.push(format!("disconnect {share}"));
            }
        }
    }

    #[test]
    fn drive_letters_parse_and_normalize() {
        assert_eq!(drive_letter(r"C:\HMI"), Some('C'));
        assert_eq!(drive_letter(r"d:\data\logs"), Some('D'));
        assert_eq!(drive_letter(r"\\host\share"), None);
        assert_eq!(drive_letter("relative/path"), None);
        assert_eq!(drive_letter(""), None);
    }

    #[test]
    fn grouping_is_case_insensitive_and_order_preserving() {
        let paths = vec![
            r"C:\HMI".to_string(),
            r"D:\Data".to_string(),
            r"c:\Temp".to_string(),
            "no-root".to_string(),
        ];
        let (groups, skipped) = group_by_drive_root(&paths);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].letter, 'C');
        assert_eq!(groups[0].folders, vec![r"C:\HMI", r"c:\Temp"]);
        assert_eq!(groups[1].letter, 'D');
        assert_eq!(skipped, vec!["no-root"]);
    }

    #[test]
    fn unc_paths_rebase_onto_the_admin_share() {
        let share = admin_share("172.16.2.16", 'C');
        assert_eq!(share, r"\\172.16.2.16\C$");
        assert_eq!(to_unc_path(&share, r"C:\HMI\logs"), r"\\172.16.2.16\C$\HMI\logs");
        assert_eq!(to_unc_path(&share, r"C:\"), r"\\172.16.2.16\C$");
    }

    #[tokio::test]
    async fn gate_reports_success_and_failure_codes() {
        let connector = Arc::new(RecordingConnector {
            fail_without_credentials: true,
            ..RecordingConnector::default()
        });
        let gate = ConnectionGate::new(Arc::clone(&connector) as Arc<dyn ShareConnector>);

        let implicit = gate.try_connect(r"\\host\C$", None).await;
        assert_eq!(implicit, ConnectAttempt::Failed(Some(1326)));

        let creds = Credentials::new("user", "pass");
        let explicit = gate.try_connect(r"\\host\C$", Some(&creds)).await;
        assert_eq!(explicit, ConnectAttempt::Success);
    }

    #[tokio::test]
    async fn gate_times_out_slow_attempts() {
        let connector = Arc::new(RecordingConnector {
            delay: Some(Duration::from_millis(200)),
            ..RecordingConnector::default()
        });
        let gate = ConnectionGate::new(connector as Arc<dyn ShareConnector>)
            .with_timeout(Duration::from_millis(10));

        let attempt = gate.try_connect(r"\\host\C$", None).await;
        assert_eq!(attempt, ConnectAttempt::TimedOut);
    }

    #[tokio::test]
    async fn disconnect_reaches_the_connector() {
        let connector = Arc::new(RecordingConnector::default());
        let gate = ConnectionGate::new(Arc::clone(&connector) as Arc<dyn ShareConnector>);
        gate.disconnect(r"\\host\C$").await;
        let calls = connector.calls.lock().map(|c| c.clone()).unwrap_or_default();
        assert_eq!(calls, vec![r"disconnect \\host\C$"]);
    }

    #[test]
    fn unsupported_connector_never_connects() {
        let connector = UnsupportedShareConnector;
        assert!(matches!(
            connector.connect(r"\\host\C$", None),
            Err(ShareError::Unsupported)
        ));
        connector.disconnect(r"\\host\C$");
    }
}
