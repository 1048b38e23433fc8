//! Exact-match allow-list authorization.
//!
//! Matching rules:
//! - each line is an opaque byte string; exactly one trailing `\n` is removed
//! - no other trimming (`\r`, spaces and tabs are part of the entry)
//! - byte-for-byte equality with the requested identifier, first match wins
//! - no comments, globbing or prefix matching
//!
//! The file is read once per check and never cached or written.

use crate::config::loader::verify_trusted_metadata;
use crate::config::types::{GateConfig, GateError, Result};
use std::ffi::OsStr;
use std::fs::File;
use std::io::{self, BufRead, BufReader, ErrorKind};
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

/// Knobs that affect how the allow-list is opened and matched.
#[derive(Clone, Copy, Debug)]
pub struct PolicyOptions {
    /// Skip entries that are not absolute paths
    pub require_absolute_entries: bool,
    /// Refuse files with untrusted owner or group/world write bits
    pub verify_permissions: bool,
}

impl PolicyOptions {
    pub fn from_config(config: &GateConfig) -> Self {
        Self {
            require_absolute_entries: config.require_absolute_entries,
            verify_permissions: config.verify_policy_permissions,
        }
    }
}

impl Default for PolicyOptions {
    fn default() -> Self {
        Self::from_config(&GateConfig::default())
    }
}

/// An opened allow-list. Consumed by [`PolicyFile::authorize`], which
/// releases the handle before returning on every path.
#[derive(Debug)]
pub struct PolicyFile {
    path: PathBuf,
    reader: BufReader<File>,
    options: PolicyOptions,
}

impl PolicyFile {
    /// Open the allow-list. Missing, unreadable or untrusted files fail closed.
    pub fn open(path: &Path, options: PolicyOptions) -> Result<Self> {
        let file = File::open(path).map_err(|e| {
            let reason = if e.kind() == ErrorKind::NotFound {
                "file does not exist".to_string()
            } else {
                e.to_string()
            };
            policy_unavailable(path, reason)
        })?;

        if options.verify_permissions {
            let metadata = file
                .metadata()
                .map_err(|e| policy_unavailable(path, format!("fstat failed: {}", e)))?;
            verify_trusted_metadata(&metadata).map_err(|reason| {
                policy_unavailable(path, format!("unsafe policy file: {}", reason))
            })?;
        }

        Ok(Self {
            path: path.to_path_buf(),
            reader: BufReader::new(file),
            options,
        })
    }

    /// Check `command` against every line. `Ok(())` means authorized.
    pub fn authorize(self, command: &OsStr) -> Result<()> {
        let PolicyFile {
            path,
            mut reader,
            options,
        } = self;

        let outcome = scan(&mut reader, command.as_bytes(), options.require_absolute_entries);
        // Released before the decision is acted on.
        drop(reader);

        match outcome {
            Ok(true) => Ok(()),
            Ok(false) => Err(GateError::NotAuthorized {
                command: command.to_string_lossy().into_owned(),
            }),
            Err(e) => Err(policy_unavailable(&path, format!("read failed: {}", e))),
        }
    }
}

/// Remove exactly one trailing `\n`, nothing else.
pub fn strip_line_ending(line: &[u8]) -> &[u8] {
    line.strip_suffix(b"\n").unwrap_or(line)
}

fn scan<R: BufRead>(reader: &mut R, command: &[u8], require_absolute: bool) -> io::Result<bool> {
    let mut line = Vec::new();
    let mut line_no = 0usize;

    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line)? == 0 {
            return Ok(false);
        }
        line_no += 1;

        let entry = strip_line_ending(&line);
        if require_absolute && !entry.starts_with(b"/") {
            if !entry.is_empty() {
                log::warn!("Ignoring non-absolute allow-list entry on line {}", line_no);
            }
            continue;
        }

        if entry == command {
            return Ok(true);
        }
    }
}

fn policy_unavailable(path: &Path, reason: String) -> GateError {
    GateError::PolicyUnavailable {
        path: path.to_path_buf(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};

    fn policy(contents: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents).unwrap();
        file.flush().unwrap();
        file
    }

    fn check(contents: &[u8], command: &str) -> Result<()> {
        let file = policy(contents);
        PolicyFile::open(file.path(), PolicyOptions::default())?.authorize(OsStr::new(command))
    }

    #[test]
    fn listed_command_is_authorized() {
        assert!(check(b"/bin/ls\n/bin/echo\n", "/bin/ls").is_ok());
        assert!(check(b"/bin/ls\n/bin/echo\n", "/bin/echo").is_ok());
    }

    #[test]
    fn unlisted_command_is_denied_and_named() {
        let err = check(b"/bin/ls\n/bin/echo\n", "/bin/rm").unwrap_err();
        match err {
            GateError::NotAuthorized { command } => assert_eq!(command, "/bin/rm"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn last_line_without_newline_still_matches() {
        assert!(check(b"/bin/ls\n/bin/echo", "/bin/echo").is_ok());
    }

    #[test]
    fn trailing_space_is_not_stripped() {
        assert!(matches!(
            check(b"/bin/ls \n", "/bin/ls"),
            Err(GateError::NotAuthorized { .. })
        ));
    }

    #[test]
    fn carriage_return_is_not_stripped() {
        assert!(check(b"/bin/ls\r\n", "/bin/ls").is_err());
        assert!(check(b"/bin/ls\r\n", "/bin/ls\r").is_ok());
    }

    #[test]
    fn prefix_suffix_and_case_variants_are_denied() {
        let contents = b"/usr/bin/make\n";
        for candidate in ["/usr/bin/mak", "/usr/bin/make2", "/USR/BIN/MAKE", "make", "bin/make"] {
            assert!(check(contents, candidate).is_err(), "{candidate} should be denied");
        }
    }

    #[test]
    fn path_spelling_variants_are_denied() {
        let contents = b"/bin/ls\n";
        for candidate in ["/bin//ls", "/bin/./ls", "/usr/../bin/ls", "/bin/ls/"] {
            assert!(check(contents, candidate).is_err(), "{candidate} should be denied");
        }
    }

    #[test]
    fn relative_entries_are_inert_by_default() {
        assert!(check(b"ls\n", "ls").is_err());
    }

    #[test]
    fn relative_entries_match_when_allowed() {
        let file = policy(b"ls\n");
        let options = PolicyOptions {
            require_absolute_entries: false,
            verify_permissions: true,
        };
        let result = PolicyFile::open(file.path(), options)
            .unwrap()
            .authorize(OsStr::new("ls"));
        assert!(result.is_ok());
    }

    #[test]
    fn blank_lines_never_authorize_empty_command() {
        assert!(check(b"\n/bin/ls\n\n", "").is_err());
    }

    #[test]
    fn non_utf8_entries_match_bytewise() {
        use std::os::unix::ffi::OsStrExt;
        let file = policy(b"/opt/\xffbin\n");
        let result = PolicyFile::open(file.path(), PolicyOptions::default())
            .unwrap()
            .authorize(OsStr::from_bytes(b"/opt/\xffbin"));
        assert!(result.is_ok());
    }

    #[test]
    fn missing_file_fails_closed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("allowed_commands");
        let err = PolicyFile::open(&path, PolicyOptions::default()).unwrap_err();
        match err {
            GateError::PolicyUnavailable { path: p, reason } => {
                assert_eq!(p, path);
                assert!(reason.contains("does not exist"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn world_writable_file_fails_closed() {
        use std::os::unix::fs::PermissionsExt;
        let file = policy(b"/bin/ls\n");
        std::fs::set_permissions(file.path(), std::fs::Permissions::from_mode(0o666)).unwrap();
        let err = PolicyFile::open(file.path(), PolicyOptions::default()).unwrap_err();
        assert!(matches!(err, GateError::PolicyUnavailable { .. }));
    }

    #[test]
    fn directory_policy_fails_closed_without_permission_checks() {
        let dir = tempfile::tempdir().unwrap();
        let options = PolicyOptions {
            require_absolute_entries: true,
            verify_permissions: false,
        };
        // Opening a directory succeeds on Linux; reading it does not.
        let result = PolicyFile::open(dir.path(), options)
            .and_then(|policy| policy.authorize(OsStr::new("/bin/ls")));
        assert!(matches!(result, Err(GateError::PolicyUnavailable { .. })));
    }

    #[test]
    fn scan_stops_at_first_match() {
        let mut cursor = Cursor::new(b"/bin/ls\n/bin/echo\n".to_vec());
        assert!(scan(&mut cursor, b"/bin/ls", true).unwrap());
        assert_eq!(cursor.position(), 8);
    }

    #[test]
    fn strip_removes_single_newline() {
        assert_eq!(strip_line_ending(b"/bin/ls\n"), b"/bin/ls");
        assert_eq!(strip_line_ending(b"/bin/ls\n\n"), b"/bin/ls\n");
        assert_eq!(strip_line_ending(b"/bin/ls "), b"/bin/ls ");
    }
}
