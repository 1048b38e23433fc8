//! Identity snapshots and post-transition verification.

use crate::config::types::{GateError, Result};
use serde::Serialize;
use std::fmt;

/// Real and effective user/group ids of the current process.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct IdentitySnapshot {
    pub real_uid: u32,
    pub effective_uid: u32,
    pub real_gid: u32,
    pub effective_gid: u32,
}

impl IdentitySnapshot {
    pub fn current() -> Self {
        use nix::unistd::{getegid, geteuid, getgid, getuid};

        Self {
            real_uid: getuid().as_raw(),
            effective_uid: geteuid().as_raw(),
            real_gid: getgid().as_raw(),
            effective_gid: getegid().as_raw(),
        }
    }

    /// True when real and effective ids agree for both user and group.
    pub fn is_consistent(&self) -> bool {
        self.real_uid == self.effective_uid && self.real_gid == self.effective_gid
    }
}

impl fmt::Display for IdentitySnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "UID: real={}, effective={} | GID: real={}, effective={}",
            self.real_uid, self.effective_uid, self.real_gid, self.effective_gid
        )
    }
}

/// Require real == effective == expected for both uid and gid.
pub fn verify_identity(
    actual: &IdentitySnapshot,
    expected_uid: u32,
    expected_gid: u32,
) -> Result<()> {
    if actual.real_uid != expected_uid || actual.effective_uid != expected_uid {
        return Err(GateError::IdentityTransitionFailed(format!(
            "UID verification failed: expected {}, got real={}, effective={}",
            expected_uid, actual.real_uid, actual.effective_uid
        )));
    }

    if actual.real_gid != expected_gid || actual.effective_gid != expected_gid {
        return Err(GateError::IdentityTransitionFailed(format!(
            "GID verification failed: expected {}, got real={}, effective={}",
            expected_gid, actual.real_gid, actual.effective_gid
        )));
    }

    Ok(())
}
