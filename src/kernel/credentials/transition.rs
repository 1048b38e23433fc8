//! Promote the effective identity to the real identity.
//!
//! A setuid binary starts with real = caller, effective = owner. Tools that
//! ask "who is running me" via the real id would see the caller, so before
//! exec both ids are set to the effective value.
//!
//! CRITICAL: setresgid MUST be called BEFORE setresuid.

use super::validation::{verify_identity, IdentitySnapshot};
use crate::config::types::{GateError, Result};

/// 3-step transition: capture effective ids -> setresgid -> setresuid -> verify.
///
/// Returns the snapshot after the transition. Any syscall failure or a
/// mismatch on verification is `IdentityTransitionFailed`.
pub fn assume_effective_identity() -> Result<IdentitySnapshot> {
    let before = IdentitySnapshot::current();
    let uid = before.effective_uid;
    let gid = before.effective_gid;

    // CRITICAL: GID before UID
    set_gid(gid)?;
    set_uid(uid)?;

    let after = IdentitySnapshot::current();
    verify_identity(&after, uid, gid)?;

    Ok(after)
}

/// MUST be called BEFORE set_uid.
fn set_gid(gid: u32) -> Result<()> {
    #[cfg(target_os = "linux")]
    {
        use nix::unistd::{setresgid, Gid};

        let gid = Gid::from_raw(gid);
        setresgid(gid, gid, gid).map_err(|e| {
            GateError::IdentityTransitionFailed(format!("Failed to setresgid({}): {}", gid, e))
        })
    }

    #[cfg(not(target_os = "linux"))]
    {
        // SAFETY: setregid takes plain integers and touches no memory.
        let rc = unsafe { libc::setregid(gid as libc::gid_t, gid as libc::gid_t) };
        if rc != 0 {
            let err = std::io::Error::last_os_error();
            return Err(GateError::IdentityTransitionFailed(format!(
                "Failed to setregid({}): {}",
                gid, err
            )));
        }
        Ok(())
    }
}

/// MUST be called AFTER set_gid.
fn set_uid(uid: u32) -> Result<()> {
    #[cfg(target_os = "linux")]
    {
        use nix::unistd::{setresuid, Uid};

        let uid = Uid::from_raw(uid);
        setresuid(uid, uid, uid).map_err(|e| {
            GateError::IdentityTransitionFailed(format!("Failed to setresuid({}): {}", uid, e))
        })
    }

    #[cfg(not(target_os = "linux"))]
    {
        // SAFETY: setreuid takes plain integers and touches no memory.
        let rc = unsafe { libc::setreuid(uid as libc::uid_t, uid as libc::uid_t) };
        if rc != 0 {
            let err = std::io::Error::last_os_error();
            return Err(GateError::IdentityTransitionFailed(format!(
                "Failed to setreuid({}): {}",
                uid, err
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transition_leaves_consistent_identity() {
        // Without the setuid bit real == effective already, so setting every
        // id to the effective value is always permitted.
        let before = IdentitySnapshot::current();
        let after = assume_effective_identity().unwrap();
        assert!(after.is_consistent());
        assert_eq!(after.effective_uid, before.effective_uid);
        assert_eq!(after.real_uid, before.effective_uid);
        assert_eq!(after.effective_gid, before.effective_gid);
    }

    #[test]
    fn transition_is_idempotent() {
        let first = assume_effective_identity().unwrap();
        let second = assume_effective_identity().unwrap();
        assert_eq!(first, second);
    }
}
