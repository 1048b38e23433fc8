//! Process-image replacement via `execvp`.
//!
//! All allocation happens in [`PreparedExec::new`]; [`PreparedExec::exec`]
//! performs only the syscall, so it is safe to call right after `fork`.

use crate::config::types::{GateError, Result};
use crate::exec::invocation::Invocation;
use std::ffi::CString;
use std::os::unix::ffi::OsStrExt;

/// NUL-terminated argv ready for `execvp`.
#[derive(Debug)]
pub struct PreparedExec {
    argv: Vec<CString>,
    display: String,
}

impl PreparedExec {
    /// An argument with an interior NUL cannot be passed to exec and is
    /// reported as a usage error.
    pub fn new(invocation: &Invocation) -> Result<Self> {
        let argv = invocation
            .argv()
            .iter()
            .map(|arg| CString::new(arg.as_bytes()))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|_| GateError::Usage {
                program: invocation.program().to_string_lossy().into_owned(),
            })?;

        Ok(Self {
            argv,
            display: invocation.command().to_string_lossy().into_owned(),
        })
    }

    /// Replace the process image. Returns only on failure.
    ///
    /// The command is looked up on the inherited PATH when it contains no
    /// slash; the environment is passed through untouched. There is no retry
    /// and no fallback strategy.
    pub fn exec(self) -> GateError {
        match nix::unistd::execvp(&self.argv[0], &self.argv) {
            Ok(never) => match never {},
            Err(errno) => GateError::ExecFailed {
                command: self.display,
                source: errno,
            },
        }
    }
}
