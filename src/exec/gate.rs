//! Command gate ordering
//!
//! The sequence is FIXED:
//! 1. argument ingestion (usage + capacity guard)
//! 2. allow-list open (fail closed when missing/unsafe)
//! 3. exact-match authorization, policy handle released
//! 4. real/effective identity synchronization
//! 5. execvp of the requested command
//!
//! Start -> ArgsChecked -> PolicyLoaded -> Authorized -> IdentityTransitioned
//!
//! Each step consumes the prior state and returns exactly one next state on
//! success. Only `Gate<IdentityTransitioned>` exposes exec. Every failure is
//! terminal; there is no retry edge.
//!
//! The invoking identity is captured once in [`Gate::new`] and stamped on
//! every audit record, including those written after the transition.

use crate::config::types::{GateConfig, GateError, Result};
use crate::exec::invocation::Invocation;
use crate::exec::launcher::PreparedExec;
use crate::kernel::credentials::{assume_effective_identity, IdentitySnapshot};
use crate::observability::audit::{self, AuditOutcome, AuditRecord};
use crate::policy::{PolicyFile, PolicyOptions};
use std::convert::Infallible;
use std::ffi::{OsStr, OsString};

/// Type-state marker: nothing checked yet
pub struct Start;

/// Type-state: arguments captured and within capacity
pub struct ArgsChecked {
    invocation: Invocation,
}

/// Type-state: allow-list open and trusted
pub struct PolicyLoaded {
    invocation: Invocation,
    policy: PolicyFile,
}

/// Type-state: command found in the allow-list, policy handle closed
pub struct Authorized {
    invocation: Invocation,
    launch: PreparedExec,
}

/// Type-state: real ids equal effective ids, ready for exec
pub struct IdentityTransitioned {
    launch: PreparedExec,
    identity: IdentitySnapshot,
}

/// Gate process with type-state tracking
pub struct Gate<S> {
    config: GateConfig,
    invoker: IdentitySnapshot,
    state: S,
}

impl<S> Gate<S> {
    /// Identity the gate was started with.
    pub fn invoker(&self) -> &IdentitySnapshot {
        &self.invoker
    }

    fn advance<T>(self, state: T) -> Gate<T> {
        Gate {
            config: self.config,
            invoker: self.invoker,
            state,
        }
    }

    fn audit_failure(&self, err: &GateError, command: Option<&OsStr>) {
        audit::record(AuditRecord::failure(err, &self.invoker, command));
    }
}

impl Gate<Start> {
    pub fn new(config: GateConfig) -> Self {
        Self {
            config,
            invoker: IdentitySnapshot::current(),
            state: Start,
        }
    }

    /// Capture the caller's arguments.
    pub fn check_args<I>(self, args: I) -> Result<Gate<ArgsChecked>>
    where
        I: IntoIterator<Item = OsString>,
    {
        let invocation = Invocation::parse(args, self.config.max_args).map_err(|e| {
            self.audit_failure(&e, None);
            e
        })?;
        Ok(self.advance(ArgsChecked { invocation }))
    }
}

impl Gate<ArgsChecked> {
    pub fn invocation(&self) -> &Invocation {
        &self.state.invocation
    }

    /// Open the allow-list from the configured path.
    pub fn load_policy(self) -> Result<Gate<PolicyLoaded>> {
        let options = PolicyOptions::from_config(&self.config);
        let policy = match PolicyFile::open(&self.config.policy_path, options) {
            Ok(policy) => policy,
            Err(e) => {
                self.audit_failure(&e, Some(self.state.invocation.command()));
                return Err(e);
            }
        };

        let invocation = self.state.invocation;
        Ok(Gate {
            config: self.config,
            invoker: self.invoker,
            state: PolicyLoaded { invocation, policy },
        })
    }
}

impl Gate<PolicyLoaded> {
    /// Exact-match check. The policy handle is consumed and closed here
    /// whatever the outcome.
    pub fn authorize(self) -> Result<Gate<Authorized>> {
        let Gate {
            config,
            invoker,
            state: PolicyLoaded { invocation, policy },
        } = self;

        let decision = policy
            .authorize(invocation.command())
            .and_then(|()| PreparedExec::new(&invocation));

        match decision {
            Ok(launch) => {
                audit::record(AuditRecord::new(
                    AuditOutcome::Authorized,
                    &invoker,
                    Some(invocation.command()),
                ));
                Ok(Gate {
                    config,
                    invoker,
                    state: Authorized { invocation, launch },
                })
            }
            Err(e) => {
                audit::record(AuditRecord::failure(&e, &invoker, Some(invocation.command())));
                Err(e)
            }
        }
    }
}

impl Gate<Authorized> {
    pub fn invocation(&self) -> &Invocation {
        &self.state.invocation
    }

    /// Set real uid/gid to the effective values. Failure is fatal.
    pub fn transition_identity(self) -> Result<Gate<IdentityTransitioned>> {
        let identity = match assume_effective_identity() {
            Ok(identity) => identity,
            Err(e) => {
                self.audit_failure(&e, Some(self.state.invocation.command()));
                return Err(e);
            }
        };

        let launch = self.state.launch;
        Ok(Gate {
            config: self.config,
            invoker: self.invoker,
            state: IdentityTransitioned { launch, identity },
        })
    }
}

impl Gate<IdentityTransitioned> {
    pub fn identity(&self) -> &IdentitySnapshot {
        &self.state.identity
    }

    /// Replace the process image. This is the ONLY way to exec.
    /// Returns only on failure.
    pub fn exec(self) -> GateError {
        let invoker = self.invoker;
        let err = self.state.launch.exec();
        if let GateError::ExecFailed { command, .. } = &err {
            audit::record(AuditRecord::failure(
                &err,
                &invoker,
                Some(OsStr::new(command.as_str())),
            ));
        }
        err
    }
}

/// Run the whole chain for `args` (argv[0] included).
///
/// Never returns `Ok`: on success the process image has been replaced.
pub fn execute<I>(config: GateConfig, args: I) -> Result<Infallible>
where
    I: IntoIterator<Item = OsString>,
{
    let gate = Gate::new(config)
        .check_args(args)?
        .load_policy()?
        .authorize()?
        .transition_identity()?;
    Err(gate.exec())
}
