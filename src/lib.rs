//! cmdgate: a setuid command gate
//! Checks a requested command against an administrator-owned allow-list and,
//! only when it matches exactly, replaces itself with that command under the
//! binary owner's identity.
//!
//! # Architecture
//!
//! ## Configuration ([`config`])
//! - [`config::types`]: `GateConfig`, `GateError`, exit codes
//! - [`config::loader`]: compiled-in defaults and the trusted override file
//! - [`config::validator`]: allow-list linting for `gatectl check`
//!
//! ## Policy ([`policy`])
//! - [`policy::allowlist`]: exact-match, fail-closed allow-list
//!
//! ## Kernel Primitives ([`kernel`])
//! - [`kernel::credentials`]: real/effective identity synchronization
//!
//! ## Execution Control ([`exec`])
//! - [`exec::invocation`]: argv capture with a capacity guard
//! - [`exec::gate`]: type-state ordering of the gate phases
//! - [`exec::launcher`]: `execvp` with the caller's argv and environment
//!
//! ## Observability ([`observability`])
//! - [`observability::audit`]: JSON-lines audit records
//!
//! # Exit codes
//!
//! | code | meaning |
//! |------|---------|
//! | 64   | usage error or too many arguments |
//! | 66   | allow-list missing, unreadable or unsafe |
//! | 71   | identity transition failed |
//! | 77   | command not in the allow-list |
//! | 78   | invalid or untrusted configuration |
//! | 126  | command found but not executable |
//! | 127  | command not found |
//! | 1    | any other exec failure |
//!
//! A successful run never exits: the process image is replaced.

// Configuration & Policy
pub mod config;
pub mod policy;

// Kernel Primitives
pub mod kernel;

// Execution Control
pub mod exec;

// Observability
pub mod observability;

// CLI entrypoint wiring shared by the gate/gatectl binaries.
pub mod cli;

pub use config::types::{GateConfig, GateError, Result};
pub use exec::execute;
