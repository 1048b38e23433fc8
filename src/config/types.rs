/// Core types for the command gate: configuration, errors, exit codes
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Build-time policy location. Never read from the runtime environment.
pub const DEFAULT_POLICY_PATH: &str = match option_env!("CMDGATE_POLICY_PATH") {
    Some(path) => path,
    None => "/etc/cmdgate/allowed_commands",
};

/// Build-time location of the optional trusted override file.
pub const DEFAULT_CONFIG_PATH: &str = match option_env!("CMDGATE_CONFIG_PATH") {
    Some(path) => path,
    None => "/etc/cmdgate/gate.json",
};

/// Floor for the argument capacity guard.
pub const MIN_MAX_ARGS: usize = 500;

/// Default argument capacity (arguments after the gate's own name).
pub const DEFAULT_MAX_ARGS: usize = 4096;

/// Log verbosity for the gate binary. Kept separate from `log::LevelFilter`
/// so it can be deserialized from the override file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => log::LevelFilter::Off,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
        }
    }
}

/// Effective gate configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GateConfig {
    /// Allow-list file, one command identifier per line
    pub policy_path: PathBuf,
    /// Relative allow-list entries never authorize
    pub require_absolute_entries: bool,
    /// fstat the opened policy file and refuse unsafe owners/modes
    pub verify_policy_permissions: bool,
    /// Upper bound on arguments passed through (command included)
    pub max_args: usize,
    /// JSON-lines audit log; disabled when `None`
    pub audit_log: Option<PathBuf>,
    /// stderr log filter for the gate binary
    pub log_level: LogLevel,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            policy_path: PathBuf::from(DEFAULT_POLICY_PATH),
            require_absolute_entries: true,
            verify_policy_permissions: true,
            max_args: DEFAULT_MAX_ARGS,
            audit_log: None,
            log_level: LogLevel::Warn,
        }
    }
}

impl GateConfig {
    /// Config pointing at a specific policy file, other fields defaulted.
    pub fn with_policy_path(policy_path: impl Into<PathBuf>) -> Self {
        Self {
            policy_path: policy_path.into(),
            ..Self::default()
        }
    }
}

/// Error types for the command gate. Every variant is fatal to the process.
#[derive(Error, Debug)]
pub enum GateError {
    #[error("Usage: {program} <command> [args...]")]
    Usage { program: String },

    #[error("Too many arguments: {count} exceeds limit of {limit}")]
    ArgumentLimit { count: usize, limit: usize },

    #[error("Allowed commands file unavailable: {}: {reason}", .path.display())]
    PolicyUnavailable { path: PathBuf, reason: String },

    #[error("Command not allowed to be run via this utility: {command}")]
    NotAuthorized { command: String },

    #[error("Identity transition failed: {0}")]
    IdentityTransitionFailed(String),

    #[error("Failed to exec '{command}': {source}")]
    ExecFailed {
        command: String,
        #[source]
        source: nix::errno::Errno,
    },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl GateError {
    /// Process exit status for this failure (sysexits-style).
    pub fn exit_code(&self) -> i32 {
        match self {
            // EX_USAGE
            GateError::Usage { .. } | GateError::ArgumentLimit { .. } => 64,
            // EX_NOINPUT
            GateError::PolicyUnavailable { .. } => 66,
            // EX_NOPERM
            GateError::NotAuthorized { .. } => 77,
            // EX_OSERR
            GateError::IdentityTransitionFailed(_) => 71,
            GateError::ExecFailed { source, .. } => match source {
                nix::errno::Errno::ENOENT | nix::errno::Errno::ENOTDIR => 127,
                nix::errno::Errno::EACCES
                | nix::errno::Errno::EPERM
                | nix::errno::Errno::ENOEXEC => 126,
                _ => 1,
            },
            // EX_CONFIG
            GateError::Config(_) => 78,
        }
    }
}

pub type Result<T> = std::result::Result<T, GateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_hardened() {
        let config = GateConfig::default();
        assert!(config.require_absolute_entries);
        assert!(config.verify_policy_permissions);
        assert!(config.max_args >= MIN_MAX_ARGS);
        assert!(config.audit_log.is_none());
        assert_eq!(config.log_level, LogLevel::Warn);
    }

    #[test]
    fn every_failure_exits_nonzero() {
        let errors = vec![
            GateError::Usage { program: "gate".into() },
            GateError::ArgumentLimit { count: 9000, limit: 4096 },
            GateError::PolicyUnavailable {
                path: PathBuf::from("/nope"),
                reason: "missing".into(),
            },
            GateError::NotAuthorized { command: "/bin/rm".into() },
            GateError::IdentityTransitionFailed("EPERM".into()),
            GateError::ExecFailed {
                command: "/nope".into(),
                source: nix::errno::Errno::ENOENT,
            },
            GateError::Config("bad".into()),
        ];
        let mut codes = Vec::new();
        for err in errors {
            assert_ne!(err.exit_code(), 0, "{err}");
            codes.push(err.exit_code());
        }
        assert_eq!(codes, vec![64, 64, 66, 77, 71, 127, 78]);
    }

    #[test]
    fn exec_failure_codes_follow_shell_conventions() {
        let not_found = GateError::ExecFailed {
            command: "x".into(),
            source: nix::errno::Errno::ENOENT,
        };
        let not_exec = GateError::ExecFailed {
            command: "x".into(),
            source: nix::errno::Errno::EACCES,
        };
        assert_eq!(not_found.exit_code(), 127);
        assert_eq!(not_exec.exit_code(), 126);
    }

    #[test]
    fn not_authorized_message_names_command() {
        let err = GateError::NotAuthorized { command: "/bin/rm".into() };
        assert!(err.to_string().contains("/bin/rm"));
    }

    #[test]
    fn policy_unavailable_message_names_file() {
        let err = GateError::PolicyUnavailable {
            path: PathBuf::from("/etc/cmdgate/allowed_commands"),
            reason: "No such file or directory".into(),
        };
        assert!(err.to_string().contains("/etc/cmdgate/allowed_commands"));
    }

    #[test]
    fn log_level_deserializes_lowercase() {
        let level: LogLevel = serde_json::from_str("\"debug\"").unwrap();
        assert_eq!(log::LevelFilter::from(level), log::LevelFilter::Debug);
    }
}
