/// Audit logging for gate decisions
/// Records (timestamp, invoking identity, requested command, outcome) as one
/// JSON object per line. Attached at the decision points; a failure to write
/// is reported through `log` and never changes what the gate does.
///
/// Records carry the identity the gate was invoked with, captured before any
/// credential change.
use crate::config::types::GateError;
use crate::kernel::credentials::IdentitySnapshot;
use chrono::{DateTime, Utc};
use log::{debug, error, info};
use serde::Serialize;
use std::ffi::OsStr;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};
use uuid::Uuid;

/// Result of a single gate invocation, as recorded in the audit trail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
    Authorized,
    Denied,
    PolicyUnavailable,
    UsageError,
    IdentityFailed,
    ExecFailed,
    ConfigError,
}

impl From<&GateError> for AuditOutcome {
    fn from(err: &GateError) -> Self {
        match err {
            GateError::Usage { .. } | GateError::ArgumentLimit { .. } => AuditOutcome::UsageError,
            GateError::PolicyUnavailable { .. } => AuditOutcome::PolicyUnavailable,
            GateError::NotAuthorized { .. } => AuditOutcome::Denied,
            GateError::IdentityTransitionFailed(_) => AuditOutcome::IdentityFailed,
            GateError::ExecFailed { .. } => AuditOutcome::ExecFailed,
            GateError::Config(_) => AuditOutcome::ConfigError,
        }
    }
}

/// One audit line
#[derive(Debug, Clone, Serialize)]
pub struct AuditRecord {
    pub timestamp: DateTime<Utc>,
    pub request_id: String,
    pub pid: u32,
    pub real_uid: u32,
    pub effective_uid: u32,
    pub command: Option<String>,
    pub outcome: AuditOutcome,
    pub detail: Option<String>,
}

impl AuditRecord {
    /// Build a record stamped with the current time and the invoking identity.
    pub fn new(outcome: AuditOutcome, invoker: &IdentitySnapshot, command: Option<&OsStr>) -> Self {
        Self {
            timestamp: Utc::now(),
            request_id: request_id().to_string(),
            pid: std::process::id(),
            real_uid: invoker.real_uid,
            effective_uid: invoker.effective_uid,
            command: command.map(|c| c.to_string_lossy().into_owned()),
            outcome,
            detail: None,
        }
    }

    /// Record for a failed invocation; the error message becomes the detail.
    pub fn failure(err: &GateError, invoker: &IdentitySnapshot, command: Option<&OsStr>) -> Self {
        Self::new(AuditOutcome::from(err), invoker, command).with_detail(err.to_string())
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// File-backed audit sink
pub struct AuditLogger {
    audit_file: Mutex<File>,
    audit_path: PathBuf,
}

impl AuditLogger {
    /// Open `path` for appending, creating it owner-only if absent.
    /// The parent directory is never created.
    pub fn open(path: &Path) -> std::io::Result<Self> {
        let audit_file = OpenOptions::new()
            .create(true)
            .append(true)
            .mode(0o600)
            .open(path)?;

        Ok(Self {
            audit_file: Mutex::new(audit_file),
            audit_path: path.to_path_buf(),
        })
    }

    /// Append one record. Errors are returned, not logged.
    pub fn write_record(&self, record: &AuditRecord) -> std::io::Result<()> {
        let line = serde_json::to_string(record)?;
        let mut file = self
            .audit_file
            .lock()
            .map_err(|_| std::io::Error::new(std::io::ErrorKind::Other, "audit lock poisoned"))?;
        writeln!(file, "{}", line)?;
        file.flush()
    }

    pub fn audit_path(&self) -> &Path {
        &self.audit_path
    }
}

static AUDIT_LOGGER: OnceLock<AuditLogger> = OnceLock::new();
static REQUEST_ID: OnceLock<String> = OnceLock::new();

/// Per-process correlation id shared by every record of one invocation.
pub fn request_id() -> &'static str {
    REQUEST_ID.get_or_init(|| Uuid::new_v4().to_string())
}

/// Initialize the global audit sink.
pub fn init_audit_logger(path: &Path) -> std::io::Result<()> {
    let logger = AuditLogger::open(path)?;
    if AUDIT_LOGGER.set(logger).is_err() {
        error!("Audit logger already initialized");
    } else {
        debug!("Audit logger initialized at {}", path.display());
    }
    Ok(())
}

/// Record an event. Failures are also mirrored to `log`; an authorization
/// goes to the sink only, since stderr then belongs to the exec'd command.
pub fn record(record: AuditRecord) {
    if record.outcome != AuditOutcome::Authorized {
        info!(
            "AUDIT {:?}: command={} real_uid={} effective_uid={}",
            record.outcome,
            record.command.as_deref().unwrap_or("-"),
            record.real_uid,
            record.effective_uid
        );
    }

    if let Some(logger) = AUDIT_LOGGER.get() {
        if let Err(e) = logger.write_record(&record) {
            error!(
                "Failed to write audit record to {}: {}",
                logger.audit_path().display(),
                e
            );
        }
    }
}
