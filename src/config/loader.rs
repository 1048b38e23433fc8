//! Gate configuration loading.
//!
//! The gate runs with its owner's privileges, so nothing the invoking user
//! controls may reach the configuration. Sources, in order:
//! 1. compiled-in defaults (`GateConfig::default`, build-time paths)
//! 2. the override file at `DEFAULT_CONFIG_PATH`, only if owned by root or
//!    the effective identity and not writable by group/others
//!
//! Environment variables are never consulted.

use crate::config::types::{GateConfig, GateError, Result, DEFAULT_CONFIG_PATH, MIN_MAX_ARGS};
use std::fs::{File, Metadata};
use std::io::{BufReader, ErrorKind};
use std::os::unix::fs::MetadataExt;
use std::path::Path;

/// Load configuration from the build-time override path.
pub fn load_config() -> Result<GateConfig> {
    load_config_from(Path::new(DEFAULT_CONFIG_PATH))
}

/// Load configuration from `path`; a missing file yields the defaults.
pub fn load_config_from(path: &Path) -> Result<GateConfig> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            log::debug!("No override file at {}, using defaults", path.display());
            return Ok(GateConfig::default());
        }
        Err(e) => {
            return Err(GateError::Config(format!(
                "Failed to open config file {}: {}",
                path.display(),
                e
            )))
        }
    };

    // fstat on the open handle, not a second lookup by path
    let metadata = file.metadata().map_err(|e| {
        GateError::Config(format!("Failed to stat config file {}: {}", path.display(), e))
    })?;
    verify_trusted_metadata(&metadata).map_err(|reason| {
        GateError::Config(format!("Refusing untrusted config file {}: {}", path.display(), reason))
    })?;

    let config: GateConfig = serde_json::from_reader(BufReader::new(file)).map_err(|e| {
        GateError::Config(format!("Failed to parse config file {}: {}", path.display(), e))
    })?;

    validate_config(&config)?;
    log::debug!("Loaded gate config from {}", path.display());
    Ok(config)
}

/// Ownership and mode rule shared by the override file and the allow-list:
/// regular file, owned by root or the effective uid, no group/other write.
pub fn verify_trusted_metadata(metadata: &Metadata) -> std::result::Result<(), String> {
    if !metadata.is_file() {
        return Err("not a regular file".to_string());
    }

    let owner = metadata.uid();
    let euid = nix::unistd::geteuid().as_raw();
    if owner != 0 && owner != euid {
        return Err(format!("owned by uid {} (expected 0 or {})", owner, euid));
    }

    let mode = metadata.mode() & 0o7777;
    if mode & 0o022 != 0 {
        return Err(format!("writable by group or others (mode {:o})", mode));
    }

    Ok(())
}

fn validate_config(config: &GateConfig) -> Result<()> {
    if config.max_args < MIN_MAX_ARGS {
        return Err(GateError::Config(format!(
            "max_args must be at least {} (got {})",
            MIN_MAX_ARGS, config.max_args
        )));
    }

    if !config.policy_path.is_absolute() {
        return Err(GateError::Config(format!(
            "policy_path must be absolute: {}",
            config.policy_path.display()
        )));
    }

    if let Some(audit_log) = &config.audit_log {
        if !audit_log.is_absolute() {
            return Err(GateError::Config(format!(
                "audit_log must be absolute: {}",
                audit_log.display()
            )));
        }
    }

    Ok(())
}
