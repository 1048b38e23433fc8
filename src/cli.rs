use crate::config::types::{GateConfig, GateError, LogLevel};
use crate::config::validator::{lint_policy, PolicyReport};
use crate::config::{load_config, load_config_from};
use crate::exec;
use crate::observability::audit;
use crate::policy::{PolicyFile, PolicyOptions};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::ffi::OsString;
use std::path::PathBuf;

/// Entry point for the setuid `gate` binary.
///
/// argv is read raw (no option parsing) so argv[1] reaches the allow-list
/// check byte-for-byte. Returns only to report a failure; the caller exits
/// with [`GateError::exit_code`].
pub fn run_gate() -> GateError {
    let config = match load_config() {
        Ok(config) => config,
        Err(e) => return e,
    };

    init_gate_logging(config.log_level);

    if let Some(path) = &config.audit_log {
        if let Err(e) = audit::init_audit_logger(path) {
            log::warn!("Cannot open audit log {}: {}; continuing without it", path.display(), e);
        }
    }

    match exec::execute(config, std::env::args_os()) {
        Ok(never) => match never {},
        Err(e) => e,
    }
}

/// Logging for the privileged binary: level fixed by trusted config,
/// `RUST_LOG` and friends are ignored.
fn init_gate_logging(level: LogLevel) {
    let _ = env_logger::Builder::new()
        .filter_level(level.into())
        .write_style(env_logger::WriteStyle::Never)
        .format_timestamp(None)
        .target(env_logger::Target::Stderr)
        .try_init();
}

#[derive(Parser)]
#[command(
    name = "gatectl",
    author,
    version,
    about = "Inspect command gate policy and configuration",
    long_about = None
)]
pub struct CtlCli {
    #[command(subcommand)]
    command: CtlCommand,
}

#[derive(Subcommand)]
enum CtlCommand {
    /// Lint an allow-list file
    Check {
        /// Policy file (defaults to the configured one)
        #[arg(long)]
        policy: Option<PathBuf>,
        /// Emit the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Report whether a command identifier would be authorized
    Query {
        /// Policy file (defaults to the configured one)
        #[arg(long)]
        policy: Option<PathBuf>,
        /// Command identifier, compared byte-for-byte
        #[arg(value_parser = clap::value_parser!(OsString), allow_hyphen_values = true)]
        command: OsString,
    },
    /// Print the effective gate configuration
    Config {
        /// Alternate override file to load instead of the built-in path
        #[arg(long)]
        file: Option<PathBuf>,
        /// Emit JSON
        #[arg(long)]
        json: bool,
    },
}

impl CtlCommand {
    fn command_name(&self) -> &'static str {
        match self {
            Self::Check { .. } => "check",
            Self::Query { .. } => "query",
            Self::Config { .. } => "config",
        }
    }
}

/// Entry point for `gatectl`. Never changes identity, never execs.
pub fn run_ctl() -> Result<()> {
    env_logger::init();

    let cli = CtlCli::parse();
    log::debug!("gatectl {}", cli.command.command_name());

    match cli.command {
        CtlCommand::Check { policy, json } => {
            let config = load_config().context("Failed to load gate configuration")?;
            let path = policy.unwrap_or_else(|| config.policy_path.clone());
            let report = lint_policy(&path, PolicyOptions::from_config(&config));

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report);
            }

            if !report.result.is_valid() {
                std::process::exit(1);
            }
        }
        CtlCommand::Query { policy, command } => {
            let config = load_config().context("Failed to load gate configuration")?;
            let path = policy.unwrap_or_else(|| config.policy_path.clone());
            let decision = PolicyFile::open(&path, PolicyOptions::from_config(&config))
                .and_then(|policy| policy.authorize(&command));

            match decision {
                Ok(()) => println!("allowed: {}", command.to_string_lossy()),
                Err(e) => {
                    eprintln!("{}", e);
                    std::process::exit(e.exit_code());
                }
            }
        }
        CtlCommand::Config { file, json } => {
            let config = match file {
                Some(path) => load_config_from(&path),
                None => load_config(),
            }
            .context("Failed to load gate configuration")?;

            if json {
                println!("{}", serde_json::to_string_pretty(&config)?);
            } else {
                print_config(&config);
            }
        }
    }

    Ok(())
}

fn print_report(report: &PolicyReport) {
    println!("Policy: {}", report.path.display());
    println!("Usable entries: {}", report.effective_entries);
    for error in &report.result.errors {
        println!("  error: {}", error);
    }
    for warning in &report.result.warnings {
        println!("  warning: {}", warning);
    }
    if report.result.is_valid() {
        println!("OK");
    } else {
        println!("FAILED ({} error(s))", report.result.errors.len());
    }
}

fn print_config(config: &GateConfig) {
    println!("policy_path: {}", config.policy_path.display());
    println!("require_absolute_entries: {}", config.require_absolute_entries);
    println!("verify_policy_permissions: {}", config.verify_policy_permissions);
    println!("max_args: {}", config.max_args);
    match &config.audit_log {
        Some(path) => println!("audit_log: {}", path.display()),
        None => println!("audit_log: (disabled)"),
    }
    println!("log_level: {:?}", config.log_level);
}
