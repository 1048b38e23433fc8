// Policy validation for administrators
// Lints an allow-list the way the gate will read it: same line splitting,
// same trust rule for owner and mode. Never used on the gate's own path.

use crate::config::loader::verify_trusted_metadata;
use crate::policy::{strip_line_ending, PolicyOptions};
use serde::Serialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Validation result with detailed errors
#[derive(Debug, Serialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn add_error(&mut self, error: String) {
        self.valid = false;
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: String) {
        self.warnings.push(warning);
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::new()
    }
}

/// Lint report for one policy file
#[derive(Debug, Serialize)]
pub struct PolicyReport {
    pub path: PathBuf,
    /// Lines that can authorize a request
    pub effective_entries: usize,
    #[serde(flatten)]
    pub result: ValidationResult,
}

/// Lint the policy file at `path`.
pub fn lint_policy(path: &Path, options: PolicyOptions) -> PolicyReport {
    let mut result = ValidationResult::new();
    let mut effective_entries = 0;

    match File::open(path) {
        Ok(mut file) => {
            match file.metadata() {
                Ok(metadata) => {
                    if let Err(reason) = verify_trusted_metadata(&metadata) {
                        let msg = format!("unsafe policy file: {}", reason);
                        if options.verify_permissions {
                            result.add_error(msg);
                        } else {
                            result.add_warning(format!("{} (permission checks disabled)", msg));
                        }
                    }
                }
                Err(e) => result.add_error(format!("fstat failed: {}", e)),
            }

            let mut contents = Vec::new();
            match file.read_to_end(&mut contents) {
                Ok(_) => effective_entries = lint_entries(&contents, options, &mut result),
                Err(e) => result.add_error(format!("read failed: {}", e)),
            }
        }
        Err(e) => result.add_error(format!("cannot open {}: {}", path.display(), e)),
    }

    if result.is_valid() && effective_entries == 0 {
        result.add_warning("no usable entries: every request will be denied".to_string());
    }

    PolicyReport {
        path: path.to_path_buf(),
        effective_entries,
        result,
    }
}

/// Lint raw file contents, returning the number of entries able to match.
pub fn lint_entries(
    contents: &[u8],
    options: PolicyOptions,
    result: &mut ValidationResult,
) -> usize {
    let mut seen: HashMap<&[u8], usize> = HashMap::new();
    let mut effective = 0;

    for (idx, raw) in contents.split_inclusive(|b| *b == b'\n').enumerate() {
        let line_no = idx + 1;
        let entry = strip_line_ending(raw);
        let shown = String::from_utf8_lossy(entry);

        if entry.is_empty() {
            result.add_warning(format!("line {}: blank line is inert", line_no));
            continue;
        }

        if entry.iter().all(|b| b.is_ascii_whitespace()) {
            result.add_warning(format!("line {}: whitespace-only line is inert", line_no));
            continue;
        }

        if entry.ends_with(b"\r") {
            result.add_warning(format!(
                "line {}: carriage return is part of the entry and will not match",
                line_no
            ));
        } else if entry.ends_with(b" ") || entry.ends_with(b"\t") {
            result.add_warning(format!(
                "line {}: trailing whitespace is part of the entry {:?}",
                line_no, shown
            ));
        }

        if std::str::from_utf8(entry).is_err() {
            result.add_warning(format!("line {}: entry is not valid UTF-8", line_no));
        }

        if !entry.starts_with(b"/") {
            if options.require_absolute_entries {
                result.add_error(format!(
                    "line {}: {:?} is not an absolute path and will never authorize",
                    line_no, shown
                ));
                continue;
            }
            result.add_warning(format!(
                "line {}: {:?} is resolved through the caller's PATH",
                line_no, shown
            ));
        } else if is_unnormalized(entry) {
            result.add_warning(format!(
                "line {}: {:?} is not normalized; requests must use this exact spelling",
                line_no, shown
            ));
        }

        if let Some(first) = seen.get(entry) {
            result.add_warning(format!("line {}: duplicate of line {}", line_no, first));
            continue;
        }
        seen.insert(entry, line_no);
        effective += 1;
    }

    effective
}

fn is_unnormalized(entry: &[u8]) -> bool {
    entry.windows(2).any(|w| w == b"//")
        || entry
            .split(|b| *b == b'/')
            .any(|component| component == b"." || component == b"..")
        || (entry.len() > 1 && entry.ends_with(b"/"))
}
