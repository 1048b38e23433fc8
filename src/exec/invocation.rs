//! Caller argument ingestion.
//!
//! argv[0] is the gate's own name and is only used for usage text. argv[1]
//! is the command identifier, kept byte-for-byte. argv[1..] is handed to the
//! replacement image unchanged.

use crate::config::types::{GateError, Result};
use std::ffi::{OsStr, OsString};

const FALLBACK_PROGRAM_NAME: &str = "gate";

/// The caller's request, validated for presence and size.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Invocation {
    program: OsString,
    argv: Vec<OsString>,
}

impl Invocation {
    /// Split raw arguments into program name and pass-through vector.
    ///
    /// At most `max_args + 1` tail arguments are buffered; anything larger is
    /// rejected with `ArgumentLimit` rather than collected.
    pub fn parse<I>(args: I, max_args: usize) -> Result<Self>
    where
        I: IntoIterator<Item = OsString>,
    {
        let mut args = args.into_iter();
        let program = args
            .next()
            .unwrap_or_else(|| OsString::from(FALLBACK_PROGRAM_NAME));

        let argv: Vec<OsString> = args.by_ref().take(max_args.saturating_add(1)).collect();
        if argv.len() > max_args {
            return Err(GateError::ArgumentLimit {
                count: argv.len() + args.count(),
                limit: max_args,
            });
        }

        if argv.is_empty() {
            return Err(GateError::Usage {
                program: program.to_string_lossy().into_owned(),
            });
        }

        Ok(Self { program, argv })
    }

    /// The gate's own name as invoked.
    pub fn program(&self) -> &OsStr {
        &self.program
    }

    /// The command identifier used for authorization and exec lookup.
    pub fn command(&self) -> &OsStr {
        &self.argv[0]
    }

    /// Argument vector for the replacement image, command identifier first.
    pub fn argv(&self) -> &[OsString] {
        &self.argv
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::DEFAULT_MAX_ARGS;

    fn args(items: &[&str]) -> Vec<OsString> {
        items.iter().map(OsString::from).collect()
    }

    #[test]
    fn command_is_second_token_and_argv_starts_there() {
        let argv = args(&["gate", "/bin/ls", "-la", "/tmp"]);
        let inv = Invocation::parse(argv, DEFAULT_MAX_ARGS).unwrap();
        assert_eq!(inv.program(), "gate");
        assert_eq!(inv.command(), "/bin/ls");
        assert_eq!(inv.argv(), args(&["/bin/ls", "-la", "/tmp"]).as_slice());
    }

    #[test]
    fn missing_command_is_usage_error() {
        let err = Invocation::parse(args(&["/usr/local/bin/gate"]), DEFAULT_MAX_ARGS).unwrap_err();
        match err {
            GateError::Usage { program } => assert_eq!(program, "/usr/local/bin/gate"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn empty_argv_is_usage_error() {
        let err = Invocation::parse(Vec::<OsString>::new(), DEFAULT_MAX_ARGS).unwrap_err();
        assert!(matches!(err, GateError::Usage { .. }));
    }

    #[test]
    fn identifier_is_not_normalized() {
        for raw in ["./ls", "/bin/../bin/ls", "/bin/ls ", "ls;rm -rf /", "$HOME/x", "--"] {
            let inv = Invocation::parse(args(&["gate", raw]), DEFAULT_MAX_ARGS).unwrap();
            assert_eq!(inv.command(), raw);
        }
    }

    #[test]
    fn argument_limit_is_inclusive() {
        let mut at_limit = vec![OsString::from("gate")];
        at_limit.extend((0..500).map(|i| OsString::from(format!("a{i}"))));
        assert!(Invocation::parse(at_limit.clone(), 500).is_ok());

        at_limit.push(OsString::from("one-too-many"));
        let err = Invocation::parse(at_limit, 500).unwrap_err();
        match err {
            GateError::ArgumentLimit { count, limit } => {
                assert_eq!(count, 501);
                assert_eq!(limit, 500);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn non_utf8_arguments_survive() {
        use std::os::unix::ffi::OsStringExt;
        let raw = OsString::from_vec(vec![b'/', b'x', 0xff]);
        let inv = Invocation::parse(vec![OsString::from("gate"), raw.clone()], 10).unwrap();
        assert_eq!(inv.command(), raw.as_os_str());
    }
}
