//! Allow-list policy
//!
//! Line-oriented, exact-match list of command identifiers read from a
//! single administrator-owned file.

pub mod allowlist;

pub use allowlist::{strip_line_ending, PolicyFile, PolicyOptions};
