//! Thin wrappers around kernel identity primitives.
//!
//! All `unsafe` code is concentrated here with explicit SAFETY comments.

pub mod credentials;
