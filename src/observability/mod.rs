//! Observability
//!
//! Append-only audit trail of gate decisions.

pub mod audit;
