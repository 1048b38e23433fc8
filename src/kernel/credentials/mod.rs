//! Real/effective identity synchronization.
//!
//! CRITICAL: setresgid MUST be called BEFORE setresuid.

mod transition;
mod validation;

pub use transition::assume_effective_identity;
pub use validation::{verify_identity, IdentitySnapshot};
