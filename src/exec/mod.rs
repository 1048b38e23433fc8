//! Execution control
//!
//! Argument ingestion, the type-state authorization chain, and the final
//! process-image replacement.

pub mod gate;
pub mod invocation;
pub mod launcher;

pub use gate::{execute, Gate};
pub use invocation::Invocation;
pub use launcher::PreparedExec;
