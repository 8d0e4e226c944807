//! Setup operations: shared context, install pipeline, domain errors.

pub mod context;
pub mod error;
pub mod install;

pub use context::SetupContext;
pub use error::SetupError;
