//! Constants and helpers shared across the session modules.

pub mod constants;
pub(crate) mod flags;
