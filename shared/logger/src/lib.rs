//! Leveled logger shared by the codec session crates.
//!
//! Messages are filtered by [`LogLevel`], tagged with an optional component
//! name (`"Encoder"`, `"Decoder"`, ...) and handed to a dedicated writer
//! thread so that engine calls never block on file I/O.

pub mod error;
mod log_level;
mod log_message;
mod log_writer;
mod logger;

pub use error::{LoggingError, Result};
pub use log_level::LogLevel;
pub use logger::Logger;
