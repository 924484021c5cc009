//! The [`Logger`] handle.

use crate::error::Result;
use crate::log_level::LogLevel;
use crate::log_message::LogMessage;
use crate::log_writer::spawn_writer;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{Sender, channel};

/// Cheap-to-clone logging handle.
///
/// Clones share the same writer thread. A logger built with
/// [`Logger::discard`] drops everything, which is what library code gets
/// when the caller does not care about diagnostics.
///
/// # Examples
///
/// ```
/// use logging::{LogLevel, Logger};
///
/// let logger = Logger::console(LogLevel::Warn).for_component("Encoder");
/// logger.debug("filtered out");
/// logger.warn("engine rejected frame");
/// ```
#[derive(Clone, Debug)]
pub struct Logger {
    sender: Option<Sender<LogMessage>>,
    level: LogLevel,
    component: Option<String>,
    log_path: Option<PathBuf>,
    console_output: bool,
}

impl Logger {
    /// Logs to `log_path` (appending) from a dedicated writer thread.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or the thread cannot be
    /// started.
    pub fn new(log_path: PathBuf, level: LogLevel) -> Result<Self> {
        Self::with_options(Some(log_path), level, false)
    }

    /// Logs to a file and, when `console_output` is set, echoes to stdout.
    pub fn with_options(
        log_path: Option<PathBuf>,
        level: LogLevel,
        console_output: bool,
    ) -> Result<Self> {
        let sender = match log_path {
            Some(ref path) => {
                let (sender, receiver) = channel();
                spawn_writer(path, receiver)?;
                Some(sender)
            }
            None => None,
        };
        Ok(Logger {
            sender,
            level,
            component: None,
            log_path,
            console_output,
        })
    }

    /// Console-only logger.
    pub fn console(level: LogLevel) -> Self {
        Logger {
            sender: None,
            level,
            component: None,
            log_path: None,
            console_output: true,
        }
    }

    /// Logger that records nothing.
    pub fn discard() -> Self {
        Logger {
            sender: None,
            level: LogLevel::Error,
            component: None,
            log_path: None,
            console_output: false,
        }
    }

    /// Same sink and level, different component tag.
    pub fn for_component(&self, component: &str) -> Self {
        Logger {
            component: Some(component.to_string()),
            ..self.clone()
        }
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }

    pub fn component(&self) -> Option<&str> {
        self.component.as_deref()
    }

    pub fn log_path(&self) -> Option<&Path> {
        self.log_path.as_deref()
    }

    /// True when a message at `level` would be recorded somewhere.
    pub fn enabled(&self, level: LogLevel) -> bool {
        level >= self.level && (self.sender.is_some() || self.console_output)
    }

    pub fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, message);
    }

    pub fn info(&self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    pub fn warn(&self, message: &str) {
        self.log(LogLevel::Warn, message);
    }

    pub fn error(&self, message: &str) {
        self.log(LogLevel::Error, message);
    }

    fn log(&self, level: LogLevel, message: &str) {
        if !self.enabled(level) {
            return;
        }
        let msg = LogMessage::new(level, self.component.as_deref(), message);
        if self.console_output {
            print!("{}", msg.format());
        }
        if let Some(ref sender) = self.sender {
            // The writer thread only goes away with the process.
            let _ = sender.send(msg);
        }
    }
}
