//! A single formatted log record.

use crate::log_level::LogLevel;
use chrono::Local;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

#[derive(Debug, Clone)]
pub(crate) struct LogMessage {
    pub timestamp: String,
    pub level: LogLevel,
    pub component: Option<String>,
    pub message: String,
}

impl LogMessage {
    /// Stamps a message with the local wall-clock time.
    pub fn new(level: LogLevel, component: Option<&str>, message: &str) -> Self {
        Self {
            timestamp: Local::now().format(TIMESTAMP_FORMAT).to_string(),
            level,
            component: component.map(str::to_owned),
            message: message.to_owned(),
        }
    }

    /// `[timestamp] LEVEL [component]: message` followed by a newline.
    pub fn format(&self) -> String {
        match self.component {
            Some(ref component) => format!(
                "[{}] {} [{}]: {}\n",
                self.timestamp, self.level, component, self.message
            ),
            None => format!("[{}] {}: {}\n", self.timestamp, self.level, self.message),
        }
    }
}
