use std::fmt;

/// Result type used by the loader.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Failures while locating, reading or parsing a configuration file.
#[derive(Debug)]
pub enum ConfigError {
    /// No file at the given path, or none of the searched locations matched.
    FileNotFound(String),
    /// The file exists but could not be read.
    ReadError(String),
    /// The contents are not valid JSON for the requested type.
    ParseError(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::FileNotFound(path) => write!(f, "configuration file not found: {}", path),
            ConfigError::ReadError(msg) => write!(f, "cannot read configuration file: {}", msg),
            ConfigError::ParseError(msg) => write!(f, "invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}
