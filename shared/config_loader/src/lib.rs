//! # Config Loader
//!
//! Finds a configuration file, reads it and deserializes it with
//! `serde_json`.
//!
//! ```no_run
//! use config_loader::{find_config_file, load_json};
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct Settings {
//!     width: u32,
//! }
//!
//! let path = find_config_file("session.json", "VPX_SESSION_CONFIG")?;
//! let settings: Settings = load_json(&path)?;
//! # Ok::<(), config_loader::ConfigError>(())
//! ```

pub mod error;

pub use error::{ConfigError, Result};

use serde::de::DeserializeOwned;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Reads the whole file into a string.
pub fn load_config_file<P: AsRef<Path>>(path: P) -> Result<String> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    fs::read_to_string(path).map_err(|e| ConfigError::ReadError(format!("{}: {}", path.display(), e)))
}

/// Deserializes a JSON document held in memory.
pub fn parse_json<T: DeserializeOwned>(content: &str) -> Result<T> {
    serde_json::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
}

/// Reads and deserializes a JSON file.
pub fn load_json<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<T> {
    let content = load_config_file(path)?;
    parse_json(&content)
}

/// Searches for a configuration file.
///
/// Lookup order:
/// 1. the path held by the environment variable `env_var`, if it exists
/// 2. `./config/{filename}`
/// 3. `./{filename}`
pub fn find_config_file(filename: &str, env_var: &str) -> Result<PathBuf> {
    let candidates = env::var_os(env_var)
        .map(PathBuf::from)
        .into_iter()
        .chain([
            PathBuf::from("./config").join(filename),
            PathBuf::from("./").join(filename),
        ]);

    for candidate in candidates {
        if candidate.is_file() {
            return Ok(candidate);
        }
    }

    Err(ConfigError::FileNotFound(format!(
        "'{}' (searched ${}, ./config/{}, ./{})",
        filename, env_var, filename, filename
    )))
}

/// [`find_config_file`] followed by [`load_json`].
pub fn find_and_load<T: DeserializeOwned>(filename: &str, env_var: &str) -> Result<T> {
    let path = find_config_file(filename, env_var)?;
    load_json(path)
}
