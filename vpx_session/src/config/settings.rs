//! Settings file for sessions and logging.
//!
//! ```json
//! {
//!   "encoder": { "width": 640, "height": 480, "target_bitrate": 800 },
//!   "logging": { "log_level": "debug", "enable_file": false }
//! }
//! ```

use super::EncoderConfig;
use super::encoder_config::{KeyframeMode, RateControl};
use crate::common::constants::CONFIG_ENV_VAR;
use crate::error::{Result, VpxError};
use logging::{LogLevel, Logger};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Logging section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub log_file_path: String,
    pub log_level: String,
    pub enable_console: bool,
    pub enable_file: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            log_file_path: "vpx-session.log".to_string(),
            log_level: "info".to_string(),
            enable_console: false,
            enable_file: true,
        }
    }
}

impl LoggingConfig {
    /// Builds the logger this section describes.
    ///
    /// # Errors
    ///
    /// [`VpxError::Config`] for an unknown level name; an I/O error if the
    /// log file cannot be opened.
    pub fn build_logger(&self) -> Result<Logger> {
        let level: LogLevel = self.log_level.parse().map_err(VpxError::Config)?;
        if !self.enable_file && !self.enable_console {
            return Ok(Logger::discard());
        }
        if !self.enable_file {
            return Ok(Logger::console(level));
        }
        let path = PathBuf::from(&self.log_file_path);
        Ok(Logger::with_options(Some(path), level, self.enable_console)?)
    }
}

/// Encoder section. Absent fields keep the engine-derived value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderSettings {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub target_bitrate: Option<u32>,
    pub threads: Option<u32>,
    pub rate_control: Option<RateControl>,
    pub min_quantizer: Option<u32>,
    pub max_quantizer: Option<u32>,
    pub keyframe_mode: Option<KeyframeMode>,
    pub keyframe_max_dist: Option<u32>,
    pub error_resilient: Option<bool>,
}

impl EncoderSettings {
    /// Overrides `config` with the fields present here. Geometry changes are
    /// expected to go through [`EncoderConfig::derive`] first.
    pub fn apply(&self, config: &mut EncoderConfig) {
        if let Some(v) = self.target_bitrate {
            config.target_bitrate = v;
        }
        if let Some(v) = self.threads {
            config.threads = v;
        }
        if let Some(v) = self.rate_control {
            config.rate_control = v;
        }
        if let Some(v) = self.min_quantizer {
            config.min_quantizer = v;
        }
        if let Some(v) = self.max_quantizer {
            config.max_quantizer = v;
        }
        if let Some(v) = self.keyframe_mode {
            config.keyframe_mode = v;
        }
        if let Some(v) = self.keyframe_max_dist {
            config.keyframe_max_dist = v;
        }
        if let Some(v) = self.error_resilient {
            config.error_resilient = v;
        }
    }
}

/// Top-level settings file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    pub encoder: EncoderSettings,
    pub logging: LoggingConfig,
}

impl SessionSettings {
    /// Settings file name searched for by [`SessionSettings::discover`].
    pub const FILE_NAME: &'static str = "vpx_session.json";

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Ok(config_loader::load_json(path)?)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        Ok(config_loader::parse_json(content)?)
    }

    /// Loads the settings file from `$VPX_SESSION_CONFIG`, `./config/` or
    /// the working directory.
    pub fn discover() -> Result<Self> {
        Ok(config_loader::find_and_load(Self::FILE_NAME, CONFIG_ENV_VAR)?)
    }
}
