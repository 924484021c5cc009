//! Encoder configuration and session settings.

mod encoder_config;
mod settings;

pub use encoder_config::{EncoderConfig, KeyframeMode, RateControl, Timebase};
pub use settings::{EncoderSettings, LoggingConfig, SessionSettings};
