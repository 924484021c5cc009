//! Encoder configuration record.

use crate::common::constants::encoder_defaults;
use crate::error::{Result, VpxError};
use serde::{Deserialize, Serialize};

/// Rate control algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RateControl {
    /// Variable bitrate
    #[default]
    Vbr,
    /// Constant bitrate
    Cbr,
    /// Constrained quality
    Cq,
}

/// Key frame placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyframeMode {
    /// Engine places key frames, at least every `keyframe_max_dist` frames
    #[default]
    Auto,
    /// Key frames only when forced
    Disabled,
}

/// Time unit of presentation timestamps, as a fraction of a second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Timebase {
    pub num: i32,
    pub den: i32,
}

impl Default for Timebase {
    fn default() -> Self {
        Timebase {
            num: encoder_defaults::TIMEBASE_NUM,
            den: encoder_defaults::TIMEBASE_DEN,
        }
    }
}

/// Encoder configuration.
///
/// Obtain one from the engine's defaults (see
/// [`crate::session::Encoder::configure`]) rather than building it by hand;
/// the engine validates it when the session opens and on every
/// reconfigure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncoderConfig {
    pub usage: u32,
    pub threads: u32,
    pub profile: u32,
    pub width: u32,
    pub height: u32,
    pub timebase: Timebase,
    pub error_resilient: bool,
    pub lag_in_frames: u32,
    pub rate_control: RateControl,
    /// Target bitrate in kilobits per second
    pub target_bitrate: u32,
    pub min_quantizer: u32,
    pub max_quantizer: u32,
    pub keyframe_mode: KeyframeMode,
    pub keyframe_min_dist: u32,
    pub keyframe_max_dist: u32,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        EncoderConfig {
            usage: 0,
            threads: 1,
            profile: 0,
            width: encoder_defaults::WIDTH,
            height: encoder_defaults::HEIGHT,
            timebase: Timebase::default(),
            error_resilient: false,
            lag_in_frames: 0,
            rate_control: RateControl::default(),
            target_bitrate: encoder_defaults::TARGET_BITRATE,
            min_quantizer: encoder_defaults::MIN_QUANTIZER,
            max_quantizer: encoder_defaults::MAX_QUANTIZER,
            keyframe_mode: KeyframeMode::default(),
            keyframe_min_dist: 0,
            keyframe_max_dist: encoder_defaults::KEYFRAME_MAX_DIST,
        }
    }
}

impl EncoderConfig {
    /// Derives a configuration for `width`x`height` from engine defaults.
    ///
    /// The bitrate scales with the pixel count relative to the default
    /// geometry and never drops below 1 kbps.
    ///
    /// # Errors
    ///
    /// [`VpxError::Config`] if the defaults report a zero geometry.
    pub fn derive(defaults: &EncoderConfig, width: u32, height: u32) -> Result<Self> {
        let default_pixels = u64::from(defaults.width) * u64::from(defaults.height);
        if default_pixels == 0 {
            return Err(VpxError::Config(format!(
                "engine default geometry {}x{} cannot scale the bitrate",
                defaults.width, defaults.height
            )));
        }

        let pixels = u64::from(width) * u64::from(height);
        let bitrate = u64::from(defaults.target_bitrate) * pixels / default_pixels;

        Ok(EncoderConfig {
            width,
            height,
            target_bitrate: bitrate.clamp(1, u64::from(u32::MAX)) as u32,
            ..defaults.clone()
        })
    }

    /// Target bitrate in bits per second.
    pub fn bitrate_bps(&self) -> u64 {
        u64::from(self.target_bitrate) * 1000
    }
}
