//! Common constants shared across session and engine modules

/// Logging intervals for frame processing
pub mod logging {
    /// Log progress every N submitted images (encoder)
    pub const ENCODER_LOG_INTERVAL: u64 = 60;
    /// Log progress every N decoded frames (decoder)
    pub const DECODER_LOG_INTERVAL: u64 = 60;
}

/// Geometry limits and alignment units
pub mod geometry {
    /// Macroblock edge in luma samples; decoders allocate in multiples of it
    pub const MACROBLOCK_SIZE: usize = 16;
    /// Largest width or height a 14-bit frame header can carry
    pub const MAX_DIMENSION: u32 = 0x3fff;
    /// Buffer alignment used for decoder output images
    pub const DECODER_BUFFER_ALIGN: u32 = 16;
}

/// Encoder defaults reported by the built-in engine
pub mod encoder_defaults {
    pub const WIDTH: u32 = 320;
    pub const HEIGHT: u32 = 240;
    /// Target bitrate in kilobits per second
    pub const TARGET_BITRATE: u32 = 256;
    pub const TIMEBASE_NUM: i32 = 1;
    pub const TIMEBASE_DEN: i32 = 30;
    pub const MIN_QUANTIZER: u32 = 4;
    pub const MAX_QUANTIZER: u32 = 63;
    pub const KEYFRAME_MAX_DIST: u32 = 128;
}

/// Environment variable naming the session settings file
pub const CONFIG_ENV_VAR: &str = "VPX_SESSION_CONFIG";
