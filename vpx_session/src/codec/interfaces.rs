//! Process-wide interface singletons.
//!
//! Each interface is built on first use and never mutated or dropped.

use super::CodecInterface;
use crate::engine::reference::{ReferenceDecoderEngine, ReferenceEncoderEngine};
use std::sync::LazyLock;

static REFERENCE_ENCODER: LazyLock<CodecInterface> =
    LazyLock::new(|| CodecInterface::new(ReferenceEncoderEngine));

static REFERENCE_DECODER: LazyLock<CodecInterface> =
    LazyLock::new(|| CodecInterface::new(ReferenceDecoderEngine));

/// Encoder of the built-in software engine.
pub fn reference_encoder() -> &'static CodecInterface {
    &REFERENCE_ENCODER
}

/// Decoder of the built-in software engine.
pub fn reference_decoder() -> &'static CodecInterface {
    &REFERENCE_DECODER
}

#[cfg(feature = "ffmpeg")]
static VP8_ENCODER: LazyLock<CodecInterface> =
    LazyLock::new(|| CodecInterface::new(crate::engine::ffmpeg::Vp8EncoderEngine));

#[cfg(feature = "ffmpeg")]
static VP8_DECODER: LazyLock<CodecInterface> =
    LazyLock::new(|| CodecInterface::new(crate::engine::ffmpeg::Vp8DecoderEngine));

/// libvpx VP8 encoder reached through FFmpeg.
#[cfg(feature = "ffmpeg")]
pub fn vp8_encoder() -> &'static CodecInterface {
    &VP8_ENCODER
}

/// libvpx VP8 decoder reached through FFmpeg.
#[cfg(feature = "ffmpeg")]
pub fn vp8_decoder() -> &'static CodecInterface {
    &VP8_DECODER
}
