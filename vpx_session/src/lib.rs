//! VPX Session Layer
//!
//! Encode and decode sessions over a block-based video codec engine, image
//! buffers with owned or borrowed pixel memory and color conversion, and
//! pull-based iteration over compressed packets and decoded frames.
//!
//! The engine itself sits behind the traits in [`engine`]. A pure Rust
//! reference engine is always available; libvpx through FFmpeg is enabled by
//! the `ffmpeg` feature.

pub mod codec;
pub mod common;
pub mod config;
pub mod engine;
pub mod error;
pub mod image;
pub mod session;

// Re-export commonly used types
pub use codec::{Capabilities, CodecInterface, Version};
pub use config::{EncoderConfig, SessionSettings};
pub use engine::{Deadline, EncodeFlags, FrameFlags, Packet, PacketKind, SliceRegion, StreamInfo};
pub use error::{Result, Status, VpxError};
pub use image::{Image, ImageFormat, Rect};
pub use session::{Decoder, EncodeOptions, Encoder, Frames, Packets, SessionState};
