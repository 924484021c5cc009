//! Codec engine seam.
//!
//! Sessions never compress or decompress anything themselves. They drive an
//! [`Engine`] through the primitives below, each of which reports a
//! [`Status`] that the session routes through [`crate::error::check`].
//!
//! ```text
//! CodecInterface ──> Engine ──init──> EncoderContext ──encode/next_packet──> Packet
//!                          └─init──> DecoderContext ──decode/next_frame───> Image
//! ```

pub mod bitstream;
pub mod reference;

#[cfg(feature = "ffmpeg")]
pub mod ffmpeg;

use crate::codec::Capabilities;
use crate::common::flags::flag_set;
use crate::config::EncoderConfig;
use crate::error::Status;
use crate::image::{Image, Rect};

/// What kind of data a [`Packet`] carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketKind {
    /// Compressed video frame
    CompressedFrame,
    /// Two-pass statistics for this frame
    TwoPassStats,
    /// PSNR statistics for this frame
    PsnrStats,
    /// Engine-specific data
    Custom,
}

flag_set! {
    /// Properties of a compressed frame packet.
    pub struct FrameFlags {
        /// Frame is the start of a group of pictures
        const KEY = 0x1;
        /// Frame can be dropped without affecting the stream
        const DROPPABLE = 0x2;
        /// Frame should be decoded but not shown
        const INVISIBLE = 0x4;
    }
}

flag_set! {
    /// Per-call encoder flags.
    pub struct EncodeFlags {
        /// Force this frame to be a key frame
        const FORCE_KEYFRAME = 0x1;
        /// Do not replace the reference frame with this one
        const NO_UPDATE_REFERENCE = 0x4_0000;
    }
}

/// Time budget hint for one encode or decode call, in microseconds.
///
/// `0` asks for the best result regardless of time. The engine may ignore it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Deadline(pub u64);

impl Deadline {
    pub const BEST_QUALITY: Deadline = Deadline(0);
    pub const REALTIME: Deadline = Deadline(1);
    pub const GOOD_QUALITY: Deadline = Deadline(1_000_000);
}

/// One unit of encoder output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub kind: PacketKind,
    pub data: Vec<u8>,
    /// Presentation timestamp in timebase units
    pub pts: i64,
    /// Duration in timebase units
    pub duration: u64,
    pub flags: FrameFlags,
}

impl Packet {
    pub fn is_keyframe(&self) -> bool {
        self.flags.contains(FrameFlags::KEY)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Metadata available without a full decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StreamInfo {
    pub width: u32,
    pub height: u32,
    pub is_keyframe: bool,
}

/// Where a decoded slice landed inside the frame being reconstructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SliceRegion {
    /// Rows decoded so far
    pub valid: Rect,
    /// Rows written by this slice
    pub update: Rect,
}

/// Receiver of per-slice progress during a decode call.
pub type SliceSink<'s> = dyn FnMut(&Image<'static>, SliceRegion) + Send + 's;

/// An algorithm implementation behind a [`crate::codec::CodecInterface`].
pub trait Engine: Send + Sync {
    fn name(&self) -> &str;

    fn caps(&self) -> Capabilities;

    /// Default encoder configuration. Decoders answer `Incapable`.
    fn default_encoder_config(&self) -> Result<EncoderConfig, Status> {
        Err(Status::Incapable)
    }

    /// Creates an encoder context for a validated configuration.
    fn init_encoder(&self, config: &EncoderConfig) -> Result<Box<dyn EncoderContext>, Status> {
        let _ = config;
        Err(Status::Incapable)
    }

    fn init_decoder(&self) -> Result<Box<dyn DecoderContext>, Status> {
        Err(Status::Incapable)
    }

    /// Reads stream info from a payload header without decoding it.
    fn peek_stream_info(&self, data: &[u8]) -> Result<StreamInfo, Status> {
        let _ = data;
        Err(Status::Incapable)
    }
}

/// Lifecycle and diagnostics shared by every engine context.
pub trait EngineContext: Send {
    /// Detail text for the most recent failure.
    fn error_detail(&self) -> Option<&str>;

    /// Tears the context down. Called at most once.
    fn destroy(&mut self) -> Status;
}

pub trait EncoderContext: EngineContext {
    /// Submits one image, or flushes when `image` is `None`. Discards any
    /// packets left over from the previous submission.
    fn encode(
        &mut self,
        image: Option<&Image<'_>>,
        pts: i64,
        duration: u64,
        flags: EncodeFlags,
        deadline: Deadline,
    ) -> Status;

    /// Next packet of the latest submission; `None` once exhausted.
    fn next_packet(&mut self) -> Option<Packet>;

    /// Validates and applies a new configuration. Leaves the current one in
    /// place on failure.
    fn set_config(&mut self, config: &EncoderConfig) -> Status;
}

pub trait DecoderContext: EngineContext {
    /// Decodes one payload. An empty payload flushes. Frames from the
    /// previous call that were not pulled are discarded.
    fn decode(
        &mut self,
        data: &[u8],
        deadline: Deadline,
        slices: Option<&mut SliceSink<'_>>,
    ) -> Status;

    /// Next frame of the latest call; `None` once exhausted.
    fn next_frame(&mut self) -> Option<Image<'static>>;

    fn stream_info(&self) -> Result<StreamInfo, Status>;
}
