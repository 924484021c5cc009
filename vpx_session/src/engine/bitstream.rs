//! Frame framing shared by the engines.
//!
//! Every compressed frame starts with a 3-byte little-endian frame tag:
//!
//! | bits  | field                                  |
//! |-------|----------------------------------------|
//! | 0     | frame type (0 = key frame)             |
//! | 1..4  | version                                |
//! | 4     | show frame                             |
//! | 5..24 | first partition size                   |
//!
//! Key frames follow the tag with the start code `9d 01 2a` and two 16-bit
//! little-endian words holding a 14-bit dimension and a 2-bit scale.

use super::StreamInfo;
use crate::common::constants::geometry::MAX_DIMENSION;
use crate::error::Status;

pub const FRAME_TAG_LEN: usize = 3;
pub const KEYFRAME_START_CODE: [u8; 3] = [0x9d, 0x01, 0x2a];
pub const KEYFRAME_HEADER_LEN: usize = 10;
const MAX_PARTITION_SIZE: u32 = 0x7_ffff;

/// Decoded frame tag, plus dimensions for key frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub keyframe: bool,
    pub version: u8,
    pub show_frame: bool,
    pub first_part_size: u32,
    /// Coded width; 0 on inter frames
    pub width: u32,
    /// Coded height; 0 on inter frames
    pub height: u32,
    pub horizontal_scale: u8,
    pub vertical_scale: u8,
}

impl FrameHeader {
    pub fn key(width: u32, height: u32) -> Self {
        FrameHeader {
            keyframe: true,
            version: 0,
            show_frame: true,
            first_part_size: 0,
            width,
            height,
            horizontal_scale: 0,
            vertical_scale: 0,
        }
    }

    pub fn inter() -> Self {
        FrameHeader {
            keyframe: false,
            ..FrameHeader::key(0, 0)
        }
    }

    /// Bytes this header occupies.
    pub fn encoded_len(&self) -> usize {
        if self.keyframe {
            KEYFRAME_HEADER_LEN
        } else {
            FRAME_TAG_LEN
        }
    }

    pub fn write(&self, out: &mut Vec<u8>) {
        let tag = u32::from(!self.keyframe)
            | (u32::from(self.version & 0x7) << 1)
            | (u32::from(self.show_frame) << 4)
            | (self.first_part_size.min(MAX_PARTITION_SIZE) << 5);
        out.extend_from_slice(&tag.to_le_bytes()[..FRAME_TAG_LEN]);

        if self.keyframe {
            out.extend_from_slice(&KEYFRAME_START_CODE);
            let w = (self.width & MAX_DIMENSION) as u16 | (u16::from(self.horizontal_scale) << 14);
            let h = (self.height & MAX_DIMENSION) as u16 | (u16::from(self.vertical_scale) << 14);
            out.extend_from_slice(&w.to_le_bytes());
            out.extend_from_slice(&h.to_le_bytes());
        }
    }

    /// Parses the header at the start of `data`.
    ///
    /// # Errors
    ///
    /// `UnsupBitstream` for truncated input or a bad start code,
    /// `CorruptFrame` for a key frame with zero width or height.
    pub fn parse(data: &[u8]) -> Result<Self, Status> {
        if data.len() < FRAME_TAG_LEN {
            return Err(Status::UnsupBitstream);
        }
        let tag = u32::from(data[0]) | (u32::from(data[1]) << 8) | (u32::from(data[2]) << 16);
        let mut header = FrameHeader {
            keyframe: tag & 0x1 == 0,
            version: ((tag >> 1) & 0x7) as u8,
            show_frame: (tag >> 4) & 0x1 == 1,
            first_part_size: (tag >> 5) & MAX_PARTITION_SIZE,
            width: 0,
            height: 0,
            horizontal_scale: 0,
            vertical_scale: 0,
        };
        if !header.keyframe {
            return Ok(header);
        }

        if data.len() < KEYFRAME_HEADER_LEN || data[3..6] != KEYFRAME_START_CODE {
            return Err(Status::UnsupBitstream);
        }
        let w = u16::from_le_bytes([data[6], data[7]]);
        let h = u16::from_le_bytes([data[8], data[9]]);
        header.width = u32::from(w) & MAX_DIMENSION;
        header.height = u32::from(h) & MAX_DIMENSION;
        header.horizontal_scale = (w >> 14) as u8;
        header.vertical_scale = (h >> 14) as u8;
        if header.width == 0 || header.height == 0 {
            return Err(Status::CorruptFrame);
        }
        Ok(header)
    }
}

/// Stream info of a key frame payload.
///
/// Inter frames carry no geometry and are rejected with `UnsupBitstream`,
/// as is anything shorter than a key frame header.
pub fn peek_stream_info(data: &[u8]) -> Result<StreamInfo, Status> {
    if data.len() < KEYFRAME_HEADER_LEN {
        return Err(Status::UnsupBitstream);
    }
    let header = FrameHeader::parse(data)?;
    if !header.keyframe {
        return Err(Status::UnsupBitstream);
    }
    Ok(StreamInfo {
        width: header.width,
        height: header.height,
        is_keyframe: true,
    })
}
