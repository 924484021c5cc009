//! Built-in software engine.
//!
//! Frames are coded losslessly, one macroblock row per slice. Key frames
//! carry raw samples and inter frames carry the byte-wise difference to the
//! previous reference, both run-length coded. Frame headers follow the
//! layout in [`super::bitstream`].

mod decoder;
mod encoder;
mod rle;

use super::bitstream;
use super::{DecoderContext, EncoderContext, Engine, StreamInfo};
use crate::codec::Capabilities;
use crate::common::constants::geometry::MACROBLOCK_SIZE;
use crate::config::EncoderConfig;
use crate::error::Status;
use crate::image::Image;
use std::ops::Range;

pub use decoder::ReferenceDecoder;
pub use encoder::ReferenceEncoder;

const PLANES: usize = 3;
const CHROMA_MACROBLOCK: usize = MACROBLOCK_SIZE / 2;

/// Contiguous I420 frame padded to whole macroblocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct MacroblockFrame {
    width: u32,
    height: u32,
    mb_cols: usize,
    mb_rows: usize,
    data: Vec<u8>,
}

impl MacroblockFrame {
    pub(crate) fn new(width: u32, height: u32) -> Self {
        let mb_cols = (width as usize).div_ceil(MACROBLOCK_SIZE);
        let mb_rows = (height as usize).div_ceil(MACROBLOCK_SIZE);
        let luma = mb_cols * mb_rows * MACROBLOCK_SIZE * MACROBLOCK_SIZE;
        MacroblockFrame {
            width,
            height,
            mb_cols,
            mb_rows,
            data: vec![0; luma + luma / 2],
        }
    }

    pub(crate) fn width(&self) -> u32 {
        self.width
    }

    pub(crate) fn height(&self) -> u32 {
        self.height
    }

    pub(crate) fn mb_rows(&self) -> usize {
        self.mb_rows
    }

    /// Padded luma width.
    pub(crate) fn coded_width(&self) -> u32 {
        (self.mb_cols * MACROBLOCK_SIZE) as u32
    }

    /// Padded luma height.
    pub(crate) fn coded_height(&self) -> u32 {
        (self.mb_rows * MACROBLOCK_SIZE) as u32
    }

    fn stride(&self, plane: usize) -> usize {
        if plane == 0 {
            self.mb_cols * MACROBLOCK_SIZE
        } else {
            self.mb_cols * CHROMA_MACROBLOCK
        }
    }

    fn plane_base(&self, plane: usize) -> usize {
        let luma = self.stride(0) * self.mb_rows * MACROBLOCK_SIZE;
        let chroma = self.stride(1) * self.mb_rows * CHROMA_MACROBLOCK;
        match plane {
            0 => 0,
            1 => luma,
            _ => luma + chroma,
        }
    }

    fn rows_per_slice(plane: usize) -> usize {
        if plane == 0 {
            MACROBLOCK_SIZE
        } else {
            CHROMA_MACROBLOCK
        }
    }

    /// Byte ranges of the Y, U and V rows belonging to macroblock row `mb_row`.
    pub(crate) fn slice_ranges(&self, mb_row: usize) -> [Range<usize>; PLANES] {
        std::array::from_fn(|plane| {
            let len = self.stride(plane) * Self::rows_per_slice(plane);
            let start = self.plane_base(plane) + mb_row * len;
            start..start + len
        })
    }

    /// Sample count of one slice across all planes.
    pub(crate) fn slice_len(&self) -> usize {
        self.slice_ranges(0).iter().map(|r| r.len()).sum()
    }

    pub(crate) fn slice(&self, mb_row: usize) -> impl Iterator<Item = u8> + '_ {
        self.slice_ranges(mb_row)
            .into_iter()
            .flat_map(move |range| self.data[range].iter().copied())
    }

    /// Writes `samples` (Y, then U, then V) into the rows of `mb_row`.
    pub(crate) fn write_slice(&mut self, mb_row: usize, samples: &[u8]) {
        let mut offset = 0;
        for range in self.slice_ranges(mb_row) {
            let len = range.len();
            self.data[range].copy_from_slice(&samples[offset..offset + len]);
            offset += len;
        }
    }

    /// Copies the display region of an I420 or YV12 image. Padding is zeroed.
    pub(crate) fn load(&mut self, image: &Image<'_>) {
        self.data.fill(0);
        for plane in 0..PLANES {
            let stride = self.stride(plane);
            let base = self.plane_base(plane);
            for row in 0..image.plane_rows(plane) {
                let src = image.row(plane, row);
                let start = base + row * stride;
                self.data[start..start + src.len()].copy_from_slice(src);
            }
        }
    }

    /// Copies the rows of `mb_row` into an I420 image of the padded geometry.
    pub(crate) fn store_slice(&self, mb_row: usize, image: &mut Image<'_>) {
        for (plane, range) in self.slice_ranges(mb_row).into_iter().enumerate() {
            let stride = self.stride(plane);
            let dst_stride = image.stride(plane);
            let first_row = mb_row * Self::rows_per_slice(plane);
            let dst = image.plane_mut(plane);
            for (i, src) in self.data[range].chunks_exact(stride).enumerate() {
                let start = (first_row + i) * dst_stride;
                dst[start..start + stride].copy_from_slice(src);
            }
        }
    }
}

/// Encoder side of the built-in engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReferenceEncoderEngine;

impl Engine for ReferenceEncoderEngine {
    fn name(&self) -> &str {
        concat!("Reference Block Encoder v", env!("CARGO_PKG_VERSION"))
    }

    fn caps(&self) -> Capabilities {
        Capabilities::ENCODER
    }

    fn default_encoder_config(&self) -> Result<EncoderConfig, Status> {
        Ok(EncoderConfig::default())
    }

    fn init_encoder(&self, config: &EncoderConfig) -> Result<Box<dyn EncoderContext>, Status> {
        Ok(Box::new(ReferenceEncoder::new(config)?))
    }

    fn peek_stream_info(&self, data: &[u8]) -> Result<StreamInfo, Status> {
        bitstream::peek_stream_info(data)
    }
}

/// Decoder side of the built-in engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReferenceDecoderEngine;

impl Engine for ReferenceDecoderEngine {
    fn name(&self) -> &str {
        concat!("Reference Block Decoder v", env!("CARGO_PKG_VERSION"))
    }

    fn caps(&self) -> Capabilities {
        Capabilities::DECODER | Capabilities::PUT_FRAME | Capabilities::PUT_SLICE
    }

    fn init_decoder(&self) -> Result<Box<dyn DecoderContext>, Status> {
        Ok(Box::new(ReferenceDecoder::new()))
    }

    fn peek_stream_info(&self, data: &[u8]) -> Result<StreamInfo, Status> {
        bitstream::peek_stream_info(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::ImageFormat;

    #[test]
    fn test_macroblock_padding() {
        let frame = MacroblockFrame::new(33, 17);
        assert_eq!(frame.coded_width(), 48);
        assert_eq!(frame.coded_height(), 32);
        assert_eq!(frame.mb_rows(), 2);
        assert_eq!(frame.data.len(), 48 * 32 * 3 / 2);
        assert_eq!(frame.slice_len(), 48 * 16 + 2 * 24 * 8);
    }

    #[test]
    fn test_slice_ranges_tile_the_frame() {
        let frame = MacroblockFrame::new(32, 48);
        let mut covered = vec![false; frame.data.len()];
        for mb_row in 0..frame.mb_rows() {
            for range in frame.slice_ranges(mb_row) {
                for i in range {
                    assert!(!covered[i]);
                    covered[i] = true;
                }
            }
        }
        assert!(covered.into_iter().all(|c| c));
    }

    #[test]
    fn test_load_and_store_keep_samples() {
        let mut image = Image::alloc(ImageFormat::I420, 18, 18, 1).unwrap();
        for (i, b) in image.data_mut().iter_mut().enumerate() {
            *b = (i % 251) as u8;
        }
        let mut frame = MacroblockFrame::new(18, 18);
        frame.load(&image);

        let mut out = Image::alloc(ImageFormat::I420, 32, 32, 16).unwrap();
        for mb_row in 0..frame.mb_rows() {
            frame.store_slice(mb_row, &mut out);
        }
        out.set_display_rect(crate::image::Rect::new(0, 0, 18, 18)).unwrap();

        for plane in 0..3 {
            for row in 0..image.plane_rows(plane) {
                assert_eq!(image.row(plane, row), out.row(plane, row));
            }
        }
    }

    #[test]
    fn test_yv12_loads_as_i420() {
        let mut image = Image::alloc(ImageFormat::Yv12, 2, 2, 1).unwrap();
        image.plane_mut(1).fill(50);
        image.plane_mut(2).fill(60);
        let mut frame = MacroblockFrame::new(2, 2);
        frame.load(&image);

        let [_, u, v] = frame.slice_ranges(0);
        assert_eq!(frame.data[u.start], 50);
        assert_eq!(frame.data[v.start], 60);
    }

    #[test]
    fn test_engine_names() {
        assert!(ReferenceEncoderEngine.name().ends_with(env!("CARGO_PKG_VERSION")));
        assert!(ReferenceDecoderEngine.init_encoder(&EncoderConfig::default()).is_err());
        assert!(ReferenceEncoderEngine.init_decoder().is_err());
    }
}
