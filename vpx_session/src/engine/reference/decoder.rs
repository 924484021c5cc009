use super::bitstream::FrameHeader;
use super::{MacroblockFrame, rle};
use crate::common::constants::geometry::{DECODER_BUFFER_ALIGN, MACROBLOCK_SIZE};
use crate::engine::{Deadline, DecoderContext, EngineContext, SliceRegion, SliceSink, StreamInfo};
use crate::error::Status;
use crate::image::{Image, ImageFormat, Rect};
use std::collections::VecDeque;

/// Decoder context of the built-in engine.
#[derive(Debug, Default)]
pub struct ReferenceDecoder {
    reference: Option<MacroblockFrame>,
    pending: VecDeque<Image<'static>>,
    info: Option<StreamInfo>,
    detail: Option<String>,
}

impl ReferenceDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    fn fail(&mut self, status: Status, detail: impl Into<String>) -> Status {
        self.detail = Some(detail.into());
        status
    }

    /// Reconstructs one frame, reporting each finished slice to `slices`.
    fn reconstruct(
        &self,
        header: &FrameHeader,
        payload: &[u8],
        mut slices: Option<&mut SliceSink<'_>>,
    ) -> Result<(MacroblockFrame, Image<'static>), (Status, String)> {
        let mut frame = match (&self.reference, header.keyframe) {
            (_, true) => MacroblockFrame::new(header.width, header.height),
            (Some(reference), false) => reference.clone(),
            (None, false) => {
                return Err((
                    Status::CorruptFrame,
                    "inter frame without a reference frame".to_string(),
                ));
            }
        };

        let mut image = Image::alloc(
            ImageFormat::I420,
            frame.coded_width(),
            frame.coded_height(),
            DECODER_BUFFER_ALIGN,
        )
        .map_err(|e| (e.status().unwrap_or(Status::MemError), e.to_string()))?;

        let (width, height) = (frame.width(), frame.height());
        let mut samples = vec![0u8; frame.slice_len()];
        let mut cursor = 0;

        for mb_row in 0..frame.mb_rows() {
            let used = rle::decode(&payload[cursor..], &mut samples)
                .map_err(|status| (status, format!("slice {} truncated", mb_row)))?;
            cursor += used;

            if !header.keyframe {
                for (sample, prev) in samples.iter_mut().zip(frame.slice(mb_row)) {
                    *sample = prev.wrapping_add(*sample);
                }
            }
            frame.write_slice(mb_row, &samples);
            frame.store_slice(mb_row, &mut image);

            if let Some(sink) = slices.as_deref_mut() {
                let top = (mb_row * MACROBLOCK_SIZE) as u32;
                let bottom = ((mb_row + 1) * MACROBLOCK_SIZE).min(height as usize) as u32;
                let region = SliceRegion {
                    valid: Rect::new(0, 0, width, bottom),
                    update: Rect::new(0, top, width, bottom - top),
                };
                sink(&image, region);
            }
        }

        if cursor != payload.len() {
            return Err((
                Status::CorruptFrame,
                format!("{} trailing bytes after last slice", payload.len() - cursor),
            ));
        }

        image
            .set_display_rect(Rect::new(0, 0, width, height))
            .map_err(|e| (Status::CorruptFrame, e.to_string()))?;
        Ok((frame, image))
    }
}

impl EngineContext for ReferenceDecoder {
    fn error_detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    fn destroy(&mut self) -> Status {
        self.pending.clear();
        self.reference = None;
        Status::Ok
    }
}

impl DecoderContext for ReferenceDecoder {
    fn decode(
        &mut self,
        data: &[u8],
        _deadline: Deadline,
        slices: Option<&mut SliceSink<'_>>,
    ) -> Status {
        self.pending.clear();
        self.detail = None;

        // Nothing is buffered between calls, so a flush produces nothing.
        if data.is_empty() {
            return Status::Ok;
        }

        let header = match FrameHeader::parse(data) {
            Ok(header) => header,
            Err(status) => return self.fail(status, "malformed frame header"),
        };
        let payload = &data[header.encoded_len()..];

        match self.reconstruct(&header, payload, slices) {
            Ok((frame, image)) => {
                self.info = Some(StreamInfo {
                    width: frame.width(),
                    height: frame.height(),
                    is_keyframe: header.keyframe,
                });
                self.reference = Some(frame);
                if header.show_frame {
                    self.pending.push_back(image);
                }
                Status::Ok
            }
            Err((status, detail)) => self.fail(status, detail),
        }
    }

    fn next_frame(&mut self) -> Option<Image<'static>> {
        self.pending.pop_front()
    }

    fn stream_info(&self) -> Result<StreamInfo, Status> {
        self.info.ok_or(Status::Error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EncoderConfig;
    use crate::engine::reference::ReferenceEncoder;
    use crate::engine::{EncodeFlags, EncoderContext};

    fn encoded(frames: &[Image<'_>]) -> Vec<Vec<u8>> {
        let first = &frames[0];
        let config = EncoderConfig {
            width: first.width(),
            height: first.height(),
            ..EncoderConfig::default()
        };
        let mut enc = ReferenceEncoder::new(&config).unwrap();
        frames
            .iter()
            .map(|image| {
                enc.encode(Some(image), 0, 1, EncodeFlags::empty(), Deadline::REALTIME);
                enc.next_packet().unwrap().data
            })
            .collect()
    }

    fn gradient(width: u32, height: u32, seed: u8) -> Image<'static> {
        let mut image = Image::alloc(ImageFormat::I420, width, height, 1).unwrap();
        for (i, b) in image.data_mut().iter_mut().enumerate() {
            *b = (i as u8).wrapping_mul(7).wrapping_add(seed);
        }
        image
    }

    fn same_pixels(a: &Image<'_>, b: &Image<'_>) -> bool {
        (0..3).all(|p| (0..a.plane_rows(p)).all(|r| a.row(p, r) == b.row(p, r)))
    }

    #[test]
    fn test_decodes_key_and_inter_frames_exactly() {
        let frames = [gradient(40, 24, 0), gradient(40, 24, 3), gradient(40, 24, 200)];
        let mut dec = ReferenceDecoder::new();

        for (source, data) in frames.iter().zip(encoded(&frames)) {
            assert_eq!(dec.decode(&data, Deadline::REALTIME, None), Status::Ok);
            let image = dec.next_frame().unwrap();
            assert!(dec.next_frame().is_none());

            assert_eq!((image.width(), image.height()), (40, 24));
            assert_eq!((image.stored_width(), image.stored_height()), (48, 32));
            assert!(same_pixels(source, &image));
        }
        assert_eq!(
            dec.stream_info(),
            Ok(StreamInfo {
                width: 40,
                height: 24,
                is_keyframe: false
            })
        );
    }

    #[test]
    fn test_slice_callbacks_cover_frame() {
        let frames = [gradient(20, 40, 1)];
        let data = &encoded(&frames)[0];
        let mut regions = Vec::new();
        let mut sink = |_: &Image<'static>, region: SliceRegion| regions.push(region);

        let mut dec = ReferenceDecoder::new();
        assert_eq!(dec.decode(data, Deadline::REALTIME, Some(&mut sink)), Status::Ok);

        assert_eq!(regions.len(), 3);
        assert_eq!(regions[0].update, Rect::new(0, 0, 20, 16));
        assert_eq!(regions[2].update, Rect::new(0, 32, 20, 8));
        assert_eq!(regions[2].valid, Rect::new(0, 0, 20, 40));
    }

    #[test]
    fn test_inter_frame_without_reference() {
        let frames = [gradient(16, 16, 0), gradient(16, 16, 1)];
        let data = encoded(&frames);

        let mut dec = ReferenceDecoder::new();
        assert_eq!(dec.decode(&data[1], Deadline::REALTIME, None), Status::CorruptFrame);
        assert!(dec.error_detail().unwrap().contains("reference"));
        assert!(dec.next_frame().is_none());
        assert_eq!(dec.stream_info(), Err(Status::Error));
    }

    #[test]
    fn test_truncated_and_padded_payloads() {
        let data = &encoded(&[gradient(16, 16, 0)])[0];
        let mut dec = ReferenceDecoder::new();

        assert_eq!(
            dec.decode(&data[..data.len() - 1], Deadline::REALTIME, None),
            Status::CorruptFrame
        );

        let mut padded = data.clone();
        padded.push(0);
        assert_eq!(dec.decode(&padded, Deadline::REALTIME, None), Status::CorruptFrame);
        assert!(dec.error_detail().unwrap().contains("trailing"));

        assert_eq!(dec.decode(&[1, 2], Deadline::REALTIME, None), Status::UnsupBitstream);
    }

    #[test]
    fn test_flush_yields_nothing() {
        let data = &encoded(&[gradient(16, 16, 0)])[0];
        let mut dec = ReferenceDecoder::new();
        dec.decode(data, Deadline::REALTIME, None);
        assert_eq!(dec.decode(&[], Deadline::REALTIME, None), Status::Ok);
        assert!(dec.next_frame().is_none());
    }

    #[test]
    fn test_failed_frame_keeps_reference() {
        let frames = [gradient(16, 16, 0), gradient(16, 16, 5)];
        let data = encoded(&frames);
        let mut dec = ReferenceDecoder::new();
        dec.decode(&data[0], Deadline::REALTIME, None);

        let truncated = &data[1][..data[1].len() - 2];
        assert_eq!(dec.decode(truncated, Deadline::REALTIME, None), Status::CorruptFrame);

        assert_eq!(dec.decode(&data[1], Deadline::REALTIME, None), Status::Ok);
        assert!(same_pixels(&frames[1], &dec.next_frame().unwrap()));
    }
}
