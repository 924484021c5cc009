//! libvpx VP8 through FFmpeg.
//!
//! Frames go to `libvpx` through `ffmpeg-next` the same way for every
//! session; configuration is fixed when the context is created.

use super::bitstream;
use super::{
    Deadline, DecoderContext, EncodeFlags, EncoderContext, Engine, EngineContext, FrameFlags,
    Packet, PacketKind, SliceSink, StreamInfo,
};
use crate::codec::Capabilities;
use crate::common::constants::geometry::{DECODER_BUFFER_ALIGN, MACROBLOCK_SIZE};
use crate::config::EncoderConfig;
use crate::error::Status;
use crate::image::{Image, ImageFormat, Rect};
use ffmpeg_next as ffmpeg;
use std::collections::VecDeque;

const PLANES: usize = 3;

fn init() -> Result<(), Status> {
    ffmpeg::init().map_err(|_| Status::AbiMismatch)
}

/// Whether a `receive_*` error only means no more output is ready.
fn is_drained(error: &ffmpeg::Error) -> bool {
    match error {
        ffmpeg::Error::Eof => true,
        ffmpeg::Error::Other { errno } => *errno == ffmpeg::util::error::EAGAIN,
        _ => false,
    }
}

/// VP8 encoder engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct Vp8EncoderEngine;

impl Engine for Vp8EncoderEngine {
    fn name(&self) -> &str {
        "WebM Project VP8 Encoder (FFmpeg libvpx)"
    }

    fn caps(&self) -> Capabilities {
        Capabilities::ENCODER
    }

    fn default_encoder_config(&self) -> Result<EncoderConfig, Status> {
        Ok(EncoderConfig::default())
    }

    fn init_encoder(&self, config: &EncoderConfig) -> Result<Box<dyn EncoderContext>, Status> {
        Ok(Box::new(Vp8Encoder::new(config)?))
    }

    fn peek_stream_info(&self, data: &[u8]) -> Result<StreamInfo, Status> {
        bitstream::peek_stream_info(data)
    }
}

/// VP8 decoder engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct Vp8DecoderEngine;

impl Engine for Vp8DecoderEngine {
    fn name(&self) -> &str {
        "WebM Project VP8 Decoder (FFmpeg libvpx)"
    }

    fn caps(&self) -> Capabilities {
        Capabilities::DECODER
    }

    fn init_decoder(&self) -> Result<Box<dyn DecoderContext>, Status> {
        Ok(Box::new(Vp8Decoder::new()?))
    }

    fn peek_stream_info(&self, data: &[u8]) -> Result<StreamInfo, Status> {
        bitstream::peek_stream_info(data)
    }
}

pub struct Vp8Encoder {
    encoder: ffmpeg::encoder::Video,
    width: u32,
    height: u32,
    pending: VecDeque<Packet>,
    detail: Option<String>,
}

impl Vp8Encoder {
    fn new(config: &EncoderConfig) -> Result<Self, Status> {
        init()?;

        let codec = ffmpeg::encoder::find(ffmpeg::codec::Id::VP8)
            .ok_or(Status::Incapable)?
            .video()
            .map_err(|_| Status::Incapable)?;

        let mut encoder = ffmpeg::codec::context::Context::new_with_codec(*codec)
            .encoder()
            .video()
            .map_err(|_| Status::MemError)?;

        encoder.set_width(config.width);
        encoder.set_height(config.height);
        encoder.set_format(ffmpeg::format::Pixel::YUV420P);
        encoder.set_bit_rate(config.bitrate_bps() as usize);
        encoder.set_time_base((config.timebase.num, config.timebase.den));
        encoder.set_gop(config.keyframe_max_dist);

        let encoder = encoder.open_as(codec).map_err(|_| Status::InvalidParam)?;

        Ok(Vp8Encoder {
            encoder,
            width: config.width,
            height: config.height,
            pending: VecDeque::new(),
            detail: None,
        })
    }

    fn fail(&mut self, status: Status, detail: String) -> Status {
        self.detail = Some(detail);
        status
    }

    fn to_frame(image: &Image<'_>, pts: i64) -> ffmpeg::frame::Video {
        let mut frame = ffmpeg::frame::Video::new(
            ffmpeg::format::Pixel::YUV420P,
            image.width(),
            image.height(),
        );
        for plane in 0..PLANES {
            let stride = frame.stride(plane);
            let dst = frame.data_mut(plane);
            for row in 0..image.plane_rows(plane) {
                let src = image.row(plane, row);
                dst[row * stride..row * stride + src.len()].copy_from_slice(src);
            }
        }
        frame.set_pts(Some(pts));
        frame
    }

    fn drain(&mut self, duration: u64) -> Status {
        let mut encoded = ffmpeg::Packet::empty();
        loop {
            match self.encoder.receive_packet(&mut encoded) {
                Ok(()) => {}
                Err(e) if is_drained(&e) => return Status::Ok,
                Err(e) => {
                    return self.fail(Status::Error, format!("Error receiving packet: {}", e));
                }
            }
            if let Some(data) = encoded.data() {
                let flags = if encoded.is_key() {
                    FrameFlags::KEY
                } else {
                    FrameFlags::empty()
                };
                self.pending.push_back(Packet {
                    kind: PacketKind::CompressedFrame,
                    data: data.to_vec(),
                    pts: encoded.pts().unwrap_or(0),
                    duration,
                    flags,
                });
            }
        }
    }
}

impl EngineContext for Vp8Encoder {
    fn error_detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    fn destroy(&mut self) -> Status {
        self.pending.clear();
        Status::Ok
    }
}

impl EncoderContext for Vp8Encoder {
    fn encode(
        &mut self,
        image: Option<&Image<'_>>,
        pts: i64,
        duration: u64,
        flags: EncodeFlags,
        _deadline: Deadline,
    ) -> Status {
        self.pending.clear();
        self.detail = None;

        let Some(image) = image else {
            if let Err(e) = self.encoder.send_eof() {
                return self.fail(Status::Error, format!("Error flushing encoder: {}", e));
            }
            return self.drain(duration);
        };

        if !matches!(image.format(), ImageFormat::I420 | ImageFormat::Yv12) {
            let detail = format!("unsupported input format {}", image.format());
            return self.fail(Status::InvalidParam, detail);
        }
        if image.is_freed() {
            return self.fail(Status::InvalidParam, "input image has been freed".to_string());
        }
        if image.width() != self.width || image.height() != self.height {
            let detail = format!(
                "input {}x{} does not match configured {}x{}",
                image.width(),
                image.height(),
                self.width,
                self.height
            );
            return self.fail(Status::InvalidParam, detail);
        }
        if flags.contains(EncodeFlags::NO_UPDATE_REFERENCE) {
            let detail = "reference control is not exposed through FFmpeg".to_string();
            return self.fail(Status::UnsupFeature, detail);
        }

        let mut frame = Self::to_frame(image, pts);
        if flags.contains(EncodeFlags::FORCE_KEYFRAME) {
            frame.set_kind(ffmpeg::picture::Type::I);
        }

        if let Err(e) = self.encoder.send_frame(&frame) {
            return self.fail(Status::Error, format!("Error sending frame: {}", e));
        }
        self.drain(duration)
    }

    fn next_packet(&mut self) -> Option<Packet> {
        self.pending.pop_front()
    }

    fn set_config(&mut self, _config: &EncoderConfig) -> Status {
        self.fail(
            Status::Incapable,
            "FFmpeg encoders cannot be reconfigured in place".to_string(),
        )
    }
}

pub struct Vp8Decoder {
    decoder: ffmpeg::decoder::Video,
    pending: VecDeque<Image<'static>>,
    info: Option<StreamInfo>,
    detail: Option<String>,
}

impl Vp8Decoder {
    fn new() -> Result<Self, Status> {
        init()?;

        let codec = ffmpeg::decoder::find_by_name("vp8")
            .or_else(|| ffmpeg::decoder::find(ffmpeg::codec::Id::VP8))
            .or_else(|| ffmpeg::decoder::find_by_name("libvpx"))
            .ok_or(Status::Incapable)?;

        let decoder = ffmpeg::codec::context::Context::new_with_codec(codec)
            .decoder()
            .video()
            .map_err(|_| Status::MemError)?;

        Ok(Vp8Decoder {
            decoder,
            pending: VecDeque::new(),
            info: None,
            detail: None,
        })
    }

    fn fail(&mut self, status: Status, detail: String) -> Status {
        self.detail = Some(detail);
        status
    }

    /// Copies a decoded frame into a macroblock-aligned image.
    fn to_image(frame: &ffmpeg::frame::Video) -> Result<Image<'static>, Status> {
        let (width, height) = (frame.width(), frame.height());
        let mb = MACROBLOCK_SIZE as u32;
        let mut image = Image::alloc(
            ImageFormat::I420,
            width.div_ceil(mb) * mb,
            height.div_ceil(mb) * mb,
            DECODER_BUFFER_ALIGN,
        )
        .map_err(|e| e.status().unwrap_or(Status::MemError))?;
        image
            .set_display_rect(Rect::new(0, 0, width, height))
            .map_err(|_| Status::CorruptFrame)?;

        for plane in 0..PLANES {
            let src_stride = frame.stride(plane);
            let src = frame.data(plane);
            for row in 0..image.plane_rows(plane) {
                let dst = image.row_mut(plane, row);
                let start = row * src_stride;
                dst.copy_from_slice(&src[start..start + dst.len()]);
            }
        }
        Ok(image)
    }

    fn drain(&mut self) -> Status {
        let mut decoded = ffmpeg::frame::Video::empty();
        loop {
            match self.decoder.receive_frame(&mut decoded) {
                Ok(()) => {}
                Err(e) if is_drained(&e) => return Status::Ok,
                Err(e) => {
                    let detail = format!("Error receiving frame: {}", e);
                    return self.fail(Status::CorruptFrame, detail);
                }
            }
            if decoded.format() != ffmpeg::format::Pixel::YUV420P {
                let detail = format!("unexpected output format {:?}", decoded.format());
                return self.fail(Status::UnsupFeature, detail);
            }
            match Self::to_image(&decoded) {
                Ok(image) => self.pending.push_back(image),
                Err(status) => {
                    return self.fail(status, "Error copying decoded frame".to_string());
                }
            }
        }
    }
}

impl EngineContext for Vp8Decoder {
    fn error_detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    fn destroy(&mut self) -> Status {
        self.pending.clear();
        Status::Ok
    }
}

impl DecoderContext for Vp8Decoder {
    fn decode(
        &mut self,
        data: &[u8],
        _deadline: Deadline,
        _slices: Option<&mut SliceSink<'_>>,
    ) -> Status {
        self.pending.clear();
        self.detail = None;

        if data.is_empty() {
            if let Err(e) = self.decoder.send_eof() {
                return self.fail(Status::Error, format!("Error flushing decoder: {}", e));
            }
            return self.drain();
        }

        match bitstream::FrameHeader::parse(data) {
            Ok(header) if header.keyframe => {
                self.info = Some(StreamInfo {
                    width: header.width,
                    height: header.height,
                    is_keyframe: true,
                });
            }
            Ok(_) => {
                if let Some(info) = self.info.as_mut() {
                    info.is_keyframe = false;
                }
            }
            Err(status) => return self.fail(status, "malformed frame header".to_string()),
        }

        let packet = ffmpeg::Packet::copy(data);
        if let Err(e) = self.decoder.send_packet(&packet) {
            return self.fail(Status::CorruptFrame, format!("Error sending packet: {}", e));
        }
        self.drain()
    }

    fn next_frame(&mut self) -> Option<Image<'static>> {
        self.pending.pop_front()
    }

    fn stream_info(&self) -> Result<StreamInfo, Status> {
        self.info.ok_or(Status::Error)
    }
}
