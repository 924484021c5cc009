use super::bitstream::FrameHeader;
use super::{MacroblockFrame, rle};
use crate::common::constants::encoder_defaults::MAX_QUANTIZER;
use crate::common::constants::geometry::MAX_DIMENSION;
use crate::config::{EncoderConfig, KeyframeMode};
use crate::engine::{
    Deadline, EncodeFlags, EncoderContext, EngineContext, FrameFlags, Packet, PacketKind,
};
use crate::error::Status;
use crate::image::{Image, ImageFormat};
use std::collections::VecDeque;

/// Checks a configuration against what the engine can honor.
fn validate(config: &EncoderConfig) -> Result<(), String> {
    let in_range = |v: u32| (1..=MAX_DIMENSION).contains(&v);
    if !in_range(config.width) || !in_range(config.height) {
        return Err(format!(
            "frame size {}x{} out of range 1..={}",
            config.width, config.height, MAX_DIMENSION
        ));
    }
    if config.timebase.num <= 0 || config.timebase.den <= 0 {
        return Err(format!(
            "timebase {}/{} must be positive",
            config.timebase.num, config.timebase.den
        ));
    }
    if config.target_bitrate == 0 {
        return Err("target bitrate must be nonzero".to_string());
    }
    if config.max_quantizer > MAX_QUANTIZER || config.min_quantizer > config.max_quantizer {
        return Err(format!(
            "quantizer range {}..={} invalid",
            config.min_quantizer, config.max_quantizer
        ));
    }
    if config.keyframe_mode == KeyframeMode::Auto
        && config.keyframe_min_dist > config.keyframe_max_dist
    {
        return Err(format!(
            "keyframe distance {}..={} invalid",
            config.keyframe_min_dist, config.keyframe_max_dist
        ));
    }
    Ok(())
}

/// Encoder context of the built-in engine.
#[derive(Debug)]
pub struct ReferenceEncoder {
    config: EncoderConfig,
    reference: Option<MacroblockFrame>,
    current: MacroblockFrame,
    frames_since_key: u32,
    pending: VecDeque<Packet>,
    detail: Option<String>,
}

impl ReferenceEncoder {
    pub fn new(config: &EncoderConfig) -> Result<Self, Status> {
        validate(config).map_err(|_| Status::InvalidParam)?;
        Ok(ReferenceEncoder {
            config: config.clone(),
            reference: None,
            current: MacroblockFrame::new(config.width, config.height),
            frames_since_key: 0,
            pending: VecDeque::new(),
            detail: None,
        })
    }

    fn fail(&mut self, status: Status, detail: String) -> Status {
        self.detail = Some(detail);
        status
    }

    fn wants_keyframe(&self, flags: EncodeFlags) -> bool {
        if self.reference.is_none() || flags.contains(EncodeFlags::FORCE_KEYFRAME) {
            return true;
        }
        self.config.keyframe_mode == KeyframeMode::Auto
            && self.config.keyframe_max_dist > 0
            && self.frames_since_key >= self.config.keyframe_max_dist
    }

    fn compress(&self, keyframe: bool) -> Vec<u8> {
        let mut payload = Vec::new();
        for mb_row in 0..self.current.mb_rows() {
            match (&self.reference, keyframe) {
                (Some(reference), false) => rle::encode(
                    self.current
                        .slice(mb_row)
                        .zip(reference.slice(mb_row))
                        .map(|(cur, prev)| cur.wrapping_sub(prev)),
                    &mut payload,
                ),
                _ => rle::encode(self.current.slice(mb_row), &mut payload),
            }
        }

        let mut header = if keyframe {
            FrameHeader::key(self.config.width, self.config.height)
        } else {
            FrameHeader::inter()
        };
        header.first_part_size = u32::try_from(payload.len()).unwrap_or(u32::MAX);

        let mut data = Vec::with_capacity(header.encoded_len() + payload.len());
        header.write(&mut data);
        data.extend_from_slice(&payload);
        data
    }
}

impl EngineContext for ReferenceEncoder {
    fn error_detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    fn destroy(&mut self) -> Status {
        self.pending.clear();
        self.reference = None;
        Status::Ok
    }
}

impl EncoderContext for ReferenceEncoder {
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

        // No lookahead, so a flush has nothing left to emit.
        let Some(image) = image else {
            return Status::Ok;
        };

        if !matches!(image.format(), ImageFormat::I420 | ImageFormat::Yv12) {
            let detail = format!("unsupported input format {}", image.format());
            return self.fail(Status::InvalidParam, detail);
        }
        if image.is_freed() {
            return self.fail(Status::InvalidParam, "input image has been freed".to_string());
        }
        if image.width() != self.config.width || image.height() != self.config.height {
            let detail = format!(
                "input {}x{} does not match configured {}x{}",
                image.width(),
                image.height(),
                self.config.width,
                self.config.height
            );
            return self.fail(Status::InvalidParam, detail);
        }

        self.current.load(image);
        let keyframe = self.wants_keyframe(flags);
        let data = self.compress(keyframe);

        let mut frame_flags = FrameFlags::empty();
        if keyframe {
            frame_flags |= FrameFlags::KEY;
        }
        if flags.contains(EncodeFlags::NO_UPDATE_REFERENCE) {
            frame_flags |= FrameFlags::DROPPABLE;
        } else {
            self.reference = Some(self.current.clone());
            self.frames_since_key = if keyframe { 1 } else { self.frames_since_key + 1 };
        }

        self.pending.push_back(Packet {
            kind: PacketKind::CompressedFrame,
            data,
            pts,
            duration,
            flags: frame_flags,
        });
        Status::Ok
    }

    fn next_packet(&mut self) -> Option<Packet> {
        self.pending.pop_front()
    }

    fn set_config(&mut self, config: &EncoderConfig) -> Status {
        if let Err(detail) = validate(config) {
            return self.fail(Status::InvalidParam, detail);
        }
        if config.width != self.config.width || config.height != self.config.height {
            self.current = MacroblockFrame::new(config.width, config.height);
            self.reference = None;
        }
        self.config = config.clone();
        self.detail = None;
        Status::Ok
    }
}
