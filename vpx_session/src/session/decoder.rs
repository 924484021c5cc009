//! Decoder session.

use super::{CodecSession, SessionState};
use crate::codec::{Capabilities, CodecInterface, interfaces};
use crate::common::constants::logging::DECODER_LOG_INTERVAL;
use crate::engine::{Deadline, DecoderContext, SliceRegion, SliceSink, StreamInfo};
use crate::error::{Result, VpxError};
use crate::image::Image;
use logging::Logger;
use std::iter::FusedIterator;

type FrameCallback = dyn FnMut(&Image<'static>) + Send;

/// Frames reconstructed from one submission.
///
/// Pull-based like [`super::Packets`]: finite, fused, and tied to the
/// decoder borrow.
pub struct Frames<'s> {
    context: Option<&'s mut dyn DecoderContext>,
}

impl<'s> Frames<'s> {
    fn new(context: &'s mut dyn DecoderContext) -> Self {
        Frames {
            context: Some(context),
        }
    }

    fn exhausted() -> Self {
        Frames { context: None }
    }
}

impl Iterator for Frames<'_> {
    type Item = Image<'static>;

    fn next(&mut self) -> Option<Image<'static>> {
        let frame = self.context.as_mut()?.next_frame();
        if frame.is_none() {
            self.context = None;
        }
        frame
    }
}

impl FusedIterator for Frames<'_> {}

/// A decoding session.
///
/// Callbacks registered on the session run synchronously inside
/// [`Decoder::decode`] and are dropped with it.
pub struct Decoder {
    session: CodecSession<dyn DecoderContext>,
    frame_callback: Option<Box<FrameCallback>>,
    slice_callback: Option<Box<SliceSink<'static>>>,
    decode_count: u64,
}

impl Decoder {
    /// Default decoder interface.
    pub fn interface() -> &'static CodecInterface {
        interfaces::reference_decoder()
    }

    /// Opens a decoder on the default interface.
    ///
    /// # Arguments
    ///
    /// * `logger` - Logger instance; messages are tagged `Decoder`
    ///
    /// # Returns
    ///
    /// * `Ok(Decoder)` - Open session ready for [`Decoder::decode`]
    /// * `Err` - The engine's status if it could not be initialized
    pub fn new(logger: Logger) -> Result<Self> {
        let mut decoder = Self::with_interface(Self::interface(), logger)?;
        decoder.open()?;
        Ok(decoder)
    }

    /// Creates an unopened decoder on `interface`. Callbacks may be
    /// registered before [`Decoder::open`].
    pub fn with_interface(interface: &'static CodecInterface, logger: Logger) -> Result<Self> {
        if !interface.is_decoder() {
            return Err(VpxError::Capability {
                operation: "decode",
                required: Capabilities::DECODER,
            });
        }
        Ok(Decoder {
            session: CodecSession::new(interface, logger.for_component("Decoder")),
            frame_callback: None,
            slice_callback: None,
            decode_count: 0,
        })
    }

    /// Creates the engine context.
    ///
    /// # Errors
    ///
    /// [`VpxError::SessionState`] unless the session is unopened; the
    /// engine's status when initialization fails.
    pub fn open(&mut self) -> Result<()> {
        self.session.open_with(|engine| engine.init_decoder())
    }

    /// Decodes `data` with no time limit.
    pub fn decode(&mut self, data: &[u8]) -> Result<Frames<'_>> {
        self.decode_with(data, Deadline::BEST_QUALITY)
    }

    /// Submits one compressed payload and returns the frames it completed.
    /// An empty payload flushes the engine.
    ///
    /// With a frame callback registered, every frame goes to the callback
    /// and the returned sequence is empty.
    ///
    /// # Errors
    ///
    /// [`VpxError::SessionState`] unless open; `CorruptFrame` or
    /// `UnsupBitstream` when the payload cannot be decoded, with the
    /// engine's detail recorded on the session.
    pub fn decode_with(&mut self, data: &[u8], deadline: Deadline) -> Result<Frames<'_>> {
        let context = self.session.context_mut("decode")?;
        let status = context.decode(data, deadline, self.slice_callback.as_deref_mut());
        self.session.check(status)?;

        if !data.is_empty() {
            self.decode_count += 1;
            if self.decode_count.is_multiple_of(DECODER_LOG_INTERVAL) {
                self.session
                    .logger()
                    .debug(&format!("Decoded {} payloads", self.decode_count));
            }
        }

        let context = self.session.context_mut("decode")?;
        match self.frame_callback.as_mut() {
            Some(callback) => {
                while let Some(frame) = context.next_frame() {
                    callback(&frame);
                }
                Ok(Frames::exhausted())
            }
            None => Ok(Frames::new(context)),
        }
    }

    /// Stream info accumulated from the payloads decoded so far.
    ///
    /// # Errors
    ///
    /// The engine's `Error` status before any key frame was decoded.
    pub fn stream_info(&mut self) -> Result<StreamInfo> {
        match self.session.context_mut("query stream info of")?.stream_info() {
            Ok(info) => Ok(info),
            Err(status) => Err(self.session.fail(status)),
        }
    }

    /// Reads stream info from `data` with the default interface, without a
    /// session.
    pub fn peek_stream_info(data: &[u8]) -> Result<StreamInfo> {
        Self::peek_stream_info_with(Self::interface(), data)
    }

    /// Same as [`Decoder::peek_stream_info`] on a chosen interface.
    ///
    /// # Errors
    ///
    /// `UnsupBitstream` for inter frames and truncated headers.
    pub fn peek_stream_info_with(
        interface: &'static CodecInterface,
        data: &[u8],
    ) -> Result<StreamInfo> {
        Ok(interface.engine().peek_stream_info(data)?)
    }

    /// Delivers each decoded frame to `callback` instead of the returned
    /// sequence.
    ///
    /// # Errors
    ///
    /// [`VpxError::Capability`] when the interface lacks `PUT_FRAME`.
    pub fn register_frame_callback<F>(&mut self, callback: F) -> Result<()>
    where
        F: FnMut(&Image<'static>) + Send + 'static,
    {
        self.require(Capabilities::PUT_FRAME, "register a frame callback")?;
        self.frame_callback = Some(Box::new(callback));
        Ok(())
    }

    /// Calls `callback` after each decoded slice with the partially
    /// reconstructed frame.
    ///
    /// # Errors
    ///
    /// [`VpxError::Capability`] when the interface lacks `PUT_SLICE`.
    pub fn register_slice_callback<F>(&mut self, callback: F) -> Result<()>
    where
        F: FnMut(&Image<'static>, SliceRegion) + Send + 'static,
    {
        self.require(Capabilities::PUT_SLICE, "register a slice callback")?;
        self.slice_callback = Some(Box::new(callback));
        Ok(())
    }

    fn require(&self, required: Capabilities, operation: &'static str) -> Result<()> {
        if self.session.interface().caps().contains(required) {
            Ok(())
        } else {
            Err(VpxError::Capability {
                operation,
                required,
            })
        }
    }

    /// Releases the engine context. Closing again does nothing.
    pub fn close(&mut self) -> Result<()> {
        self.session.close()
    }

    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    pub fn codec(&self) -> &'static CodecInterface {
        self.session.interface()
    }

    pub fn error_message(&self) -> &'static str {
        self.session.error_message()
    }

    pub fn error_detail(&self) -> Option<&str> {
        self.session.error_detail()
    }
}

impl std::fmt::Debug for Decoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Decoder")
            .field("session", &self.session)
            .field("frame_callback", &self.frame_callback.is_some())
            .field("slice_callback", &self.slice_callback.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Engine;
    use crate::error::Status;
    use crate::image::{ImageFormat, Rect};
    use crate::session::{EncodeOptions, Encoder};
    use std::sync::{Arc, LazyLock, Mutex};

    struct FramesOnlyEngine;

    impl Engine for FramesOnlyEngine {
        fn name(&self) -> &str {
            "Frames Only"
        }

        fn caps(&self) -> Capabilities {
            Capabilities::DECODER
        }
    }

    static FRAMES_ONLY: LazyLock<CodecInterface> =
        LazyLock::new(|| CodecInterface::new(FramesOnlyEngine));

    fn payloads(width: u32, height: u32, count: usize) -> Vec<Vec<u8>> {
        let mut encoder = Encoder::new(width, height, Logger::discard()).unwrap();
        let mut image = Image::alloc(ImageFormat::I420, width, height, 1).unwrap();
        (0..count)
            .map(|i| {
                image.data_mut().fill(i as u8 * 40);
                encoder
                    .encode_with(&image, i as i64, EncodeOptions::default())
                    .unwrap()
                    .flat_map(|packet| packet.data)
                    .collect()
            })
            .collect()
    }

    #[test]
    fn test_decode_yields_single_frame() {
        let data = payloads(40, 30, 1);
        let mut decoder = Decoder::new(Logger::discard()).unwrap();

        let mut frames = decoder.decode(&data[0]).unwrap();
        let frame = frames.next().unwrap();
        assert!(frames.next().is_none());
        assert!(frames.next().is_none());
        drop(frames);

        assert_eq!((frame.width(), frame.height()), (40, 30));
        assert_eq!((frame.stored_width(), frame.stored_height()), (48, 32));
        assert_eq!(
            decoder.stream_info().unwrap(),
            StreamInfo {
                width: 40,
                height: 30,
                is_keyframe: true
            }
        );
    }

    #[test]
    fn test_stream_info_before_decode() {
        let mut decoder = Decoder::new(Logger::discard()).unwrap();
        let err = decoder.stream_info().unwrap_err();
        assert_eq!(err.status(), Some(Status::Error));
    }

    #[test]
    fn test_corrupt_payload_reports_detail() {
        let data = payloads(16, 16, 2);
        let mut decoder = Decoder::new(Logger::discard()).unwrap();

        let err = decoder.decode(&data[1]).err().unwrap();
        assert_eq!(err.status(), Some(Status::CorruptFrame));
        assert!(decoder.error_detail().unwrap().contains("reference"));
    }

    #[test]
    fn test_empty_payload_flushes() {
        let mut decoder = Decoder::new(Logger::discard()).unwrap();
        assert_eq!(decoder.decode(&[]).unwrap().count(), 0);
    }

    #[test]
    fn test_frame_callback_takes_frames() {
        let data = payloads(32, 32, 3);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();

        let mut decoder = Decoder::new(Logger::discard()).unwrap();
        decoder
            .register_frame_callback(move |frame| {
                sink.lock().unwrap().push(frame.plane(0)[0]);
            })
            .unwrap();

        for payload in &data {
            assert_eq!(decoder.decode(payload).unwrap().count(), 0);
        }
        assert_eq!(*seen.lock().unwrap(), vec![0, 40, 80]);
    }

    #[test]
    fn test_slice_callback_regions() {
        let data = payloads(24, 40, 1);
        let regions = Arc::new(Mutex::new(Vec::new()));
        let sink = regions.clone();

        let mut decoder = Decoder::with_interface(Decoder::interface(), Logger::discard()).unwrap();
        decoder
            .register_slice_callback(move |_, region| sink.lock().unwrap().push(region))
            .unwrap();
        decoder.open().unwrap();
        assert_eq!(decoder.decode(&data[0]).unwrap().count(), 1);

        let regions = regions.lock().unwrap();
        let updates: Vec<Rect> = regions.iter().map(|r| r.update).collect();
        assert_eq!(
            updates,
            vec![
                Rect::new(0, 0, 24, 16),
                Rect::new(0, 16, 24, 16),
                Rect::new(0, 32, 24, 8)
            ]
        );
        assert_eq!(regions.last().unwrap().valid, Rect::new(0, 0, 24, 40));
    }

    #[test]
    fn test_callbacks_need_capabilities() {
        let mut decoder = Decoder::with_interface(&FRAMES_ONLY, Logger::discard()).unwrap();
        let err = decoder.register_frame_callback(|_| {}).unwrap_err();
        assert!(matches!(
            err,
            VpxError::Capability {
                required: Capabilities::PUT_FRAME,
                ..
            }
        ));
        assert!(decoder.register_slice_callback(|_, _| {}).is_err());

        // No decoder context to create either
        let err = decoder.open().unwrap_err();
        assert_eq!(err.status(), Some(Status::Incapable));
    }

    #[test]
    fn test_unopened_and_closed_decoder() {
        let mut decoder = Decoder::with_interface(Decoder::interface(), Logger::discard()).unwrap();
        assert!(matches!(
            decoder.decode(&[1, 2, 3]),
            Err(VpxError::SessionState {
                state: SessionState::Unopened,
                ..
            })
        ));

        decoder.open().unwrap();
        decoder.close().unwrap();
        decoder.close().unwrap();
        assert_eq!(decoder.state(), SessionState::Closed);
        assert!(decoder.stream_info().is_err());
    }

    #[test]
    fn test_peek_without_session() {
        let data = payloads(320, 240, 2);
        let info = Decoder::peek_stream_info(&data[0]).unwrap();
        assert_eq!((info.width, info.height, info.is_keyframe), (320, 240, true));

        let err = Decoder::peek_stream_info(&data[1]).unwrap_err();
        assert_eq!(err.status(), Some(Status::UnsupBitstream));
    }

    #[test]
    fn test_encoder_interface_rejected() {
        let err = Decoder::with_interface(interfaces::reference_encoder(), Logger::discard())
            .unwrap_err();
        assert!(matches!(err, VpxError::Capability { .. }));
    }
}
