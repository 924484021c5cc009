//! Encoder session.

use super::{CodecSession, SessionState};
use crate::codec::{Capabilities, CodecInterface, interfaces};
use crate::common::constants::logging::ENCODER_LOG_INTERVAL;
use crate::config::{EncoderConfig, SessionSettings};
use crate::engine::{Deadline, EncodeFlags, EncoderContext, Packet};
use crate::error::{Result, Status, VpxError};
use crate::image::Image;
use logging::Logger;
use std::iter::FusedIterator;

/// Per-call encode parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeOptions {
    /// Frame duration in timebase units
    pub duration: u64,
    pub flags: EncodeFlags,
    pub deadline: Deadline,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        EncodeOptions {
            duration: 1,
            flags: EncodeFlags::empty(),
            deadline: Deadline::REALTIME,
        }
    }
}

impl EncodeOptions {
    pub fn with_flags(flags: EncodeFlags) -> Self {
        EncodeOptions {
            flags,
            ..EncodeOptions::default()
        }
    }
}

/// Packets produced by one submission.
///
/// Each pull asks the engine for its next packet. Once the engine runs dry
/// the sequence stays exhausted; it borrows the encoder, so the next
/// submission can only happen after it is dropped.
pub struct Packets<'s> {
    context: Option<&'s mut dyn EncoderContext>,
}

impl<'s> Packets<'s> {
    fn new(context: &'s mut dyn EncoderContext) -> Self {
        Packets {
            context: Some(context),
        }
    }
}

impl Iterator for Packets<'_> {
    type Item = Packet;

    fn next(&mut self) -> Option<Packet> {
        let packet = self.context.as_mut()?.next_packet();
        if packet.is_none() {
            self.context = None;
        }
        packet
    }
}

impl FusedIterator for Packets<'_> {}

/// An encoding session.
///
/// The configuration is derived from the engine's defaults for the
/// requested geometry before the engine context is created.
///
/// ```no_run
/// use logging::Logger;
/// use vpx_session::{EncodeFlags, EncodeOptions, Encoder, Image, ImageFormat};
///
/// let mut encoder = Encoder::new(320, 240, Logger::discard())?;
/// let mut image = Image::alloc(ImageFormat::I420, 320, 240, 1)?;
/// image.clear();
///
/// let options = EncodeOptions::with_flags(EncodeFlags::FORCE_KEYFRAME);
/// for packet in encoder.encode_with(&image, 1, options)? {
///     println!("{} bytes", packet.len());
/// }
/// # Ok::<(), vpx_session::VpxError>(())
/// ```
#[derive(Debug)]
pub struct Encoder {
    session: CodecSession<dyn EncoderContext>,
    config: EncoderConfig,
    frame_count: u64,
}

impl Encoder {
    /// Default encoder interface.
    pub fn interface() -> &'static CodecInterface {
        interfaces::reference_encoder()
    }

    /// Opens an encoder on the default interface.
    ///
    /// # Arguments
    ///
    /// * `width` - Frame width in pixels
    /// * `height` - Frame height in pixels
    /// * `logger` - Logger instance; messages are tagged `Encoder`
    ///
    /// # Returns
    ///
    /// * `Ok(Encoder)` - Open session with the engine defaults scaled to
    ///   the requested geometry
    /// * `Err` - If the defaults cannot be derived or the engine rejects
    ///   the configuration
    pub fn new(width: u32, height: u32, logger: Logger) -> Result<Self> {
        Self::with_interface(Self::interface(), width, height, logger)
    }

    /// Opens an encoder on `interface`.
    ///
    /// # Errors
    ///
    /// Same as [`Encoder::configure`], plus the engine's status when
    /// initialization fails.
    pub fn with_interface(
        interface: &'static CodecInterface,
        width: u32,
        height: u32,
        logger: Logger,
    ) -> Result<Self> {
        let mut encoder = Self::configure(interface, width, height, logger)?;
        encoder.open()?;
        Ok(encoder)
    }

    /// Derives the configuration for `width`x`height` without opening the
    /// engine, so it can be adjusted through [`Encoder::config_mut`].
    ///
    /// # Errors
    ///
    /// [`VpxError::Capability`] for a non-encoder interface, the engine's
    /// status if it has no defaults, [`VpxError::Config`] if the defaults
    /// cannot be scaled.
    pub fn configure(
        interface: &'static CodecInterface,
        width: u32,
        height: u32,
        logger: Logger,
    ) -> Result<Self> {
        let defaults = Self::engine_defaults(interface)?;
        let config = EncoderConfig::derive(&defaults, width, height)?;
        Ok(Self::unopened(interface, config, logger))
    }

    /// Opens an encoder with an explicit configuration.
    ///
    /// # Arguments
    ///
    /// * `interface` - Encoder interface to drive
    /// * `config` - Complete configuration, used as is
    /// * `logger` - Logger instance
    ///
    /// # Errors
    ///
    /// [`VpxError::Capability`] for a non-encoder interface; the engine's
    /// status (usually `InvalidParam`) when it rejects `config`.
    pub fn from_config(
        interface: &'static CodecInterface,
        config: EncoderConfig,
        logger: Logger,
    ) -> Result<Self> {
        if !interface.is_encoder() {
            return Err(Self::not_an_encoder());
        }
        let mut encoder = Self::unopened(interface, config, logger);
        encoder.open()?;
        Ok(encoder)
    }

    /// Opens an encoder on the default interface from a settings file.
    ///
    /// Geometry missing from the settings falls back to the engine's
    /// default geometry.
    ///
    /// # Errors
    ///
    /// [`VpxError::Config`] for a bad logging section, otherwise as
    /// [`Encoder::from_config`].
    pub fn from_settings(settings: &SessionSettings) -> Result<Self> {
        let logger = settings.logging.build_logger()?;
        let interface = Self::interface();
        let defaults = Self::engine_defaults(interface)?;

        let width = settings.encoder.width.unwrap_or(defaults.width);
        let height = settings.encoder.height.unwrap_or(defaults.height);
        let mut config = EncoderConfig::derive(&defaults, width, height)?;
        settings.encoder.apply(&mut config);

        Self::from_config(interface, config, logger)
    }

    fn engine_defaults(interface: &'static CodecInterface) -> Result<EncoderConfig> {
        if !interface.is_encoder() {
            return Err(Self::not_an_encoder());
        }
        Ok(interface.engine().default_encoder_config()?)
    }

    fn not_an_encoder() -> VpxError {
        VpxError::Capability {
            operation: "encode",
            required: Capabilities::ENCODER,
        }
    }

    fn unopened(interface: &'static CodecInterface, config: EncoderConfig, logger: Logger) -> Self {
        Encoder {
            session: CodecSession::new(interface, logger.for_component("Encoder")),
            config,
            frame_count: 0,
        }
    }

    /// Creates the engine context for the current configuration.
    ///
    /// # Errors
    ///
    /// [`VpxError::SessionState`] unless the session is unopened; the
    /// engine's status when it rejects the configuration.
    pub fn open(&mut self) -> Result<()> {
        let config = &self.config;
        self.session
            .open_with(|engine| engine.init_encoder(config))?;
        self.session.logger().info(&format!(
            "Encoder ready: {}x{}, bitrate={} kbps, timebase={}/{}",
            config.width,
            config.height,
            config.target_bitrate,
            config.timebase.num,
            config.timebase.den
        ));
        Ok(())
    }

    /// Submits `image` with default options.
    pub fn encode(&mut self, image: &Image<'_>, pts: i64) -> Result<Packets<'_>> {
        self.encode_with(image, pts, EncodeOptions::default())
    }

    /// Submits `image` at `pts` and returns the packets it produced.
    ///
    /// # Errors
    ///
    /// [`VpxError::SessionState`] unless open; the engine's status when it
    /// rejects the image, for example on a geometry mismatch.
    pub fn encode_with(
        &mut self,
        image: &Image<'_>,
        pts: i64,
        options: EncodeOptions,
    ) -> Result<Packets<'_>> {
        self.session.context_mut("encode")?;
        if image.is_freed() {
            let detail = "input image has been freed".to_string();
            return Err(self.session.reject(Status::InvalidParam, detail));
        }

        let status = self.session.context_mut("encode")?.encode(
            Some(image),
            pts,
            options.duration,
            options.flags,
            options.deadline,
        );
        self.session.check(status)?;

        self.frame_count += 1;
        if self.frame_count.is_multiple_of(ENCODER_LOG_INTERVAL) {
            self.session
                .logger()
                .debug(&format!("Encoded {} frames", self.frame_count));
        }
        Ok(Packets::new(self.session.context_mut("encode")?))
    }

    /// Signals end of stream and returns whatever the engine still holds.
    ///
    /// # Errors
    ///
    /// [`VpxError::SessionState`] unless open.
    pub fn flush(&mut self) -> Result<Packets<'_>> {
        let options = EncodeOptions::default();
        let status = self.session.context_mut("flush")?.encode(
            None,
            0,
            options.duration,
            options.flags,
            options.deadline,
        );
        self.session.check(status)?;
        self.session.logger().debug("Encoder flushed");
        Ok(Packets::new(self.session.context_mut("flush")?))
    }

    /// Applies `config` to the live engine context. On rejection the
    /// previous configuration stays in effect.
    pub fn reconfigure(&mut self, config: EncoderConfig) -> Result<()> {
        let status = self.session.context_mut("reconfigure")?.set_config(&config);
        self.session.check(status)?;
        self.session.logger().info(&format!(
            "Encoder reconfigured: {}x{}, bitrate={} kbps",
            config.width, config.height, config.target_bitrate
        ));
        self.config = config;
        Ok(())
    }

    /// Releases the engine context. Closing again does nothing.
    ///
    /// # Errors
    ///
    /// The engine's status if teardown failed; the session is closed
    /// either way.
    pub fn close(&mut self) -> Result<()> {
        self.session.close()
    }

    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    /// Mutable configuration; only honored by [`Encoder::open`], use
    /// [`Encoder::reconfigure`] once open.
    pub fn config_mut(&mut self) -> Option<&mut EncoderConfig> {
        match self.session.state() {
            SessionState::Unopened => Some(&mut self.config),
            _ => None,
        }
    }

    pub fn width(&self) -> u32 {
        self.config.width
    }

    pub fn height(&self) -> u32 {
        self.config.height
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::PacketKind;
    use crate::image::ImageFormat;

    fn blank(width: u32, height: u32) -> Image<'static> {
        let mut image = Image::alloc(ImageFormat::I420, width, height, 1).unwrap();
        image.clear();
        image
    }

    #[test]
    fn test_new_derives_config() {
        let encoder = Encoder::new(640, 480, Logger::discard()).unwrap();
        assert_eq!(encoder.state(), SessionState::Open);
        assert_eq!((encoder.width(), encoder.height()), (640, 480));
        assert_eq!(encoder.config().target_bitrate, 1024);
    }

    #[test]
    fn test_forced_keyframe_yields_one_packet() {
        let mut encoder = Encoder::new(320, 240, Logger::discard()).unwrap();
        let image = blank(320, 240);
        let options = EncodeOptions::with_flags(EncodeFlags::FORCE_KEYFRAME);

        let mut packets = encoder.encode_with(&image, 1, options).unwrap();
        let packet = packets.next().unwrap();
        assert_eq!(packet.kind, PacketKind::CompressedFrame);
        assert!(packet.is_keyframe());
        assert_eq!(packet.pts, 1);
        assert!(packets.next().is_none());
        assert!(packets.next().is_none());
    }

    #[test]
    fn test_abandoned_packets_are_discarded() {
        let mut encoder = Encoder::new(16, 16, Logger::discard()).unwrap();
        let image = blank(16, 16);
        drop(encoder.encode(&image, 0).unwrap());

        let packets: Vec<_> = encoder.encode(&image, 1).unwrap().collect();
        assert_eq!(packets.len(), 1);
        assert_eq!(packets[0].pts, 1);
    }

    #[test]
    fn test_rejected_image_reports_detail() {
        let mut encoder = Encoder::new(32, 32, Logger::discard()).unwrap();
        let err = encoder.encode(&blank(16, 16), 0).err().unwrap();

        assert_eq!(err.status(), Some(Status::InvalidParam));
        assert_eq!(encoder.error_message(), Status::InvalidParam.as_str());
        assert!(encoder.error_detail().unwrap().contains("16x16"));

        // A good call clears the recorded failure
        encoder.encode(&blank(32, 32), 1).unwrap();
        assert_eq!(encoder.error_message(), "Success");
        assert!(encoder.error_detail().is_none());
    }

    #[test]
    fn test_freed_image_is_rejected_before_the_engine() {
        let mut encoder = Encoder::new(32, 32, Logger::discard()).unwrap();
        let mut image = blank(32, 32);
        image.free();

        let err = encoder.encode(&image, 0).err().unwrap();
        assert_eq!(err.status(), Some(Status::InvalidParam));
        assert_eq!(encoder.error_message(), Status::InvalidParam.as_str());
        assert!(encoder.error_detail().unwrap().contains("freed"));
        assert_eq!(encoder.state(), SessionState::Open);

        encoder.encode(&blank(32, 32), 1).unwrap();
        assert!(encoder.error_detail().is_none());
    }

    #[test]
    fn test_configure_then_open() {
        let mut encoder =
            Encoder::configure(Encoder::interface(), 64, 64, Logger::discard()).unwrap();
        assert_eq!(encoder.state(), SessionState::Unopened);
        assert!(encoder.encode(&blank(64, 64), 0).is_err());

        encoder.config_mut().unwrap().keyframe_max_dist = 2;
        encoder.open().unwrap();
        assert!(encoder.config_mut().is_none());
        assert!(matches!(
            encoder.open(),
            Err(VpxError::SessionState {
                state: SessionState::Open,
                ..
            })
        ));
    }

    #[test]
    fn test_reconfigure_keeps_last_good_config() {
        let mut encoder = Encoder::new(32, 32, Logger::discard()).unwrap();
        let good = encoder.config().clone();

        let bad = EncoderConfig {
            width: 0,
            ..good.clone()
        };
        assert!(encoder.reconfigure(bad).is_err());
        assert_eq!(encoder.config(), &good);

        let faster = EncoderConfig {
            target_bitrate: good.target_bitrate * 2,
            ..good.clone()
        };
        encoder.reconfigure(faster.clone()).unwrap();
        assert_eq!(encoder.config(), &faster);
    }

    #[test]
    fn test_closed_encoder_rejects_calls() {
        let mut encoder = Encoder::new(16, 16, Logger::discard()).unwrap();
        encoder.close().unwrap();
        encoder.close().unwrap();

        let err = encoder.encode(&blank(16, 16), 0).err().unwrap();
        assert_eq!(err.to_string(), "Cannot encode a session that is closed");
        assert!(encoder.flush().is_err());
        assert!(encoder.reconfigure(EncoderConfig::default()).is_err());
        assert!(encoder.open().is_err());
    }

    #[test]
    fn test_decoder_interface_is_not_an_encoder() {
        let err = Encoder::with_interface(
            interfaces::reference_decoder(),
            16,
            16,
            Logger::discard(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            VpxError::Capability {
                required: Capabilities::ENCODER,
                ..
            }
        ));
    }

    #[test]
    fn test_from_settings() {
        let settings = SessionSettings::from_json(
            r#"{
                "encoder": { "width": 64, "height": 48, "keyframe_max_dist": 10 },
                "logging": { "enable_file": false }
            }"#,
        )
        .unwrap();
        let encoder = Encoder::from_settings(&settings).unwrap();

        assert_eq!((encoder.width(), encoder.height()), (64, 48));
        assert_eq!(encoder.config().keyframe_max_dist, 10);
        assert_eq!(encoder.config().target_bitrate, 10);
    }

    #[test]
    fn test_flush_is_empty() {
        let mut encoder = Encoder::new(16, 16, Logger::discard()).unwrap();
        encoder.encode(&blank(16, 16), 0).unwrap();
        assert_eq!(encoder.flush().unwrap().count(), 0);
    }
}
