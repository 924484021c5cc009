//! Static metadata about an encode or decode interface.

use crate::common::flags::flag_set;
use crate::engine::Engine;
use std::fmt;

flag_set! {
    /// Capability bitmask advertised by an interface.
    pub struct Capabilities {
        /// Is a decoder
        const DECODER = 0x1;
        /// Is an encoder
        const ENCODER = 0x2;
        /// Will issue put-slice callbacks
        const PUT_SLICE = 0x1_0000;
        /// Will issue put-frame callbacks
        const PUT_FRAME = 0x2_0000;
        /// Can post-process decoded frames
        const POSTPROC = 0x4_0000;
        /// Can conceal errors due to packet loss
        const ERROR_CONCEALMENT = 0x8_0000;
        /// Can receive encoded frames one fragment at a time
        const INPUT_FRAGMENTS = 0x10_0000;
        /// Can issue PSNR packets
        const PSNR = 0x20_0000;
        /// Can output one partition at a time
        const OUTPUT_PARTITION = 0x40_0000;
    }
}

/// Version of the engine library linked into this crate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
    /// `v{major}.{minor}.{patch}`, suffixed with `-{extra}` when `extra` is set
    pub version_string: String,
    pub extra: String,
    pub build_config: String,
}

impl Version {
    fn current() -> Self {
        let major = env!("CARGO_PKG_VERSION_MAJOR").parse().unwrap_or(0);
        let minor = env!("CARGO_PKG_VERSION_MINOR").parse().unwrap_or(0);
        let patch = env!("CARGO_PKG_VERSION_PATCH").parse().unwrap_or(0);
        let extra = format!("{}-{}", std::env::consts::ARCH, std::env::consts::OS);

        let mut build_config = vec!["--enable-reference-engine".to_string()];
        if cfg!(feature = "ffmpeg") {
            build_config.push("--enable-ffmpeg".to_string());
        }
        if cfg!(debug_assertions) {
            build_config.push("--enable-debug".to_string());
        }

        let mut version_string = format!("v{}.{}.{}", major, minor, patch);
        if !extra.is_empty() {
            version_string = format!("{}-{}", version_string, extra);
        }

        Version {
            major,
            minor,
            patch,
            version_string,
            extra,
            build_config: build_config.join(" "),
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.version_string)
    }
}

/// An encode or decode algorithm bound to the engine implementing it.
///
/// Instances are immutable; the built-in ones live for the whole process
/// (see [`crate::codec::interfaces`]).
pub struct CodecInterface {
    engine: Box<dyn Engine>,
}

impl CodecInterface {
    pub fn new(engine: impl Engine + 'static) -> Self {
        CodecInterface {
            engine: Box::new(engine),
        }
    }

    /// Engine-supplied name of the interface.
    pub fn name(&self) -> &str {
        self.engine.name()
    }

    /// Capabilities of the algorithm.
    pub fn caps(&self) -> Capabilities {
        self.engine.caps()
    }

    pub fn is_encoder(&self) -> bool {
        self.caps().contains(Capabilities::ENCODER)
    }

    pub fn is_decoder(&self) -> bool {
        self.caps().contains(Capabilities::DECODER)
    }

    /// Version of the engine library.
    pub fn version() -> Version {
        Version::current()
    }

    pub(crate) fn engine(&self) -> &dyn Engine {
        self.engine.as_ref()
    }
}

impl fmt::Debug for CodecInterface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodecInterface")
            .field("name", &self.name())
            .field("caps", &self.caps())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_string_format() {
        let v = CodecInterface::version();
        assert_eq!(
            v.version_string,
            format!("v{}.{}.{}-{}", v.major, v.minor, v.patch, v.extra)
        );
        assert!(!v.build_config.is_empty());
        assert_eq!(v.to_string(), v.version_string);
    }

    #[test]
    fn test_capabilities_debug() {
        let caps = Capabilities::DECODER | Capabilities::PUT_FRAME;
        assert_eq!(format!("{:?}", caps), "Capabilities(DECODER | PUT_FRAME)");
    }
}
