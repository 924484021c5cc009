//! Error types for codec sessions.
//!
//! Every engine primitive reports a [`Status`]. [`check`] turns a non-OK
//! status into a [`VpxError`]; the remaining variants are raised locally
//! before the engine is touched.

use crate::codec::Capabilities;
use crate::session::SessionState;
use std::fmt;
use std::io;

pub type Result<T> = std::result::Result<T, VpxError>;

/// Status codes returned by engine primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// Operation completed without error
    Ok,
    /// Unspecified error
    Error,
    /// Memory operation failed
    MemError,
    /// Engine and caller disagree on the interface version
    AbiMismatch,
    /// Algorithm does not have the requested capability
    Incapable,
    /// The bitstream was unable to be parsed at the highest level
    UnsupBitstream,
    /// The bitstream uses a feature the engine does not support
    UnsupFeature,
    /// The stream contains corrupt data
    CorruptFrame,
    /// An application-supplied parameter is not valid
    InvalidParam,
    /// An iterator reached the end of its list
    ListEnd,
}

impl Status {
    /// The engine's description of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Ok => "Success",
            Status::Error => "Unspecified internal error",
            Status::MemError => "Memory allocation error",
            Status::AbiMismatch => "ABI version mismatch",
            Status::Incapable => "Codec does not implement requested capability",
            Status::UnsupBitstream => "Bitstream not supported by this decoder",
            Status::UnsupFeature => "Bitstream required feature not supported by this decoder",
            Status::CorruptFrame => "Corrupt frame detected",
            Status::InvalidParam => "Invalid parameter",
            Status::ListEnd => "End of iterated list",
        }
    }

    /// Numeric code, in declaration order starting at 0 for `Ok`.
    pub fn code(&self) -> i32 {
        *self as i32
    }

    pub fn is_ok(&self) -> bool {
        *self == Status::Ok
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Routes an engine status through the error model.
///
/// # Errors
///
/// Returns [`VpxError::Engine`] for anything but [`Status::Ok`].
pub fn check(status: Status) -> Result<()> {
    match status {
        Status::Ok => Ok(()),
        status => Err(VpxError::from(status)),
    }
}

/// Error type for session, image and engine operations
#[derive(Debug)]
pub enum VpxError {
    /// The engine returned a non-OK status
    Engine {
        status: Status,
        detail: Option<String>,
    },
    /// Caller-supplied memory is smaller than the geometry requires
    BufferSize { required: usize, actual: usize },
    /// Operation invoked on a session in the wrong lifecycle state
    SessionState {
        operation: &'static str,
        state: SessionState,
    },
    /// The interface does not advertise the capability the operation needs
    Capability {
        operation: &'static str,
        required: Capabilities,
    },
    /// Settings could not be loaded or applied
    Config(String),
    /// I/O error
    Io(io::Error),
}

impl VpxError {
    /// Engine failure with the engine's detail text attached.
    pub fn engine(status: Status, detail: impl Into<String>) -> Self {
        VpxError::Engine {
            status,
            detail: Some(detail.into()),
        }
    }

    /// The engine status behind this error, if any.
    pub fn status(&self) -> Option<Status> {
        match self {
            VpxError::Engine { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl fmt::Display for VpxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VpxError::Engine {
                status,
                detail: None,
            } => write!(f, "{}", status),
            VpxError::Engine {
                status,
                detail: Some(detail),
            } => write!(f, "{}: {}", status, detail),
            VpxError::BufferSize { required, actual } => write!(
                f,
                "Buffer too small: {} bytes required, {} supplied",
                required, actual
            ),
            VpxError::SessionState { operation, state } => {
                write!(f, "Cannot {} a session that is {}", operation, state)
            }
            VpxError::Capability {
                operation,
                required,
            } => write!(
                f,
                "Interface lacks capability {:?} needed to {}",
                required, operation
            ),
            VpxError::Config(msg) => write!(f, "Config error: {}", msg),
            VpxError::Io(err) => write!(f, "I/O error: {}", err),
        }
    }
}

impl std::error::Error for VpxError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            VpxError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<Status> for VpxError {
    fn from(status: Status) -> Self {
        VpxError::Engine {
            status,
            detail: None,
        }
    }
}

impl From<io::Error> for VpxError {
    fn from(err: io::Error) -> Self {
        VpxError::Io(err)
    }
}

impl From<config_loader::ConfigError> for VpxError {
    fn from(err: config_loader::ConfigError) -> Self {
        VpxError::Config(err.to_string())
    }
}

impl From<logging::LoggingError> for VpxError {
    fn from(err: logging::LoggingError) -> Self {
        match err {
            logging::LoggingError::Io(err) => VpxError::Io(err),
            other => VpxError::Config(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_ok_passes() {
        assert!(check(Status::Ok).is_ok());
    }

    #[test]
    fn test_check_maps_every_failure() {
        let failures = [
            Status::Error,
            Status::MemError,
            Status::AbiMismatch,
            Status::Incapable,
            Status::UnsupBitstream,
            Status::UnsupFeature,
            Status::CorruptFrame,
            Status::InvalidParam,
            Status::ListEnd,
        ];
        for status in failures {
            let err = check(status).unwrap_err();
            assert_eq!(err.status(), Some(status));
            assert_eq!(err.to_string(), status.as_str());
        }
    }

    #[test]
    fn test_ok_status_error_reads_success() {
        let err = VpxError::from(Status::Ok);
        assert_eq!(err.status(), Some(Status::Ok));
        assert_eq!(err.to_string(), "Success");
    }

    #[test]
    fn test_engine_error_with_detail() {
        let err = VpxError::engine(Status::InvalidParam, "width 0 out of range");
        assert_eq!(err.to_string(), "Invalid parameter: width 0 out of range");
    }

    #[test]
    fn test_status_codes_are_stable() {
        assert_eq!(Status::Ok.code(), 0);
        assert_eq!(Status::InvalidParam.code(), 8);
        assert!(Status::Ok.is_ok());
        assert!(!Status::ListEnd.is_ok());
    }

    #[test]
    fn test_local_error_display() {
        let err = VpxError::BufferSize {
            required: 115200,
            actual: 100,
        };
        assert_eq!(
            err.to_string(),
            "Buffer too small: 115200 bytes required, 100 supplied"
        );

        let err = VpxError::SessionState {
            operation: "encode",
            state: SessionState::Closed,
        };
        assert_eq!(err.to_string(), "Cannot encode a session that is closed");
        assert!(err.status().is_none());
    }

    #[test]
    fn test_error_from_io() {
        let err: VpxError = io::Error::new(io::ErrorKind::NotFound, "missing").into();
        assert!(matches!(err, VpxError::Io(_)));
        let _: &dyn std::error::Error = &err;
    }
}
