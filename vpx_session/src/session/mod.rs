//! Codec sessions.
//!
//! A session owns one engine context from a successful open until close.
//! Dropping a session closes it, so the context is released on every exit
//! path, including `?` returns and unwinding.

mod decoder;
mod encoder;

pub use decoder::{Decoder, Frames};
pub use encoder::{EncodeOptions, Encoder, Packets};

use crate::codec::CodecInterface;
use crate::engine::{Engine, EngineContext};
use crate::error::{self, Result, Status, VpxError};
use logging::Logger;
use std::fmt;

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    Unopened,
    Open,
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Unopened => "unopened",
            SessionState::Open => "open",
            SessionState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Lifecycle shared by encoder and decoder sessions.
pub struct CodecSession<C: ?Sized + EngineContext> {
    interface: &'static CodecInterface,
    state: SessionState,
    context: Option<Box<C>>,
    last_status: Status,
    last_detail: Option<String>,
    logger: Logger,
}

impl<C: ?Sized + EngineContext> CodecSession<C> {
    pub fn new(interface: &'static CodecInterface, logger: Logger) -> Self {
        CodecSession {
            interface,
            state: SessionState::Unopened,
            context: None,
            last_status: Status::Ok,
            last_detail: None,
            logger,
        }
    }

    pub fn interface(&self) -> &'static CodecInterface {
        self.interface
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    /// Creates the engine context through `init`.
    ///
    /// # Errors
    ///
    /// [`VpxError::SessionState`] unless the session is unopened; the
    /// engine's status when `init` fails, in which case the session stays
    /// unopened.
    pub fn open_with<F>(&mut self, init: F) -> Result<()>
    where
        F: FnOnce(&dyn Engine) -> std::result::Result<Box<C>, Status>,
    {
        if self.state != SessionState::Unopened {
            return Err(VpxError::SessionState {
                operation: "open",
                state: self.state,
            });
        }

        match init(self.interface.engine()) {
            Ok(context) => {
                self.context = Some(context);
                self.state = SessionState::Open;
                self.last_status = Status::Ok;
                self.last_detail = None;
                self.logger
                    .info(&format!("Opened session on {}", self.interface.name()));
                Ok(())
            }
            Err(status) => Err(self.fail(status)),
        }
    }

    /// The engine context, or a state error naming `operation`.
    pub(crate) fn context_mut(&mut self, operation: &'static str) -> Result<&mut C> {
        let state = self.state;
        self.context
            .as_deref_mut()
            .ok_or(VpxError::SessionState { operation, state })
    }

    /// Records `status` and turns a non-OK status into an error carrying the
    /// engine's detail text.
    pub(crate) fn check(&mut self, status: Status) -> Result<()> {
        match error::check(status) {
            Ok(()) => {
                self.last_status = status;
                self.last_detail = None;
                Ok(())
            }
            Err(_) => Err(self.fail(status)),
        }
    }

    /// Records a failure detected before the engine was called.
    pub(crate) fn reject(&mut self, status: Status, detail: String) -> VpxError {
        self.logger
            .warn(&format!("Rejected call: {}: {}", status, detail));
        self.last_status = status;
        self.last_detail = Some(detail.clone());
        VpxError::Engine {
            status,
            detail: Some(detail),
        }
    }

    pub(crate) fn fail(&mut self, status: Status) -> VpxError {
        self.last_status = status;
        self.last_detail = self
            .context
            .as_deref()
            .and_then(|context| context.error_detail())
            .map(str::to_string);

        match &self.last_detail {
            Some(detail) => self
                .logger
                .warn(&format!("Engine rejected call: {}: {}", status, detail)),
            None => self.logger.warn(&format!("Engine rejected call: {}", status)),
        }
        VpxError::Engine {
            status,
            detail: self.last_detail.clone(),
        }
    }

    /// Destroys the engine context.
    ///
    /// The context is released even when teardown reports a failure. Closing
    /// a session that holds no context does nothing.
    pub fn close(&mut self) -> Result<()> {
        let Some(mut context) = self.context.take() else {
            return Ok(());
        };
        self.state = SessionState::Closed;

        let status = context.destroy();
        let detail = match status {
            Status::Ok => None,
            _ => context.error_detail().map(str::to_string),
        };
        drop(context);
        self.logger
            .info(&format!("Closed session on {}", self.interface.name()));

        self.last_status = status;
        self.last_detail = detail.clone();
        error::check(status).map_err(|_| VpxError::Engine { status, detail })
    }

    /// Engine string for the status of the last call.
    pub fn error_message(&self) -> &'static str {
        self.last_status.as_str()
    }

    /// Engine detail text recorded with the last failure.
    pub fn error_detail(&self) -> Option<&str> {
        self.last_detail.as_deref()
    }
}

impl<C: ?Sized + EngineContext> Drop for CodecSession<C> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            self.logger
                .error(&format!("Failed to close session on drop: {}", e));
        }
    }
}

impl<C: ?Sized + EngineContext> fmt::Debug for CodecSession<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodecSession")
            .field("interface", &self.interface.name())
            .field("state", &self.state)
            .field("last_status", &self.last_status)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Capabilities;
    use crate::codec::interfaces::reference_decoder;
    use crate::engine::DecoderContext;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, LazyLock};

    struct TeardownFails {
        destroyed: Arc<AtomicUsize>,
    }

    impl EngineContext for TeardownFails {
        fn error_detail(&self) -> Option<&str> {
            Some("flush failed")
        }

        fn destroy(&mut self) -> Status {
            self.destroyed.fetch_add(1, Ordering::SeqCst);
            Status::Error
        }
    }

    struct RefusingEngine;

    impl Engine for RefusingEngine {
        fn name(&self) -> &str {
            "Refusing"
        }

        fn caps(&self) -> Capabilities {
            Capabilities::DECODER
        }
    }

    static REFUSING: LazyLock<CodecInterface> =
        LazyLock::new(|| CodecInterface::new(RefusingEngine));

    #[test]
    fn test_state_display() {
        assert_eq!(SessionState::Closed.to_string(), "closed");
        assert_eq!(SessionState::Unopened.to_string(), "unopened");
    }

    #[test]
    fn test_open_close_lifecycle() {
        let mut session: CodecSession<dyn DecoderContext> =
            CodecSession::new(reference_decoder(), Logger::discard());
        assert_eq!(session.state(), SessionState::Unopened);
        assert!(matches!(
            session.context_mut("decode"),
            Err(VpxError::SessionState {
                state: SessionState::Unopened,
                ..
            })
        ));

        session.open_with(|engine| engine.init_decoder()).unwrap();
        assert_eq!(session.state(), SessionState::Open);
        assert_eq!(session.error_message(), "Success");

        let again = session.open_with(|engine| engine.init_decoder());
        assert!(matches!(again, Err(VpxError::SessionState { .. })));

        session.close().unwrap();
        session.close().unwrap();
        assert_eq!(session.state(), SessionState::Closed);
        assert!(session.context_mut("decode").is_err());
    }

    #[test]
    fn test_failed_open_stays_unopened() {
        let mut session: CodecSession<dyn DecoderContext> =
            CodecSession::new(&REFUSING, Logger::discard());
        let err = session.open_with(|engine| engine.init_decoder()).unwrap_err();

        assert_eq!(err.status(), Some(Status::Incapable));
        assert_eq!(session.state(), SessionState::Unopened);
        assert_eq!(session.error_message(), Status::Incapable.as_str());
    }

    #[test]
    fn test_close_reports_teardown_failure_and_releases() {
        let destroyed = Arc::new(AtomicUsize::new(0));
        let mut session: CodecSession<dyn EngineContext> =
            CodecSession::new(reference_decoder(), Logger::discard());
        let counter = destroyed.clone();
        session
            .open_with(move |_| {
                Ok(Box::new(TeardownFails { destroyed: counter }) as Box<dyn EngineContext>)
            })
            .unwrap();

        let err = session.close().unwrap_err();
        assert_eq!(err.to_string(), format!("{}: flush failed", Status::Error));
        assert_eq!(session.error_detail(), Some("flush failed"));
        assert_eq!(session.state(), SessionState::Closed);

        // Context is gone: neither a second close nor drop destroys again
        session.close().unwrap();
        drop(session);
        assert_eq!(destroyed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_drop_closes_open_session() {
        let destroyed = Arc::new(AtomicUsize::new(0));
        {
            let mut session: CodecSession<dyn EngineContext> =
                CodecSession::new(reference_decoder(), Logger::discard());
            let counter = destroyed.clone();
            session
                .open_with(move |_| {
                    Ok(Box::new(TeardownFails { destroyed: counter }) as Box<dyn EngineContext>)
                })
                .unwrap();
        }
        assert_eq!(destroyed.load(Ordering::SeqCst), 1);
    }
}
