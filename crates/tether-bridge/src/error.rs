use std::io;

use tether::{Exception, engine::EngineError, session_manager::SessionError};
use thiserror::Error;

/// Failure of a command handler, converted to an error result by the dispatcher.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The script being evaluated raised.
    #[error("{}", .0.message())]
    Script(#[from] Exception),
    /// A required field is missing or has the wrong JSON type.
    #[error("invalid {command} request: {source}")]
    InvalidRequest {
        command: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("failed to encode result: {0}")]
    Encode(#[source] serde_json::Error),
    /// Writing an intermediate result failed.
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl CommandError {
    /// Error class name shown before the message.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Script(exc) => exc.kind().into(),
            Self::InvalidRequest { .. } => "ArgumentError",
            Self::Engine(_) | Self::Encode(_) => "RuntimeError",
            Self::Io(_) => "IOError",
        }
    }

    #[must_use]
    pub fn backtrace(&self) -> Vec<String> {
        match self {
            Self::Script(exc) => exc.backtrace(),
            _ => Vec::new(),
        }
    }
}

/// Handlers answer `NotFound` with their own result before converting.
impl From<SessionError> for CommandError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Launch(exc) => Self::Script(exc),
            SessionError::Engine(err) => Self::Engine(err),
            SessionError::NotFound(_) => Self::Engine(EngineError::Terminated),
        }
    }
}
