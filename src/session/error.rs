//! Session error types

use crate::engine::EngineError;
use thiserror::Error;

/// Errors raised while building or applying a configuration
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    /// The engine refused the configuration. The hosting session should
    /// be terminated; prepare is never retried automatically.
    #[error("Audio or video configuration failed: {0}")]
    PrepareFailed(String),
}

/// Errors raised when an operation is not allowed in the current state
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateError {
    #[error("Session is not prepared")]
    NotReady,

    #[error("Output surface is not ready")]
    SurfaceNotReady,

    #[error("Another reconfiguration is in progress")]
    Busy,

    #[error("Session has been released")]
    Released,
}

/// Any error returned by the session coordinator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    State(#[from] StateError),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl SessionError {
    /// Whether the hosting session has to be torn down
    pub fn is_fatal(&self) -> bool {
        matches!(self, SessionError::Config(ConfigError::PrepareFailed(_)))
    }
}

/// Result type alias using SessionError
pub type SessionResult<T> = Result<T, SessionError>;
