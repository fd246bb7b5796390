//! Error types and handling
//!
//! Common error types used by the UI shell.

use crate::engine::EngineError;
use crate::session::{ConfigError, SessionError, StateError};
use crate::settings::SettingsError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),
}

/// Error response for the UI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    /// The hosting session cannot continue
    pub fatal: bool,
}

impl From<AppError> for ErrorResponse {
    fn from(error: AppError) -> Self {
        let code = match &error {
            AppError::Io(_) => "IO_ERROR",
            AppError::Settings(_) => "SETTINGS_ERROR",
            AppError::Session(SessionError::Config(ConfigError::Invalid(_))) => "INVALID_CONFIG",
            AppError::Session(SessionError::Config(ConfigError::PrepareFailed(_))) => {
                "PREPARE_FAILED"
            }
            AppError::Session(SessionError::State(StateError::NotReady)) => "NOT_READY",
            AppError::Session(SessionError::State(StateError::SurfaceNotReady)) => {
                "SURFACE_NOT_READY"
            }
            AppError::Session(SessionError::State(StateError::Busy)) => "BUSY",
            AppError::Session(SessionError::State(StateError::Released)) => "RELEASED",
            AppError::Session(SessionError::Engine(EngineError::Operation(_))) => "ENGINE_ERROR",
            AppError::Session(SessionError::Engine(EngineError::Unsupported(_))) => "UNSUPPORTED",
            AppError::PermissionDenied(_) => "PERMISSION_DENIED",
        };
        let fatal = match &error {
            AppError::Session(e) => e.is_fatal(),
            AppError::PermissionDenied(_) => true,
            _ => false,
        };

        ErrorResponse {
            code: code.to_string(),
            message: error.to_string(),
            fatal,
        }
    }
}

impl From<SessionError> for ErrorResponse {
    fn from(error: SessionError) -> Self {
        AppError::from(error).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prepare_failure_is_fatal() {
        let response: ErrorResponse =
            SessionError::from(ConfigError::PrepareFailed("audio rejected".to_string())).into();
        assert_eq!(response.code, "PREPARE_FAILED");
        assert!(response.fatal);
        assert!(response.message.contains("audio rejected"));
    }

    #[test]
    fn test_state_errors_are_recoverable() {
        let response: ErrorResponse = SessionError::from(StateError::Busy).into();
        assert_eq!(response.code, "BUSY");
        assert!(!response.fatal);
    }
}
