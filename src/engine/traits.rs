//! Engine capability definitions
//!
//! The coordinator never talks to an encoder, muxer or transport directly.
//! Everything it needs from the capture/encode/transport engine is expressed
//! by [`EngineFacade`], and everything the engine reports back arrives as an
//! [`EngineEvent`] on the channel it was handed at construction.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors raised by the engine
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("Engine operation failed: {0}")]
    Operation(String),

    #[error("Unsupported by engine: {0}")]
    Unsupported(String),
}

/// Result type alias using EngineError
pub type EngineResult<T> = Result<T, EngineError>;

/// Video encoder parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoParams {
    pub width: u32,
    pub height: u32,
    pub bitrate_bps: u32,
    pub rotation_degrees: u16,
}

/// Audio encoder parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioParams {
    pub sample_rate_hz: u32,
    pub stereo: bool,
    pub bitrate_bps: u32,
}

/// Size of the surface the preview renders into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurfaceSize {
    pub width: u32,
    pub height: u32,
}

/// Recording progress reported by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Started,
    Recording,
    Paused,
    Resumed,
    Stopped,
}

/// Events delivered by the engine
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    ConnectionStarted(String),
    ConnectionSuccess,
    ConnectionFailed(String),
    Disconnect,
    AuthError,
    AuthSuccess,
    /// New measured bitrate in bits per second
    BitrateChanged(u64),
    RecordStatus(RecordStatus),
}

/// Sending half handed to the engine when it is built
pub type EngineEventSender = mpsc::UnboundedSender<EngineEvent>;

/// Receiving half consumed by the connection monitor
pub type EngineEventReceiver = mpsc::UnboundedReceiver<EngineEvent>;

/// Create the channel an engine reports its events on
pub fn engine_event_channel() -> (EngineEventSender, EngineEventReceiver) {
    mpsc::unbounded_channel()
}

/// Capability surface of the capture/encode/transport engine.
///
/// Implementations are owned exclusively by one
/// [`SessionCoordinator`](crate::session::SessionCoordinator), which is the
/// only caller. `prepare_*` return `Ok(false)` when the engine rejects the
/// parameters and `Err` when the call itself blew up; the coordinator treats
/// both as a failed prepare. The `stop_*` calls must be idempotent.
#[async_trait]
pub trait EngineFacade: Send {
    async fn prepare_video(&mut self, params: VideoParams) -> EngineResult<bool>;

    async fn prepare_audio(&mut self, params: AudioParams) -> EngineResult<bool>;

    async fn start_preview(&mut self, surface: Option<SurfaceSize>) -> EngineResult<()>;

    async fn stop_preview(&mut self) -> EngineResult<()>;

    async fn set_preview_resolution(&mut self, size: SurfaceSize) -> EngineResult<()>;

    async fn start_stream(&mut self, url: &str) -> EngineResult<()>;

    async fn stop_stream(&mut self) -> EngineResult<()>;

    /// Begin writing to `path`; progress arrives as [`EngineEvent::RecordStatus`]
    async fn start_record(&mut self, path: &Path) -> EngineResult<()>;

    async fn stop_record(&mut self) -> EngineResult<()>;

    async fn switch_camera(&mut self) -> EngineResult<()> {
        Err(EngineError::Unsupported("camera switching".to_string()))
    }

    /// Free every resource. The engine must be prepared again before reuse.
    async fn release(&mut self) -> EngineResult<()>;
}
