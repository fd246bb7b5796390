//! User-facing notifications
//!
//! Everything the UI shell needs to redraw is published as a [`UiEvent`]
//! on a broadcast channel.

use crate::connection::ConnectionStatus;
use crate::engine::RecordStatus;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::sync::broadcast;

/// How a notice should be presented
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    /// Short non-blocking message
    Transient,
    /// Must be acknowledged; the session is back to idle or closing
    Blocking,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Transient,
            message: message.into(),
        }
    }

    pub fn blocking(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Blocking,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum UiEvent {
    Notice(Notice),
    /// Bitrate label, `None` clears it
    Bitrate(Option<String>),
    Connection(ConnectionStatus),
    RecordStatus(RecordStatus),
    /// Stream button state
    StreamingChanged(bool),
    /// A finished recording that should be indexed by the media library
    RecordingSaved(PathBuf),
}

pub type UiEventSender = broadcast::Sender<UiEvent>;

pub fn ui_event_channel() -> (UiEventSender, broadcast::Receiver<UiEvent>) {
    broadcast::channel(100)
}

/// Format a bitrate in bits per second as shown next to the preview
pub fn format_bitrate(bitrate_bps: u64) -> String {
    format!("{:.1} mb/s", bitrate_bps as f64 / 1_000_000.0)
}
