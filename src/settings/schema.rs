//! Settings schema
//!
//! Persisted defaults for the capture parameters, retry policy, recordings
//! location and logging. Every field has a default so partial files load.

use crate::connection::retry::{DEFAULT_BACKOFF_MS, DEFAULT_MAX_ATTEMPTS};
use crate::connection::ConnectionRetryPolicy;
use crate::session::{ConfigError, CoordinatorOptions, Orientation, SessionConfig};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VideoSettings {
    pub width: u32,
    pub height: u32,
    pub bitrate_bps: u32,
}

impl Default for VideoSettings {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            bitrate_bps: 1200 * 1000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AudioSettings {
    pub sample_rate_hz: u32,
    pub stereo: bool,
    pub bitrate_bps: u32,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            sample_rate_hz: 32000,
            stereo: true,
            bitrate_bps: 128 * 1000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RetrySettings {
    /// Connection attempts including the first one
    pub max_attempts: u32,
    pub backoff_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_ms: DEFAULT_BACKOFF_MS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StreamerSettings {
    pub video: VideoSettings,
    pub audio: AudioSettings,
    pub retry: RetrySettings,
    /// Where recordings are written
    pub recordings_dir: PathBuf,
    /// Start preview as soon as a surface is available
    pub preview_on_surface: bool,
    /// Default `tracing` filter when `RUST_LOG` is unset
    pub log_filter: String,
}

impl Default for StreamerSettings {
    fn default() -> Self {
        Self {
            video: VideoSettings::default(),
            audio: AudioSettings::default(),
            retry: RetrySettings::default(),
            recordings_dir: default_recordings_dir(),
            preview_on_surface: true,
            log_filter: "rotation_streamer=debug".to_string(),
        }
    }
}

/// `$HOME/Movies/Streamer`, or `Movies/Streamer` relative to the working
/// directory when there is no home
pub fn default_recordings_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_default()
        .join("Movies")
        .join("Streamer")
}

impl StreamerSettings {
    /// Build the configuration for the given orientation
    pub fn session_config(&self, orientation: Orientation) -> Result<SessionConfig, ConfigError> {
        SessionConfig::new(
            self.video.width,
            self.video.height,
            self.video.bitrate_bps,
            orientation.rotation().degrees(),
            self.audio.sample_rate_hz,
            self.audio.stereo,
            self.audio.bitrate_bps,
        )
    }

    pub fn retry_policy(&self) -> ConnectionRetryPolicy {
        ConnectionRetryPolicy::new(
            self.retry.max_attempts,
            Duration::from_millis(self.retry.backoff_ms),
        )
    }

    pub fn coordinator_options(&self) -> CoordinatorOptions {
        CoordinatorOptions {
            preview_on_surface: self.preview_on_surface,
        }
    }

    /// Check the values that cannot be caught by deserialization alone
    pub fn validate(&self) -> Result<(), String> {
        self.session_config(Orientation::Landscape)
            .map_err(|e| e.to_string())?;
        if self.retry.max_attempts == 0 {
            return Err("retry.maxAttempts must be at least 1".to_string());
        }
        Ok(())
    }
}
