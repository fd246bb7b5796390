//! Session configuration
//!
//! A [`SessionConfig`] describes the capture and encode parameters for one
//! prepare cycle. It is validated on construction and never mutated; a
//! reconfigure hands the coordinator a whole new value.

use super::error::ConfigError;
use crate::engine::{AudioParams, VideoParams};
use serde::{Deserialize, Serialize};

/// Output rotation in degrees
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub enum Rotation {
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    pub fn degrees(self) -> u16 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 90,
            Rotation::Deg180 => 180,
            Rotation::Deg270 => 270,
        }
    }

    /// Whether the encoded frame is transposed relative to the capture size
    pub fn is_transposed(self) -> bool {
        matches!(self, Rotation::Deg90 | Rotation::Deg270)
    }
}

impl Default for Rotation {
    fn default() -> Self {
        Self::Deg0
    }
}

impl TryFrom<u16> for Rotation {
    type Error = ConfigError;

    fn try_from(degrees: u16) -> Result<Self, Self::Error> {
        match degrees {
            0 => Ok(Rotation::Deg0),
            90 => Ok(Rotation::Deg90),
            180 => Ok(Rotation::Deg180),
            270 => Ok(Rotation::Deg270),
            other => Err(ConfigError::Invalid(format!(
                "rotation must be 0, 90, 180 or 270, got {}",
                other
            ))),
        }
    }
}

impl From<Rotation> for u16 {
    fn from(rotation: Rotation) -> Self {
        rotation.degrees()
    }
}

/// Orientation requested by the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    /// Stream keeps the configured width x height
    Landscape,
    /// Stream is rotated 90 degrees, so 640x480 becomes 480x640
    Portrait,
}

impl Orientation {
    pub fn from_vertical(is_vertical: bool) -> Self {
        if is_vertical {
            Orientation::Portrait
        } else {
            Orientation::Landscape
        }
    }

    pub fn rotation(self) -> Rotation {
        match self {
            Orientation::Landscape => Rotation::Deg0,
            Orientation::Portrait => Rotation::Deg90,
        }
    }
}

/// Capture and encode parameters for one prepare cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawSessionConfig")]
pub struct SessionConfig {
    width: u32,
    height: u32,
    video_bitrate_bps: u32,
    rotation: Rotation,
    sample_rate_hz: u32,
    stereo: bool,
    audio_bitrate_bps: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSessionConfig {
    width: u32,
    height: u32,
    video_bitrate_bps: u32,
    rotation: Rotation,
    sample_rate_hz: u32,
    stereo: bool,
    audio_bitrate_bps: u32,
}

impl TryFrom<RawSessionConfig> for SessionConfig {
    type Error = ConfigError;

    fn try_from(raw: RawSessionConfig) -> Result<Self, Self::Error> {
        SessionConfig::new(
            raw.width,
            raw.height,
            raw.video_bitrate_bps,
            raw.rotation.degrees(),
            raw.sample_rate_hz,
            raw.stereo,
            raw.audio_bitrate_bps,
        )
    }
}

impl SessionConfig {
    /// Build a validated configuration
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        width: u32,
        height: u32,
        video_bitrate_bps: u32,
        rotation_degrees: u16,
        sample_rate_hz: u32,
        stereo: bool,
        audio_bitrate_bps: u32,
    ) -> Result<Self, ConfigError> {
        let rotation = Rotation::try_from(rotation_degrees)?;

        let positive = [
            ("width", width),
            ("height", height),
            ("videoBitrateBps", video_bitrate_bps),
            ("sampleRateHz", sample_rate_hz),
            ("audioBitrateBps", audio_bitrate_bps),
        ];
        if let Some((name, _)) = positive.iter().find(|(_, value)| *value == 0) {
            return Err(ConfigError::Invalid(format!("{} must be positive", name)));
        }

        Ok(Self {
            width,
            height,
            video_bitrate_bps,
            rotation,
            sample_rate_hz,
            stereo,
            audio_bitrate_bps,
        })
    }

    /// Same parameters with a different rotation
    pub fn with_rotation(self, rotation: Rotation) -> Self {
        Self { rotation, ..self }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    pub fn video_bitrate_bps(&self) -> u32 {
        self.video_bitrate_bps
    }

    pub fn audio_bitrate_bps(&self) -> u32 {
        self.audio_bitrate_bps
    }

    /// Combined audio and video bitrate, the ceiling for bitrate adaptation
    pub fn max_bitrate_bps(&self) -> u64 {
        u64::from(self.video_bitrate_bps) + u64::from(self.audio_bitrate_bps)
    }

    /// Resolution of the produced stream or file after rotation
    pub fn output_resolution(&self) -> (u32, u32) {
        if self.rotation.is_transposed() {
            (self.height, self.width)
        } else {
            (self.width, self.height)
        }
    }

    pub fn video(&self) -> VideoParams {
        VideoParams {
            width: self.width,
            height: self.height,
            bitrate_bps: self.video_bitrate_bps,
            rotation_degrees: self.rotation.degrees(),
        }
    }

    pub fn audio(&self) -> AudioParams {
        AudioParams {
            sample_rate_hz: self.sample_rate_hz,
            stereo: self.stereo,
            bitrate_bps: self.audio_bitrate_bps,
        }
    }
}
