//! H.264 encoder parameters.
//!
//! The stream is encoded by `x264enc`. Only the three knobs the server
//! exposes are modelled here: target bitrate, speed preset and tuning
//! profile. Everything else is left at the element's defaults.

use std::fmt;
use std::str::FromStr;

use crate::error::{LaunchError, Result};

/// Upper bound of x264enc's `bitrate` property, in kbit/s.
pub const MAX_BITRATE_KBPS: u32 = 2_048_000;

pub const DEFAULT_BITRATE_KBPS: u32 = 800;

/// x264 `speed-preset`, fastest first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SpeedPreset {
    #[default]
    Ultrafast,
    Superfast,
    Veryfast,
    Faster,
    Fast,
    Medium,
    Slow,
    Slower,
    Veryslow,
    Placebo,
}

impl SpeedPreset {
    pub const ALL: [SpeedPreset; 10] = [
        Self::Ultrafast,
        Self::Superfast,
        Self::Veryfast,
        Self::Faster,
        Self::Fast,
        Self::Medium,
        Self::Slow,
        Self::Slower,
        Self::Veryslow,
        Self::Placebo,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ultrafast => "ultrafast",
            Self::Superfast => "superfast",
            Self::Veryfast => "veryfast",
            Self::Faster => "faster",
            Self::Fast => "fast",
            Self::Medium => "medium",
            Self::Slow => "slow",
            Self::Slower => "slower",
            Self::Veryslow => "veryslow",
            Self::Placebo => "placebo",
        }
    }
}

impl fmt::Display for SpeedPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SpeedPreset {
    type Err = LaunchError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| LaunchError::UnknownOption {
                what: "speed preset",
                value: s.to_string(),
            })
    }
}

/// x264 `tune` profile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Tune {
    #[default]
    Zerolatency,
    Fastdecode,
    Stillimage,
    Film,
    Animation,
    Grain,
    Psnr,
    Ssim,
}

impl Tune {
    pub const ALL: [Tune; 8] = [
        Self::Zerolatency,
        Self::Fastdecode,
        Self::Stillimage,
        Self::Film,
        Self::Animation,
        Self::Grain,
        Self::Psnr,
        Self::Ssim,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Zerolatency => "zerolatency",
            Self::Fastdecode => "fastdecode",
            Self::Stillimage => "stillimage",
            Self::Film => "film",
            Self::Animation => "animation",
            Self::Grain => "grain",
            Self::Psnr => "psnr",
            Self::Ssim => "ssim",
        }
    }
}

impl fmt::Display for Tune {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tune {
    type Err = LaunchError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| LaunchError::UnknownOption {
                what: "tune",
                value: s.to_string(),
            })
    }
}

/// Parameters rendered onto the `x264enc` element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderSettings {
    /// Target bitrate in kbit/s.
    pub bitrate_kbps: u32,
    pub preset: SpeedPreset,
    pub tune: Tune,
}

impl Default for EncoderSettings {
    fn default() -> Self {
        Self {
            bitrate_kbps: DEFAULT_BITRATE_KBPS,
            preset: SpeedPreset::default(),
            tune: Tune::default(),
        }
    }
}

impl EncoderSettings {
    pub fn validate(&self) -> Result<()> {
        if self.bitrate_kbps == 0 || self.bitrate_kbps > MAX_BITRATE_KBPS {
            return Err(LaunchError::InvalidBitrate(self.bitrate_kbps));
        }
        Ok(())
    }

    /// The encoder element as it appears in a launch description.
    pub fn element(&self) -> String {
        format!(
            "x264enc tune={} bitrate={} speed-preset={}",
            self.tune, self.bitrate_kbps, self.preset
        )
    }
}
