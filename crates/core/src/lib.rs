//! Configuration model for a static RTSP test stream.
//!
//! This crate has no media-framework dependency. It describes *what* is
//! served: encoder parameters ([`encoder`]), the launch description handed
//! to the media factory ([`pipeline`]), the mount table ([`mount`]) and the
//! server settings tying them together ([`config`]). Serving is done by the
//! `rtsp-launch-gst` crate.

pub mod config;
pub mod encoder;
pub mod error;
pub mod mount;
pub mod pipeline;

pub use config::{MountConfig, PipelineSource, ServerConfig, Validation};
pub use encoder::{EncoderSettings, SpeedPreset, Tune};
pub use error::{LaunchError, ParseErrorKind, Result};
pub use mount::{FactoryConfig, Mount, MountTable};
pub use pipeline::{LaunchLine, PipelineDescription};
