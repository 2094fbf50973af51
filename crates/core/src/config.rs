//! Server configuration.
//!
//! [`ServerConfig::default`] reproduces the reference stream exactly: one
//! shared H.264 mount at `/test` on port 8554.

use crate::error::{LaunchError, Result};
use crate::mount::{DEFAULT_MOUNT_PATH, FactoryConfig, MountTable};
use crate::pipeline::PipelineDescription;

pub const DEFAULT_ADDRESS: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8554;
pub const DEFAULT_PUBLIC_HOST: &str = "localhost";

/// When launch descriptions are checked by the media framework.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Validation {
    /// Descriptions are parsed when the first client connects. A broken
    /// description starts fine and only shows up as a logged error then.
    #[default]
    Lazy,
    /// Every description is parsed before the server attaches; a failure
    /// aborts startup.
    Eager,
}

/// Where a mount's launch description comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineSource {
    Described(PipelineDescription),
    /// Used verbatim. Its syntax is not checked here.
    Raw(String),
}

impl Default for PipelineSource {
    fn default() -> Self {
        Self::Described(PipelineDescription::default())
    }
}

impl PipelineSource {
    pub fn launch(&self) -> String {
        match self {
            Self::Described(description) => description.render(),
            Self::Raw(launch) => launch.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountConfig {
    pub path: String,
    pub pipeline: PipelineSource,
    pub shared: bool,
}

impl Default for MountConfig {
    fn default() -> Self {
        Self {
            path: DEFAULT_MOUNT_PATH.to_string(),
            pipeline: PipelineSource::default(),
            shared: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address the RTSP listener binds to.
    pub address: String,
    /// RTSP port. `0` picks an ephemeral port.
    pub port: u16,
    /// Host advertised in stream URLs.
    pub public_host: String,
    pub mounts: Vec<MountConfig>,
    pub validation: Validation,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS.to_string(),
            port: DEFAULT_PORT,
            public_host: DEFAULT_PUBLIC_HOST.to_string(),
            mounts: vec![MountConfig::default()],
            validation: Validation::default(),
        }
    }
}

impl ServerConfig {
    /// Build the mount table.
    ///
    /// Mount paths and builder parameters are checked; raw launch strings
    /// pass through untouched so their syntax is still only judged by the
    /// framework.
    pub fn mount_table(&self) -> Result<MountTable> {
        if self.mounts.is_empty() {
            return Err(LaunchError::NoMounts);
        }

        let table = MountTable::new();
        for mount in &self.mounts {
            if let PipelineSource::Described(description) = &mount.pipeline {
                description.validate()?;
            }
            table.add(
                &mount.path,
                FactoryConfig {
                    launch: mount.pipeline.launch(),
                    shared: mount.shared,
                },
            )?;
        }
        Ok(table)
    }

    /// Stream URL for a mount path, using the given port instead of the
    /// configured one (the bound port differs when `port` is 0).
    pub fn stream_url_on(&self, path: &str, port: u16) -> String {
        format!("rtsp://{}:{}{}", self.public_host, port, path)
    }

    pub fn stream_url(&self, path: &str) -> String {
        self.stream_url_on(path, self.port)
    }

    /// Startup message, one line per mount.
    pub fn readiness_lines(&self, port: u16) -> Vec<String> {
        self.mounts
            .iter()
            .map(|m| format!("RTSP stream ready at {}", self.stream_url_on(&m.path, port)))
            .collect()
    }
}
