use gst::glib;
use rtsp_launch::LaunchError;

/// Errors from bringing the RTSP server up.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// `gst::init` failed.
    #[error("GStreamer initialization failed: {0}")]
    Init(#[source] glib::Error),

    /// The configuration was rejected before touching the framework.
    #[error(transparent)]
    Config(#[from] LaunchError),

    /// The server returned no mount-point registry.
    #[error("RTSP server has no mount points")]
    NoMountPoints,

    /// Binding the listener or attaching it to the main context failed,
    /// typically because the port is already in use.
    #[error("failed to attach RTSP server: {0}")]
    Attach(#[from] glib::BoolError),

    /// Eager validation: the framework could not parse a launch description.
    #[error("invalid pipeline for mount {mount}: {source}")]
    InvalidPipeline {
        mount: String,
        #[source]
        source: glib::Error,
    },

    /// Eager validation: element factories named in a description are not
    /// installed.
    #[error("missing elements for mount {mount}: {}", .elements.join(", "))]
    MissingElements { mount: String, elements: Vec<String> },

    /// [`Server::start`](crate::Server::start) was called while already running.
    #[error("server already running")]
    AlreadyRunning,

    /// [`Server::run`](crate::Server::run) was called before `start`.
    #[error("server not started")]
    NotStarted,
}

pub type Result<T> = std::result::Result<T, ServerError>;
