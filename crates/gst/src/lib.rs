//! Serves [`rtsp_launch`] mounts with gst-rtsp-server.
//!
//! Each configured mount becomes an `RTSPMediaFactory` built from its launch
//! description. The server attaches to a GLib main context and
//! [`Server::run`] blocks in that context's loop.
//!
//! ```no_run
//! use rtsp_launch::ServerConfig;
//! use rtsp_launch_gst::Server;
//!
//! rtsp_launch_gst::init()?;
//! let mut server = Server::new(ServerConfig::default());
//! server.start()?;
//! for line in server.readiness_lines() {
//!     println!("{line}");
//! }
//! server.run()?;
//! # Ok::<(), rtsp_launch_gst::ServerError>(())
//! ```
//!
//! ## Defaults
//!
//! | Setting    | Value                                       |
//! |------------|---------------------------------------------|
//! | Port       | `8554`                                      |
//! | Mount      | `/test`, shared                             |
//! | Pipeline   | `autovideosrc` → `x264enc` → `rtph264pay`   |
//! | Encoder    | 800 kbit/s, `ultrafast`, `zerolatency`      |
//! | Validation | lazy (on first client request)              |

mod error;
mod factory;
mod server;
pub mod validate;

pub use error::{Result, ServerError};
pub use server::{Server, ShutdownHandle};

/// Initialize GStreamer. Safe to call more than once.
pub fn init() -> Result<()> {
    gst::init().map_err(ServerError::Init)
}
