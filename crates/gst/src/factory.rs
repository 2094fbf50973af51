use gst_rtsp_server::RTSPMediaFactory;
use gst_rtsp_server::prelude::*;

use rtsp_launch::Mount;

/// Build the media factory for a mount.
///
/// The launch description is stored as-is; the framework parses it when a
/// client first asks for the mount. Media lifecycle is logged so that a
/// stream which never prepares is visible in the logs.
pub(crate) fn build(mount: &Mount) -> RTSPMediaFactory {
    let factory = RTSPMediaFactory::new();
    factory.set_launch(mount.launch());
    factory.set_shared(mount.is_shared());

    let path = mount.path().to_string();
    factory.connect_media_configure(move |factory, media| {
        tracing::info!(mount = %path, shared = factory.is_shared(), "media configured");

        let prepared_path = path.clone();
        media.connect_prepared(move |_| {
            tracing::info!(mount = %prepared_path, "media prepared");
        });

        let unprepared_path = path.clone();
        media.connect_unprepared(move |_| {
            tracing::debug!(mount = %unprepared_path, "media unprepared");
        });
    });

    factory
}
