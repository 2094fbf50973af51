//! Eager launch-description checks.
//!
//! Only used with [`Validation::Eager`](rtsp_launch::Validation::Eager).
//! By default descriptions are left for the media factory to parse when the
//! first client connects.

use rtsp_launch::{LaunchLine, Mount};

use crate::error::{Result, ServerError};

/// Factory names from `line` that have no registered element factory.
pub fn missing_elements(line: &LaunchLine) -> Vec<String> {
    line.factory_names()
        .into_iter()
        .filter(|name| gst::ElementFactory::find(name).is_none())
        .map(str::to_string)
        .collect()
}

/// Parse a description with the framework and discard the result.
pub fn validate_launch(mount: &str, launch: &str) -> Result<()> {
    gst::parse::launch(launch)
        .map(drop)
        .map_err(|source| ServerError::InvalidPipeline {
            mount: mount.to_string(),
            source,
        })
}

/// Full check of one mount: structure, payloader naming, installed
/// elements, then a framework parse.
pub fn validate_mount(mount: &Mount) -> Result<()> {
    let line = LaunchLine::parse(mount.launch())?;
    line.check_payloaders()?;

    let missing = missing_elements(&line);
    if !missing.is_empty() {
        return Err(ServerError::MissingElements {
            mount: mount.path().to_string(),
            elements: missing,
        });
    }

    validate_launch(mount.path(), mount.launch())?;
    tracing::debug!(mount = mount.path(), "launch description validated");
    Ok(())
}
