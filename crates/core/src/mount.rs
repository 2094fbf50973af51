use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{LaunchError, Result};

pub const DEFAULT_MOUNT_PATH: &str = "/test";

/// What the media factory at a mount is built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactoryConfig {
    /// Launch description handed to the factory verbatim.
    pub launch: String,
    /// One pipeline instance for all clients instead of one per client.
    pub shared: bool,
}

/// A URL path bound to one media factory.
#[derive(Debug)]
pub struct Mount {
    path: String,
    factory: FactoryConfig,
}

impl Mount {
    pub fn new(path: &str, factory: FactoryConfig) -> Result<Self> {
        validate_mount_path(path)?;
        Ok(Self {
            path: path.to_string(),
            factory,
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn factory(&self) -> &FactoryConfig {
        &self.factory
    }

    pub fn launch(&self) -> &str {
        &self.factory.launch
    }

    pub fn is_shared(&self) -> bool {
        self.factory.shared
    }
}

/// Registry of mount points, keyed by path.
///
/// Fixed once the server starts; lookups never fall back to another mount,
/// so a request for an unregistered path is answered with 404 by the server.
#[derive(Clone, Default)]
pub struct MountTable {
    mounts: Arc<RwLock<BTreeMap<String, Arc<Mount>>>>,
}

impl MountTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a mount. A second registration at the same path is rejected.
    pub fn add(&self, path: &str, factory: FactoryConfig) -> Result<Arc<Mount>> {
        let mount = Arc::new(Mount::new(path, factory)?);
        let mut mounts = self.mounts.write();
        if mounts.contains_key(path) {
            return Err(LaunchError::DuplicateMount(path.to_string()));
        }
        mounts.insert(path.to_string(), mount.clone());
        tracing::debug!(path, shared = mount.is_shared(), "mount registered");
        Ok(mount)
    }

    pub fn get(&self, path: &str) -> Option<Arc<Mount>> {
        self.mounts.read().get(path).cloned()
    }

    /// Registered paths in sorted order.
    pub fn paths(&self) -> Vec<String> {
        self.mounts.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.mounts.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.mounts.read().is_empty()
    }

    /// Snapshot of all mounts, sorted by path.
    pub fn mounts(&self) -> Vec<Arc<Mount>> {
        self.mounts.read().values().cloned().collect()
    }
}

impl std::fmt::Debug for MountTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MountTable")
            .field("paths", &self.paths())
            .finish()
    }
}

pub fn validate_mount_path(path: &str) -> Result<()> {
    let invalid = |reason| {
        Err(LaunchError::InvalidMountPath {
            path: path.to_string(),
            reason,
        })
    };

    if !path.starts_with('/') {
        return invalid("must start with '/'");
    }
    if path.len() > 1 && path.ends_with('/') {
        return invalid("must not end with '/'");
    }
    if path.chars().any(char::is_whitespace) {
        return invalid("must not contain whitespace");
    }
    if path.contains(['?', '#']) {
        return invalid("must not contain '?' or '#'");
    }
    Ok(())
}
