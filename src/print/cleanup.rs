//! Temp file lifecycle for print jobs.
//!
//! Every HTML file written for a render surface is registered here and
//! removed exactly once: explicitly when the job settles, or on drop if
//! the job unwound before reaching its cleanup step.

use lazy_static::lazy_static;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempPath;

lazy_static! {
    static ref GLOBAL_REGISTRY: Arc<TempFileRegistry> = Arc::new(TempFileRegistry::new());
}

/// Set of temp files that still await deletion.
#[derive(Debug, Default)]
pub struct TempFileRegistry {
    paths: Mutex<HashSet<PathBuf>>,
}

impl TempFileRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide registry used by the server.
    pub fn global() -> Arc<TempFileRegistry> {
        GLOBAL_REGISTRY.clone()
    }

    fn register(&self, path: PathBuf) {
        self.paths.lock().insert(path);
    }

    fn unregister(&self, path: &Path) -> bool {
        self.paths.lock().remove(path)
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.paths.lock().contains(path)
    }

    pub fn pending(&self) -> Vec<PathBuf> {
        self.paths.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.paths.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.lock().is_empty()
    }
}

/// A registered temp file owned by exactly one job.
#[derive(Debug)]
pub struct TrackedTempFile {
    temp: Option<TempPath>,
    location: PathBuf,
    registry: Arc<TempFileRegistry>,
}

impl TrackedTempFile {
    pub fn track(temp: TempPath, registry: Arc<TempFileRegistry>) -> Self {
        let location = temp.to_path_buf();
        registry.register(location.clone());
        log::debug!("Tracking print temp file {}", location.display());
        Self {
            temp: Some(temp),
            location,
            registry,
        }
    }

    pub fn path(&self) -> &Path {
        &self.location
    }

    /// Delete the file and drop it from the registry.
    ///
    /// The entry is unregistered before the first await; a dropped release
    /// future still deletes the file on the blocking pool.
    pub async fn release(mut self) {
        let Some(temp) = self.temp.take() else {
            return;
        };
        self.registry.unregister(&self.location);

        match tokio::task::spawn_blocking(move || temp.close()).await {
            Ok(Ok(())) => log::debug!("Removed print temp file {}", self.location.display()),
            Ok(Err(e)) => log::warn!(
                "Failed to remove print temp file {}: {}",
                self.location.display(),
                e
            ),
            Err(e) => log::warn!(
                "Temp file cleanup task for {} did not complete: {}",
                self.location.display(),
                e
            ),
        }
    }
}

impl Drop for TrackedTempFile {
    fn drop(&mut self) {
        if let Some(temp) = self.temp.take() {
            if let Err(e) = temp.close() {
                log::warn!(
                    "Failed to remove print temp file {} on drop: {}",
                    self.location.display(),
                    e
                );
            }
            self.registry.unregister(&self.location);
        }
    }
}
