//! Archive lifecycle management.
//!
//! [`ArchiveManager`] composes the stateless [`catalog`] with the [`unpack`]
//! step, remembers which archives were loaded in this process, optionally
//! watches the archive directory, and enforces the retention policy.
//!
//! ## Unpack layout
//!
//! A compressed archive `<dir>/<id>.<ext>` unpacks into `<unpack_dir>/<id>/`.
//! The target is deterministic, so an existing directory is reused rather than
//! re-extracted.
//!
//! ## Notifications
//!
//! Every lifecycle step is announced on the manager's [`EventBus`]; call
//! [`ArchiveManager::subscribe`] to receive them.

pub mod catalog;
pub mod events;
pub mod unpack;
pub mod watcher;

pub use events::{ArchiveEvent, EventBus};
pub use watcher::DirectoryWatch;

use crate::models::ArchiveMetadata;
use crate::{Error, Result};
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tokio::sync::broadcast;

/// Settings for an [`ArchiveManager`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagerConfig {
    /// Directory scanned for archives
    pub archive_dir: PathBuf,
    /// Root under which compressed archives are unpacked
    pub unpack_dir: PathBuf,
    /// Unpack compressed archives on load
    pub auto_unpack: bool,
    /// Watch `archive_dir` as soon as the manager is created
    pub watch: bool,
    /// Keep unpacked directories when retention deletes their archive
    pub keep_unpacked: bool,
    /// Retain at most this many archives
    pub max_archives: Option<usize>,
}

impl ManagerConfig {
    pub fn new(archive_dir: impl Into<PathBuf>, unpack_dir: impl Into<PathBuf>) -> Self {
        Self {
            archive_dir: archive_dir.into(),
            unpack_dir: unpack_dir.into(),
            auto_unpack: true,
            watch: false,
            keep_unpacked: true,
            max_archives: None,
        }
    }
}

/// Outcome of a retention pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CleanupReport {
    /// Archives that were kept
    pub kept: usize,
    /// Archives deleted (with their unpacked directory when applicable)
    pub removed: Vec<ArchiveMetadata>,
    /// Archives that could not be deleted, with the error message
    pub failed: Vec<(ArchiveMetadata, String)>,
}

/// Discovers, loads, watches and retires archives.
pub struct ArchiveManager {
    config: ManagerConfig,
    registry: HashMap<String, ArchiveMetadata>,
    bus: EventBus,
    watch: Option<DirectoryWatch>,
}

impl ArchiveManager {
    /// Create a manager. Starts watching immediately if `config.watch` is set.
    pub fn new(config: ManagerConfig) -> Result<Self> {
        let mut manager = Self {
            config,
            registry: HashMap::new(),
            bus: EventBus::new(),
            watch: None,
        };
        if manager.config.watch {
            manager.watch()?;
        }
        Ok(manager)
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// Replace the configuration, restarting or stopping the watch to match.
    pub fn reconfigure(&mut self, config: ManagerConfig) -> Result<()> {
        let dir_changed = config.archive_dir != self.config.archive_dir;
        self.config = config;
        if dir_changed || !self.config.watch {
            self.unwatch();
        }
        if self.config.watch {
            self.watch()?;
        }
        Ok(())
    }

    /// Listen for lifecycle events emitted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<ArchiveEvent> {
        self.bus.subscribe()
    }

    /// List archives in `dir` (default: the configured archive directory), newest first.
    pub fn list(&self, dir: Option<&Path>) -> Result<Vec<ArchiveMetadata>> {
        let dir = dir.unwrap_or(&self.config.archive_dir);
        let archives = catalog::list(dir)?;
        Ok(archives
            .into_iter()
            .map(|archive| {
                let target = self.unpack_target(&archive);
                if archive.is_compressed() && target.is_dir() {
                    archive.with_unpacked_path(target)
                } else {
                    archive
                }
            })
            .collect())
    }

    /// Where a compressed archive is unpacked.
    pub fn unpack_target(&self, archive: &ArchiveMetadata) -> PathBuf {
        self.config.unpack_dir.join(&archive.id)
    }

    /// Load an archive, unpacking it first when auto-unpack is enabled.
    pub fn load(&mut self, path: &Path) -> Result<ArchiveMetadata> {
        let unpack = self.config.auto_unpack;
        self.load_with(path, unpack)
    }

    /// Load an archive with an explicit unpack choice.
    ///
    /// Emits `LoadStarted`, then `LoadCompleted` or `LoadFailed`. A failed load
    /// leaves the registry unchanged.
    pub fn load_with(&mut self, path: &Path, unpack: bool) -> Result<ArchiveMetadata> {
        self.bus.emit(ArchiveEvent::LoadStarted {
            path: path.to_path_buf(),
        });

        match self.load_inner(path, unpack) {
            Ok(archive) => {
                tracing::info!(id = %archive.id, path = %archive.path.display(), "archive loaded");
                self.registry.insert(archive.id.clone(), archive.clone());
                self.bus.emit(ArchiveEvent::LoadCompleted {
                    archive: archive.clone(),
                });
                Ok(archive)
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "archive load failed");
                self.bus.emit(ArchiveEvent::LoadFailed {
                    path: path.to_path_buf(),
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    fn load_inner(&self, path: &Path, unpack: bool) -> Result<ArchiveMetadata> {
        let path = std::path::absolute(path)?;
        let stats = fs::metadata(&path)?;
        if !stats.is_file() {
            return Err(Error::InvalidInput(format!(
                "{} is not an archive file",
                path.display()
            )));
        }
        let archive = catalog::describe(&path, stats.len()).ok_or_else(|| {
            Error::InvalidInput(format!("{} is not a recognized archive", path.display()))
        })?;

        if !(archive.is_compressed() && unpack) {
            return Ok(archive);
        }

        let target = self.unpack_target(&archive);
        if let Some(owner) = self
            .registry
            .values()
            .find(|a| a.unpacked_path.as_ref() == Some(&target) && a.path != archive.path)
        {
            return Err(Error::InvalidInput(format!(
                "unpack directory {} already belongs to {}",
                target.display(),
                owner.path.display()
            )));
        }

        unpack::ensure_unpacked(&archive.path, &target)?;
        Ok(archive.with_unpacked_path(target))
    }

    /// Load the archive with the given id from the archive directory.
    pub fn load_by_id(&mut self, id: &str) -> Result<ArchiveMetadata> {
        let archive = self
            .list(None)?
            .into_iter()
            .find(|a| a.id == id)
            .ok_or_else(|| Error::NotFound(format!("Archive not found: {}", id)))?;
        self.load(&archive.path)
    }

    /// Load the newest archive in the archive directory.
    pub fn load_latest(&mut self) -> Result<ArchiveMetadata> {
        let latest = self.list(None)?.into_iter().next().ok_or_else(|| {
            Error::NotFound(format!(
                "No archives found in {}",
                self.config.archive_dir.display()
            ))
        })?;
        self.load(&latest.path)
    }

    /// Metadata for `id`: the loaded record if any, otherwise a fresh catalog scan.
    pub fn metadata(&self, id: &str) -> Result<Option<ArchiveMetadata>> {
        if let Some(archive) = self.registry.get(id) {
            return Ok(Some(archive.clone()));
        }
        Ok(self.list(None)?.into_iter().find(|a| a.id == id))
    }

    /// Archives loaded so far in this process.
    pub fn loaded(&self) -> impl Iterator<Item = &ArchiveMetadata> {
        self.registry.values()
    }

    /// Start watching the archive directory. A second call is a no-op.
    pub fn watch(&mut self) -> Result<()> {
        if self.watch.is_some() {
            return Ok(());
        }
        let watch = DirectoryWatch::start(&self.config.archive_dir, self.bus.clone())?;
        tracing::info!(dir = %watch.dir().display(), "watching archive directory");
        self.bus.emit(ArchiveEvent::WatchStarted {
            dir: watch.dir().to_path_buf(),
        });
        self.watch = Some(watch);
        Ok(())
    }

    /// Stop watching and release the underlying watch.
    pub fn unwatch(&mut self) {
        if let Some(watch) = self.watch.take() {
            let dir = watch.dir().to_path_buf();
            drop(watch);
            self.bus.emit(ArchiveEvent::WatchStopped { dir });
        }
    }

    pub fn is_watching(&self) -> bool {
        self.watch.is_some()
    }

    /// Delete the oldest archives beyond `max_archives`.
    ///
    /// Unpacked directories go too unless `keep_unpacked` is set. Each
    /// deletion is independent: a failure is reported and the pass continues.
    pub fn cleanup_old_archives(&mut self) -> Result<CleanupReport> {
        let Some(max) = self.config.max_archives else {
            return Ok(CleanupReport::default());
        };
        let archives = self.list(None)?;
        if archives.len() <= max {
            return Ok(CleanupReport {
                kept: archives.len(),
                ..Default::default()
            });
        }

        let mut report = CleanupReport {
            kept: max,
            ..Default::default()
        };
        for archive in archives.into_iter().skip(max) {
            match self.remove_archive(&archive) {
                Ok(()) => {
                    tracing::info!(id = %archive.id, "removed old archive");
                    self.registry.remove(&archive.id);
                    self.bus.emit(ArchiveEvent::ArchiveRemoved {
                        archive: archive.clone(),
                    });
                    report.removed.push(archive);
                }
                Err(e) => {
                    tracing::warn!(id = %archive.id, error = %e, "failed to remove old archive");
                    // The unpacked directory may be gone even though the file stayed
                    if let Some(record) = self
                        .registry
                        .get_mut(&archive.id)
                        .filter(|r| r.unpacked_path.as_ref().is_some_and(|d| !d.exists()))
                    {
                        record.unpacked_path = None;
                    }
                    self.bus.emit(ArchiveEvent::RemoveFailed {
                        archive: archive.clone(),
                        error: e.to_string(),
                    });
                    report.failed.push((archive, e.to_string()));
                }
            }
        }
        Ok(report)
    }

    /// The unpacked directory goes first so a failure leaves the archive file
    /// (and its registry entry) in place.
    fn remove_archive(&self, archive: &ArchiveMetadata) -> Result<()> {
        if !self.config.keep_unpacked {
            let target = archive
                .unpacked_path
                .clone()
                .unwrap_or_else(|| self.unpack_target(archive));
            if target.exists() {
                fs::remove_dir_all(&target)?;
            }
        }
        fs::remove_file(&archive.path)?;
        Ok(())
    }
}

impl Drop for ArchiveManager {
    fn drop(&mut self) {
        self.unwatch();
    }
}
