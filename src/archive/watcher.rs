//! File system watcher for the archive directory.
//!
//! The `notify` callback runs on the watcher's own thread; it only classifies
//! events and forwards them to the [`EventBus`]. Anything heavier (such as
//! loading a new archive) belongs to the subscriber.

use super::events::{ArchiveEvent, EventBus};
use crate::Result;
use crate::models::ArchiveFormat;
use notify::event::{ModifyKind, RenameMode};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};

/// An active, non-recursive watch. Dropping it releases the OS watch.
pub struct DirectoryWatch {
    dir: PathBuf,
    _watcher: RecommendedWatcher,
}

impl DirectoryWatch {
    /// Start watching `dir`, forwarding qualifying file events to `bus`.
    pub fn start(dir: &Path, bus: EventBus) -> Result<Self> {
        let callback_bus = bus.clone();
        let mut watcher = RecommendedWatcher::new(
            move |res: std::result::Result<Event, notify::Error>| match res {
                Ok(event) => {
                    for archive_event in classify(&event) {
                        callback_bus.emit(archive_event);
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "archive watch error");
                    callback_bus.emit(ArchiveEvent::WatchError {
                        error: e.to_string(),
                    });
                }
            },
            Config::default(),
        )?;
        watcher.watch(dir, RecursiveMode::NonRecursive)?;

        Ok(Self {
            dir: dir.to_path_buf(),
            _watcher: watcher,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

/// Translate a raw notify event into archive events.
///
/// Creation (or a rename into the directory) is an addition; any other
/// modification is a change. Dotfiles and non-archive files are ignored.
pub fn classify(event: &Event) -> Vec<ArchiveEvent> {
    let added = match event.kind {
        EventKind::Create(_) | EventKind::Modify(ModifyKind::Name(RenameMode::To)) => true,
        EventKind::Modify(ModifyKind::Name(_)) => return Vec::new(),
        EventKind::Modify(_) => false,
        _ => return Vec::new(),
    };

    event
        .paths
        .iter()
        .filter(|p| is_archive_candidate(p))
        .map(|p| {
            let path = p.clone();
            if added {
                ArchiveEvent::ArchiveAdded { path }
            } else {
                ArchiveEvent::ArchiveChanged { path }
            }
        })
        .collect()
}

fn is_archive_candidate(path: &Path) -> bool {
    match path.file_name().and_then(|n| n.to_str()) {
        Some(name) => !name.starts_with('.') && ArchiveFormat::detect(name).is_some(),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, DataChange};

    fn event(kind: EventKind, path: &str) -> Event {
        Event::new(kind).add_path(PathBuf::from(path))
    }

    #[test]
    fn test_create_is_added() {
        let events = classify(&event(
            EventKind::Create(CreateKind::File),
            "/backups/b-2024-01-01.zip",
        ));
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].name(), "archive_added");
    }

    #[test]
    fn test_modify_is_changed() {
        let events = classify(&event(
            EventKind::Modify(ModifyKind::Data(DataChange::Content)),
            "/backups/All-Data.json",
        ));
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].name(), "archive_changed");
    }

    #[test]
    fn test_rename_into_directory_is_added() {
        let events = classify(&event(
            EventKind::Modify(ModifyKind::Name(RenameMode::To)),
            "/backups/new.tar.gz",
        ));
        assert_eq!(events[0].name(), "archive_added");
    }

    #[test]
    fn test_ignores_dotfiles_and_other_files() {
        let create = EventKind::Create(CreateKind::File);
        assert!(classify(&event(create, "/backups/.partial.zip")).is_empty());
        assert!(classify(&event(create, "/backups/readme.md")).is_empty());
        let remove = EventKind::Remove(notify::event::RemoveKind::File);
        assert!(classify(&event(remove, "/backups/a.zip")).is_empty());
    }

    #[test]
    fn test_watch_reports_new_archive() {
        let dir = tempfile::TempDir::new().unwrap();
        let bus = EventBus::new();
        let mut rx = bus.subscribe();
        let watch = DirectoryWatch::start(dir.path(), bus).unwrap();
        assert_eq!(watch.dir(), dir.path());

        std::fs::write(dir.path().join("backup-2024-05-01.zip"), b"data").unwrap();

        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
        let mut seen = false;
        while std::time::Instant::now() < deadline && !seen {
            match rx.try_recv() {
                Ok(ArchiveEvent::ArchiveAdded { path }) | Ok(ArchiveEvent::ArchiveChanged { path }) => {
                    seen = path.ends_with("backup-2024-05-01.zip");
                }
                Ok(_) => {}
                Err(_) => std::thread::sleep(std::time::Duration::from_millis(20)),
            }
        }
        assert!(seen, "expected an event for the new archive");
    }
}
