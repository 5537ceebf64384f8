//! Lifecycle notifications for the archive manager.
//!
//! Events are fanned out over a `tokio::sync::broadcast` channel, which can be
//! sent to from any thread (including the watcher's) without a runtime.
//! Subscribers that fall behind by more than the channel capacity observe a
//! `Lagged` error and miss the oldest events.

use crate::models::ArchiveMetadata;
use serde::Serialize;
use std::path::PathBuf;
use tokio::sync::broadcast;

/// Buffered events per subscriber
const EVENT_CAPACITY: usize = 256;

/// Something that happened to an archive or to the directory watch.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ArchiveEvent {
    LoadStarted { path: PathBuf },
    LoadCompleted { archive: ArchiveMetadata },
    LoadFailed { path: PathBuf, error: String },
    WatchStarted { dir: PathBuf },
    WatchStopped { dir: PathBuf },
    /// A qualifying archive file appeared in the watched directory
    ArchiveAdded { path: PathBuf },
    /// A qualifying archive file was modified
    ArchiveChanged { path: PathBuf },
    WatchError { error: String },
    /// Retention cleanup deleted an archive
    ArchiveRemoved { archive: ArchiveMetadata },
    /// Retention cleanup failed to delete an archive
    RemoveFailed {
        archive: ArchiveMetadata,
        error: String,
    },
}

impl ArchiveEvent {
    /// Short event name, e.g. `load_started`.
    pub fn name(&self) -> &'static str {
        match self {
            ArchiveEvent::LoadStarted { .. } => "load_started",
            ArchiveEvent::LoadCompleted { .. } => "load_completed",
            ArchiveEvent::LoadFailed { .. } => "load_failed",
            ArchiveEvent::WatchStarted { .. } => "watch_started",
            ArchiveEvent::WatchStopped { .. } => "watch_stopped",
            ArchiveEvent::ArchiveAdded { .. } => "archive_added",
            ArchiveEvent::ArchiveChanged { .. } => "archive_changed",
            ArchiveEvent::WatchError { .. } => "watch_error",
            ArchiveEvent::ArchiveRemoved { .. } => "archive_removed",
            ArchiveEvent::RemoveFailed { .. } => "remove_failed",
        }
    }
}

/// Cloneable sending half shared by the manager and its watcher.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ArchiveEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CAPACITY);
        Self { tx }
    }

    /// Register a new listener. It receives events emitted after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<ArchiveEvent> {
        self.tx.subscribe()
    }

    /// Send an event. Having no subscribers is not an error.
    pub fn emit(&self, event: ArchiveEvent) {
        tracing::trace!(event = event.name(), "archive event");
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_without_subscribers_is_ok() {
        let bus = EventBus::new();
        bus.emit(ArchiveEvent::WatchError {
            error: "nobody listening".to_string(),
        });
    }

    #[test]
    fn test_subscribers_receive_in_order() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();
        bus.emit(ArchiveEvent::ArchiveAdded {
            path: PathBuf::from("a.zip"),
        });
        bus.emit(ArchiveEvent::ArchiveChanged {
            path: PathBuf::from("a.zip"),
        });

        assert_eq!(rx.try_recv().unwrap().name(), "archive_added");
        assert_eq!(rx.try_recv().unwrap().name(), "archive_changed");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_event_serializes_with_tag() {
        let event = ArchiveEvent::LoadFailed {
            path: PathBuf::from("x.zip"),
            error: "boom".to_string(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "load_failed");
        assert_eq!(json["error"], "boom");
    }
}
