//! Boardvault - archive manager and query engine for whiteboard knowledge-base backups.
//!
//! This library provides the core functionality for the `bv` CLI tool:
//! discovering, unpacking, watching and retiring backup archives, loading
//! their boards, cards, placements and connections into memory, and answering
//! search, relationship and spatial queries over them.

pub mod analysis;
pub mod archive;
pub mod cli;
pub mod commands;
pub mod config;
pub mod export;
pub mod models;
pub mod query;
pub mod render;
pub mod store;

use std::path::PathBuf;

/// Test utilities for isolated test environments.
#[cfg(test)]
pub(crate) mod test_utils {
    use serde_json::{Value, json};
    use std::fs::{self, File};
    use std::io::Write;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    /// A throwaway archive directory plus unpack root.
    pub struct TestEnv {
        pub archive_dir: TempDir,
        pub unpack_dir: TempDir,
    }

    impl TestEnv {
        pub fn new() -> Self {
            Self {
                archive_dir: TempDir::new().unwrap(),
                unpack_dir: TempDir::new().unwrap(),
            }
        }

        pub fn archive_path(&self) -> &Path {
            self.archive_dir.path()
        }

        pub fn unpack_path(&self) -> &Path {
            self.unpack_dir.path()
        }

        /// Write a zip archive containing `All-Data.json` built from `dataset`.
        pub fn write_zip(&self, name: &str, dataset: &Value) -> PathBuf {
            let path = self.archive_path().join(name);
            write_zip_file(&path, &[("All-Data.json", dataset.to_string())]);
            path
        }

        /// Write an arbitrary file into the archive directory.
        pub fn write_file(&self, name: &str, contents: &[u8]) -> PathBuf {
            let path = self.archive_path().join(name);
            let mut file = File::create(&path).unwrap();
            file.write_all(contents).unwrap();
            path
        }
    }

    impl Default for TestEnv {
        fn default() -> Self {
            Self::new()
        }
    }

    pub fn write_zip_file(path: &Path, entries: &[(&str, String)]) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        let file = File::create(path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated);
        for (name, contents) in entries {
            writer.start_file(*name, options).unwrap();
            writer.write_all(contents.as_bytes()).unwrap();
        }
        writer.finish().unwrap();
    }

    /// A query engine loaded with `dataset` as a combined export.
    pub fn engine_for(dataset: &Value) -> crate::query::QueryEngine {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("All-Data.json"), dataset.to_string()).unwrap();
        let mut engine = crate::query::QueryEngine::default();
        engine.load(dir.path()).unwrap();
        engine
    }

    /// Small dataset: two boards (one trashed), three cards (one trashed),
    /// placements across both boards and one connection.
    pub fn sample_dataset() -> Value {
        json!({
            "whiteBoardList": [
                board("wb-1", "Research Notes", "2024-01-10T00:00:00Z", false),
                board("wb-2", "Project Plan", "2024-03-05T00:00:00Z", false),
                board("wb-trash", "Old Research", "2024-02-01T00:00:00Z", true),
            ],
            "cardList": [
                card("card-1", Some("Rust ownership"), "Borrowing rules", "2024-01-11T00:00:00Z", false),
                card("card-2", Some("Graph theory"), "Clustering coefficient", "2024-02-20T00:00:00Z", false),
                card("card-3", None, "An untitled research draft", "2024-03-06T00:00:00Z", false),
                card("card-trash", Some("Rust trash"), "gone", "2024-01-12T00:00:00Z", true),
            ],
            "cardInstances": [
                placement("pl-1", "card-1", "wb-1", 100.0, 200.0),
                placement("pl-2", "card-2", "wb-1", 400.0, 400.0),
                placement("pl-3", "card-1", "wb-2", 0.0, 0.0),
                placement("pl-4", "card-3", "wb-2", 50.0, 50.0),
                placement("pl-dangling", "card-missing", "wb-1", 100.0, 210.0),
            ],
            "connections": [
                connection("conn-1", "wb-1", "pl-1", "pl-2"),
            ],
        })
    }

    pub fn board(id: &str, name: &str, created: &str, trashed: bool) -> Value {
        json!({
            "id": id,
            "name": name,
            "createdBy": "user-1",
            "createdTime": created,
            "lastEditedTime": created,
            "spaceId": "space-1",
            "isTrashed": trashed,
        })
    }

    pub fn card(id: &str, title: Option<&str>, text: &str, created: &str, trashed: bool) -> Value {
        let content = json!({
            "type": "doc",
            "content": [{"type": "paragraph", "content": [{"type": "text", "text": text}]}],
        });
        let mut value = json!({
            "id": id,
            "content": content.to_string(),
            "createdBy": "user-1",
            "createdTime": created,
            "lastEditedTime": created,
            "spaceId": "space-1",
            "isTrashed": trashed,
        });
        if let Some(title) = title {
            value["title"] = json!(title);
        }
        value
    }

    pub fn placement(id: &str, card_id: &str, board_id: &str, x: f64, y: f64) -> Value {
        json!({
            "id": id,
            "cardId": card_id,
            "whiteboardId": board_id,
            "x": x,
            "y": y,
            "width": 300,
            "height": 150,
            "color": "blue",
        })
    }

    pub fn connection(id: &str, board_id: &str, begin: &str, end: &str) -> Value {
        json!({
            "id": id,
            "whiteboardId": board_id,
            "beginId": begin,
            "beginObjectType": "card",
            "endId": end,
            "endObjectType": "card",
            "color": "#000000",
            "lineStyle": "solid",
            "type": "connection",
            "createdBy": "user-1",
            "createdTime": "2024-01-01T00:00:00Z",
        })
    }
}

/// Library-level error type for boardvault operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Malformed data in {}: {source}", path.display())]
    MalformedData {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Extraction failed: {0}")]
    Extraction(String),

    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Watch error: {0}")]
    Watch(#[from] notify::Error),

    #[error("{0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for boardvault operations.
pub type Result<T> = std::result::Result<T, Error>;
