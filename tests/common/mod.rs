//! Common test utilities for boardvault integration tests.
//!
//! Provides `TestEnv` for isolated test environments: every command gets its
//! own archive, unpack and config locations, so tests never read the user's
//! configuration and can run in parallel.

#![allow(dead_code)]

use assert_cmd::Command;
use serde_json::{Value, json};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
pub use tempfile::TempDir;

const BV_ENV_VARS: [&str; 8] = [
    "BV_ARCHIVE_DIR",
    "BV_UNPACK_DIR",
    "BV_AUTO_UNPACK",
    "BV_WATCH",
    "BV_KEEP_UNPACKED",
    "BV_MAX_ARCHIVES",
    "BV_CACHE_ENABLED",
    "BV_CACHE_TTL",
];

/// A test environment with isolated archive, unpack and config directories.
pub struct TestEnv {
    pub archive_dir: TempDir,
    pub unpack_dir: TempDir,
    pub config_dir: TempDir,
}

impl TestEnv {
    /// Create a new test environment with an empty config.kdl.
    pub fn new() -> Self {
        let env = Self {
            archive_dir: TempDir::new().unwrap(),
            unpack_dir: TempDir::new().unwrap(),
            config_dir: TempDir::new().unwrap(),
        };
        env.write_config("");
        env
    }

    /// A test environment holding one zip archive of [`sample_dataset`].
    pub fn with_sample() -> Self {
        let env = Self::new();
        env.write_zip("backup-2024-06-01.zip", &sample_dataset());
        env
    }

    /// Get a Command for the bv binary with isolated directories.
    ///
    /// Inherited `BV_*` variables are cleared so only the test's settings apply.
    pub fn bv(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_bv"));
        for var in BV_ENV_VARS {
            cmd.env_remove(var);
        }
        cmd.env("BV_CONFIG", self.config_path());
        cmd.env("BV_ARCHIVE_DIR", self.archive_path());
        cmd.env("BV_UNPACK_DIR", self.unpack_path());
        cmd
    }

    /// Like [`TestEnv::bv`] but without an archive directory.
    pub fn bv_unconfigured(&self) -> Command {
        let mut cmd = self.bv();
        cmd.env_remove("BV_ARCHIVE_DIR");
        cmd
    }

    pub fn archive_path(&self) -> &Path {
        self.archive_dir.path()
    }

    pub fn unpack_path(&self) -> &Path {
        self.unpack_dir.path()
    }

    pub fn config_path(&self) -> PathBuf {
        self.config_dir.path().join("config.kdl")
    }

    pub fn write_config(&self, kdl: &str) {
        fs::write(self.config_path(), kdl).unwrap();
    }

    /// Write a zip archive containing `All-Data.json` built from `dataset`.
    pub fn write_zip(&self, name: &str, dataset: &Value) -> PathBuf {
        let path = self.archive_path().join(name);
        let file = File::create(&path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated);
        writer.start_file("All-Data.json", options).unwrap();
        writer.write_all(dataset.to_string().as_bytes()).unwrap();
        writer.finish().unwrap();
        path
    }

    /// Write an uncompressed JSON archive.
    pub fn write_json(&self, name: &str, dataset: &Value) -> PathBuf {
        let path = self.archive_path().join(name);
        fs::write(&path, dataset.to_string()).unwrap();
        path
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a command's stdout as JSON.
pub fn stdout_json(cmd: &mut Command) -> Value {
    let output = cmd.output().unwrap();
    assert!(
        output.status.success(),
        "command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).unwrap()
}

/// Two live boards and one trashed; three live cards and one trashed.
///
/// `wb-1` holds card-1 at (100, 200) and card-2 at (400, 400), linked by
/// `conn-1`. `wb-2` holds card-1 again at (0, 0) and card-3 at (50, 50).
pub fn sample_dataset() -> Value {
    json!({
        "whiteBoardList": [
            board("wb-1", "Research Notes", "2024-01-10T00:00:00Z", false),
            board("wb-2", "Project Plan", "2024-03-05T00:00:00Z", false),
            board("wb-trash", "Old Research", "2024-02-01T00:00:00Z", true),
        ],
        "cardList": [
            card("card-1", "Rust ownership", "Borrowing rules", "2024-01-11T00:00:00Z", false),
            card("card-2", "Graph theory", "Clustering coefficient", "2024-02-20T00:00:00Z", false),
            card("card-3", "Draft", "An untitled research draft", "2024-03-06T00:00:00Z", false),
            card("card-trash", "Rust trash", "gone", "2024-01-12T00:00:00Z", true),
        ],
        "cardInstances": [
            placement("pl-1", "card-1", "wb-1", 100.0, 200.0),
            placement("pl-2", "card-2", "wb-1", 400.0, 400.0),
            placement("pl-3", "card-1", "wb-2", 0.0, 0.0),
            placement("pl-4", "card-3", "wb-2", 50.0, 50.0),
        ],
        "connections": [
            {
                "id": "conn-1",
                "whiteboardId": "wb-1",
                "beginId": "pl-1",
                "endId": "pl-2",
                "createdTime": "2024-01-12T00:00:00Z",
            },
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
        "isTrashed": trashed,
    })
}

pub fn card(id: &str, title: &str, text: &str, created: &str, trashed: bool) -> Value {
    let content = json!({
        "type": "doc",
        "content": [
            {"type": "paragraph", "content": [{"type": "text", "text": text}]},
        ],
    });
    json!({
        "id": id,
        "title": title,
        "content": content.to_string(),
        "createdBy": "user-1",
        "createdTime": created,
        "lastEditedTime": created,
        "isTrashed": trashed,
    })
}

pub fn placement(id: &str, card_id: &str, board_id: &str, x: f64, y: f64) -> Value {
    json!({
        "id": id,
        "cardId": card_id,
        "whiteboardId": board_id,
        "x": x,
        "y": y,
        "width": 200.0,
        "height": 100.0,
    })
}
