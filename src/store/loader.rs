//! Dataset loaders for the two export layouts.
//!
//! - **Combined**: one `All-Data.json` object holding all four entity arrays
//! - **Split**: up to four files (`whiteboard.json`, `card.json`,
//!   `card-Instance.json`, `connection.json`), each optional
//!
//! [`detect_layout`] picks the layout: a file path or a directory containing
//! `All-Data.json` is combined, any other directory is split.

use crate::models::{Board, Card, Connection, Placement};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// File name of the combined export.
pub const COMBINED_FILE: &str = "All-Data.json";

/// Per-entity file names of the split layout.
pub const BOARD_FILE: &str = "whiteboard.json";
pub const CARD_FILE: &str = "card.json";
pub const PLACEMENT_FILE: &str = "card-Instance.json";
pub const CONNECTION_FILE: &str = "connection.json";

/// The four entity collections as read from disk, before indexing.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub boards: Vec<Board>,
    pub cards: Vec<Card>,
    pub placements: Vec<Placement>,
    pub connections: Vec<Connection>,
}

/// Which on-disk layout a dataset came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutKind {
    Combined,
    Split,
}

impl LayoutKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Combined => "combined",
            Self::Split => "split",
        }
    }
}

impl fmt::Display for LayoutKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A source that can produce a full [`Dataset`].
pub trait DatasetSource: Send + Sync {
    /// Read all entity collections.
    fn read(&self) -> Result<Dataset>;

    /// Path being read (for display purposes).
    fn location(&self) -> &Path;

    fn kind(&self) -> LayoutKind;
}

/// Choose the loader for `path`.
pub fn detect_layout(path: &Path) -> Result<Box<dyn DatasetSource>> {
    if path.is_file() {
        return Ok(Box::new(CombinedExport::new(path)));
    }
    if !path.is_dir() {
        return Err(Error::Io(io::Error::new(
            io::ErrorKind::NotFound,
            format!("dataset path not found: {}", path.display()),
        )));
    }
    let combined = path.join(COMBINED_FILE);
    if combined.is_file() {
        Ok(Box::new(CombinedExport::new(&combined)))
    } else {
        Ok(Box::new(SplitExport::new(path)))
    }
}

/// Single-file export with named arrays.
#[derive(Debug, Clone)]
pub struct CombinedExport {
    path: PathBuf,
}

#[derive(Deserialize)]
struct CombinedFile {
    #[serde(rename = "whiteBoardList", alias = "boardList")]
    boards: Option<Vec<Board>>,
    #[serde(rename = "cardList")]
    cards: Option<Vec<Card>>,
    #[serde(rename = "cardInstances", alias = "placementList")]
    placements: Option<Vec<Placement>>,
    #[serde(rename = "connections", alias = "connectionList")]
    connections: Option<Vec<Connection>>,
}

impl CombinedExport {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }
}

impl DatasetSource for CombinedExport {
    fn read(&self) -> Result<Dataset> {
        let file: CombinedFile = read_json(&self.path)?;
        Ok(Dataset {
            boards: file.boards.unwrap_or_default(),
            cards: file.cards.unwrap_or_default(),
            placements: file.placements.unwrap_or_default(),
            connections: file.connections.unwrap_or_default(),
        })
    }

    fn location(&self) -> &Path {
        &self.path
    }

    fn kind(&self) -> LayoutKind {
        LayoutKind::Combined
    }
}

/// One file per entity type; missing files yield empty collections.
#[derive(Debug, Clone)]
pub struct SplitExport {
    dir: PathBuf,
}

impl SplitExport {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
        }
    }

    fn read_optional<T: DeserializeOwned>(&self, file_name: &str) -> Result<Vec<T>> {
        let path = self.dir.join(file_name);
        if !path.exists() {
            return Ok(Vec::new());
        }
        read_json(&path)
    }
}

impl DatasetSource for SplitExport {
    fn read(&self) -> Result<Dataset> {
        Ok(Dataset {
            boards: self.read_optional(BOARD_FILE)?,
            cards: self.read_optional(CARD_FILE)?,
            placements: self.read_optional(PLACEMENT_FILE)?,
            connections: self.read_optional(CONNECTION_FILE)?,
        })
    }

    fn location(&self) -> &Path {
        &self.dir
    }

    fn kind(&self) -> LayoutKind {
        LayoutKind::Split
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = fs::read(path)?;
    serde_json::from_slice(&bytes).map_err(|source| Error::MalformedData {
        path: path.to_path_buf(),
        source,
    })
}
