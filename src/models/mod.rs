//! Data models for boardvault entities.
//!
//! This module defines the core data structures:
//! - `Board` - A whiteboard canvas hosting placements and connections
//! - `Card` - A rich-document note, placeable on any number of boards
//! - `Placement` - One instance of a card positioned on a board
//! - `Connection` - A link between two placements on a board
//! - `ArchiveMetadata` - A discovered or loaded backup archive
//! - `SearchQuery` - Filters shared by the board and card searches
//!
//! Record fields follow the camelCase names used by the exporting application.

pub mod graph;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// A whiteboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    /// Unique identifier
    pub id: String,

    /// Display name
    #[serde(default)]
    pub name: String,

    /// Creator user id
    #[serde(default)]
    pub created_by: String,

    /// Creation timestamp
    #[serde(default)]
    pub created_time: DateTime<Utc>,

    /// Last edit timestamp
    #[serde(default)]
    pub last_edited_time: DateTime<Utc>,

    /// Owning space
    #[serde(default)]
    pub space_id: String,

    /// Trashed boards are hidden from searches and listings
    #[serde(default)]
    pub is_trashed: bool,
}

/// A card holding a serialized rich document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    /// Unique identifier
    pub id: String,

    /// Optional title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Serialized rich document (see [`crate::render::Document`])
    #[serde(default)]
    pub content: String,

    #[serde(default)]
    pub created_by: String,

    #[serde(default)]
    pub created_time: DateTime<Utc>,

    #[serde(default)]
    pub last_edited_time: DateTime<Utc>,

    #[serde(default)]
    pub space_id: String,

    #[serde(default)]
    pub is_trashed: bool,
}

impl Card {
    /// Title for display, falling back to "Untitled".
    pub fn display_title(&self) -> &str {
        match self.title.as_deref() {
            Some(t) if !t.is_empty() => t,
            _ => "Untitled",
        }
    }
}

/// A card's instance on a board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Placement {
    /// Unique identifier
    pub id: String,

    /// The placed card (a card may have placements on many boards)
    pub card_id: String,

    /// The hosting board
    #[serde(rename = "whiteboardId", alias = "boardId")]
    pub board_id: String,

    #[serde(default)]
    pub x: f64,

    #[serde(default)]
    pub y: f64,

    #[serde(default)]
    pub width: f64,

    #[serde(default)]
    pub height: f64,

    #[serde(default)]
    pub color: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_time: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_edited_time: Option<DateTime<Utc>>,
}

impl Placement {
    /// Euclidean distance from the placement origin to `(x, y)`.
    pub fn distance_to(&self, x: f64, y: f64) -> f64 {
        let dx = self.x - x;
        let dy = self.y - y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// A link between two objects (normally placements) on a board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    /// Unique identifier
    pub id: String,

    #[serde(rename = "whiteboardId", alias = "boardId")]
    pub board_id: String,

    /// Begin endpoint id
    pub begin_id: String,

    /// Begin endpoint object type (e.g. "card")
    #[serde(default)]
    pub begin_object_type: String,

    /// End endpoint id
    pub end_id: String,

    #[serde(default)]
    pub end_object_type: String,

    #[serde(default)]
    pub color: String,

    #[serde(default)]
    pub line_style: String,

    /// Connection type tag
    #[serde(rename = "type", default)]
    pub connection_type: String,

    #[serde(default)]
    pub created_by: String,

    #[serde(default)]
    pub created_time: DateTime<Utc>,
}

impl Connection {
    /// Whether either endpoint is `id`.
    pub fn touches(&self, id: &str) -> bool {
        self.begin_id == id || self.end_id == id
    }
}

/// Storage format of an archive file, derived from its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArchiveFormat {
    Zip,
    TarGz,
    TarZst,
    /// Uncompressed combined export
    Json,
}

impl ArchiveFormat {
    /// Recognized extensions, longest first so `.tar.gz` wins over `.gz`.
    const EXTENSIONS: [(&'static str, ArchiveFormat); 5] = [
        (".tar.zst", ArchiveFormat::TarZst),
        (".tar.gz", ArchiveFormat::TarGz),
        (".tgz", ArchiveFormat::TarGz),
        (".zip", ArchiveFormat::Zip),
        (".json", ArchiveFormat::Json),
    ];

    /// Detect the format from a file name, returning it with the stem.
    pub fn detect(file_name: &str) -> Option<(Self, &str)> {
        let lower = file_name.to_ascii_lowercase();
        Self::EXTENSIONS.iter().find_map(|(ext, format)| {
            lower
                .ends_with(ext)
                .then(|| (*format, &file_name[..file_name.len() - ext.len()]))
        })
    }

    /// Whether the archive must be unpacked before loading.
    pub fn is_compressed(&self) -> bool {
        !matches!(self, ArchiveFormat::Json)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ArchiveFormat::Zip => "zip",
            ArchiveFormat::TarGz => "tar.gz",
            ArchiveFormat::TarZst => "tar.zst",
            ArchiveFormat::Json => "json",
        }
    }
}

impl fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Metadata for one archive file.
///
/// Records are immutable once built; `with_unpacked_path` consumes the record
/// and is only used while constructing it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchiveMetadata {
    /// Archive id (file name without the archive extension)
    pub id: String,

    /// Absolute path of the archive file
    pub path: PathBuf,

    /// Date parsed from the file name (or discovery time when unparseable)
    pub created: DateTime<Utc>,

    /// File size in bytes
    pub size: u64,

    pub format: ArchiveFormat,

    /// Directory holding the unpacked contents, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unpacked_path: Option<PathBuf>,

    /// Version token parsed from the file name ("unknown" if none)
    pub version: String,
}

impl ArchiveMetadata {
    pub fn is_compressed(&self) -> bool {
        self.format.is_compressed()
    }

    pub fn with_unpacked_path(mut self, path: PathBuf) -> Self {
        self.unpacked_path = Some(path);
        self
    }

    /// Path the entity store should load from.
    ///
    /// Unpacked directory first, then the file itself for plain exports, and
    /// finally the directory containing the archive.
    pub fn data_path(&self) -> PathBuf {
        if let Some(dir) = &self.unpacked_path {
            return dir.clone();
        }
        if !self.is_compressed() {
            return self.path.clone();
        }
        self.path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

/// Inclusive creation-date window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, time: &DateTime<Utc>) -> bool {
        *time >= self.start && *time <= self.end
    }
}

/// Filters for board and card searches. All present filters must match.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchQuery {
    /// Case-insensitive substring
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_range: Option<DateRange>,

    /// Cards only: require a placement on this board
    #[serde(skip_serializing_if = "Option::is_none")]
    pub board_id: Option<String>,
}

impl SearchQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn with_date_range(mut self, range: DateRange) -> Self {
        self.date_range = Some(range);
        self
    }

    pub fn with_board(mut self, board_id: impl Into<String>) -> Self {
        self.board_id = Some(board_id.into());
        self
    }
}
