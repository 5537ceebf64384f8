//! Archive discovery and filename parsing.
//!
//! The catalog is stateless: every call re-reads the directory. A file is a
//! candidate when its extension is a known archive format (see
//! [`ArchiveFormat::detect`]); its date and version are parsed from the name.

use crate::Result;
use crate::models::{ArchiveFormat, ArchiveMetadata};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// Version reported for names with no recognizable date or version.
pub const UNKNOWN_VERSION: &str = "unknown";

/// e.g. `Backup-2025-05-18T14-49-23-577Z`
static TIMESTAMP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{4})-(\d{2})-(\d{2})T(\d{2})-(\d{2})-(\d{2})-\d{3}Z").expect("valid regex")
});

/// e.g. `backup-2024-01-15.zip`
static DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{4})-(\d{2})-(\d{2})").expect("valid regex"));

/// e.g. `backup-v1.2.3.zip`
static VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"v(\d+\.\d+\.\d+)").expect("valid regex"));

/// Date and version derived from an archive file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilenameInfo {
    pub created: DateTime<Utc>,
    pub version: String,
    /// False when `created` is a fallback to the current time
    pub dated: bool,
}

/// Parse a date and version out of an archive file name.
///
/// Tries a full timestamp, then a bare date, then a semantic version. Digits
/// that do not form a valid calendar date fall through to the next pattern.
pub fn parse_filename(file_name: &str) -> FilenameInfo {
    if let Some(caps) = TIMESTAMP_RE.captures(file_name) {
        let n = |i: usize| caps[i].parse::<u32>().unwrap_or(u32::MAX);
        let parsed = NaiveDate::from_ymd_opt(caps[1].parse().unwrap_or(-1), n(2), n(3))
            .and_then(|d| d.and_hms_opt(n(4), n(5), n(6)));
        if let Some(naive) = parsed {
            return FilenameInfo {
                created: Utc.from_utc_datetime(&naive),
                version: naive.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
                dated: true,
            };
        }
    }

    if let Some(caps) = DATE_RE.captures(file_name) {
        let parsed = NaiveDate::from_ymd_opt(
            caps[1].parse().unwrap_or(-1),
            caps[2].parse().unwrap_or(0),
            caps[3].parse().unwrap_or(0),
        )
        .and_then(|d| d.and_hms_opt(0, 0, 0));
        if let Some(naive) = parsed {
            return FilenameInfo {
                created: Utc.from_utc_datetime(&naive),
                version: naive.format("%Y-%m-%d").to_string(),
                dated: true,
            };
        }
    }

    if let Some(m) = VERSION_RE.find(file_name) {
        return FilenameInfo {
            created: Utc::now(),
            version: m.as_str().to_string(),
            dated: false,
        };
    }

    FilenameInfo {
        created: Utc::now(),
        version: UNKNOWN_VERSION.to_string(),
        dated: false,
    }
}

/// Build metadata for one archive file from its name and on-disk size.
pub fn describe(path: &Path, size: u64) -> Option<ArchiveMetadata> {
    let file_name = path.file_name()?.to_str()?;
    let (format, stem) = ArchiveFormat::detect(file_name)?;
    let info = parse_filename(file_name);
    Some(ArchiveMetadata {
        id: stem.to_string(),
        path: path.to_path_buf(),
        created: info.created,
        size,
        format,
        unpacked_path: None,
        version: info.version,
    })
}

/// List archives in `dir`, newest first.
///
/// Fails if the directory cannot be read. Entries whose size cannot be read
/// are skipped. Equal dates keep file-name order.
pub fn list(dir: &Path) -> Result<Vec<ArchiveMetadata>> {
    let dir = absolute(dir);
    let mut entries: Vec<PathBuf> = fs::read_dir(&dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .collect();
    entries.sort();

    let mut archives = Vec::new();
    for path in entries {
        let meta = match fs::metadata(&path) {
            Ok(meta) if meta.is_file() => meta,
            Ok(_) => continue,
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "skipping unreadable entry");
                continue;
            }
        };
        if let Some(archive) = describe(&path, meta.len()) {
            archives.push(archive);
        }
    }

    archives.sort_by(|a, b| b.created.cmp(&a.created));
    Ok(archives)
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}
