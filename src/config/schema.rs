//! KDL schema for config.kdl.
//!
//! ```kdl
//! archive-dir "/home/me/Backups/whiteboard"
//! unpack-dir "/home/me/.cache/boardvault"
//! auto-unpack #true
//! watch #false
//! keep-unpacked #true
//! max-archives 10
//! cache-enabled #true
//! cache-ttl 3600
//! ```
//!
//! Every node is optional. Values of the wrong type, or out of range, are
//! ignored as if the node were absent.
//!
//! `max-archives` must be at least 1. Retention cannot be switched off from
//! here: `0` is out of range, and an unset value falls back to the default of 10.

use crate::{Error, Result};
use kdl::{KdlDocument, KdlEntry, KdlNode, KdlValue};
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub const ARCHIVE_DIR: &str = "archive-dir";
pub const UNPACK_DIR: &str = "unpack-dir";
pub const AUTO_UNPACK: &str = "auto-unpack";
pub const WATCH: &str = "watch";
pub const KEEP_UNPACKED: &str = "keep-unpacked";
pub const MAX_ARCHIVES: &str = "max-archives";
pub const CACHE_ENABLED: &str = "cache-enabled";
pub const CACHE_TTL: &str = "cache-ttl";

/// Settings read from config.kdl. `None` means "not set in the file".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VaultConfig {
    pub archive_dir: Option<PathBuf>,
    pub unpack_dir: Option<PathBuf>,
    pub auto_unpack: Option<bool>,
    pub watch: Option<bool>,
    pub keep_unpacked: Option<bool>,
    /// Retention count, at least 1
    pub max_archives: Option<usize>,
    pub cache_enabled: Option<bool>,
    /// Cache entry lifetime in seconds
    pub cache_ttl: Option<u64>,
}

impl VaultConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a config file. A missing file yields an empty config.
    pub fn load(path: &Path) -> Result<Self> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::new()),
            Err(e) => {
                return Err(Error::Config(format!(
                    "Failed to read {}: {}",
                    path.display(),
                    e
                )));
            }
        };
        let doc: KdlDocument = content.parse().map_err(|e| {
            Error::Config(format!("Failed to parse KDL in {}: {}", path.display(), e))
        })?;
        Ok(Self::from_kdl(&doc))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let doc: KdlDocument = content
            .parse()
            .map_err(|e| Error::Config(format!("Failed to parse KDL: {}", e)))?;
        Ok(Self::from_kdl(&doc))
    }

    pub fn from_kdl(doc: &KdlDocument) -> Self {
        Self {
            archive_dir: first_value(doc, ARCHIVE_DIR)
                .and_then(KdlValue::as_string)
                .map(PathBuf::from),
            unpack_dir: first_value(doc, UNPACK_DIR)
                .and_then(KdlValue::as_string)
                .map(PathBuf::from),
            auto_unpack: first_value(doc, AUTO_UNPACK).and_then(KdlValue::as_bool),
            watch: first_value(doc, WATCH).and_then(KdlValue::as_bool),
            keep_unpacked: first_value(doc, KEEP_UNPACKED).and_then(KdlValue::as_bool),
            max_archives: first_value(doc, MAX_ARCHIVES)
                .and_then(KdlValue::as_integer)
                .filter(|n| *n >= 1)
                .and_then(|n| usize::try_from(n).ok()),
            cache_enabled: first_value(doc, CACHE_ENABLED).and_then(KdlValue::as_bool),
            cache_ttl: first_value(doc, CACHE_TTL)
                .and_then(KdlValue::as_integer)
                .and_then(|n| u64::try_from(n).ok()),
        }
    }

    pub fn to_kdl(&self) -> KdlDocument {
        let mut doc = KdlDocument::new();
        if let Some(dir) = &self.archive_dir {
            push(&mut doc, ARCHIVE_DIR, KdlValue::String(dir.display().to_string()));
        }
        if let Some(dir) = &self.unpack_dir {
            push(&mut doc, UNPACK_DIR, KdlValue::String(dir.display().to_string()));
        }
        if let Some(b) = self.auto_unpack {
            push(&mut doc, AUTO_UNPACK, KdlValue::Bool(b));
        }
        if let Some(b) = self.watch {
            push(&mut doc, WATCH, KdlValue::Bool(b));
        }
        if let Some(b) = self.keep_unpacked {
            push(&mut doc, KEEP_UNPACKED, KdlValue::Bool(b));
        }
        if let Some(n) = self.max_archives {
            push(&mut doc, MAX_ARCHIVES, KdlValue::Integer(n as i128));
        }
        if let Some(b) = self.cache_enabled {
            push(&mut doc, CACHE_ENABLED, KdlValue::Bool(b));
        }
        if let Some(n) = self.cache_ttl {
            push(&mut doc, CACHE_TTL, KdlValue::Integer(n as i128));
        }
        doc
    }
}

fn first_value<'a>(doc: &'a KdlDocument, name: &str) -> Option<&'a KdlValue> {
    doc.get(name)
        .and_then(|node| node.entries().first())
        .map(|entry| entry.value())
}

fn push(doc: &mut KdlDocument, name: &str, value: KdlValue) {
    let mut node = KdlNode::new(name);
    node.push(KdlEntry::new(value));
    doc.nodes_mut().push(node);
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_empty_document() {
        let config = VaultConfig::from_kdl(&KdlDocument::new());
        assert_eq!(config, VaultConfig::default());
    }

    #[test]
    fn test_full_document() {
        let config = VaultConfig::parse(
            r#"
            archive-dir "/backups"
            unpack-dir "/tmp/unpacked"
            auto-unpack #false
            watch #true
            keep-unpacked #false
            max-archives 3
            cache-enabled #false
            cache-ttl 60
            "#,
        )
        .unwrap();

        assert_eq!(config.archive_dir, Some(PathBuf::from("/backups")));
        assert_eq!(config.unpack_dir, Some(PathBuf::from("/tmp/unpacked")));
        assert_eq!(config.auto_unpack, Some(false));
        assert_eq!(config.watch, Some(true));
        assert_eq!(config.keep_unpacked, Some(false));
        assert_eq!(config.max_archives, Some(3));
        assert_eq!(config.cache_enabled, Some(false));
        assert_eq!(config.cache_ttl, Some(60));
    }

    #[test]
    fn test_invalid_values_are_ignored() {
        let config = VaultConfig::parse(
            r#"
            max-archives 0
            cache-ttl -5
            watch "yes"
            "#,
        )
        .unwrap();
        assert_eq!(config.max_archives, None);
        assert_eq!(config.cache_ttl, None);
        assert_eq!(config.watch, None);
    }

    #[test]
    fn test_roundtrip() {
        let config = VaultConfig {
            archive_dir: Some(PathBuf::from("/a")),
            unpack_dir: None,
            auto_unpack: Some(true),
            watch: Some(false),
            keep_unpacked: None,
            max_archives: Some(5),
            cache_enabled: Some(true),
            cache_ttl: Some(120),
        };
        assert_eq!(VaultConfig::from_kdl(&config.to_kdl()), config);
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let config = VaultConfig::load(&dir.path().join("config.kdl")).unwrap();
        assert_eq!(config, VaultConfig::default());
    }

    #[test]
    fn test_load_invalid_kdl_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.kdl");
        fs::write(&path, "archive-dir \"unterminated").unwrap();
        assert!(matches!(VaultConfig::load(&path), Err(Error::Config(_))));
    }
}
