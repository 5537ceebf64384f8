//! Precedence resolution for boardvault settings.
//!
//! ## Precedence (highest to lowest)
//!
//! 1. CLI flags
//! 2. `BV_*` environment variables
//! 3. config.kdl (`--config`, `BV_CONFIG`, or `<config dir>/boardvault/config.kdl`)
//! 4. Built-in defaults
//!
//! Boolean environment variables are true only for the literal `true`
//! (case-insensitive); anything else is false. Numeric environment variables
//! that do not parse are ignored.

use super::schema::VaultConfig;
use crate::archive::ManagerConfig;
use crate::query::EngineOptions;
use crate::{Error, Result};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_ENV: &str = "BV_CONFIG";
pub const ARCHIVE_DIR_ENV: &str = "BV_ARCHIVE_DIR";
pub const UNPACK_DIR_ENV: &str = "BV_UNPACK_DIR";
pub const AUTO_UNPACK_ENV: &str = "BV_AUTO_UNPACK";
pub const WATCH_ENV: &str = "BV_WATCH";
pub const KEEP_UNPACKED_ENV: &str = "BV_KEEP_UNPACKED";
pub const MAX_ARCHIVES_ENV: &str = "BV_MAX_ARCHIVES";
pub const CACHE_ENABLED_ENV: &str = "BV_CACHE_ENABLED";
pub const CACHE_TTL_ENV: &str = "BV_CACHE_TTL";

pub const DEFAULT_UNPACK_DIR: &str = "./data/unpacked";
pub const DEFAULT_MAX_ARCHIVES: usize = 10;
pub const DEFAULT_CACHE_TTL: u64 = 3600;

/// Tracks where a resolved value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueSource {
    /// Value from environment variable
    EnvVar(String),
    /// Value from a config.kdl file
    ConfigFile(PathBuf),
    /// Value from CLI flag
    CliFlag,
    /// Built-in default value
    Default,
}

impl fmt::Display for ValueSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueSource::EnvVar(name) => write!(f, "env:{}", name),
            ValueSource::ConfigFile(path) => write!(f, "config:{}", path.display()),
            ValueSource::CliFlag => write!(f, "cli"),
            ValueSource::Default => write!(f, "default"),
        }
    }
}

impl Serialize for ValueSource {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A resolved value with its source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolved<T> {
    pub value: T,
    pub source: ValueSource,
}

impl<T> Resolved<T> {
    pub fn new(value: T, source: ValueSource) -> Self {
        Self { value, source }
    }
}

/// Values given on the command line.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub config_path: Option<PathBuf>,
    pub archive_dir: Option<PathBuf>,
    pub unpack_dir: Option<PathBuf>,
}

impl ConfigOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    pub fn with_archive_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.archive_dir = Some(dir.into());
        self
    }

    pub fn with_unpack_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.unpack_dir = Some(dir.into());
        self
    }
}

/// Fully resolved settings with source tracking.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedSettings {
    /// Config file consulted, if any
    pub config_path: Option<PathBuf>,
    pub archive_dir: Option<Resolved<PathBuf>>,
    pub unpack_dir: Resolved<PathBuf>,
    pub auto_unpack: Resolved<bool>,
    pub watch: Resolved<bool>,
    pub keep_unpacked: Resolved<bool>,
    /// Always at least 1; only library callers can disable retention
    pub max_archives: Resolved<usize>,
    pub cache_enabled: Resolved<bool>,
    /// Seconds
    pub cache_ttl: Resolved<u64>,
}

impl Default for ResolvedSettings {
    fn default() -> Self {
        Self {
            config_path: None,
            archive_dir: None,
            unpack_dir: Resolved::new(PathBuf::from(DEFAULT_UNPACK_DIR), ValueSource::Default),
            auto_unpack: Resolved::new(true, ValueSource::Default),
            watch: Resolved::new(false, ValueSource::Default),
            keep_unpacked: Resolved::new(true, ValueSource::Default),
            max_archives: Resolved::new(DEFAULT_MAX_ARCHIVES, ValueSource::Default),
            cache_enabled: Resolved::new(true, ValueSource::Default),
            cache_ttl: Resolved::new(DEFAULT_CACHE_TTL, ValueSource::Default),
        }
    }
}

impl ResolvedSettings {
    pub fn archive_dir(&self) -> Option<&Path> {
        self.archive_dir.as_ref().map(|r| r.value.as_path())
    }

    /// Archive manager settings. Fails when no archive directory is configured.
    pub fn manager_config(&self) -> Result<ManagerConfig> {
        let archive_dir = self.archive_dir().ok_or_else(|| {
            Error::Config(format!(
                "No archive directory configured (use --archive-dir, {} or {} in config.kdl)",
                ARCHIVE_DIR_ENV,
                super::schema::ARCHIVE_DIR
            ))
        })?;
        Ok(ManagerConfig {
            archive_dir: archive_dir.to_path_buf(),
            unpack_dir: self.unpack_dir.value.clone(),
            auto_unpack: self.auto_unpack.value,
            watch: self.watch.value,
            keep_unpacked: self.keep_unpacked.value,
            max_archives: Some(self.max_archives.value),
        })
    }

    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            cache_enabled: self.cache_enabled.value,
            cache_ttl: Duration::from_secs(self.cache_ttl.value),
        }
    }
}

/// Default config file location: `<config dir>/boardvault/config.kdl`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("boardvault").join("config.kdl"))
}

/// Resolve settings from CLI overrides, the process environment and config.kdl.
pub fn resolve_settings(overrides: &ConfigOverrides) -> Result<ResolvedSettings> {
    resolve_settings_with(overrides, |name| std::env::var(name).ok())
}

/// Resolve settings with an explicit environment lookup.
pub fn resolve_settings_with<F>(overrides: &ConfigOverrides, env: F) -> Result<ResolvedSettings>
where
    F: Fn(&str) -> Option<String>,
{
    let env = |name: &str| env(name).filter(|v| !v.is_empty());

    // An explicitly named config file must exist; the default one may not
    let explicit = overrides
        .config_path
        .clone()
        .or_else(|| env(CONFIG_ENV).map(PathBuf::from));
    let config_path = match explicit {
        Some(path) => {
            if !path.is_file() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            Some(path)
        }
        None => default_config_path(),
    };
    let file = match &config_path {
        Some(path) => VaultConfig::load(path)?,
        None => VaultConfig::new(),
    };
    let file_source = || {
        ValueSource::ConfigFile(config_path.clone().unwrap_or_default())
    };

    let mut result = ResolvedSettings {
        config_path: config_path.clone(),
        ..ResolvedSettings::default()
    };

    // Directories
    if let Some(dir) = &overrides.archive_dir {
        result.archive_dir = Some(Resolved::new(dir.clone(), ValueSource::CliFlag));
    } else if let Some(dir) = env(ARCHIVE_DIR_ENV) {
        result.archive_dir = Some(Resolved::new(
            PathBuf::from(dir),
            ValueSource::EnvVar(ARCHIVE_DIR_ENV.to_string()),
        ));
    } else if let Some(dir) = &file.archive_dir {
        result.archive_dir = Some(Resolved::new(dir.clone(), file_source()));
    }

    if let Some(dir) = &overrides.unpack_dir {
        result.unpack_dir = Resolved::new(dir.clone(), ValueSource::CliFlag);
    } else if let Some(dir) = env(UNPACK_DIR_ENV) {
        result.unpack_dir = Resolved::new(
            PathBuf::from(dir),
            ValueSource::EnvVar(UNPACK_DIR_ENV.to_string()),
        );
    } else if let Some(dir) = &file.unpack_dir {
        result.unpack_dir = Resolved::new(dir.clone(), file_source());
    }

    // Flags
    let flag = |name: &str, from_file: Option<bool>, current: Resolved<bool>| {
        if let Some(raw) = env(name) {
            Resolved::new(raw.eq_ignore_ascii_case("true"), ValueSource::EnvVar(name.to_string()))
        } else if let Some(value) = from_file {
            Resolved::new(value, file_source())
        } else {
            current
        }
    };
    result.auto_unpack = flag(AUTO_UNPACK_ENV, file.auto_unpack, result.auto_unpack);
    result.watch = flag(WATCH_ENV, file.watch, result.watch);
    result.keep_unpacked = flag(KEEP_UNPACKED_ENV, file.keep_unpacked, result.keep_unpacked);
    result.cache_enabled = flag(CACHE_ENABLED_ENV, file.cache_enabled, result.cache_enabled);

    // Numbers
    if let Some(n) = env(MAX_ARCHIVES_ENV)
        .and_then(|raw| raw.trim().parse::<usize>().ok())
        .filter(|n| *n >= 1)
    {
        result.max_archives = Resolved::new(n, ValueSource::EnvVar(MAX_ARCHIVES_ENV.to_string()));
    } else if let Some(n) = file.max_archives {
        result.max_archives = Resolved::new(n, file_source());
    }

    if let Some(n) = env(CACHE_TTL_ENV).and_then(|raw| raw.trim().parse::<u64>().ok()) {
        result.cache_ttl = Resolved::new(n, ValueSource::EnvVar(CACHE_TTL_ENV.to_string()));
    } else if let Some(n) = file.cache_ttl {
        result.cache_ttl = Resolved::new(n, file_source());
    }

    tracing::debug!(
        config = ?result.config_path,
        archive_dir = ?result.archive_dir(),
        "resolved settings"
    );
    Ok(result)
}
