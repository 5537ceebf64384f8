//! Configuration for boardvault.
//!
//! ## config.kdl
//!
//! Located at (first that applies):
//! - `--config <path>`
//! - `BV_CONFIG`
//! - `<config dir>/boardvault/config.kdl` (e.g. `~/.config/boardvault/config.kdl`)
//!
//! Contains archive and unpack directories, the auto-unpack / watch /
//! keep-unpacked flags, the retention count and cache settings. See
//! [`schema`] for the node names.
//!
//! ## Precedence
//!
//! CLI flag > environment variable > config.kdl > defaults
//!
//! Use the [`resolver`] module for unified precedence resolution.

pub mod resolver;
pub mod schema;

pub use resolver::{
    ConfigOverrides, Resolved, ResolvedSettings, ValueSource, default_config_path,
    resolve_settings, resolve_settings_with,
};
pub use schema::VaultConfig;
