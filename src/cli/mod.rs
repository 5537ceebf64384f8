//! CLI argument definitions for boardvault.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Boardvault - browse and query whiteboard knowledge-base backups.
///
/// Point `--archive-dir` at the folder holding your backups, then start with
/// `bv archive list`. Data commands load the newest archive unless
/// `--archive` names one.
#[derive(Parser, Debug)]
#[command(name = "bv")]
#[command(author, version, about = "Archive manager and query tool for whiteboard knowledge-base backups", long_about = None)]
pub struct Cli {
    /// Output in human-readable format instead of JSON
    #[arg(short = 'H', long = "human", global = true)]
    pub human_readable: bool,

    /// Path to config.kdl (overrides BV_CONFIG and the default location)
    #[arg(long = "config", global = true)]
    pub config_path: Option<PathBuf>,

    /// Directory containing backup archives (overrides BV_ARCHIVE_DIR)
    #[arg(long = "archive-dir", global = true)]
    pub archive_dir: Option<PathBuf>,

    /// Directory archives are unpacked into (overrides BV_UNPACK_DIR)
    #[arg(long = "unpack-dir", global = true)]
    pub unpack_dir: Option<PathBuf>,

    /// Archive to query: a file path or an archive id (default: newest)
    #[arg(short = 'A', long = "archive", global = true)]
    pub archive: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Archive management (list, load, cleanup, watch, diff)
    Archive {
        #[command(subcommand)]
        command: ArchiveCommands,
    },

    /// Search boards or cards
    Search {
        #[command(subcommand)]
        command: SearchCommands,
    },

    /// Board commands
    Board {
        #[command(subcommand)]
        command: BoardCommands,
    },

    /// Card commands
    Card {
        #[command(subcommand)]
        command: CardCommands,
    },

    /// Graph metrics over connections
    Analyze {
        /// Limit analysis to one board
        #[arg(long)]
        board: Option<String>,

        /// Metric to compute (repeatable)
        #[arg(long = "metric", short = 'm', value_parser = ["centrality", "clustering", "density", "components"])]
        metrics: Vec<String>,

        /// Also write the report as JSON to this file
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Show build and environment information
    Debug,
}

/// Archive subcommands
#[derive(Subcommand, Debug)]
pub enum ArchiveCommands {
    /// List archives, newest first
    List {
        /// Sort order
        #[arg(long, default_value = "date", value_parser = ["date", "size"])]
        sort: String,

        /// Show at most this many archives
        #[arg(long)]
        limit: Option<usize>,

        /// Directory to list instead of the configured archive directory
        #[arg(long)]
        dir: Option<PathBuf>,
    },

    /// Load an archive (unpacking it if needed) and report its contents
    Load {
        /// Archive file path
        #[arg(long, conflicts_with = "id")]
        path: Option<PathBuf>,

        /// Archive id (file name without extension)
        #[arg(long)]
        id: Option<String>,

        /// Do not unpack compressed archives
        #[arg(long)]
        no_unpack: bool,
    },

    /// Delete the oldest archives beyond the retention count
    Cleanup,

    /// Watch the archive directory and print lifecycle events until Ctrl-C
    Watch {
        /// Load archives as they appear
        #[arg(long)]
        load: bool,
    },

    /// Compare two archives by entity counts
    Diff {
        /// First (older) archive id
        first: String,

        /// Second (newer) archive id
        second: String,

        /// Compare a single board
        #[arg(long)]
        board: Option<String>,

        /// Also write the comparison as JSON to this file
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

/// Search subcommands
#[derive(Subcommand, Debug)]
pub enum SearchCommands {
    /// Search boards by name and creation date
    Boards {
        /// Case-insensitive substring of the board name
        #[arg(long, short = 'q')]
        query: Option<String>,

        /// Created on or after (YYYY-MM-DD or RFC 3339)
        #[arg(long)]
        from: Option<String>,

        /// Created on or before (YYYY-MM-DD or RFC 3339)
        #[arg(long)]
        to: Option<String>,
    },

    /// Search cards by title/content, board and creation date
    Cards {
        /// Case-insensitive substring of the title or content
        #[arg(long, short = 'q')]
        query: Option<String>,

        /// Only cards placed on this board
        #[arg(long)]
        board: Option<String>,

        /// Created on or after (YYYY-MM-DD or RFC 3339)
        #[arg(long)]
        from: Option<String>,

        /// Created on or before (YYYY-MM-DD or RFC 3339)
        #[arg(long)]
        to: Option<String>,
    },
}

/// Board subcommands
#[derive(Subcommand, Debug)]
pub enum BoardCommands {
    /// Show a board
    Show {
        /// Board ID
        id: String,

        /// Include the cards placed on the board
        #[arg(long)]
        cards: bool,

        /// Include the connections drawn on the board
        #[arg(long)]
        connections: bool,
    },

    /// Export a board to a file
    Export {
        /// Board ID
        id: String,

        /// Output file
        #[arg(long, short = 'o')]
        out: PathBuf,

        /// Output format
        #[arg(long, default_value = "markdown", value_parser = ["markdown", "json", "html"])]
        format: String,

        /// Leave card contents out
        #[arg(long)]
        no_cards: bool,

        /// Include connections
        #[arg(long)]
        connections: bool,

        /// Include created/modified/creator metadata
        #[arg(long)]
        metadata: bool,
    },

    /// Summarize a board
    Summarize {
        /// Board ID
        id: String,

        /// Summary style
        #[arg(long, default_value = "text", value_parser = ["text", "structured"])]
        format: String,

        /// Include word and character counts
        #[arg(long)]
        stats: bool,
    },
}

/// Card subcommands
#[derive(Subcommand, Debug)]
pub enum CardCommands {
    /// Show a card with its placements
    Show {
        /// Card ID
        id: String,

        /// Rendering of the card content
        #[arg(long, default_value = "json", value_parser = ["json", "markdown", "html"])]
        format: String,

        /// Include the boards and connections the card takes part in
        #[arg(long)]
        related: bool,
    },

    /// Print a card's content
    Content {
        /// Card ID
        id: String,

        /// raw (stored document), markdown, or json (parsed document tree)
        #[arg(long, default_value = "markdown", value_parser = ["raw", "markdown", "json"])]
        format: String,
    },

    /// Cards placed within a radius of a point on a board
    #[command(allow_negative_numbers = true)]
    Area {
        /// Board ID
        board: String,

        /// X coordinate
        x: f64,

        /// Y coordinate
        y: f64,

        /// Search radius (inclusive)
        #[arg(long, short = 'r', default_value_t = 100.0)]
        radius: f64,
    },
}

/// Configuration subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show resolved settings and where each value came from
    Show,
}
