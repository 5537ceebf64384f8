//! Command implementations for the boardvault CLI.
//!
//! Each command returns a result type implementing [`Output`], which the
//! binary prints as JSON (default) or human-readable text (`-H`).
//!
//! Data commands run against a [`Session`]: an archive manager plus a query
//! engine loaded with the archive named by `--archive`, or the newest one.

use crate::analysis::{self, ArchiveComparison, GraphReport, Metric};
use crate::archive::{ArchiveEvent, ArchiveManager, ManagerConfig};
use crate::config::ResolvedSettings;
use crate::export::{self, BoardSummary, ExportFormat, ExportOptions, ExportReport, SummaryFormat};
use crate::models::{ArchiveMetadata, Board, Card, Connection, DateRange, Placement, SearchQuery};
use crate::query::{BoardInclude, BoardView, QueryEngine};
use crate::render;
use crate::store::{EntityCounts, EntityStore, LayoutKind};
use crate::{Error, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::sync::broadcast::error::RecvError;

/// Command results that can be serialized to JSON or formatted for humans.
pub trait Output {
    /// Serialize to JSON string.
    fn to_json(&self) -> String;

    /// Format for human-readable output.
    fn to_human(&self) -> String;
}

fn json_string<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value)
        .unwrap_or_else(|e| serde_json::json!({ "error": e.to_string() }).to_string())
}

fn date(time: &DateTime<Utc>) -> String {
    time.format("%Y-%m-%d %H:%M").to_string()
}

fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.1} {}", size, UNITS[unit])
    }
}

// === Session ===

/// A manager and an engine loaded with one archive.
pub struct Session {
    pub manager: ArchiveManager,
    pub engine: QueryEngine,
    pub archive: ArchiveMetadata,
}

impl Session {
    /// Open the archive named by `selector` (a file path or an archive id),
    /// or the newest archive in the archive directory.
    pub fn open(settings: &ResolvedSettings, selector: Option<&str>) -> Result<Self> {
        let mut manager = ArchiveManager::new(session_config(settings)?)?;
        let archive = match selector {
            Some(s) if Path::new(s).is_file() => manager.load(Path::new(s))?,
            Some(id) => manager.load_by_id(id)?,
            None => manager.load_latest()?,
        };
        let mut engine = QueryEngine::new(settings.engine_options());
        engine.load(&archive.data_path())?;
        tracing::debug!(id = %archive.id, "session opened");
        Ok(Self {
            manager,
            engine,
            archive,
        })
    }
}

/// Manager settings for one-shot commands: never watch.
fn session_config(settings: &ResolvedSettings) -> Result<ManagerConfig> {
    let mut config = settings.manager_config()?;
    config.watch = false;
    Ok(config)
}

/// Like [`session_config`], but falls back to `dir` as the archive directory
/// when none is configured.
fn config_or(settings: &ResolvedSettings, dir: Option<&Path>) -> Result<ManagerConfig> {
    match (session_config(settings), dir) {
        (Ok(config), _) => Ok(config),
        (Err(_), Some(dir)) => Ok(ManagerConfig {
            auto_unpack: settings.auto_unpack.value,
            keep_unpacked: settings.keep_unpacked.value,
            max_archives: Some(settings.max_archives.value),
            ..ManagerConfig::new(dir, settings.unpack_dir.value.clone())
        }),
        (Err(e), None) => Err(e),
    }
}

// === Archive commands ===

#[derive(Serialize)]
pub struct ArchiveList {
    pub dir: PathBuf,
    pub count: usize,
    pub archives: Vec<ArchiveMetadata>,
}

impl Output for ArchiveList {
    fn to_json(&self) -> String {
        json_string(self)
    }

    fn to_human(&self) -> String {
        if self.archives.is_empty() {
            return format!("No archives found in {}.", self.dir.display());
        }
        let mut lines = vec![format!(
            "{} archive(s) in {}:",
            self.count,
            self.dir.display()
        )];
        lines.push(String::new());
        for archive in &self.archives {
            let unpacked = if archive.unpacked_path.is_some() {
                " (unpacked)"
            } else {
                ""
            };
            lines.push(format!(
                "  {}  {}  {:>9}  {}{}",
                archive.id,
                date(&archive.created),
                human_size(archive.size),
                archive.format,
                unpacked
            ));
        }
        lines.join("\n")
    }
}

/// List archives sorted by `sort` ("date" newest first, or "size" largest first).
pub fn archive_list(
    settings: &ResolvedSettings,
    sort: &str,
    limit: Option<usize>,
    dir: Option<&Path>,
) -> Result<ArchiveList> {
    let manager = ArchiveManager::new(config_or(settings, dir)?)?;
    let mut archives = manager.list(dir)?;
    match sort {
        "date" => {}
        "size" => archives.sort_by(|a, b| b.size.cmp(&a.size).then_with(|| a.id.cmp(&b.id))),
        other => {
            return Err(Error::InvalidInput(format!(
                "Unknown sort order: {} (expected date or size)",
                other
            )));
        }
    }
    if let Some(limit) = limit {
        archives.truncate(limit);
    }
    Ok(ArchiveList {
        dir: dir.unwrap_or(manager.config().archive_dir.as_path()).to_path_buf(),
        count: archives.len(),
        archives,
    })
}

#[derive(Serialize)]
pub struct ArchiveLoaded {
    pub archive: ArchiveMetadata,
    pub data_path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layout: Option<LayoutKind>,
    pub counts: EntityCounts,
}

impl Output for ArchiveLoaded {
    fn to_json(&self) -> String {
        json_string(self)
    }

    fn to_human(&self) -> String {
        let mut lines = vec![format!("Loaded archive {}", self.archive.id)];
        lines.push(format!("  File: {}", self.archive.path.display()));
        lines.push(format!("  Created: {}", date(&self.archive.created)));
        lines.push(format!("  Size: {}", human_size(self.archive.size)));
        lines.push(format!("  Data: {}", self.data_path.display()));
        if let Some(layout) = self.layout {
            lines.push(format!("  Layout: {}", layout));
        }
        lines.push(format!(
            "  {} boards, {} cards, {} placements, {} connections",
            self.counts.boards, self.counts.cards, self.counts.placements, self.counts.connections
        ));
        lines.join("\n")
    }
}

/// Load an archive by path or id and report what it contains.
pub fn archive_load(
    settings: &ResolvedSettings,
    path: Option<&Path>,
    id: Option<&str>,
    no_unpack: bool,
) -> Result<ArchiveLoaded> {
    let parent = path.and_then(Path::parent);
    let mut manager = ArchiveManager::new(config_or(settings, parent)?)?;
    let unpack = manager.config().auto_unpack && !no_unpack;
    let archive = match (path, id) {
        (Some(path), _) => manager.load_with(path, unpack)?,
        (None, Some(id)) => {
            let found = manager
                .metadata(id)?
                .ok_or_else(|| Error::NotFound(format!("Archive not found: {}", id)))?;
            manager.load_with(&found.path, unpack)?
        }
        (None, None) => {
            return Err(Error::InvalidInput(
                "Either --path or --id is required".to_string(),
            ));
        }
    };

    let data_path = archive.data_path();
    let mut store = EntityStore::new();
    let counts = if archive.is_compressed() && archive.unpacked_path.is_none() {
        EntityCounts::default()
    } else {
        store.load(&data_path)?;
        store.counts()
    };
    Ok(ArchiveLoaded {
        layout: store.layout(),
        archive,
        data_path,
        counts,
    })
}

#[derive(Serialize)]
pub struct FailedRemoval {
    pub id: String,
    pub path: PathBuf,
    pub error: String,
}

#[derive(Serialize)]
pub struct CleanupResult {
    pub max_archives: usize,
    pub kept: usize,
    pub removed: Vec<ArchiveMetadata>,
    pub failed: Vec<FailedRemoval>,
}

impl Output for CleanupResult {
    fn to_json(&self) -> String {
        json_string(self)
    }

    fn to_human(&self) -> String {
        if self.removed.is_empty() && self.failed.is_empty() {
            return format!(
                "Nothing to clean up ({} archive(s), limit {}).",
                self.kept, self.max_archives
            );
        }
        let mut lines = vec![format!(
            "Kept {} archive(s), removed {}.",
            self.kept,
            self.removed.len()
        )];
        for archive in &self.removed {
            lines.push(format!("  - {} ({})", archive.id, date(&archive.created)));
        }
        if !self.failed.is_empty() {
            lines.push(format!("Failed to remove {}:", self.failed.len()));
            for failure in &self.failed {
                lines.push(format!("  ! {}: {}", failure.id, failure.error));
            }
        }
        lines.join("\n")
    }
}

/// Delete the oldest archives beyond the configured retention count.
pub fn archive_cleanup(settings: &ResolvedSettings) -> Result<CleanupResult> {
    let mut manager = ArchiveManager::new(session_config(settings)?)?;
    let report = manager.cleanup_old_archives()?;
    Ok(CleanupResult {
        max_archives: settings.max_archives.value,
        kept: report.kept,
        removed: report.removed,
        failed: report
            .failed
            .into_iter()
            .map(|(archive, error)| FailedRemoval {
                id: archive.id,
                path: archive.path,
                error,
            })
            .collect(),
    })
}

impl Output for ArchiveEvent {
    fn to_json(&self) -> String {
        json_string(self)
    }

    fn to_human(&self) -> String {
        let detail = match self {
            ArchiveEvent::LoadStarted { path }
            | ArchiveEvent::ArchiveAdded { path }
            | ArchiveEvent::ArchiveChanged { path } => path.display().to_string(),
            ArchiveEvent::LoadCompleted { archive } | ArchiveEvent::ArchiveRemoved { archive } => {
                format!("{} ({})", archive.id, archive.path.display())
            }
            ArchiveEvent::LoadFailed { path, error } => {
                format!("{}: {}", path.display(), error)
            }
            ArchiveEvent::WatchStarted { dir } | ArchiveEvent::WatchStopped { dir } => {
                dir.display().to_string()
            }
            ArchiveEvent::WatchError { error } => error.clone(),
            ArchiveEvent::RemoveFailed { archive, error } => {
                format!("{}: {}", archive.id, error)
            }
        };
        format!("[{}] {} {}", Utc::now().format("%H:%M:%S"), self.name(), detail)
    }
}

/// Watch the archive directory until Ctrl-C, handing every lifecycle event to
/// `emit`. With `load`, newly added archives are loaded as they appear.
///
/// Must run on a multi-threaded runtime: loads block the current worker.
pub async fn archive_watch<F>(settings: &ResolvedSettings, load: bool, mut emit: F) -> Result<()>
where
    F: FnMut(&ArchiveEvent),
{
    let config = session_config(settings)?;
    let mut manager = ArchiveManager::new(config.clone())?;
    let mut rx = manager.subscribe();
    manager.reconfigure(ManagerConfig {
        watch: true,
        ..config
    })?;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            signal = &mut ctrl_c => {
                signal?;
                break;
            }
            received = rx.recv() => {
                match received {
                    Ok(event) => {
                        emit(&event);
                        if let (true, ArchiveEvent::ArchiveAdded { path }) = (load, &event) {
                            let path = path.clone();
                            tokio::task::block_in_place(|| load_added(&mut manager, &path));
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "event listener fell behind");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }
    }

    manager.unwatch();
    while let Ok(event) = rx.try_recv() {
        emit(&event);
    }
    Ok(())
}

/// Load an archive that just appeared. Failures already go out as
/// `LoadFailed` events, so they are only logged here.
fn load_added(manager: &mut ArchiveManager, path: &Path) -> Option<ArchiveMetadata> {
    match manager.load(path) {
        Ok(archive) => Some(archive),
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "follow-up load failed");
            None
        }
    }
}

impl Output for ArchiveComparison {
    fn to_json(&self) -> String {
        json_string(self)
    }

    fn to_human(&self) -> String {
        let mut lines = vec![format!("Comparing {} -> {}", self.first.id, self.second.id)];
        if let (Some(id), Some(name)) = (&self.board_id, &self.board) {
            lines.push(format!("Board: {} ({})", name, id));
        }
        lines.push(String::new());
        let signed = |n: i64| if n > 0 { format!("+{}", n) } else { n.to_string() };
        if let (Some(before), Some(after), Some(added)) =
            (self.before.boards, self.after.boards, self.changes.boards_added)
        {
            lines.push(format!(
                "  Boards:      {} -> {} ({})",
                before,
                after,
                signed(added)
            ));
        }
        lines.push(format!(
            "  Cards:       {} -> {} ({})",
            self.before.cards,
            self.after.cards,
            signed(self.changes.cards_added)
        ));
        lines.push(format!(
            "  Connections: {} -> {} ({})",
            self.before.connections,
            self.after.connections,
            signed(self.changes.connections_added)
        ));
        if let Some(path) = &self.exported_to {
            lines.push(String::new());
            lines.push(format!("Written to {}", path.display()));
        }
        lines.join("\n")
    }
}

pub fn archive_diff(
    settings: &ResolvedSettings,
    first: &str,
    second: &str,
    board_id: Option<&str>,
    out: Option<&Path>,
) -> Result<ArchiveComparison> {
    let mut manager = ArchiveManager::new(session_config(settings)?)?;
    analysis::compare_archives(&mut manager, first, second, board_id, out)
}

// === Search commands ===

/// Parse a `--from`/`--to` date: RFC 3339, or `YYYY-MM-DD` meaning the start
/// (or with `end_of_day`, the last instant) of that UTC day.
pub fn parse_date(s: &str, end_of_day: bool) -> Result<DateTime<Utc>> {
    if let Ok(time) = DateTime::parse_from_rfc3339(s) {
        return Ok(time.with_timezone(&Utc));
    }
    let day = NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| {
        Error::InvalidInput(format!(
            "Invalid date '{}' (expected YYYY-MM-DD or RFC 3339)",
            s
        ))
    })?;
    let time = if end_of_day {
        day.and_hms_nano_opt(23, 59, 59, 999_999_999)
    } else {
        day.and_hms_opt(0, 0, 0)
    };
    time.map(|t| t.and_utc())
        .ok_or_else(|| Error::InvalidInput(format!("Invalid date '{}'", s)))
}

/// Build the creation-date window. An open side is unbounded.
pub fn date_range(from: Option<&str>, to: Option<&str>) -> Result<Option<DateRange>> {
    if from.is_none() && to.is_none() {
        return Ok(None);
    }
    let start = from
        .map(|s| parse_date(s, false))
        .transpose()?
        .unwrap_or(DateTime::<Utc>::MIN_UTC);
    let end = to
        .map(|s| parse_date(s, true))
        .transpose()?
        .unwrap_or(DateTime::<Utc>::MAX_UTC);
    if start > end {
        return Err(Error::InvalidInput(
            "--from must not be after --to".to_string(),
        ));
    }
    Ok(Some(DateRange::new(start, end)))
}

fn search_query(query: Option<&str>, from: Option<&str>, to: Option<&str>) -> Result<SearchQuery> {
    let mut search = SearchQuery::new();
    if let Some(q) = query {
        search = search.with_query(q);
    }
    if let Some(range) = date_range(from, to)? {
        search = search.with_date_range(range);
    }
    Ok(search)
}

#[derive(Serialize)]
pub struct BoardList {
    pub archive: String,
    pub count: usize,
    pub boards: Vec<Board>,
}

impl Output for BoardList {
    fn to_json(&self) -> String {
        json_string(self)
    }

    fn to_human(&self) -> String {
        if self.boards.is_empty() {
            return "No boards found.".to_string();
        }
        let mut lines = vec![format!("{} board(s):", self.count), String::new()];
        for board in &self.boards {
            lines.push(format!(
                "  {}  {}  (created {})",
                board.id,
                board.name,
                date(&board.created_time)
            ));
        }
        lines.join("\n")
    }
}

pub fn search_boards(
    session: &Session,
    query: Option<&str>,
    from: Option<&str>,
    to: Option<&str>,
) -> Result<BoardList> {
    let boards = session.engine.search_boards(&search_query(query, from, to)?)?;
    Ok(BoardList {
        archive: session.archive.id.clone(),
        count: boards.len(),
        boards,
    })
}

#[derive(Serialize)]
pub struct CardList {
    pub archive: String,
    pub count: usize,
    pub cards: Vec<Card>,
}

fn card_lines(cards: &[Card]) -> Vec<String> {
    cards
        .iter()
        .map(|card| {
            format!(
                "  {}  {}  (created {})",
                card.id,
                card.display_title(),
                date(&card.created_time)
            )
        })
        .collect()
}

impl Output for CardList {
    fn to_json(&self) -> String {
        json_string(self)
    }

    fn to_human(&self) -> String {
        if self.cards.is_empty() {
            return "No cards found.".to_string();
        }
        let mut lines = vec![format!("{} card(s):", self.count), String::new()];
        lines.extend(card_lines(&self.cards));
        lines.join("\n")
    }
}

pub fn search_cards(
    session: &Session,
    query: Option<&str>,
    board_id: Option<&str>,
    from: Option<&str>,
    to: Option<&str>,
) -> Result<CardList> {
    let mut search = search_query(query, from, to)?;
    if let Some(id) = board_id {
        search = search.with_board(id);
    }
    let cards = session.engine.search_cards(&search)?;
    Ok(CardList {
        archive: session.archive.id.clone(),
        count: cards.len(),
        cards,
    })
}

// === Board commands ===

impl Output for BoardView {
    fn to_json(&self) -> String {
        json_string(self)
    }

    fn to_human(&self) -> String {
        let board = &self.board;
        let mut lines = vec![format!("{} ({})", board.name, board.id)];
        lines.push(format!("  Created: {} by {}", date(&board.created_time), board.created_by));
        lines.push(format!("  Modified: {}", date(&board.last_edited_time)));
        if board.is_trashed {
            lines.push("  Trashed".to_string());
        }
        if let Some(cards) = &self.cards {
            lines.push(String::new());
            lines.push(format!("Cards ({}):", cards.len()));
            lines.extend(card_lines(cards));
        }
        if let Some(connections) = &self.connections {
            lines.push(String::new());
            lines.push(format!("Connections ({}):", connections.len()));
            for connection in connections {
                lines.push(format!(
                    "  {}  {} -> {}",
                    connection.id, connection.begin_id, connection.end_id
                ));
            }
        }
        lines.join("\n")
    }
}

pub fn board_show(session: &Session, id: &str, cards: bool, connections: bool) -> Result<BoardView> {
    session.engine.board(id, BoardInclude { cards, connections })
}

impl Output for ExportReport {
    fn to_json(&self) -> String {
        json_string(self)
    }

    fn to_human(&self) -> String {
        format!(
            "Exported board {} as {} to {} ({} cards, {} connections, {} bytes)",
            self.board_id,
            self.format,
            self.path.display(),
            self.cards,
            self.connections,
            self.bytes
        )
    }
}

pub fn board_export(
    session: &Session,
    id: &str,
    out: &Path,
    format: &str,
    no_cards: bool,
    connections: bool,
    metadata: bool,
) -> Result<ExportReport> {
    let format = ExportFormat::from_str(format)
        .ok_or_else(|| Error::InvalidInput(format!("Unknown export format: {}", format)))?;
    let options = ExportOptions {
        format,
        include_cards: !no_cards,
        include_connections: connections,
        include_metadata: metadata,
        ..ExportOptions::new(id, out)
    };
    export::export_board(&session.engine, &options)
}

impl Output for BoardSummary {
    fn to_json(&self) -> String {
        json_string(self)
    }

    fn to_human(&self) -> String {
        self.text.clone()
    }
}

pub fn board_summarize(session: &Session, id: &str, format: &str, stats: bool) -> Result<BoardSummary> {
    let format = SummaryFormat::from_str(format)
        .ok_or_else(|| Error::InvalidInput(format!("Unknown summary format: {}", format)))?;
    export::summarize_board(&session.engine, id, format, stats)
}

// === Card commands ===

#[derive(Serialize)]
pub struct CardDetails {
    pub card: Card,
    pub placements: Vec<Placement>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub boards: Option<Vec<Board>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connections: Option<Vec<Connection>>,
    /// Content rendered as markdown or HTML when requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rendered: Option<String>,
}

impl Output for CardDetails {
    fn to_json(&self) -> String {
        json_string(self)
    }

    fn to_human(&self) -> String {
        let card = &self.card;
        let mut lines = vec![format!("{} ({})", card.display_title(), card.id)];
        lines.push(format!("  Created: {} by {}", date(&card.created_time), card.created_by));
        lines.push(format!("  Modified: {}", date(&card.last_edited_time)));
        lines.push(format!("  Placements: {}", self.placements.len()));
        if let Some(boards) = &self.boards {
            let names: Vec<&str> = boards.iter().map(|b| b.name.as_str()).collect();
            lines.push(format!("  Boards: {}", names.join(", ")));
        }
        if let Some(connections) = &self.connections {
            lines.push(format!("  Connections: {}", connections.len()));
        }
        lines.push(String::new());
        match &self.rendered {
            Some(rendered) => lines.push(rendered.trim_end().to_string()),
            None => lines.push(render::plain_text(&card.content)),
        }
        lines.join("\n")
    }
}

pub fn card_show(session: &Session, id: &str, format: &str, related: bool) -> Result<CardDetails> {
    let mut details = if related {
        let related = session.engine.card_with_related(id)?;
        CardDetails {
            card: related.card,
            placements: related.placements,
            boards: Some(related.boards),
            connections: Some(related.connections),
            rendered: None,
        }
    } else {
        let view = session.engine.card(id)?;
        CardDetails {
            card: view.card,
            placements: view.placements,
            boards: None,
            connections: None,
            rendered: None,
        }
    };
    details.rendered = match format {
        "json" => None,
        "markdown" => Some(render::to_markdown(&details.card.content)),
        "html" => Some(render::to_html(&details.card.content)),
        other => {
            return Err(Error::InvalidInput(format!("Unknown card format: {}", other)));
        }
    };
    Ok(details)
}

#[derive(Serialize)]
pub struct CardContent {
    pub id: String,
    pub format: String,
    pub content: Value,
}

impl Output for CardContent {
    fn to_json(&self) -> String {
        json_string(self)
    }

    fn to_human(&self) -> String {
        match &self.content {
            Value::String(s) => s.trim_end().to_string(),
            other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
        }
    }
}

/// A card's content as stored (`raw`), rendered (`markdown`) or parsed (`json`).
pub fn card_content(session: &Session, id: &str, format: &str) -> Result<CardContent> {
    let card = session.engine.card(id)?.card;
    let content = match format {
        "raw" => Value::String(card.content),
        "markdown" => Value::String(render::to_markdown(&card.content)),
        "json" => serde_json::to_value(render::Document::parse(&card.content)?)?,
        other => {
            return Err(Error::InvalidInput(format!("Unknown content format: {}", other)));
        }
    };
    Ok(CardContent {
        id: id.to_string(),
        format: format.to_string(),
        content,
    })
}

#[derive(Serialize)]
pub struct AreaResult {
    pub board_id: String,
    pub x: f64,
    pub y: f64,
    pub radius: f64,
    pub count: usize,
    pub cards: Vec<Card>,
}

impl Output for AreaResult {
    fn to_json(&self) -> String {
        json_string(self)
    }

    fn to_human(&self) -> String {
        let header = format!(
            "{} card(s) within {} of ({}, {}) on {}",
            self.count, self.radius, self.x, self.y, self.board_id
        );
        if self.cards.is_empty() {
            return header;
        }
        let mut lines = vec![header, String::new()];
        lines.extend(card_lines(&self.cards));
        lines.join("\n")
    }
}

pub fn card_area(session: &Session, board_id: &str, x: f64, y: f64, radius: f64) -> Result<AreaResult> {
    if !radius.is_finite() || radius < 0.0 {
        return Err(Error::InvalidInput(format!(
            "Radius must be a non-negative number, got {}",
            radius
        )));
    }
    let cards = session.engine.cards_by_area(board_id, x, y, radius);
    Ok(AreaResult {
        board_id: board_id.to_string(),
        x,
        y,
        radius,
        count: cards.len(),
        cards,
    })
}

// === Analysis ===

impl Output for GraphReport {
    fn to_json(&self) -> String {
        json_string(self)
    }

    fn to_human(&self) -> String {
        let mut lines = Vec::new();
        match (&self.board_id, &self.board) {
            (Some(id), Some(name)) => lines.push(format!("Graph of board {} ({})", name, id)),
            _ => lines.push(format!(
                "Graph of all {} board(s)",
                self.boards.unwrap_or_default()
            )),
        }
        lines.push(format!("  Nodes: {}", self.nodes));
        lines.push(format!("  Edges: {}", self.edges));
        let metrics = &self.metrics;
        if let Some(density) = metrics.density {
            lines.push(format!("  Density: {:.4}", density));
        }
        if let Some(clustering) = metrics.clustering {
            lines.push(format!("  Average clustering: {:.4}", clustering));
        }
        if let Some(components) = &metrics.components {
            lines.push(format!("  Components: {}", components.len()));
        }
        if metrics.centrality.is_some() {
            lines.push("  Most connected:".to_string());
            for (id, degree) in metrics.most_central(5) {
                lines.push(format!("    {} ({})", id, degree));
            }
        }
        if let Some(path) = &self.exported_to {
            lines.push(format!("Written to {}", path.display()));
        }
        lines.join("\n")
    }
}

/// Graph metrics; every metric when none is named.
pub fn analyze(
    session: &Session,
    board_id: Option<&str>,
    metrics: &[String],
    out: Option<&Path>,
) -> Result<GraphReport> {
    let mut selected = metrics
        .iter()
        .map(|m| {
            Metric::from_str(m).ok_or_else(|| Error::InvalidInput(format!("Unknown metric: {}", m)))
        })
        .collect::<Result<Vec<_>>>()?;
    if selected.is_empty() {
        selected = vec![
            Metric::Centrality,
            Metric::Clustering,
            Metric::Density,
            Metric::Components,
        ];
    }
    selected.dedup();
    analysis::analyze_graph(&session.engine, board_id, &selected, out)
}

// === Config and debug ===

impl Output for ResolvedSettings {
    fn to_json(&self) -> String {
        json_string(self)
    }

    fn to_human(&self) -> String {
        let mut lines = vec![match &self.config_path {
            Some(path) => format!("Config file: {}", path.display()),
            None => "Config file: (none)".to_string(),
        }];
        lines.push(String::new());
        match &self.archive_dir {
            Some(dir) => lines.push(format!(
                "  archive-dir    = {} [{}]",
                dir.value.display(),
                dir.source
            )),
            None => lines.push("  archive-dir    = (unset)".to_string()),
        }
        lines.push(format!(
            "  unpack-dir     = {} [{}]",
            self.unpack_dir.value.display(),
            self.unpack_dir.source
        ));
        let flags = [
            ("auto-unpack", &self.auto_unpack),
            ("watch", &self.watch),
            ("keep-unpacked", &self.keep_unpacked),
            ("cache-enabled", &self.cache_enabled),
        ];
        for (name, flag) in flags {
            lines.push(format!("  {:<14} = {} [{}]", name, flag.value, flag.source));
        }
        lines.push(format!(
            "  max-archives   = {} [{}]",
            self.max_archives.value, self.max_archives.source
        ));
        lines.push(format!(
            "  cache-ttl      = {}s [{}]",
            self.cache_ttl.value, self.cache_ttl.source
        ));
        lines.join("\n")
    }
}

#[derive(Serialize)]
pub struct DebugInfo {
    pub version: String,
    pub build_timestamp: String,
    pub git_commit: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archive_dir: Option<PathBuf>,
    pub unpack_dir: PathBuf,
    /// Archives found in the archive directory, if it could be listed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archives: Option<usize>,
}

impl Output for DebugInfo {
    fn to_json(&self) -> String {
        json_string(self)
    }

    fn to_human(&self) -> String {
        let mut lines = vec![format!("bv {}", self.version)];
        lines.push(format!("  Built: {}", self.build_timestamp));
        lines.push(format!("  Commit: {}", self.git_commit));
        let show = |p: &Option<PathBuf>| {
            p.as_ref()
                .map_or_else(|| "(none)".to_string(), |p| p.display().to_string())
        };
        lines.push(format!("  Config file: {}", show(&self.config_path)));
        lines.push(format!("  Archive dir: {}", show(&self.archive_dir)));
        lines.push(format!("  Unpack dir: {}", self.unpack_dir.display()));
        if let Some(count) = self.archives {
            lines.push(format!("  Archives: {}", count));
        }
        lines.join("\n")
    }
}

pub fn debug_info(settings: &ResolvedSettings) -> DebugInfo {
    let archives = session_config(settings)
        .and_then(ArchiveManager::new)
        .and_then(|manager| manager.list(None))
        .map(|archives| archives.len())
        .ok();
    DebugInfo {
        version: env!("CARGO_PKG_VERSION").to_string(),
        build_timestamp: env!("BV_BUILD_TIMESTAMP").to_string(),
        git_commit: env!("BV_GIT_COMMIT").to_string(),
        config_path: settings.config_path.clone(),
        archive_dir: settings.archive_dir().map(Path::to_path_buf),
        unpack_dir: settings.unpack_dir.value.clone(),
        archives,
    }
}
