//! Board export and summaries.

use crate::query::{BoardInclude, BoardView, QueryEngine};
use crate::render;
use crate::{Error, Result};
use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Number of card titles listed in a structured summary.
const SUMMARY_TOPICS: usize = 5;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Markdown,
    Json,
    Html,
}

impl ExportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "markdown" | "md" => Some(Self::Markdown),
            "json" => Some(Self::Json),
            "html" => Some(Self::Html),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Markdown => "markdown",
            Self::Json => "json",
            Self::Html => "html",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryFormat {
    #[default]
    Text,
    Structured,
}

impl SummaryFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" => Some(Self::Text),
            "structured" => Some(Self::Structured),
            _ => None,
        }
    }
}

/// What to export and where.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub board_id: String,
    pub output_path: PathBuf,
    pub format: ExportFormat,
    pub include_cards: bool,
    pub include_connections: bool,
    pub include_metadata: bool,
}

impl ExportOptions {
    /// Markdown export with cards, without connections or metadata.
    pub fn new(board_id: impl Into<String>, output_path: impl Into<PathBuf>) -> Self {
        Self {
            board_id: board_id.into(),
            output_path: output_path.into(),
            format: ExportFormat::default(),
            include_cards: true,
            include_connections: false,
            include_metadata: false,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportReport {
    pub board_id: String,
    pub path: PathBuf,
    pub format: ExportFormat,
    pub bytes: usize,
    pub cards: usize,
    pub connections: usize,
    pub include_metadata: bool,
}

/// Render a board and write it to `options.output_path`.
///
/// Parent directories of the output path are created as needed.
pub fn export_board(engine: &QueryEngine, options: &ExportOptions) -> Result<ExportReport> {
    check_output_path(&options.output_path)?;
    let view = engine.board(
        &options.board_id,
        BoardInclude {
            cards: options.include_cards,
            connections: options.include_connections,
        },
    )?;
    let content = render_board(&view, options.format, options.include_metadata)?;

    if let Some(parent) = options.output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(&options.output_path, &content)?;
    tracing::info!(
        board = %options.board_id,
        path = %options.output_path.display(),
        format = %options.format,
        "exported board"
    );

    Ok(ExportReport {
        board_id: options.board_id.clone(),
        path: options.output_path.clone(),
        format: options.format,
        bytes: content.len(),
        cards: view.cards.as_ref().map_or(0, Vec::len),
        connections: view.connections.as_ref().map_or(0, Vec::len),
        include_metadata: options.include_metadata,
    })
}

/// Render a resolved board in the requested format.
pub fn render_board(view: &BoardView, format: ExportFormat, include_metadata: bool) -> Result<String> {
    match format {
        ExportFormat::Markdown => Ok(board_markdown(view, include_metadata)),
        ExportFormat::Html => Ok(board_html(view, include_metadata)),
        ExportFormat::Json => Ok(serde_json::to_string_pretty(view)?),
    }
}

fn board_markdown(view: &BoardView, include_metadata: bool) -> String {
    let board = &view.board;
    let mut lines = vec![format!("# {}", board.name), String::new()];

    if include_metadata {
        lines.push("## Metadata".to_string());
        lines.push(format!("- Created: {}", board.created_time.to_rfc3339()));
        lines.push(format!("- Last Modified: {}", board.last_edited_time.to_rfc3339()));
        lines.push(format!("- Created By: {}", board.created_by));
        lines.push(String::new());
    }

    if let Some(cards) = view.cards.as_ref().filter(|c| !c.is_empty()) {
        lines.push("## Cards".to_string());
        lines.push(String::new());
        for card in cards {
            lines.push(format!("### {}", card.display_title()));
            lines.push(render::to_markdown(&card.content).trim_end().to_string());
            lines.push(String::new());
        }
    }

    if let Some(connections) = view.connections.as_ref().filter(|c| !c.is_empty()) {
        lines.push("## Connections".to_string());
        lines.push(String::new());
        for conn in connections {
            lines.push(format!("- {} → {}", conn.begin_id, conn.end_id));
        }
        lines.push(String::new());
    }

    lines.join("\n")
}

fn board_html(view: &BoardView, include_metadata: bool) -> String {
    let board = &view.board;
    let name = render::escape_html(&board.name);
    let mut lines = vec![
        "<!DOCTYPE html>".to_string(),
        "<html>".to_string(),
        "<head>".to_string(),
        "<meta charset=\"utf-8\">".to_string(),
        format!("<title>{}</title>", name),
        "</head>".to_string(),
        "<body>".to_string(),
        format!("<h1>{}</h1>", name),
    ];

    if include_metadata {
        lines.push("<div class=\"metadata\">".to_string());
        lines.push(format!("<p>Created: {}</p>", board.created_time.to_rfc3339()));
        lines.push(format!("<p>Last Modified: {}</p>", board.last_edited_time.to_rfc3339()));
        lines.push(format!("<p>Created By: {}</p>", render::escape_html(&board.created_by)));
        lines.push("</div>".to_string());
    }

    if let Some(cards) = view.cards.as_ref().filter(|c| !c.is_empty()) {
        lines.push("<h2>Cards</h2>".to_string());
        for card in cards {
            lines.push("<div class=\"card\">".to_string());
            lines.push(format!("<h3>{}</h3>", render::escape_html(card.display_title())));
            lines.push(render::to_html(&card.content));
            lines.push("</div>".to_string());
        }
    }

    if let Some(connections) = view.connections.as_ref().filter(|c| !c.is_empty()) {
        lines.push("<h2>Connections</h2>".to_string());
        lines.push("<ul>".to_string());
        for conn in connections {
            lines.push(format!(
                "<li>{} &rarr; {}</li>",
                render::escape_html(&conn.begin_id),
                render::escape_html(&conn.end_id)
            ));
        }
        lines.push("</ul>".to_string());
    }

    lines.push("</body>".to_string());
    lines.push("</html>".to_string());
    lines.join("\n")
}

/// Word and character totals over the plain text of a board's cards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TextStatistics {
    pub words: usize,
    pub characters: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct BoardSummary {
    pub board_id: String,
    pub name: String,
    pub format: SummaryFormat,
    pub cards: usize,
    pub connections: usize,
    pub titles: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statistics: Option<TextStatistics>,
    /// Rendered summary
    pub text: String,
}

pub fn summarize_board(
    engine: &QueryEngine,
    board_id: &str,
    format: SummaryFormat,
    include_statistics: bool,
) -> Result<BoardSummary> {
    let view = engine.board(
        board_id,
        BoardInclude {
            cards: true,
            connections: true,
        },
    )?;
    let cards = view.cards.unwrap_or_default();
    let connections = view.connections.map_or(0, |c| c.len());
    let titles: Vec<String> = cards.iter().map(|c| c.display_title().to_string()).collect();

    let statistics = include_statistics.then(|| {
        cards
            .iter()
            .map(|c| render::plain_text(&c.content))
            .fold(TextStatistics::default(), |acc, text| TextStatistics {
                words: acc.words + text.split_whitespace().count(),
                characters: acc.characters + text.chars().count(),
            })
    });

    let name = view.board.name;
    let text = match format {
        SummaryFormat::Text => text_summary(&name, &titles, connections, statistics),
        SummaryFormat::Structured => structured_summary(&name, &titles, connections, statistics),
    };

    Ok(BoardSummary {
        board_id: board_id.to_string(),
        name,
        format,
        cards: titles.len(),
        connections,
        titles,
        statistics,
        text,
    })
}

fn text_summary(
    name: &str,
    titles: &[String],
    connections: usize,
    statistics: Option<TextStatistics>,
) -> String {
    let mut lines = vec![
        name.to_string(),
        String::new(),
        format!("Summary: {} cards, {} connections", titles.len(), connections),
        String::new(),
    ];
    if let Some(stats) = statistics {
        lines.push("Statistics:".to_string());
        lines.push(format!("- Word count: {}", stats.words));
        lines.push(format!("- Character count: {}", stats.characters));
        lines.push(String::new());
    }
    if !titles.is_empty() {
        lines.push("Cards:".to_string());
        lines.extend(titles.iter().map(|t| format!("- {}", t)));
    }
    lines.join("\n")
}

fn structured_summary(
    name: &str,
    titles: &[String],
    connections: usize,
    statistics: Option<TextStatistics>,
) -> String {
    let mut lines = vec![
        format!("# Summary: {}", name),
        String::new(),
        "## Overview".to_string(),
        format!("- Total Cards: {}", titles.len()),
        format!("- Total Connections: {}", connections),
        String::new(),
        "## Key Topics".to_string(),
    ];
    lines.extend(titles.iter().take(SUMMARY_TOPICS).map(|t| format!("- {}", t)));
    if titles.len() > SUMMARY_TOPICS {
        lines.push(format!("- ... and {} more", titles.len() - SUMMARY_TOPICS));
    }
    lines.push(String::new());
    lines.push("## Statistics".to_string());
    lines.push(format!("- {} cards", titles.len()));
    lines.push(format!("- {} connections", connections));
    if let Some(stats) = statistics {
        lines.push(format!("- Word count: {}", stats.words));
        lines.push(format!("- Character count: {}", stats.characters));
    }
    lines.join("\n")
}

/// Reject an output path that points at an existing directory.
pub fn check_output_path(path: &Path) -> Result<()> {
    if path.is_dir() {
        return Err(Error::InvalidInput(format!(
            "output path is a directory: {}",
            path.display()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{board, card, engine_for, placement, sample_dataset};
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_export_markdown_creates_parent_dirs() {
        let engine = engine_for(&sample_dataset());
        let dir = TempDir::new().unwrap();
        let mut options = ExportOptions::new("wb-1", dir.path().join("out/nested/board.md"));
        options.include_connections = true;
        options.include_metadata = true;

        let report = export_board(&engine, &options).unwrap();
        assert_eq!(report.cards, 2);
        assert_eq!(report.connections, 1);

        let written = fs::read_to_string(&options.output_path).unwrap();
        assert_eq!(written.len(), report.bytes);
        assert!(written.starts_with("# Research Notes\n"));
        assert!(written.contains("## Metadata"));
        assert!(written.contains("- Created By: user-1"));
        assert!(written.contains("### Rust ownership\nBorrowing rules\n"));
        assert!(written.contains("- pl-1 → pl-2"));
    }

    #[test]
    fn test_export_html_escapes_names() {
        let dataset = json!({
            "whiteBoardList": [board("wb-x", "A <b> & C", "2024-01-01T00:00:00Z", false)],
            "cardList": [card("c-1", Some("<script>"), "body", "2024-01-01T00:00:00Z", false)],
            "cardInstances": [placement("p-1", "c-1", "wb-x", 0.0, 0.0)],
        });
        let engine = engine_for(&dataset);
        let dir = TempDir::new().unwrap();
        let mut options = ExportOptions::new("wb-x", dir.path().join("board.html"));
        options.format = ExportFormat::Html;
        export_board(&engine, &options).unwrap();

        let written = fs::read_to_string(&options.output_path).unwrap();
        assert!(written.contains("<h1>A &lt;b&gt; &amp; C</h1>"));
        assert!(written.contains("<h3>&lt;script&gt;</h3>"));
        assert!(written.contains("<p>body</p>"));
        assert!(!written.contains("<script>"));
    }

    #[test]
    fn test_export_json_round_trips_board() {
        let engine = engine_for(&sample_dataset());
        let dir = TempDir::new().unwrap();
        let mut options = ExportOptions::new("wb-2", dir.path().join("board.json"));
        options.format = ExportFormat::Json;
        options.include_cards = false;
        export_board(&engine, &options).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&options.output_path).unwrap()).unwrap();
        assert_eq!(value["board"]["name"], "Project Plan");
        assert!(value.get("cards").is_none());
    }

    #[test]
    fn test_export_unknown_board_fails() {
        let engine = engine_for(&sample_dataset());
        let dir = TempDir::new().unwrap();
        let options = ExportOptions::new("missing", dir.path().join("x.md"));
        assert!(matches!(export_board(&engine, &options), Err(Error::NotFound(_))));
        assert!(!options.output_path.exists());
    }

    #[test]
    fn test_text_summary_with_statistics() {
        let engine = engine_for(&sample_dataset());
        let summary = summarize_board(&engine, "wb-1", SummaryFormat::Text, true).unwrap();
        assert_eq!(summary.cards, 2);
        assert_eq!(summary.connections, 1);
        // "Borrowing rules" + "Clustering coefficient"
        assert_eq!(
            summary.statistics,
            Some(TextStatistics {
                words: 4,
                characters: 37
            })
        );
        assert!(summary.text.starts_with("Research Notes\n\nSummary: 2 cards, 1 connections\n"));
        assert!(summary.text.ends_with("Cards:\n- Rust ownership\n- Graph theory"));
    }

    #[test]
    fn test_structured_summary_truncates_topics() {
        let cards: Vec<_> = (0..7)
            .map(|i| card(&format!("c-{i}"), Some(&format!("Topic {i}")), "x", "2024-01-01T00:00:00Z", false))
            .collect();
        let placements: Vec<_> = (0..7)
            .map(|i| placement(&format!("p-{i}"), &format!("c-{i}"), "wb", 0.0, 0.0))
            .collect();
        let engine = engine_for(&json!({
            "whiteBoardList": [board("wb", "Big", "2024-01-01T00:00:00Z", false)],
            "cardList": cards,
            "cardInstances": placements,
        }));

        let summary = summarize_board(&engine, "wb", SummaryFormat::Structured, false).unwrap();
        assert!(summary.text.starts_with("# Summary: Big\n"));
        assert!(summary.text.contains("- Topic 4\n- ... and 2 more\n"));
        assert!(!summary.text.contains("Topic 5"));
        assert!(summary.statistics.is_none());
    }

    #[test]
    fn test_export_to_directory_is_rejected() {
        let engine = engine_for(&sample_dataset());
        let dir = TempDir::new().unwrap();
        let options = ExportOptions::new("wb-1", dir.path());
        assert!(matches!(export_board(&engine, &options), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!(ExportFormat::from_str("HTML"), Some(ExportFormat::Html));
        assert_eq!(ExportFormat::from_str("pdf"), None);
        assert_eq!(SummaryFormat::from_str("structured"), Some(SummaryFormat::Structured));
    }
}
