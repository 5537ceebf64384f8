//! Knowledge-graph metrics and archive comparison.
//!
//! Metrics treat connection endpoints as nodes of an undirected graph. Node and
//! edge totals come from the dataset (cards and connections), optionally scoped
//! to one board.

use crate::archive::ArchiveManager;
use crate::models::ArchiveMetadata;
use crate::models::graph::{ConnectionGraph, edge_density};
use crate::query::{BoardInclude, EngineOptions, QueryEngine};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Centrality,
    Clustering,
    Density,
    Components,
}

impl Metric {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "centrality" | "degree" => Some(Self::Centrality),
            "clustering" => Some(Self::Clustering),
            "density" => Some(Self::Density),
            "components" => Some(Self::Components),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Centrality => "centrality",
            Self::Clustering => "clustering",
            Self::Density => "density",
            Self::Components => "components",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Requested metric values; metrics that were not requested stay `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GraphMetrics {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub centrality: Option<BTreeMap<String, usize>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clustering: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub density: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub components: Option<Vec<Vec<String>>>,
}

impl GraphMetrics {
    /// Highest-degree nodes, ties broken by id.
    pub fn most_central(&self, limit: usize) -> Vec<(&str, usize)> {
        let Some(centrality) = &self.centrality else {
            return Vec::new();
        };
        let mut ranked: Vec<(&str, usize)> =
            centrality.iter().map(|(k, v)| (k.as_str(), *v)).collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranked.truncate(limit);
        ranked
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GraphReport {
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub board_id: Option<String>,
    /// Board name when scoped to one board
    #[serde(skip_serializing_if = "Option::is_none")]
    pub board: Option<String>,
    /// Board count when analysing the whole dataset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub boards: Option<usize>,
    pub nodes: usize,
    pub edges: usize,
    pub metrics: GraphMetrics,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exported_to: Option<PathBuf>,
}

/// Compute graph totals and the requested metrics.
///
/// With `board_id`, nodes are the resolvable cards on that board and edges the
/// connections drawn on it. The report is written as JSON to `export_path`
/// when given.
pub fn analyze_graph(
    engine: &QueryEngine,
    board_id: Option<&str>,
    metrics: &[Metric],
    export_path: Option<&Path>,
) -> Result<GraphReport> {
    let (board, boards, nodes, connections) = match board_id {
        Some(id) => {
            let view = engine.board(
                id,
                BoardInclude {
                    cards: true,
                    connections: true,
                },
            )?;
            (
                Some(view.board.name),
                None,
                view.cards.map_or(0, |c| c.len()),
                view.connections.unwrap_or_default(),
            )
        }
        None => (
            None,
            Some(engine.boards().len()),
            engine.cards().len(),
            engine.connections(None),
        ),
    };

    let graph = ConnectionGraph::from_connections(&connections);
    let edges = connections.len();
    let mut values = GraphMetrics::default();
    for metric in metrics {
        match metric {
            Metric::Centrality => values.centrality = Some(graph.degree_centrality()),
            Metric::Clustering => values.clustering = Some(graph.average_clustering()),
            Metric::Density => values.density = Some(edge_density(nodes, edges)),
            Metric::Components => values.components = Some(graph.components()),
        }
    }

    let mut report = GraphReport {
        timestamp: Utc::now(),
        board_id: board_id.map(str::to_string),
        board,
        boards,
        nodes,
        edges,
        metrics: values,
        exported_to: None,
    };
    if let Some(path) = export_path {
        write_report(path, &report)?;
        report.exported_to = Some(path.to_path_buf());
    }
    Ok(report)
}

/// Identity of one side of a comparison.
#[derive(Debug, Clone, Serialize)]
pub struct ArchiveSide {
    pub id: String,
    pub created: DateTime<Utc>,
    pub size: u64,
}

impl From<&ArchiveMetadata> for ArchiveSide {
    fn from(archive: &ArchiveMetadata) -> Self {
        Self {
            id: archive.id.clone(),
            created: archive.created,
            size: archive.size,
        }
    }
}

/// Entity totals of one archive, or of one board within it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub boards: Option<usize>,
    pub cards: usize,
    pub connections: usize,
}

/// Second minus first, per entity type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CountChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub boards_added: Option<i64>,
    pub cards_added: i64,
    pub connections_added: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ArchiveComparison {
    pub timestamp: DateTime<Utc>,
    pub first: ArchiveSide,
    pub second: ArchiveSide,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub board_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub board: Option<String>,
    pub before: Snapshot,
    pub after: Snapshot,
    pub changes: CountChanges,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exported_to: Option<PathBuf>,
}

/// Compare two archives by entity counts.
///
/// Each archive is loaded into its own engine, so neither comparison side
/// nor any caller-held engine observes the other dataset.
pub fn compare_archives(
    manager: &mut ArchiveManager,
    first_id: &str,
    second_id: &str,
    board_id: Option<&str>,
    export_path: Option<&Path>,
) -> Result<ArchiveComparison> {
    let first = resolve_archive(manager, first_id)?;
    let second = resolve_archive(manager, second_id)?;

    let (before, board) = snapshot(&load_engine(manager, &first)?, board_id)?;
    let (after, _) = snapshot(&load_engine(manager, &second)?, board_id)?;

    let changes = CountChanges {
        boards_added: before
            .boards
            .zip(after.boards)
            .map(|(b, a)| a as i64 - b as i64),
        cards_added: after.cards as i64 - before.cards as i64,
        connections_added: after.connections as i64 - before.connections as i64,
    };

    let mut comparison = ArchiveComparison {
        timestamp: Utc::now(),
        first: ArchiveSide::from(&first),
        second: ArchiveSide::from(&second),
        board_id: board_id.map(str::to_string),
        board,
        before,
        after,
        changes,
        exported_to: None,
    };
    if let Some(path) = export_path {
        write_report(path, &comparison)?;
        comparison.exported_to = Some(path.to_path_buf());
    }
    Ok(comparison)
}

fn resolve_archive(manager: &ArchiveManager, id: &str) -> Result<ArchiveMetadata> {
    manager
        .metadata(id)?
        .ok_or_else(|| Error::NotFound(format!("Archive not found: {}", id)))
}

fn load_engine(manager: &mut ArchiveManager, archive: &ArchiveMetadata) -> Result<QueryEngine> {
    let loaded = manager.load(&archive.path)?;
    let mut engine = QueryEngine::new(EngineOptions {
        cache_enabled: false,
        ..EngineOptions::default()
    });
    engine.load(&loaded.data_path())?;
    Ok(engine)
}

fn snapshot(engine: &QueryEngine, board_id: Option<&str>) -> Result<(Snapshot, Option<String>)> {
    match board_id {
        Some(id) => {
            let view = engine.board(
                id,
                BoardInclude {
                    cards: true,
                    connections: true,
                },
            )?;
            let snapshot = Snapshot {
                boards: None,
                cards: view.cards.map_or(0, |c| c.len()),
                connections: view.connections.map_or(0, |c| c.len()),
            };
            Ok((snapshot, Some(view.board.name)))
        }
        None => Ok((
            Snapshot {
                boards: Some(engine.boards().len()),
                cards: engine.cards().len(),
                connections: engine.connections(None).len(),
            },
            None,
        )),
    }
}

/// Write a report as pretty JSON, creating parent directories.
pub fn write_report<T: Serialize>(path: &Path, report: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string_pretty(report)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::ManagerConfig;
    use crate::test_utils::{TestEnv, board, card, connection, engine_for, placement, sample_dataset};
    use serde_json::json;

    const ALL: [Metric; 4] = [
        Metric::Centrality,
        Metric::Clustering,
        Metric::Density,
        Metric::Components,
    ];

    fn triangle_dataset() -> serde_json::Value {
        let cards: Vec<_> = ["a", "b", "c", "d"]
            .iter()
            .map(|&id| card(id, Some(id), "x", "2024-01-01T00:00:00Z", false))
            .collect();
        let placements: Vec<_> = ["a", "b", "c", "d"]
            .iter()
            .map(|&id| placement(&format!("p-{id}"), id, "wb", 0.0, 0.0))
            .collect();
        json!({
            "whiteBoardList": [board("wb", "Triangle", "2024-01-01T00:00:00Z", false)],
            "cardList": cards,
            "cardInstances": placements,
            "connections": [
                connection("e1", "wb", "p-a", "p-b"),
                connection("e2", "wb", "p-b", "p-c"),
                connection("e3", "wb", "p-c", "p-a"),
                connection("e4", "other", "p-c", "p-d"),
            ],
        })
    }

    #[test]
    fn test_whole_dataset_metrics() {
        let engine = engine_for(&triangle_dataset());
        let report = analyze_graph(&engine, None, &ALL, None).unwrap();

        assert_eq!(report.boards, Some(1));
        assert_eq!(report.nodes, 4);
        assert_eq!(report.edges, 4);
        assert_eq!(report.metrics.most_central(1), vec![("p-c", 3)]);
        // a and b: 1.0 each, c: 1/3, d has degree 1
        let clustering = report.metrics.clustering.unwrap();
        assert!((clustering - 7.0 / 9.0).abs() < 1e-9);
        assert!((report.metrics.density.unwrap() - 4.0 / 12.0).abs() < 1e-9);
        assert_eq!(report.metrics.components.as_ref().unwrap().len(), 1);
    }

    #[test]
    fn test_board_scoped_metrics() {
        let engine = engine_for(&triangle_dataset());
        let report = analyze_graph(&engine, Some("wb"), &[Metric::Clustering], None).unwrap();

        assert_eq!(report.board.as_deref(), Some("Triangle"));
        assert_eq!(report.boards, None);
        assert_eq!(report.edges, 3);
        assert_eq!(report.metrics.clustering, Some(1.0));
        assert!(report.metrics.centrality.is_none());
        assert!(report.metrics.density.is_none());
    }

    #[test]
    fn test_density_is_zero_below_two_nodes() {
        let engine = engine_for(&json!({
            "cardList": [card("only", None, "x", "2024-01-01T00:00:00Z", false)],
        }));
        let report = analyze_graph(&engine, None, &[Metric::Density, Metric::Clustering], None).unwrap();
        assert_eq!(report.metrics.density, Some(0.0));
        assert_eq!(report.metrics.clustering, Some(0.0));
    }

    #[test]
    fn test_analysis_export() {
        let engine = engine_for(&sample_dataset());
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("reports/graph.json");
        let report = analyze_graph(&engine, None, &[Metric::Centrality], Some(&path)).unwrap();

        assert_eq!(report.exported_to.as_deref(), Some(path.as_path()));
        let written: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["nodes"], 3);
        assert_eq!(written["metrics"]["centrality"]["pl-1"], 1);
    }

    #[test]
    fn test_unknown_board_fails() {
        let engine = engine_for(&sample_dataset());
        assert!(matches!(
            analyze_graph(&engine, Some("missing"), &ALL, None),
            Err(Error::NotFound(_))
        ));
    }

    fn manager_with_two_archives(env: &TestEnv) -> ArchiveManager {
        env.write_zip("vault-2024-01-01.zip", &sample_dataset());
        let mut newer = sample_dataset();
        newer["cardList"]
            .as_array_mut()
            .unwrap()
            .push(card("card-4", Some("New"), "fresh", "2024-04-01T00:00:00Z", false));
        newer["cardInstances"]
            .as_array_mut()
            .unwrap()
            .push(placement("pl-5", "card-4", "wb-1", 10.0, 10.0));
        newer["connections"]
            .as_array_mut()
            .unwrap()
            .push(connection("conn-2", "wb-1", "pl-2", "pl-5"));
        env.write_zip("vault-2024-02-01.zip", &newer);

        ArchiveManager::new(ManagerConfig::new(env.archive_path(), env.unpack_path())).unwrap()
    }

    #[test]
    fn test_compare_archives() {
        let env = TestEnv::new();
        let mut manager = manager_with_two_archives(&env);

        let diff =
            compare_archives(&mut manager, "vault-2024-01-01", "vault-2024-02-01", None, None).unwrap();
        assert_eq!(diff.before.cards, 3);
        assert_eq!(diff.after.cards, 4);
        assert_eq!(diff.changes.boards_added, Some(0));
        assert_eq!(diff.changes.cards_added, 1);
        assert_eq!(diff.changes.connections_added, 1);
        assert_eq!(diff.first.id, "vault-2024-01-01");
    }

    #[test]
    fn test_compare_archives_on_board() {
        let env = TestEnv::new();
        let mut manager = manager_with_two_archives(&env);

        let diff = compare_archives(
            &mut manager,
            "vault-2024-02-01",
            "vault-2024-01-01",
            Some("wb-1"),
            None,
        )
        .unwrap();
        assert_eq!(diff.board.as_deref(), Some("Research Notes"));
        assert_eq!(diff.changes.boards_added, None);
        assert_eq!(diff.changes.cards_added, -1);
    }

    #[test]
    fn test_compare_unknown_archive() {
        let env = TestEnv::new();
        let mut manager = manager_with_two_archives(&env);
        let err = compare_archives(&mut manager, "vault-2024-01-01", "nope", None, None).unwrap_err();
        assert_eq!(err.to_string(), "Archive not found: nope");
    }
}
