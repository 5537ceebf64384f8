//! In-memory entity store.
//!
//! Holds the four entity tables of one loaded dataset, keyed by id. A `load`
//! replaces every table at once; nothing from the previous dataset survives.

pub mod loader;

pub use loader::{Dataset, DatasetSource, LayoutKind, detect_layout};

use crate::Result;
use crate::models::{Board, Card, Connection, Placement};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Entity counts of a loaded dataset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EntityCounts {
    pub boards: usize,
    pub cards: usize,
    pub placements: usize,
    pub connections: usize,
}

/// Unfiltered view of all four tables, trashed records included.
#[derive(Debug, Clone, Copy)]
pub struct RawTables<'a> {
    pub boards: &'a BTreeMap<String, Board>,
    pub cards: &'a BTreeMap<String, Card>,
    pub placements: &'a BTreeMap<String, Placement>,
    pub connections: &'a BTreeMap<String, Connection>,
}

impl RawTables<'_> {
    pub fn counts(&self) -> EntityCounts {
        EntityCounts {
            boards: self.boards.len(),
            cards: self.cards.len(),
            placements: self.placements.len(),
            connections: self.connections.len(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct EntityStore {
    boards: BTreeMap<String, Board>,
    cards: BTreeMap<String, Card>,
    placements: BTreeMap<String, Placement>,
    connections: BTreeMap<String, Connection>,
    source: Option<PathBuf>,
    layout: Option<LayoutKind>,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from already-read collections.
    ///
    /// Duplicate ids are resolved last-write-wins.
    pub fn from_dataset(dataset: Dataset) -> Self {
        Self {
            boards: index(dataset.boards, |b| &b.id),
            cards: index(dataset.cards, |c| &c.id),
            placements: index(dataset.placements, |p| &p.id),
            connections: index(dataset.connections, |c| &c.id),
            source: None,
            layout: None,
        }
    }

    /// Load a dataset from a directory or a combined export file.
    ///
    /// On failure the previously loaded tables are left untouched.
    pub fn load(&mut self, path: &Path) -> Result<()> {
        let source = detect_layout(path)?;
        tracing::debug!(
            path = %source.location().display(),
            layout = %source.kind(),
            "loading dataset"
        );
        let dataset = source.read()?;

        let mut store = Self::from_dataset(dataset);
        store.source = Some(source.location().to_path_buf());
        store.layout = Some(source.kind());
        *self = store;

        let counts = self.counts();
        tracing::info!(
            boards = counts.boards,
            cards = counts.cards,
            placements = counts.placements,
            connections = counts.connections,
            "dataset loaded"
        );
        Ok(())
    }

    /// Where the current dataset was read from, if loaded from disk.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn layout(&self) -> Option<LayoutKind> {
        self.layout
    }

    pub fn is_empty(&self) -> bool {
        self.boards.is_empty()
            && self.cards.is_empty()
            && self.placements.is_empty()
            && self.connections.is_empty()
    }

    /// Boards not in the trash.
    pub fn boards(&self) -> impl Iterator<Item = &Board> {
        self.boards.values().filter(|b| !b.is_trashed)
    }

    /// Cards not in the trash.
    pub fn cards(&self) -> impl Iterator<Item = &Card> {
        self.cards.values().filter(|c| !c.is_trashed)
    }

    /// Look up a board by id, trashed or not.
    pub fn board(&self, id: &str) -> Option<&Board> {
        self.boards.get(id)
    }

    /// Look up a card by id, trashed or not.
    pub fn card(&self, id: &str) -> Option<&Card> {
        self.cards.get(id)
    }

    pub fn placements(&self) -> impl Iterator<Item = &Placement> {
        self.placements.values()
    }

    /// All placements of `card_id`, across every board.
    pub fn placements_of_card<'a>(&'a self, card_id: &'a str) -> impl Iterator<Item = &'a Placement> {
        self.placements.values().filter(move |p| p.card_id == card_id)
    }

    pub fn placements_on_board<'a>(&'a self, board_id: &'a str) -> impl Iterator<Item = &'a Placement> {
        self.placements.values().filter(move |p| p.board_id == board_id)
    }

    /// Connections, optionally restricted to those touching a card.
    ///
    /// A card is matched through its placements: a connection qualifies when
    /// either endpoint is one of the card's placement ids.
    pub fn connections(&self, card_id: Option<&str>) -> Vec<&Connection> {
        match card_id {
            None => self.connections.values().collect(),
            Some(card_id) => {
                let placement_ids: Vec<&str> = self
                    .placements_of_card(card_id)
                    .map(|p| p.id.as_str())
                    .collect();
                self.connections
                    .values()
                    .filter(|c| placement_ids.iter().any(|id| c.touches(id)))
                    .collect()
            }
        }
    }

    pub fn connections_on_board<'a>(&'a self, board_id: &'a str) -> impl Iterator<Item = &'a Connection> {
        self.connections.values().filter(move |c| c.board_id == board_id)
    }

    pub fn raw(&self) -> RawTables<'_> {
        RawTables {
            boards: &self.boards,
            cards: &self.cards,
            placements: &self.placements,
            connections: &self.connections,
        }
    }

    pub fn counts(&self) -> EntityCounts {
        self.raw().counts()
    }
}

fn index<T>(records: Vec<T>, id: impl Fn(&T) -> &String) -> BTreeMap<String, T> {
    let mut table = BTreeMap::new();
    for record in records {
        table.insert(id(&record).clone(), record);
    }
    table
}
