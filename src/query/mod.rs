//! Query engine over a loaded [`EntityStore`].
//!
//! Searches exclude trashed records; direct id lookups do not. Board and card
//! searches are cached per query shape when caching is enabled, and every
//! real scan bumps a counter that tests use to observe cache hits.

pub mod cache;

pub use cache::{ResultCache, cache_key};

use crate::models::{Board, Card, Connection, Placement, SearchQuery};
use crate::store::EntityStore;
use crate::{Error, Result};
use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Cache settings for a [`QueryEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    pub cache_enabled: bool,
    pub cache_ttl: Duration,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            cache_enabled: true,
            cache_ttl: cache::DEFAULT_TTL,
        }
    }
}

/// What to resolve alongside a board.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BoardInclude {
    /// Resolve the board's placements to their cards
    pub cards: bool,
    /// Include connections drawn on the board
    pub connections: bool,
}

/// A board with optionally resolved contents.
#[derive(Debug, Clone, Serialize)]
pub struct BoardView {
    pub board: Board,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cards: Option<Vec<Card>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connections: Option<Vec<Connection>>,
}

/// A card with every placement that references it.
#[derive(Debug, Clone, Serialize)]
pub struct CardView {
    pub card: Card,
    pub placements: Vec<Placement>,
}

/// A card with its placements, the boards it sits on and its connections.
#[derive(Debug, Clone, Serialize)]
pub struct RelatedCard {
    pub card: Card,
    pub placements: Vec<Placement>,
    pub boards: Vec<Board>,
    pub connections: Vec<Connection>,
}

#[derive(Debug)]
pub struct QueryEngine {
    store: EntityStore,
    board_cache: Option<ResultCache<Vec<Board>>>,
    card_cache: Option<ResultCache<Vec<Card>>>,
    scans: AtomicUsize,
}

impl QueryEngine {
    pub fn new(options: EngineOptions) -> Self {
        Self::with_store(EntityStore::new(), options)
    }

    pub fn with_store(store: EntityStore, options: EngineOptions) -> Self {
        let (board_cache, card_cache) = if options.cache_enabled {
            (
                Some(ResultCache::new(options.cache_ttl)),
                Some(ResultCache::new(options.cache_ttl)),
            )
        } else {
            (None, None)
        };
        Self {
            store,
            board_cache,
            card_cache,
            scans: AtomicUsize::new(0),
        }
    }

    /// Replace the dataset and drop every cached result.
    pub fn load(&mut self, path: &Path) -> Result<()> {
        self.store.load(path)?;
        self.clear_cache();
        Ok(())
    }

    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    pub fn clear_cache(&self) {
        if let Some(cache) = &self.board_cache {
            cache.clear();
        }
        if let Some(cache) = &self.card_cache {
            cache.clear();
        }
    }

    /// Number of table scans performed by searches so far.
    pub fn scan_count(&self) -> usize {
        self.scans.load(Ordering::Relaxed)
    }

    pub fn search_boards(&self, query: &SearchQuery) -> Result<Vec<Board>> {
        let key = cache_key("boards", query)?;
        if let Some(hit) = self.board_cache.as_ref().and_then(|c| c.get(&key)) {
            tracing::debug!(%key, "board search cache hit");
            return Ok(hit);
        }

        self.scans.fetch_add(1, Ordering::Relaxed);
        let needle = query.query.as_deref().map(str::to_lowercase);
        let boards: Vec<Board> = self
            .store
            .boards()
            .filter(|b| {
                needle
                    .as_deref()
                    .is_none_or(|n| b.name.to_lowercase().contains(n))
            })
            .filter(|b| {
                query
                    .date_range
                    .is_none_or(|range| range.contains(&b.created_time))
            })
            .cloned()
            .collect();
        tracing::debug!(%key, results = boards.len(), "board search scan");

        if let Some(cache) = &self.board_cache {
            cache.set(key, boards.clone());
        }
        Ok(boards)
    }

    pub fn search_cards(&self, query: &SearchQuery) -> Result<Vec<Card>> {
        let key = cache_key("cards", query)?;
        if let Some(hit) = self.card_cache.as_ref().and_then(|c| c.get(&key)) {
            tracing::debug!(%key, "card search cache hit");
            return Ok(hit);
        }

        self.scans.fetch_add(1, Ordering::Relaxed);
        let needle = query.query.as_deref().map(str::to_lowercase);
        let on_board: Option<HashSet<&str>> = query.board_id.as_deref().map(|board_id| {
            self.store
                .placements_on_board(board_id)
                .map(|p| p.card_id.as_str())
                .collect()
        });
        let cards: Vec<Card> = self
            .store
            .cards()
            .filter(|c| needle.as_deref().is_none_or(|n| card_matches(c, n)))
            .filter(|c| {
                on_board
                    .as_ref()
                    .is_none_or(|ids| ids.contains(c.id.as_str()))
            })
            .filter(|c| {
                query
                    .date_range
                    .is_none_or(|range| range.contains(&c.created_time))
            })
            .cloned()
            .collect();
        tracing::debug!(%key, results = cards.len(), "card search scan");

        if let Some(cache) = &self.card_cache {
            cache.set(key, cards.clone());
        }
        Ok(cards)
    }

    /// Fetch a board, optionally resolving its cards and connections.
    ///
    /// Placements whose card cannot be resolved are dropped; a card placed
    /// several times on the board is listed once.
    pub fn board(&self, id: &str, include: BoardInclude) -> Result<BoardView> {
        let board = self
            .store
            .board(id)
            .ok_or_else(|| Error::NotFound(format!("Board not found: {}", id)))?;

        let cards = include.cards.then(|| {
            let mut seen = HashSet::new();
            self.store
                .placements_on_board(id)
                .filter_map(|p| self.store.card(&p.card_id))
                .filter(|c| seen.insert(c.id.as_str()))
                .cloned()
                .collect()
        });
        let connections = include
            .connections
            .then(|| self.store.connections_on_board(id).cloned().collect());

        Ok(BoardView {
            board: board.clone(),
            cards,
            connections,
        })
    }

    pub fn card(&self, id: &str) -> Result<CardView> {
        let card = self.find_card(id)?;
        Ok(CardView {
            card: card.clone(),
            placements: self.store.placements_of_card(id).cloned().collect(),
        })
    }

    pub fn card_with_related(&self, id: &str) -> Result<RelatedCard> {
        let card = self.find_card(id)?;
        let placements: Vec<Placement> = self.store.placements_of_card(id).cloned().collect();

        let mut seen = HashSet::new();
        let boards = placements
            .iter()
            .filter(|p| seen.insert(p.board_id.as_str()))
            .filter_map(|p| self.store.board(&p.board_id))
            .cloned()
            .collect();
        let connections = self.connections_for_card(id);

        Ok(RelatedCard {
            card: card.clone(),
            placements,
            boards,
            connections,
        })
    }

    /// Cards placed within `radius` of `(x, y)` on a board, boundary included.
    pub fn cards_by_area(&self, board_id: &str, x: f64, y: f64, radius: f64) -> Vec<Card> {
        self.store
            .placements_on_board(board_id)
            .filter(|p| p.distance_to(x, y) <= radius)
            .filter_map(|p| self.store.card(&p.card_id))
            .cloned()
            .collect()
    }

    /// Connections touching any placement of `card_id`.
    pub fn connections_for_card(&self, card_id: &str) -> Vec<Connection> {
        self.connections(Some(card_id))
    }

    pub fn connections(&self, card_id: Option<&str>) -> Vec<Connection> {
        self.store
            .connections(card_id)
            .into_iter()
            .cloned()
            .collect()
    }

    /// All boards not in the trash.
    pub fn boards(&self) -> Vec<Board> {
        self.store.boards().cloned().collect()
    }

    /// All cards not in the trash.
    pub fn cards(&self) -> Vec<Card> {
        self.store.cards().cloned().collect()
    }

    fn find_card(&self, id: &str) -> Result<&Card> {
        self.store
            .card(id)
            .ok_or_else(|| Error::NotFound(format!("Card not found: {}", id)))
    }
}

impl Default for QueryEngine {
    fn default() -> Self {
        Self::new(EngineOptions::default())
    }
}

fn card_matches(card: &Card, needle: &str) -> bool {
    card.title
        .as_deref()
        .is_some_and(|t| t.to_lowercase().contains(needle))
        || card.content.to_lowercase().contains(needle)
}
