use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::schema::CURRENT_SCHEMA_VERSION;
use crate::catalog::ItemId;

/// Default bound on the undo history kept in a record.
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    #[serde(rename = "seen")]
    Seen,
    #[serde(rename = "notSeen")]
    NotSeen,
}

/// One classification, kept so it can be undone.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: ItemId,
    pub action: Action,
}

/// The canonical progress state of one user through the catalog.
///
/// `seen` and `not_seen` behave as ordered sets: the mutation helpers keep
/// them free of duplicates and disjoint from each other. Records that come
/// from outside (storage, share codes) should pass through
/// [`ProgressRecord::normalize`] before use.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRecord {
    #[serde(default)]
    pub current_index: usize,
    #[serde(default)]
    pub seen: Vec<ItemId>,
    #[serde(default)]
    pub not_seen: Vec<ItemId>,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
    #[serde(default = "current_schema_version")]
    pub version: u64,
}

fn current_schema_version() -> u64 {
    CURRENT_SCHEMA_VERSION
}

impl Default for ProgressRecord {
    fn default() -> Self {
        ProgressRecord {
            current_index: 0,
            seen: Vec::new(),
            not_seen: Vec::new(),
            history: Vec::new(),
            last_updated: None,
            version: CURRENT_SCHEMA_VERSION,
        }
    }
}

impl ProgressRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_seen(&self, id: &ItemId) -> bool {
        self.seen.contains(id)
    }

    pub fn is_not_seen(&self, id: &ItemId) -> bool {
        self.not_seen.contains(id)
    }

    /// Number of classified items.
    pub fn classified(&self) -> usize {
        self.seen.len() + self.not_seen.len()
    }

    /// Classify `id` as seen and advance the cursor.
    pub fn mark_seen(&mut self, id: ItemId, history_limit: usize) {
        self.classify(id, Action::Seen, history_limit);
    }

    /// Classify `id` as not seen and advance the cursor.
    pub fn mark_not_seen(&mut self, id: ItemId, history_limit: usize) {
        self.classify(id, Action::NotSeen, history_limit);
    }

    fn classify(&mut self, id: ItemId, action: Action, history_limit: usize) {
        self.seen.retain(|existing| existing != &id);
        self.not_seen.retain(|existing| existing != &id);
        match action {
            Action::Seen => self.seen.push(id.clone()),
            Action::NotSeen => self.not_seen.push(id.clone()),
        }

        self.history.push(HistoryEntry { id, action });
        self.trim_history(history_limit);
        self.current_index += 1;
    }

    /// Revert the most recent classification. Returns the reverted entry.
    pub fn undo(&mut self) -> Option<HistoryEntry> {
        let entry = self.history.pop()?;
        match entry.action {
            Action::Seen => self.seen.retain(|id| id != &entry.id),
            Action::NotSeen => self.not_seen.retain(|id| id != &entry.id),
        }
        self.current_index = self.current_index.saturating_sub(1);
        Some(entry)
    }

    /// Keep only the most recent `limit` history entries.
    pub fn trim_history(&mut self, limit: usize) {
        if self.history.len() > limit {
            let excess = self.history.len() - limit;
            self.history.drain(..excess);
        }
    }

    /// Drop duplicate ids and resolve ids present in both sets in favour of
    /// `seen`. Returns true if anything changed.
    pub fn normalize(&mut self) -> bool {
        let before = (self.seen.len(), self.not_seen.len());

        let mut kept = HashSet::with_capacity(self.seen.len() + self.not_seen.len());
        self.seen.retain(|id| kept.insert(id.clone()));
        self.not_seen.retain(|id| kept.insert(id.clone()));

        before != (self.seen.len(), self.not_seen.len())
    }

    pub fn stats(&self, catalog_size: usize) -> Stats {
        get_stats(self, catalog_size)
    }
}

/// Summary counters over a record.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Stats {
    pub total: usize,
    pub seen_count: usize,
    pub not_seen_count: usize,
    pub percent_complete: u32,
    pub percent_seen: u32,
    pub remaining: usize,
}

pub fn get_stats(record: &ProgressRecord, catalog_size: usize) -> Stats {
    let total = record.classified();
    let seen_count = record.seen.len();

    Stats {
        total,
        seen_count,
        not_seen_count: record.not_seen.len(),
        percent_complete: rounded_percent(total, catalog_size),
        percent_seen: rounded_percent(seen_count, total),
        remaining: catalog_size.saturating_sub(total),
    }
}

fn rounded_percent(part: usize, whole: usize) -> u32 {
    if whole == 0 {
        return 0;
    }
    (part as f64 / whole as f64 * 100.0).round() as u32
}
