// src/index.rs
//! # Record Index
//! Scans every existing remote record through cursor pagination and builds
//! a first-wins lookup from normalized match key to record id. The index is
//! rebuilt from scratch on every run and never persisted. A page failure
//! degrades to a partial index; it never aborts the run.

use std::collections::{HashMap, HashSet};

use metrics::counter;

use crate::store::{RemoteRecord, RemoteStore};

/// Normalization applied to every key on both sides of a lookup.
pub fn normalize_key(s: &str) -> String {
    s.trim().to_ascii_uppercase()
}

/// How a match key may be derived from a record, tried in `PRIORITY` order;
/// the first strategy that yields a non-empty key wins and the rest are
/// never consulted for that record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStrategy {
    /// The record's designated display/title field.
    Title,
    /// The record's designated tag/symbol field.
    Tag,
    /// Any other text field whose normalized content equals a configured
    /// display key.
    KnownKeyText,
}

impl MatchStrategy {
    pub const PRIORITY: [MatchStrategy; 3] = [
        MatchStrategy::Title,
        MatchStrategy::Tag,
        MatchStrategy::KnownKeyText,
    ];

    pub fn derive(&self, record: &RemoteRecord, known_keys: &HashSet<String>) -> Option<String> {
        match self {
            MatchStrategy::Title => record
                .title
                .as_deref()
                .map(normalize_key)
                .filter(|k| !k.is_empty()),
            MatchStrategy::Tag => record
                .tag
                .as_deref()
                .map(normalize_key)
                .filter(|k| !k.is_empty()),
            MatchStrategy::KnownKeyText => record
                .other_text
                .iter()
                .map(|t| normalize_key(t))
                .find(|k| !k.is_empty() && known_keys.contains(k)),
        }
    }
}

fn derive_match_key(record: &RemoteRecord, known_keys: &HashSet<String>) -> Option<String> {
    MatchStrategy::PRIORITY
        .iter()
        .find_map(|s| s.derive(record, known_keys))
}

/// Lookup from normalized match key to record id. At most one record per
/// key; scan order decides which.
#[derive(Debug, Default, Clone)]
pub struct RecordIndex {
    entries: HashMap<String, String>,
}

impl RecordIndex {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Register `key -> record_id` unless the key is already taken. The
    /// first scanned record keeps the key; collisions are dropped, not
    /// overwritten.
    fn insert_first_wins(&mut self, key: String, record_id: &str) {
        if let Some(existing) = self.entries.get(&key) {
            tracing::warn!(
                key = %key,
                kept = %existing,
                dropped = %record_id,
                "duplicate match key; keeping first scanned record"
            );
            counter!("sync_index_collisions_total").increment(1);
            return;
        }
        self.entries.insert(key, record_id.to_string());
    }

    fn absorb_page(&mut self, records: &[RemoteRecord], known_keys: &HashSet<String>) {
        for rec in records {
            match derive_match_key(rec, known_keys) {
                Some(key) => self.insert_first_wins(key, &rec.id),
                None => {
                    tracing::debug!(record = %rec.id, "record yields no match key");
                }
            }
        }
    }
}

/// Paginate through every record in the store and index it. A failed page
/// fetch breaks the cursor chain, so the scan stops there and whatever was
/// indexed so far is returned.
pub async fn build_index(
    store: &dyn RemoteStore,
    page_size: u32,
    known_keys: &HashSet<String>,
) -> RecordIndex {
    let mut index = RecordIndex::default();
    let mut cursor: Option<String> = None;
    let mut pages = 0usize;

    loop {
        let page = match store.query_page(cursor.as_deref(), page_size).await {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    pages_scanned = pages,
                    "record page fetch failed; continuing with partial index"
                );
                counter!("sync_index_page_errors_total").increment(1);
                break;
            }
        };
        pages += 1;
        index.absorb_page(&page.records, known_keys);
        match page.next_cursor {
            Some(c) => cursor = Some(c),
            None => break,
        }
    }

    tracing::info!(pages, keys = index.len(), "record index built");
    index
}
