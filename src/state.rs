use std::fs;
use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::parser::filter::parse_price_minor;
use crate::parser::PRICE_UNKNOWN;

/// Bounded memory of previously seen listings plus the heartbeat counter.
/// Loaded once at run start, mutated only at run end, written back atomically
/// at most once per run. Map iteration order is insertion order, which makes
/// FIFO eviction a pop from the front.
#[derive(Debug, Default)]
pub struct MemoryState {
    entries: IndexMap<String, i64>,
    pub run_count: u32,
}

#[derive(Serialize, Deserialize)]
struct StoredItem {
    asin: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    price: Option<StoredPrice>,
}

/// Older state files (and hand-edited ones) store prices as display strings
/// like "¥1,580"; current files store yen as a number.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum StoredPrice {
    Minor(i64),
    Text(String),
}

impl StoredPrice {
    fn normalize(&self) -> i64 {
        match self {
            StoredPrice::Minor(p) => *p,
            StoredPrice::Text(t) => parse_price_minor(t),
        }
    }
}

/// The two tolerated on-disk shapes: a bare array of items (legacy) or the
/// current object with a run counter.
#[derive(Deserialize)]
#[serde(untagged)]
enum StateFile {
    Versioned {
        #[serde(alias = "asins")]
        items: Vec<StoredItem>,
        #[serde(default, alias = "runCounter", alias = "runCount")]
        run_count: u32,
    },
    Legacy(Vec<StoredItem>),
}

#[derive(Serialize)]
struct StateFileOut {
    items: Vec<StoredItem>,
    run_count: u32,
}

impl MemoryState {
    /// Load persisted state. Missing or unreadable files fail open to an
    /// empty state with counter 0 rather than aborting the run.
    pub fn load(path: &Path) -> Self {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("no state file at {}, starting empty", path.display());
                return Self::default();
            }
            Err(e) => {
                warn!("unreadable state file {}: {} (starting empty)", path.display(), e);
                return Self::default();
            }
        };

        match serde_json::from_str::<StateFile>(&raw) {
            Ok(file) => file.into_state(),
            Err(e) => {
                warn!("corrupt state file {}: {} (resetting to empty)", path.display(), e);
                Self::default()
            }
        }
    }

    /// Write state atomically: serialize to a sibling temp file, then rename
    /// over the target, so a crash mid-write never leaves a half-written file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir)
                    .with_context(|| format!("Failed to create {}", dir.display()))?;
            }
        }

        let out = StateFileOut {
            items: self
                .entries
                .iter()
                .map(|(asin, &price)| StoredItem {
                    asin: asin.clone(),
                    price: (price != PRICE_UNKNOWN).then_some(StoredPrice::Minor(price)),
                })
                .collect(),
            run_count: self.run_count,
        };
        let json = serde_json::to_string_pretty(&out)?;

        let tmp = path.with_extension("tmp");
        fs::write(&tmp, json).with_context(|| format!("Failed to write {}", tmp.display()))?;
        fs::rename(&tmp, path)
            .with_context(|| format!("Failed to replace {}", path.display()))?;
        Ok(())
    }

    pub fn price_of(&self, asin: &str) -> Option<i64> {
        self.entries.get(asin).copied()
    }

    pub fn contains(&self, asin: &str) -> bool {
        self.entries.contains_key(asin)
    }

    /// Record the latest observed price. An already-known ASIN keeps its
    /// original insertion position, so eviction stays oldest-first.
    pub fn remember(&mut self, asin: &str, price_minor: i64) {
        self.entries.insert(asin.to_string(), price_minor);
    }

    pub fn enforce_capacity(&mut self, capacity: usize) {
        while self.entries.len() > capacity {
            self.entries.shift_remove_index(0);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries oldest-first.
    pub fn iter(&self) -> impl Iterator<Item = (&str, i64)> {
        self.entries.iter().map(|(asin, &price)| (asin.as_str(), price))
    }

    #[cfg(test)]
    pub fn from_items(items: &[crate::parser::Listing]) -> Self {
        let mut state = Self::default();
        for item in items {
            state.remember(&item.asin, item.price_minor);
        }
        state
    }
}

impl StateFile {
    fn into_state(self) -> MemoryState {
        let (items, run_count) = match self {
            StateFile::Versioned { items, run_count } => (items, run_count),
            StateFile::Legacy(items) => (items, 0),
        };
        let entries = items
            .into_iter()
            .map(|item| {
                let price = item.price.map_or(PRICE_UNKNOWN, |p| p.normalize());
                (item.asin, price)
            })
            .collect();
        MemoryState { entries, run_count }
    }
}

// ── Tests ──
