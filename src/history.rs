use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::fs;
use tracing::{debug, warn};

use crate::units::UnitCategory;

/// Records kept on disk, newest first
pub const MAX_HISTORY_ITEMS: usize = 10;
/// How many recent records are checked for a repeat of the same conversion
pub const DUPLICATE_WINDOW: usize = 5;
const VALUE_TOLERANCE: f64 = 0.0001;

/// One saved unit conversion
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ConversionRecord {
    pub id: u64,
    pub category: UnitCategory,
    pub from_value: f64,
    pub from_unit: String,
    pub to_unit: String,
    pub result: String,
    /// Milliseconds since the Unix epoch
    pub ts: u64,
}

/// A conversion about to be recorded; id and timestamp are assigned on push
#[derive(Debug, Clone, PartialEq)]
pub struct NewConversion {
    pub category: UnitCategory,
    pub from_value: f64,
    pub from_unit: String,
    pub to_unit: String,
    pub result: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct HistorySummary {
    pub total_conversions: usize,
    pub category_stats: BTreeMap<String, usize>,
    pub oldest_conversion: Option<u64>,
    pub newest_conversion: Option<u64>,
}

pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

fn is_duplicate(history: &[ConversionRecord], item: &NewConversion) -> bool {
    history.iter().take(DUPLICATE_WINDOW).any(|existing| {
        existing.category == item.category
            && existing.from_unit == item.from_unit
            && existing.to_unit == item.to_unit
            && (existing.from_value - item.from_value).abs() < VALUE_TOLERANCE
    })
}

/// Insert `item` at the front unless it repeats a recent conversion; caps the list
pub fn push_record(history: &mut Vec<ConversionRecord>, item: NewConversion, ts: u64) -> bool {
    if is_duplicate(history, &item) {
        return false;
    }

    let id = history.iter().map(|r| r.id).max().map_or(1, |max| max + 1);
    history.insert(
        0,
        ConversionRecord {
            id,
            category: item.category,
            from_value: item.from_value,
            from_unit: item.from_unit,
            to_unit: item.to_unit,
            result: item.result,
            ts,
        },
    );
    history.truncate(MAX_HISTORY_ITEMS);
    true
}

pub fn summarize(history: &[ConversionRecord]) -> HistorySummary {
    let mut category_stats = BTreeMap::new();
    for record in history {
        *category_stats.entry(record.category.as_str().to_string()).or_insert(0) += 1;
    }
    HistorySummary {
        total_conversions: history.len(),
        category_stats,
        oldest_conversion: history.iter().map(|r| r.ts).min(),
        newest_conversion: history.iter().map(|r| r.ts).max(),
    }
}

/// JSON-file backed conversion history
#[derive(Debug, Clone)]
pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn default_path(dir: &Path) -> PathBuf {
        dir.join(".microtools_history.json")
    }

    /// Load the history, newest first; a missing or unreadable file is an empty history
    pub async fn load(&self) -> Vec<ConversionRecord> {
        let mut history: Vec<ConversionRecord> = match fs::read_to_string(&self.path).await {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                warn!("Ignoring corrupt history file {}: {}", self.path.display(), e);
                Vec::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                warn!("Cannot read history file {}: {}", self.path.display(), e);
                Vec::new()
            }
        };
        history.sort_by(|a, b| b.ts.cmp(&a.ts));
        history
    }

    pub async fn save(&self, history: &[ConversionRecord]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        let content = serde_json::to_string_pretty(history)?;
        fs::write(&self.path, content).await?;
        debug!("Saved {} history records to {}", history.len(), self.path.display());
        Ok(())
    }

    /// Returns false when the conversion repeats a recent one and was not saved
    pub async fn push(&self, item: NewConversion) -> Result<bool> {
        let mut history = self.load().await;
        if !push_record(&mut history, item, now_millis()) {
            return Ok(false);
        }
        self.save(&history).await?;
        Ok(true)
    }

    pub async fn remove(&self, id: u64) -> Result<bool> {
        let mut history = self.load().await;
        let before = history.len();
        history.retain(|r| r.id != id);
        let removed = history.len() != before;
        if removed {
            self.save(&history).await?;
        }
        Ok(removed)
    }

    pub async fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn summary(&self) -> HistorySummary {
        summarize(&self.load().await)
    }
}
