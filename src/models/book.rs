//! Book catalog data structures.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Raw dataset row as written by the scraper and read back by the loader.
///
/// Every field is tolerant on deserialization: missing text fields become
/// empty strings and a missing or non-numeric rating becomes 0, so a partially
/// hand-edited dataset file still loads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookRow {
    #[serde(default)]
    pub title: String,

    /// Price text as scraped, currency prefix included (e.g. "£51.77").
    #[serde(default)]
    pub price: String,

    #[serde(default, deserialize_with = "lenient_rating")]
    pub rating: u8,

    #[serde(default)]
    pub availability: String,

    #[serde(default)]
    pub category: String,

    #[serde(default)]
    pub image_url: String,
}

/// One catalog entry.
///
/// The `id` is the 1-based position of the row within the loaded snapshot.
/// Ids are re-derived on every load, so a re-scrape that reorders the source
/// can renumber books.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookRecord {
    pub id: u32,
    pub title: String,
    pub price: String,
    pub rating: u8,
    pub availability: String,
    pub category: String,
    pub image_url: String,
}

impl BookRecord {
    /// Whether the availability text indicates the book is in stock.
    pub fn in_stock(&self) -> bool {
        self.availability.to_lowercase().contains("in stock")
    }
}

/// Immutable, fully loaded view of the catalog at one point in time.
///
/// Snapshots are never mutated after construction; a reload produces a fresh
/// snapshot that fully replaces the old one.
#[derive(Debug, Clone)]
pub struct CatalogSnapshot {
    pub records: Vec<BookRecord>,
    pub loaded_at: DateTime<Utc>,
}

impl CatalogSnapshot {
    /// An empty snapshot, used when the dataset source is missing or unreadable.
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn new(records: Vec<BookRecord>) -> Self {
        Self {
            records,
            loaded_at: Utc::now(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Coerce an arbitrary JSON value into a star rating.
///
/// Accepts integers, floats, and numeric strings; anything else falls back to
/// 0. The result is clamped to the 0..=5 star scale.
pub fn coerce_rating(value: &serde_json::Value) -> u8 {
    let parsed = match value {
        serde_json::Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(0),
        serde_json::Value::String(s) => s.trim().parse::<i64>().unwrap_or(0),
        _ => 0,
    };
    parsed.clamp(0, 5) as u8
}

fn lenient_rating<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(coerce_rating(&value))
}
