//! Catalog cache, query engine, and derived views.
//!
//! The [`Catalog`] facade is what the HTTP boundary talks to: every operation
//! obtains one snapshot from the cache up front and computes its result as a
//! pure function of that snapshot, so a reload in a concurrent request can
//! never tear a single operation.

pub mod cache;
pub mod loader;
pub mod ml;
pub mod price;
pub mod query;
pub mod stats;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub use cache::CatalogCache;
pub use loader::{DatasetLoader, SnapshotSource};
pub use ml::{FeatureSet, Prediction, TrainingData};
pub use query::SearchFilter;
pub use stats::{CategoryStats, OverviewStats};

use crate::models::{BookRecord, CatalogSnapshot};

/// Liveness view of the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogHealth {
    /// True when at least one book is loaded
    pub connected: bool,
    pub total_books: usize,
    /// Whether the cache currently holds a fresh snapshot
    pub cache_valid: bool,
}

/// Snapshot-backed catalog service.
pub struct Catalog {
    cache: CatalogCache,
}

impl Catalog {
    pub fn new(cache: CatalogCache) -> Self {
        Self { cache }
    }

    /// Current snapshot, reloaded through the cache when stale.
    pub async fn snapshot(&self) -> Arc<CatalogSnapshot> {
        self.cache.get_current().await
    }

    /// Page of books in catalog order. The boundary validates
    /// `limit` (1..=1000) and `offset` (>= 0) before calling.
    pub async fn list_books(&self, limit: usize, offset: usize) -> Vec<BookRecord> {
        let snapshot = self.snapshot().await;
        query::paginate(&snapshot.records, limit, offset)
    }

    /// Book by id, or None when absent.
    pub async fn get_book(&self, id: u32) -> Option<BookRecord> {
        let snapshot = self.snapshot().await;
        query::find_by_id(&snapshot.records, id).cloned()
    }

    /// Books matching every provided filter.
    pub async fn search_books(&self, filter: &SearchFilter) -> Vec<BookRecord> {
        let snapshot = self.snapshot().await;
        query::search(&snapshot.records, filter)
    }

    /// Highest-rated books, ties broken by title.
    pub async fn top_rated_books(&self, limit: usize) -> Vec<BookRecord> {
        let snapshot = self.snapshot().await;
        query::top_rated(&snapshot.records, limit)
    }

    /// Books priced within `[min, max]`, sorted by price. The boundary
    /// rejects `min > max` before calling.
    pub async fn books_in_price_range(&self, min: f64, max: f64) -> Vec<BookRecord> {
        let snapshot = self.snapshot().await;
        query::by_price_range(&snapshot.records, min, max)
    }

    /// Distinct non-empty categories, sorted ascending.
    pub async fn list_categories(&self) -> Vec<String> {
        let snapshot = self.snapshot().await;
        query::categories(&snapshot.records)
    }

    /// Collection-wide statistics.
    pub async fn overview_stats(&self) -> OverviewStats {
        let snapshot = self.snapshot().await;
        stats::overview(&snapshot.records)
    }

    /// Per-category statistics, busiest categories first.
    pub async fn category_stats(&self) -> Vec<CategoryStats> {
        let snapshot = self.snapshot().await;
        stats::category_stats(&snapshot.records)
    }

    /// Per-book feature rows.
    pub async fn ml_features(&self) -> FeatureSet {
        let snapshot = self.snapshot().await;
        ml::features(&snapshot.records)
    }

    /// Catalog as a design matrix.
    pub async fn ml_training_data(&self) -> TrainingData {
        let snapshot = self.snapshot().await;
        ml::training_data(&snapshot.records)
    }

    /// Rule-based rating prediction.
    pub async fn predict(&self, title: &str, price: f64, category: &str) -> Prediction {
        let snapshot = self.snapshot().await;
        ml::predict(&snapshot.records, title, price, category)
    }

    /// Drop the cached snapshot; the next read reloads from the dataset.
    pub fn invalidate_cache(&self) {
        self.cache.invalidate();
    }

    /// Invalidate and reload, returning the fresh book count.
    pub async fn reload(&self) -> usize {
        self.cache.invalidate();
        self.snapshot().await.len()
    }

    /// Liveness view: connected when the snapshot holds any books.
    pub async fn health(&self) -> CatalogHealth {
        let snapshot = self.snapshot().await;
        CatalogHealth {
            connected: !snapshot.is_empty(),
            total_books: snapshot.len(),
            cache_valid: self.cache.is_valid(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use tempfile::TempDir;

    use crate::models::BookRow;
    use crate::storage::DatasetStore;

    fn row(title: &str, price: &str, rating: u8, category: &str) -> BookRow {
        BookRow {
            title: title.to_string(),
            price: price.to_string(),
            rating,
            availability: "In stock".to_string(),
            category: category.to_string(),
            image_url: String::new(),
        }
    }

    async fn catalog_with(rows: Vec<BookRow>) -> (Catalog, DatasetStore, TempDir) {
        let tmp = TempDir::new().unwrap();
        let store = DatasetStore::new(tmp.path(), "books.json");
        store.save_rows(rows).await.unwrap();

        let loader = DatasetLoader::new(store.clone());
        let cache = CatalogCache::new(Arc::new(loader), Duration::from_secs(600));
        (Catalog::new(cache), store, tmp)
    }

    #[tokio::test]
    async fn test_health_reports_connected_catalog() {
        let (catalog, _store, _tmp) =
            catalog_with(vec![row("A", "£10.00", 3, "Fiction")]).await;

        let health = catalog.health().await;
        assert!(health.connected);
        assert_eq!(health.total_books, 1);
        assert!(health.cache_valid);
    }

    #[tokio::test]
    async fn test_health_reports_disconnected_when_empty() {
        let (catalog, _store, _tmp) = catalog_with(vec![]).await;

        let health = catalog.health().await;
        assert!(!health.connected);
        assert_eq!(health.total_books, 0);
    }

    #[tokio::test]
    async fn test_reload_picks_up_new_dataset() {
        let (catalog, store, _tmp) = catalog_with(vec![row("A", "£10.00", 3, "Fiction")]).await;
        assert_eq!(catalog.list_books(100, 0).await.len(), 1);

        store
            .save_rows(vec![
                row("A", "£10.00", 3, "Fiction"),
                row("B", "£20.00", 4, "Poetry"),
            ])
            .await
            .unwrap();

        // Cached snapshot still fresh; the old view survives until a reload
        assert_eq!(catalog.list_books(100, 0).await.len(), 1);
        assert_eq!(catalog.reload().await, 2);
        assert_eq!(catalog.list_books(100, 0).await.len(), 2);
    }

    #[tokio::test]
    async fn test_operations_compose_over_one_store() {
        let (catalog, _store, _tmp) = catalog_with(vec![
            row("A Light in the Attic", "£51.77", 3, "Poetry"),
            row("Sharp Objects", "£47.82", 4, "Fiction"),
        ])
        .await;

        assert_eq!(catalog.get_book(2).await.unwrap().title, "Sharp Objects");
        assert!(catalog.get_book(99).await.is_none());
        assert_eq!(catalog.list_categories().await, vec!["Fiction", "Poetry"]);
        assert_eq!(catalog.top_rated_books(1).await[0].id, 2);
        assert_eq!(catalog.overview_stats().await.total_books, 2);
        assert_eq!(catalog.predict("X", 60.0, "Poetry").await.predicted_rating, 5);
    }
}
