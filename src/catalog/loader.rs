//! Dataset loader.
//!
//! Turns the persisted dataset into an id-assigned [`CatalogSnapshot`]. The
//! load is total: a missing or unreadable dataset degrades to an empty
//! snapshot instead of an error, and the boundary reports that state as a
//! disconnected database.

use async_trait::async_trait;

use crate::models::{BookRecord, BookRow, CatalogSnapshot};
use crate::storage::DatasetStore;

/// Source of catalog snapshots.
///
/// The cache reloads exclusively through this trait, which keeps it
/// constructible with a stub source in tests.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Produce a fresh snapshot. Never fails; degenerate sources yield an
    /// empty snapshot.
    async fn load(&self) -> CatalogSnapshot;
}

/// Loader backed by the local dataset store.
pub struct DatasetLoader {
    store: DatasetStore,
}

impl DatasetLoader {
    pub fn new(store: DatasetStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl SnapshotSource for DatasetLoader {
    async fn load(&self) -> CatalogSnapshot {
        let rows = match self.store.read_rows().await {
            Ok(Some(rows)) => rows,
            Ok(None) => {
                tracing::warn!(
                    "Dataset file {} not found; loading empty catalog",
                    self.store.dataset_path().display()
                );
                return CatalogSnapshot::empty();
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to read dataset {}: {}; loading empty catalog",
                    self.store.dataset_path().display(),
                    e
                );
                return CatalogSnapshot::empty();
            }
        };
        snapshot_from_rows(rows)
    }
}

/// Build a snapshot from raw rows.
///
/// Rows with an empty title are skipped; surviving rows get unique,
/// contiguous 1-based ids in source order.
pub fn snapshot_from_rows(rows: Vec<BookRow>) -> CatalogSnapshot {
    let records = rows
        .into_iter()
        .filter(|row| !row.title.is_empty())
        .enumerate()
        .map(|(idx, row)| BookRecord {
            id: idx as u32 + 1,
            title: row.title,
            price: row.price,
            rating: row.rating,
            availability: row.availability,
            category: row.category,
            image_url: row.image_url,
        })
        .collect();
    CatalogSnapshot::new(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn row(title: &str, rating: u8) -> BookRow {
        BookRow {
            title: title.to_string(),
            price: "£10.00".to_string(),
            rating,
            availability: "In stock".to_string(),
            category: "Fiction".to_string(),
            image_url: String::new(),
        }
    }

    #[test]
    fn test_ids_are_contiguous_in_source_order() {
        let snapshot = snapshot_from_rows(vec![row("A", 1), row("B", 2), row("C", 3)]);
        let ids: Vec<u32> = snapshot.records.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(snapshot.records[0].title, "A");
    }

    #[test]
    fn test_untitled_rows_are_skipped() {
        let snapshot = snapshot_from_rows(vec![row("A", 1), row("", 5), row("C", 3)]);
        assert_eq!(snapshot.len(), 2);
        // Ids stay contiguous even when rows are dropped
        assert_eq!(snapshot.records[1].id, 2);
        assert_eq!(snapshot.records[1].title, "C");
    }

    #[tokio::test]
    async fn test_missing_dataset_loads_empty() {
        let tmp = TempDir::new().unwrap();
        let loader = DatasetLoader::new(DatasetStore::new(tmp.path(), "books.json"));

        let snapshot = loader.load().await;
        assert!(snapshot.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_dataset_loads_empty() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(tmp.path().join("books.json"), b"{broken")
            .await
            .unwrap();
        let loader = DatasetLoader::new(DatasetStore::new(tmp.path(), "books.json"));

        let snapshot = loader.load().await;
        assert!(snapshot.is_empty());
    }

    #[tokio::test]
    async fn test_loads_persisted_rows() {
        let tmp = TempDir::new().unwrap();
        let store = DatasetStore::new(tmp.path(), "books.json");
        store
            .save_rows(vec![row("A Light in the Attic", 3), row("Sharp Objects", 4)])
            .await
            .unwrap();

        let loader = DatasetLoader::new(store);
        let snapshot = loader.load().await;
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.records[1].id, 2);
        assert_eq!(snapshot.records[1].rating, 4);
    }
}
