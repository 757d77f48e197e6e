//! Dataset persistence.
//!
//! The scraped catalog lives in a single JSON document under the configured
//! data directory:
//!
//! ```text
//! {data_dir}/
//! └── books.json            # scraped_at + count + rows
//! ```
//!
//! Writes are atomic (temp file then rename) so a crashed scrape run never
//! leaves a half-written dataset behind.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::BookRow;

/// Header wrapper for the dataset file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetFile {
    /// ISO 8601 timestamp of the scrape run
    pub scraped_at: DateTime<Utc>,
    /// Total row count
    pub count: usize,
    /// The scraped rows, in scrape order
    pub books: Vec<BookRow>,
}

impl DatasetFile {
    pub fn new(books: Vec<BookRow>) -> Self {
        Self {
            scraped_at: Utc::now(),
            count: books.len(),
            books,
        }
    }
}

/// Local filesystem dataset store.
#[derive(Debug, Clone)]
pub struct DatasetStore {
    root_dir: PathBuf,
    dataset_file: String,
}

impl DatasetStore {
    /// Create a new store rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>, dataset_file: impl Into<String>) -> Self {
        Self {
            root_dir: root_dir.into(),
            dataset_file: dataset_file.into(),
        }
    }

    /// Create a store from the catalog configuration.
    pub fn from_config(config: &crate::models::CatalogConfig) -> Self {
        Self::new(&config.data_dir, &config.dataset_file)
    }

    /// Full path of the dataset file.
    pub fn dataset_path(&self) -> PathBuf {
        self.root_dir.join(&self.dataset_file)
    }

    /// Get the full path for a relative key.
    fn path(&self, key: &str) -> PathBuf {
        self.root_dir.join(key)
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(&self, path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path(key);
        self.ensure_dir(&path).await?;

        let tmp = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    /// Write JSON data.
    async fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(value)?;
        self.write_bytes(key, &bytes).await
    }

    /// Read bytes, returning None if the file doesn't exist.
    async fn read_bytes(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path(key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    /// Read JSON data.
    async fn read_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.read_bytes(key).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Persist a scraped dataset, replacing any previous one.
    pub async fn save_rows(&self, rows: Vec<BookRow>) -> Result<()> {
        let dataset = DatasetFile::new(rows);
        tracing::info!(
            "Writing {} books to {}",
            dataset.count,
            self.dataset_path().display()
        );
        self.write_json(&self.dataset_file, &dataset).await
    }

    /// Load the dataset rows, or None when no dataset has been written yet.
    pub async fn read_rows(&self) -> Result<Option<Vec<BookRow>>> {
        Ok(self
            .read_json::<DatasetFile>(&self.dataset_file)
            .await?
            .map(|dataset| dataset.books))
    }
}
