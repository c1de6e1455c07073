//! Where record collections come from.
//!
//! The loader only talks to [`RowSource`]; the file-backed implementation is
//! what the binary uses, tests substitute in-memory sources.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use dashboard_core::error::{DashboardError, Result};
use dashboard_core::models::{FetchFilter, Record};
use dashboard_data::reader;

/// Fetches every record of a named collection that satisfies a filter.
#[async_trait]
pub trait RowSource: Send + Sync {
    async fn fetch(&self, collection: &str, filter: &FetchFilter) -> Result<Vec<Record>>;
}

/// Reads collections from JSON/JSONL files below `root`.
#[derive(Debug, Clone)]
pub struct FileRowSource {
    root: PathBuf,
}

impl FileRowSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl RowSource for FileRowSource {
    async fn fetch(&self, collection: &str, filter: &FetchFilter) -> Result<Vec<Record>> {
        let root = self.root.clone();
        let name = collection.to_string();
        let filter = filter.clone();

        // File parsing is blocking work; keep it off the async workers.
        tokio::task::spawn_blocking(move || reader::load_collection(&root, &name, &filter))
            .await
            .map_err(|e| DashboardError::FetchFailed {
                collection: collection.to_string(),
                reason: e.to_string(),
            })?
    }
}
