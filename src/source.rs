use log::{info, warn};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::config::Config;
use crate::dataset::Workbook;
use crate::error::{ExplorerError, Result};
use crate::loader::load_workbook;

/// Process-wide cache of loaded workbooks, keyed by source location
///
/// An entry is filled on first use and then only read. It goes away when an
/// operator asks for a refresh or the process exits; there is no expiry.
#[derive(Default)]
pub struct SourceCache {
    entries: RwLock<HashMap<String, Arc<Workbook>>>,
}

impl SourceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, location: &str) -> Option<Arc<Workbook>> {
        self.entries.read().await.get(location).cloned()
    }

    /// Store an already loaded workbook under `location`.
    pub async fn insert(&self, location: &str, workbook: Workbook) -> Arc<Workbook> {
        let workbook = Arc::new(workbook);
        self.entries
            .write()
            .await
            .insert(location.to_string(), Arc::clone(&workbook));
        workbook
    }

    /// Return the workbook for `config.source`, loading it on first use
    ///
    /// The write lock is held while loading so concurrent first requests
    /// trigger a single fetch.
    ///
    /// # Arguments
    /// * `config` - Source location plus load options
    ///
    /// # Returns
    /// * `Result<Arc<Workbook>>` - Shared read-only workbook, or the fetch/parse error
    pub async fn get_or_load(&self, config: &Config) -> Result<Arc<Workbook>> {
        if let Some(workbook) = self.get(&config.source).await {
            return Ok(workbook);
        }

        let mut entries = self.entries.write().await;
        if let Some(workbook) = entries.get(&config.source) {
            return Ok(Arc::clone(workbook));
        }

        let bytes = fetch_bytes(&config.source).await?;
        let workbook = Arc::new(load_workbook(&bytes, &config.source, config)?);
        entries.insert(config.source.clone(), Arc::clone(&workbook));

        Ok(workbook)
    }

    /// Drop the cached entry so the next request reloads it.
    pub async fn invalidate(&self, location: &str) -> bool {
        let removed = self.entries.write().await.remove(location).is_some();
        if removed {
            info!("invalidated cached source {}", location);
        }
        removed
    }
}

fn is_remote(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

/// Read the raw bytes behind a source location
///
/// `http://` and `https://` locations are downloaded, anything else is read
/// from the filesystem. Non-success HTTP statuses are errors; nothing is
/// retried.
pub async fn fetch_bytes(location: &str) -> Result<Vec<u8>> {
    if !is_remote(location) {
        info!("reading source file {}", location);
        return Ok(tokio::fs::read(location).await?);
    }

    info!("fetching source {}", location);
    let fetch_err = |source| ExplorerError::Fetch {
        url: location.to_string(),
        source,
    };

    let response = reqwest::get(location)
        .await
        .and_then(|r| r.error_for_status())
        .map_err(fetch_err)?;
    let bytes = response.bytes().await.map_err(fetch_err)?;

    if bytes.is_empty() {
        warn!("source {} returned an empty body", location);
    }

    Ok(bytes.to_vec())
}
