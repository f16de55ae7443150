//! Business logic between the HTTP layer and storage.
//!
//! - `IssueService`: create/read/update/delete with cache-aside reads
//! - `FilterService`: intersection of per-property subsets
//! - `SearchService`: case-insensitive substring search
//! - `AttachmentService`: files on disk plus their metadata rows
//! - `HistoryService`: read side of the audit trail
//!
//! History rows are written by storage inside the same transaction as the
//! change they describe.

pub mod attachment;
pub mod filter;
pub mod history;
pub mod issue;
pub mod search;

pub use attachment::AttachmentService;
pub use filter::FilterService;
pub use history::HistoryService;
pub use issue::IssueService;
pub use search::SearchService;

use crate::cache::{CacheConfig, IssueCache};
use crate::config::ServiceConfig;
use crate::error::{Result, ResultExt};
use crate::storage::SqliteStorage;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

/// Storage connection shared by all services.
#[derive(Debug, Clone)]
pub struct SharedStorage(Arc<Mutex<SqliteStorage>>);

impl SharedStorage {
    #[must_use]
    pub fn new(storage: SqliteStorage) -> Self {
        Self(Arc::new(Mutex::new(storage)))
    }

    /// Run `f` with exclusive access to the connection.
    ///
    /// A panic in another holder leaves no open transaction behind
    /// (rusqlite rolls back on drop), so a poisoned lock is still usable.
    ///
    /// # Errors
    ///
    /// Propagates the closure's error.
    pub fn with<R, F>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut SqliteStorage) -> Result<R>,
    {
        let mut guard = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }
}

/// All services wired to one storage, cache and attachment root.
#[derive(Debug, Clone)]
pub struct Services {
    pub issues: IssueService,
    pub filter: FilterService,
    pub search: SearchService,
    pub attachments: AttachmentService,
    pub history: HistoryService,
}

impl Services {
    /// Wire services around an already opened storage.
    #[must_use]
    pub fn new(
        storage: SqliteStorage,
        cache: CacheConfig,
        attachments_dir: PathBuf,
        download_endpoint: String,
    ) -> Self {
        let storage = SharedStorage::new(storage);
        let cache = Arc::new(IssueCache::new(cache));
        let attachments = AttachmentService::new(
            storage.clone(),
            Arc::clone(&cache),
            attachments_dir,
            download_endpoint,
        );
        let issues = IssueService::new(storage.clone(), cache, attachments.clone());

        Self {
            filter: FilterService::new(issues.clone()),
            search: SearchService::new(issues.clone()),
            history: HistoryService::new(storage),
            attachments,
            issues,
        }
    }

    /// Open the configured database, create the attachments directory and
    /// wire everything together.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or the attachments
    /// directory cannot be created.
    pub fn open(config: &ServiceConfig) -> Result<Self> {
        let storage = SqliteStorage::open_with_timeout(&config.db_path, Some(config.lock_timeout_ms))?;
        std::fs::create_dir_all(&config.attachments_dir).with_context(|| {
            format!(
                "creating attachments directory {}",
                config.attachments_dir.display()
            )
        })?;

        Ok(Self::new(
            storage,
            config.cache,
            config.attachments_dir.clone(),
            config.download_endpoint.clone(),
        ))
    }
}
