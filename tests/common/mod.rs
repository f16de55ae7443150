#![allow(dead_code)]

use issue_tracker::cache::CacheConfig;
use issue_tracker::service::Services;
use issue_tracker::storage::SqliteStorage;
use std::sync::Once;
use tempfile::TempDir;

pub mod fixtures;

static INIT: Once = Once::new();

pub fn init_test_logging() {
    INIT.call_once(|| {
        issue_tracker::logging::init_test_logging();
    });
}

pub const DOWNLOAD_ENDPOINT: &str = "/issue/attachments/";

pub fn test_db() -> SqliteStorage {
    init_test_logging();
    SqliteStorage::open_memory().expect("Failed to create test database")
}

/// Services over an in-memory database and a temporary attachments root.
pub fn test_services() -> (Services, TempDir) {
    test_services_with_cache(CacheConfig::default())
}

pub fn test_services_with_cache(cache: CacheConfig) -> (Services, TempDir) {
    init_test_logging();
    let dir = TempDir::new().expect("Failed to create temp dir");
    let services = Services::new(
        test_db(),
        cache,
        dir.path().join("attachments"),
        DOWNLOAD_ENDPOINT.to_string(),
    );
    (services, dir)
}
