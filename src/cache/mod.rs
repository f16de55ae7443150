//! Read-through issue cache.
//!
//! Process-wide `DashMap` keyed by lookup kind. Entries expire after a TTL
//! and the map is bounded by `max_entries`; every mutation clears it
//! wholesale. A load that overlaps a clear is returned but not stored.

use crate::error::Result;
use crate::model::{Issue, PropertyValue};
use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Cache sizing and expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheConfig {
    /// Maximum number of cached lookups; 0 disables caching.
    pub max_entries: usize,
    /// Time an entry stays valid.
    #[serde(rename = "ttl_seconds", serialize_with = "serialize_secs")]
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 256,
            ttl: Duration::from_secs(600),
        }
    }
}

fn serialize_secs<S: serde::Serializer>(
    ttl: &Duration,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_u64(ttl.as_secs())
}

/// What a cached value was looked up by.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Id(i64),
    Title(String),
    All,
    Property(PropertyValue),
}

#[derive(Debug, Clone)]
enum Cached {
    One(Arc<Issue>),
    Many(Arc<Vec<Issue>>),
}

#[derive(Debug)]
struct CacheEntry {
    value: Cached,
    inserted_at: Instant,
}

/// Hit/miss counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

#[derive(Debug)]
pub struct IssueCache {
    store: DashMap<CacheKey, CacheEntry>,
    config: CacheConfig,
    hits: AtomicU64,
    misses: AtomicU64,
    /// Bumped by every `clear`.
    generation: AtomicU64,
}

impl IssueCache {
    #[must_use]
    pub fn new(config: CacheConfig) -> Self {
        Self {
            store: DashMap::new(),
            config,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            generation: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub const fn config(&self) -> CacheConfig {
        self.config
    }

    /// Return the cached issue for `key`, or run `load` and cache its result.
    ///
    /// Errors from `load` are returned as-is and nothing is cached.
    ///
    /// # Errors
    ///
    /// Propagates the loader's error.
    pub fn issue<F>(&self, key: CacheKey, load: F) -> Result<Issue>
    where
        F: FnOnce() -> Result<Issue>,
    {
        if let Some(Cached::One(issue)) = self.lookup(&key) {
            return Ok(Issue::clone(&issue));
        }

        let generation = self.generation.load(Ordering::Acquire);
        let issue = load()?;
        self.insert(key, Cached::One(Arc::new(issue.clone())), generation);
        Ok(issue)
    }

    /// Return the cached issue list for `key`, or run `load` and cache it.
    ///
    /// # Errors
    ///
    /// Propagates the loader's error.
    pub fn issues<F>(&self, key: CacheKey, load: F) -> Result<Vec<Issue>>
    where
        F: FnOnce() -> Result<Vec<Issue>>,
    {
        if let Some(Cached::Many(issues)) = self.lookup(&key) {
            return Ok(Vec::clone(&issues));
        }

        let generation = self.generation.load(Ordering::Acquire);
        let issues = load()?;
        self.insert(key, Cached::Many(Arc::new(issues.clone())), generation);
        Ok(issues)
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        let dropped = self.store.len();
        self.store.clear();
        tracing::debug!(dropped, "Cleared issue cache");
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.store.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.store.len(),
        }
    }

    fn lookup(&self, key: &CacheKey) -> Option<Cached> {
        let hit = self.store.get(key).and_then(|entry| {
            if entry.inserted_at.elapsed() < self.config.ttl {
                Some(entry.value.clone())
            } else {
                None
            }
        });

        if hit.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(?key, "Cache hit");
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(?key, "Cache miss");
        }
        hit
    }

    /// Store `value` unless a `clear` happened since `generation` was read.
    fn insert(&self, key: CacheKey, value: Cached, generation: u64) {
        if self.config.max_entries == 0 {
            return;
        }

        if self.store.len() >= self.config.max_entries && !self.store.contains_key(&key) {
            self.evict();
        }

        // Recheck under the shard lock: a clear either bumped first or
        // removes this entry after.
        let slot = self.store.entry(key);
        if self.generation.load(Ordering::Acquire) != generation {
            drop(slot);
            tracing::debug!("Discarding load that overlapped a clear");
            return;
        }
        slot.insert(CacheEntry {
            value,
            inserted_at: Instant::now(),
        });
    }

    /// Drop expired entries; if still full, drop the oldest one.
    fn evict(&self) {
        let ttl = self.config.ttl;
        self.store.retain(|_, entry| entry.inserted_at.elapsed() < ttl);

        if self.store.len() < self.config.max_entries {
            return;
        }

        let oldest = self
            .store
            .iter()
            .min_by_key(|entry| entry.value().inserted_at)
            .map(|entry| entry.key().clone());
        if let Some(key) = oldest {
            self.store.remove(&key);
        }
    }
}

impl Default for IssueCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}
