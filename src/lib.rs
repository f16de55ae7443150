//! `issue_tracker`: a CRUD backend for software issue reports.
//!
//! Layering: HTTP API (`api`) -> services (`service`) -> storage
//! (`storage`) -> `SQLite`. Reads go through a shared read-through cache
//! (`cache`) that every mutation clears.

pub mod api;
pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod service;
pub mod storage;
pub mod util;
pub mod validation;

pub use error::{ErrorCode, Result, StructuredError, TrackerError};
