//! Persistence layer for `issue_tracker`.
//!
//! - `schema`: DDL, pragmas and migrations
//! - `sqlite`: `SqliteStorage` with transactional mutations
//! - `history`: audit trail rows written inside those transactions

pub mod history;
pub mod schema;
pub mod sqlite;

pub use sqlite::{MutationContext, SqliteStorage};
