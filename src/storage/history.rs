//! History record storage for `issue_tracker`.
//!
//! This module implements the audit trail with:
//! - Record insertion (atomic with the mutation that caused it)
//! - Record retrieval (newest first, DESC ordering)

use chrono::Utc;
use rusqlite::{Connection, Transaction, params};

use crate::error::Result;
use crate::model::{Change, HistoryRecord};
use crate::util::time::{format_timestamp, parse_stored_timestamp};

/// Insert a history record within a transaction.
///
/// Call this inside the same transaction as the mutation that triggered
/// the record.
///
/// # Errors
///
/// Returns an error if the database insert fails.
pub fn insert_history_record(tx: &Transaction<'_>, issue_id: i64, change: &Change) -> Result<i64> {
    tx.execute(
        "INSERT INTO history (text, date, issue_id) VALUES (?1, ?2, ?3)",
        params![change.text(), format_timestamp(&Utc::now()), issue_id],
    )?;

    Ok(tx.last_insert_rowid())
}

/// Get history records for an issue, newest first.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn get_history(conn: &Connection, issue_id: i64) -> Result<Vec<HistoryRecord>> {
    let mut stmt = conn.prepare(
        r"
        SELECT id, text, date, issue_id
        FROM history
        WHERE issue_id = ?1
        ORDER BY id DESC
        ",
    )?;

    let records = stmt
        .query_map(params![issue_id], record_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(records)
}

fn record_from_row(row: &rusqlite::Row) -> rusqlite::Result<HistoryRecord> {
    Ok(HistoryRecord {
        id: row.get(0)?,
        text: row.get(1)?,
        date: parse_stored_timestamp(&row.get::<_, String>(2)?),
        issue_id: row.get(3)?,
    })
}
