//! `SQLite` storage implementation.

use crate::error::{Result, TrackerError};
use crate::model::{
    Attachment, Change, HistoryRecord, Issue, IssueType, Project, PropertyUpdate, PropertyValue,
    Severity, Status,
};
use crate::storage::history::{get_history, insert_history_record};
use crate::storage::schema::apply_schema;
use crate::util::time::{format_timestamp, parse_stored_timestamp};
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, Transaction, params};
use std::path::Path;
use std::time::Duration;

const ISSUE_COLUMNS: &str =
    "id, title, description, author, date, issue_type, severity, status, project";

const ATTACHMENT_COLUMNS: &str = "id, path, original_filename, date, issue_id";

/// SQLite-based storage backend.
#[derive(Debug)]
pub struct SqliteStorage {
    conn: Connection,
}

/// Context for a mutation operation, tracking side effects.
#[derive(Debug)]
pub struct MutationContext {
    pub op_name: String,
    pub history: Vec<(i64, Change)>,
}

impl MutationContext {
    #[must_use]
    pub fn new(op_name: &str) -> Self {
        Self {
            op_name: op_name.to_string(),
            history: Vec::new(),
        }
    }

    /// Queue a history record, written before the transaction commits.
    pub fn record(&mut self, issue_id: i64, change: Change) {
        self.history.push((issue_id, change));
    }
}

impl SqliteStorage {
    /// Open a new connection to the database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established or schema application fails.
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with_timeout(path, None)
    }

    /// Open a new connection with an optional busy timeout (ms).
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established or schema application fails.
    pub fn open_with_timeout(path: &Path, lock_timeout_ms: Option<u64>) -> Result<Self> {
        let conn = Connection::open(path).map_err(|err| {
            tracing::warn!(path = %path.display(), error = %err, "Failed to open database");
            TrackerError::DatabaseUnavailable {
                path: path.to_path_buf(),
            }
        })?;
        if let Some(timeout) = lock_timeout_ms {
            conn.busy_timeout(Duration::from_millis(timeout))?;
        }
        apply_schema(&conn)?;
        tracing::debug!(path = %path.display(), "Opened database");
        Ok(Self { conn })
    }

    /// Open an in-memory database for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        apply_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Execute a mutation inside one IMMEDIATE transaction.
    ///
    /// History records queued on the context are written before commit, so
    /// a change and its audit trail land together or not at all.
    ///
    /// # Errors
    ///
    /// Returns an error if any step fails. The transaction is rolled back on error.
    pub fn mutate<F, R>(&mut self, op: &str, f: F) -> Result<R>
    where
        F: FnOnce(&Transaction, &mut MutationContext) -> Result<R>,
    {
        let tx = self
            .conn
            .transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;
        let mut ctx = MutationContext::new(op);

        let result = f(&tx, &mut ctx)?;

        for (issue_id, change) in &ctx.history {
            insert_history_record(&tx, *issue_id, change)?;
        }

        tx.commit()?;
        tracing::trace!(op = %ctx.op_name, records = ctx.history.len(), "Committed mutation");

        Ok(result)
    }

    /// Create a new issue. The `id` of the argument is ignored.
    ///
    /// Returns the stored issue with its assigned id.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateTitle` if the title is taken, or a database error.
    pub fn create_issue(&mut self, issue: &Issue) -> Result<Issue> {
        let id = self.mutate("create_issue", |tx, ctx| {
            if title_exists(tx, &issue.title)? {
                return Err(TrackerError::DuplicateTitle {
                    title: issue.title.clone(),
                });
            }

            tx.execute(
                "INSERT INTO issues (title, description, author, date, issue_type, severity, status, project)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    issue.title,
                    issue.description,
                    issue.author,
                    format_timestamp(&issue.date),
                    issue.issue_type.as_str(),
                    issue.severity.as_str(),
                    issue.status.as_str(),
                    issue.project.as_str(),
                ],
            )
            .map_err(|err| map_unique_violation(err, &issue.title))?;

            let id = tx.last_insert_rowid();
            ctx.record(id, Change::Created(issue.properties_summary()));
            Ok(id)
        })?;

        Ok(Issue {
            id,
            ..issue.clone()
        })
    }

    /// Replace all four categorical properties of an issue.
    ///
    /// # Errors
    ///
    /// Returns `IssueNotFound` if the id does not exist.
    pub fn update_properties(&mut self, update: &PropertyUpdate) -> Result<Issue> {
        self.mutate("update_properties", |tx, ctx| {
            let changed = tx.execute(
                "UPDATE issues SET issue_type = ?, severity = ?, status = ?, project = ? WHERE id = ?",
                params![
                    update.issue_type.as_str(),
                    update.severity.as_str(),
                    update.status.as_str(),
                    update.project.as_str(),
                    update.id,
                ],
            )?;
            if changed == 0 {
                return Err(TrackerError::IssueNotFound { id: update.id });
            }

            ctx.record(update.id, Change::Updated(update.summary()));
            Ok(())
        })?;

        self.get_issue(update.id)?
            .ok_or(TrackerError::IssueNotFound { id: update.id })
    }

    /// Replace the description of the issue with the given title.
    ///
    /// The description is stored as given; normalization happens in the service.
    ///
    /// # Errors
    ///
    /// Returns `IssueTitleNotFound` if no issue has that title.
    pub fn update_description(&mut self, title: &str, description: &str) -> Result<Issue> {
        let id = self.mutate("update_description", |tx, ctx| {
            let id: Option<i64> = tx
                .query_row("SELECT id FROM issues WHERE title = ?", [title], |row| {
                    row.get(0)
                })
                .optional()?;
            let id = id.ok_or_else(|| TrackerError::IssueTitleNotFound {
                title: title.to_string(),
            })?;

            tx.execute(
                "UPDATE issues SET description = ? WHERE id = ?",
                params![description, id],
            )?;

            ctx.record(id, Change::DescriptionChanged);
            Ok(id)
        })?;

        self.get_issue(id)?.ok_or(TrackerError::IssueNotFound { id })
    }

    /// Delete an issue together with its history and attachment rows.
    ///
    /// Returns the deleted issue.
    ///
    /// # Errors
    ///
    /// Returns `IssueNotFound` if the id does not exist.
    pub fn delete_issue(&mut self, id: i64) -> Result<Issue> {
        let issue = self
            .get_issue(id)?
            .ok_or(TrackerError::IssueNotFound { id })?;

        self.mutate("delete_issue", |tx, _ctx| {
            tx.execute("DELETE FROM history WHERE issue_id = ?", [id])?;
            tx.execute("DELETE FROM attachments WHERE issue_id = ?", [id])?;
            let deleted = tx.execute("DELETE FROM issues WHERE id = ?", [id])?;
            if deleted == 0 {
                return Err(TrackerError::IssueNotFound { id });
            }
            Ok(())
        })?;

        Ok(issue)
    }

    /// Get an issue by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn get_issue(&self, id: i64) -> Result<Option<Issue>> {
        let sql = format!("SELECT {ISSUE_COLUMNS} FROM issues WHERE id = ?");
        let issue = self
            .conn
            .query_row(&sql, [id], issue_from_row)
            .optional()?;
        Ok(issue)
    }

    /// Get an issue by its exact title.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn find_by_title(&self, title: &str) -> Result<Option<Issue>> {
        let sql = format!("SELECT {ISSUE_COLUMNS} FROM issues WHERE title = ?");
        let issue = self
            .conn
            .query_row(&sql, [title], issue_from_row)
            .optional()?;
        Ok(issue)
    }

    /// Whether an issue with this title exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn title_exists(&self, title: &str) -> Result<bool> {
        title_exists(&self.conn, title)
    }

    /// All issues, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn list_issues(&self) -> Result<Vec<Issue>> {
        let sql = format!("SELECT {ISSUE_COLUMNS} FROM issues ORDER BY id DESC");
        let mut stmt = self.conn.prepare(&sql)?;
        let issues = stmt
            .query_map([], issue_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(issues)
    }

    /// Issues whose single categorical property equals `value`, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn list_by_property(&self, value: PropertyValue) -> Result<Vec<Issue>> {
        let sql = format!(
            "SELECT {ISSUE_COLUMNS} FROM issues WHERE {} = ? ORDER BY id DESC",
            value.column()
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let issues = stmt
            .query_map([value.as_str()], issue_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(issues)
    }

    /// Count all issues.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn count_issues(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM issues", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    /// History records of an issue, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn get_history(&self, issue_id: i64) -> Result<Vec<HistoryRecord>> {
        get_history(&self.conn, issue_id)
    }

    /// Store attachment metadata and its `UPLOADED` history record.
    ///
    /// # Errors
    ///
    /// Returns `IssueNotFound` if the parent issue vanished, or a database error.
    pub fn insert_attachment(
        &mut self,
        issue_id: i64,
        path: &str,
        original_filename: &str,
    ) -> Result<Attachment> {
        let date = Utc::now();
        let id = self.mutate("insert_attachment", |tx, ctx| {
            let exists: bool = tx
                .prepare("SELECT 1 FROM issues WHERE id = ?")?
                .exists([issue_id])?;
            if !exists {
                return Err(TrackerError::IssueNotFound { id: issue_id });
            }

            tx.execute(
                "INSERT INTO attachments (path, original_filename, date, issue_id) VALUES (?, ?, ?, ?)",
                params![path, original_filename, format_timestamp(&date), issue_id],
            )?;
            let id = tx.last_insert_rowid();
            ctx.record(issue_id, Change::FileUploaded(original_filename.to_string()));
            Ok(id)
        })?;

        Ok(Attachment {
            id,
            path: path.to_string(),
            original_filename: original_filename.to_string(),
            date,
            issue_id,
        })
    }

    /// Get attachment metadata by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn get_attachment(&self, id: i64) -> Result<Option<Attachment>> {
        let sql = format!("SELECT {ATTACHMENT_COLUMNS} FROM attachments WHERE id = ?");
        let attachment = self
            .conn
            .query_row(&sql, [id], attachment_from_row)
            .optional()?;
        Ok(attachment)
    }

    /// Attachments of one issue, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn list_attachments(&self, issue_id: i64) -> Result<Vec<Attachment>> {
        let sql = format!(
            "SELECT {ATTACHMENT_COLUMNS} FROM attachments WHERE issue_id = ? ORDER BY id DESC"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let attachments = stmt
            .query_map([issue_id], attachment_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(attachments)
    }

    /// Remove attachment metadata and append its `DELETED` history record.
    ///
    /// # Errors
    ///
    /// Returns `AttachmentNotFound` if the id does not exist.
    pub fn delete_attachment(&mut self, id: i64) -> Result<Attachment> {
        let attachment = self
            .get_attachment(id)?
            .ok_or(TrackerError::AttachmentNotFound { id })?;

        self.mutate("delete_attachment", |tx, ctx| {
            let deleted = tx.execute("DELETE FROM attachments WHERE id = ?", [id])?;
            if deleted == 0 {
                return Err(TrackerError::AttachmentNotFound { id });
            }
            ctx.record(
                attachment.issue_id,
                Change::FileDeleted(attachment.original_filename.clone()),
            );
            Ok(())
        })?;

        Ok(attachment)
    }
}

fn title_exists(conn: &Connection, title: &str) -> Result<bool> {
    let exists = conn
        .prepare("SELECT 1 FROM issues WHERE title = ?")?
        .exists([title])?;
    Ok(exists)
}

/// Translate a UNIQUE violation on `issues.title` into `DuplicateTitle`.
fn map_unique_violation(err: rusqlite::Error, title: &str) -> TrackerError {
    match &err {
        rusqlite::Error::SqliteFailure(code, _)
            if code.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            TrackerError::DuplicateTitle {
                title: title.to_string(),
            }
        }
        _ => err.into(),
    }
}

fn issue_from_row(row: &rusqlite::Row) -> rusqlite::Result<Issue> {
    Ok(Issue {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        author: row.get(3)?,
        date: parse_stored_timestamp(&row.get::<_, String>(4)?),
        issue_type: parse_column::<IssueType>(row, 5)?,
        severity: parse_column::<Severity>(row, 6)?,
        status: parse_column::<Status>(row, 7)?,
        project: parse_column::<Project>(row, 8)?,
    })
}

fn attachment_from_row(row: &rusqlite::Row) -> rusqlite::Result<Attachment> {
    Ok(Attachment {
        id: row.get(0)?,
        path: row.get(1)?,
        original_filename: row.get(2)?,
        date: parse_stored_timestamp(&row.get::<_, String>(3)?),
        issue_id: row.get(4)?,
    })
}

fn parse_column<T>(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<T>
where
    T: std::str::FromStr<Err = TrackerError>,
{
    let raw: String = row.get(idx)?;
    raw.parse().map_err(|err: TrackerError| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(err))
    })
}

#[cfg(test)]
impl SqliteStorage {
    /// Execute raw SQL for tests.
    ///
    /// # Errors
    ///
    /// Returns an error if the SQL execution fails.
    pub fn execute_test_sql(&self, sql: &str) -> Result<()> {
        self.conn.execute_batch(sql)?;
        Ok(())
    }
}
