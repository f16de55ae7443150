//! Read side of the audit trail.

use super::SharedStorage;
use crate::error::{Result, TrackerError};
use crate::model::HistoryRecord;

#[derive(Debug, Clone)]
pub struct HistoryService {
    storage: SharedStorage,
}

impl HistoryService {
    #[must_use]
    pub const fn new(storage: SharedStorage) -> Self {
        Self { storage }
    }

    /// History records of an issue, newest first.
    ///
    /// # Errors
    ///
    /// Returns `IssueNotFound` if the issue does not exist.
    pub fn records_for_issue(&self, issue_id: i64) -> Result<Vec<HistoryRecord>> {
        self.storage.with(|storage| {
            if storage.get_issue(issue_id)?.is_none() {
                return Err(TrackerError::IssueNotFound { id: issue_id });
            }
            storage.get_history(issue_id)
        })
    }
}
