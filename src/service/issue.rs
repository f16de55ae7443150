//! Issue lifecycle: create, look up, update and delete.

use super::{AttachmentService, SharedStorage};
use crate::cache::{CacheKey, IssueCache};
use crate::error::{Result, TrackerError};
use crate::model::{DescriptionUpdate, Issue, NewIssue, PropertyUpdate, PropertyValue};
use crate::util::normalize_description;
use crate::validation::IssueValidator;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct IssueService {
    storage: SharedStorage,
    cache: Arc<IssueCache>,
    attachments: AttachmentService,
}

impl IssueService {
    #[must_use]
    pub fn new(
        storage: SharedStorage,
        cache: Arc<IssueCache>,
        attachments: AttachmentService,
    ) -> Self {
        Self {
            storage,
            cache,
            attachments,
        }
    }

    #[must_use]
    pub fn cache(&self) -> &IssueCache {
        &self.cache
    }

    /// Create an issue from a request.
    ///
    /// The description is normalized, status defaults to `SUBMITTED`, and a
    /// non-empty inline attachment is stored after the issue.
    ///
    /// # Errors
    ///
    /// - `Validation` / `ValidationErrors` for malformed fields
    /// - `DuplicateTitle` if the title is taken (nothing is written)
    /// - attachment errors if the inline file cannot be stored
    pub fn create(&self, request: NewIssue) -> Result<Issue> {
        IssueValidator::validate_new(&request).map_err(TrackerError::from_validation_errors)?;

        if self
            .storage
            .with(|storage| storage.title_exists(&request.title))?
        {
            return Err(TrackerError::DuplicateTitle {
                title: request.title,
            });
        }

        let draft = Issue {
            id: 0,
            title: request.title,
            description: normalize_description(&request.description),
            author: request.author,
            date: Utc::now(),
            issue_type: request.issue_type,
            severity: request.severity,
            status: request.status.unwrap_or_default(),
            project: request.project,
        };

        let issue = self.storage.with(|storage| storage.create_issue(&draft))?;
        self.cache.clear();
        info!(id = issue.id, title = %issue.title, "Created issue");

        match request.attachment {
            Some(attachment) if !attachment.bytes.is_empty() => {
                self.attachments
                    .save(issue.id, &attachment.original_filename, &attachment.bytes)?;
            }
            Some(attachment) => {
                debug!(filename = %attachment.original_filename, "Skipping empty inline attachment");
            }
            None => {}
        }

        Ok(issue)
    }

    /// # Errors
    ///
    /// Returns `IssueNotFound` if the id does not exist.
    pub fn get(&self, id: i64) -> Result<Issue> {
        self.cache.issue(CacheKey::Id(id), || {
            self.storage
                .with(|storage| storage.get_issue(id))?
                .ok_or(TrackerError::IssueNotFound { id })
        })
    }

    /// # Errors
    ///
    /// Returns `IssueTitleNotFound` if no issue has that title.
    pub fn get_by_title(&self, title: &str) -> Result<Issue> {
        self.cache.issue(CacheKey::Title(title.to_string()), || {
            self.storage
                .with(|storage| storage.find_by_title(title))?
                .ok_or_else(|| TrackerError::IssueTitleNotFound {
                    title: title.to_string(),
                })
        })
    }

    /// Every issue, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn all(&self) -> Result<Vec<Issue>> {
        self.cache.issues(CacheKey::All, || {
            self.storage.with(|storage| storage.list_issues())
        })
    }

    /// Issues matching one categorical property, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn by_property(&self, value: PropertyValue) -> Result<Vec<Issue>> {
        self.cache.issues(CacheKey::Property(value), || {
            self.storage.with(|storage| storage.list_by_property(value))
        })
    }

    /// Replace the four categorical properties.
    ///
    /// # Errors
    ///
    /// Returns `IssueNotFound` if the id does not exist.
    pub fn update_properties(&self, update: &PropertyUpdate) -> Result<Issue> {
        let issue = self
            .storage
            .with(|storage| storage.update_properties(update))?;
        self.cache.clear();
        info!(id = issue.id, properties = %update.summary(), "Updated issue properties");
        Ok(issue)
    }

    /// Replace the description of the issue with the given title.
    ///
    /// # Errors
    ///
    /// Returns `IssueTitleNotFound` if no issue has that title, or a
    /// validation error for an oversized description.
    pub fn update_description(&self, update: &DescriptionUpdate) -> Result<Issue> {
        IssueValidator::validate_description_update(update)
            .map_err(TrackerError::from_validation_errors)?;

        let description = normalize_description(&update.description);
        let issue = self
            .storage
            .with(|storage| storage.update_description(&update.title, &description))?;
        self.cache.clear();
        info!(id = issue.id, "Changed issue description");
        Ok(issue)
    }

    /// Delete an issue, its history and attachment rows, and (best-effort)
    /// its attachment directory.
    ///
    /// # Errors
    ///
    /// Returns `IssueNotFound` if the id does not exist.
    pub fn delete(&self, id: i64) -> Result<Issue> {
        let issue = self.storage.with(|storage| storage.delete_issue(id))?;
        self.cache.clear();
        self.attachments.remove_issue_dir(id);
        info!(id, title = %issue.title, "Deleted issue");
        Ok(issue)
    }

    /// Number of stored issues.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn count(&self) -> Result<usize> {
        self.storage.with(|storage| storage.count_issues())
    }
}
