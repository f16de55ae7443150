//! Attachment files and their metadata.

use super::SharedStorage;
use crate::cache::IssueCache;
use crate::error::{OptionExt, Result, ResultExt, TrackerError};
use crate::model::{Attachment, AttachmentUpload};
use crate::util::{attachment_dir, attachment_file, attachment_relative_path};
use crate::validation::AttachmentValidator;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct AttachmentService {
    storage: SharedStorage,
    cache: Arc<IssueCache>,
    root: PathBuf,
    download_endpoint: String,
}

impl AttachmentService {
    #[must_use]
    pub fn new(
        storage: SharedStorage,
        cache: Arc<IssueCache>,
        root: PathBuf,
        download_endpoint: String,
    ) -> Self {
        Self {
            storage,
            cache,
            root,
            download_endpoint,
        }
    }

    /// Directory all attachment files live under.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Store an uploaded file for the issue named by `upload.issue_title`.
    ///
    /// # Errors
    ///
    /// - `IssueTitleNotFound` if no issue has that title
    /// - `EmptyAttachment` if the content is empty
    /// - `Validation` if the filename is unsafe
    /// - `Io` / `Database` if writing fails
    pub fn upload(&self, upload: &AttachmentUpload) -> Result<Attachment> {
        let issue = self
            .storage
            .with(|storage| storage.find_by_title(&upload.issue_title))?
            .or_not_found(|| TrackerError::IssueTitleNotFound {
                title: upload.issue_title.clone(),
            })?;

        self.save(issue.id, &upload.original_filename, &upload.bytes)
    }

    /// Write `bytes` to `<root>/<issue id>/<filename>` and record the metadata.
    ///
    /// Nothing is written for empty content or a rejected filename.
    ///
    /// # Errors
    ///
    /// - `EmptyAttachment` if `bytes` is empty
    /// - `Validation` if the filename is unsafe
    /// - `IssueNotFound` if the issue vanished before the row was written
    /// - `Io` / `Database` if writing fails
    pub fn save(&self, issue_id: i64, filename: &str, bytes: &[u8]) -> Result<Attachment> {
        if bytes.is_empty() {
            return Err(TrackerError::EmptyAttachment {
                filename: filename.to_string(),
            });
        }
        AttachmentValidator::check_filename(filename)?;

        let dir = attachment_dir(&self.root, issue_id);
        fs::create_dir_all(&dir)
            .with_context(|| format!("creating attachment directory {}", dir.display()))?;

        // Stage beside the target so a failed insert never touches a file an
        // earlier row points at.
        let file_path = attachment_file(&self.root, issue_id, filename);
        let staged = dir.join(format!(".{filename}.upload"));
        fs::write(&staged, bytes)
            .with_context(|| format!("writing attachment {}", staged.display()))?;
        debug!(path = %staged.display(), size = bytes.len(), "Staged attachment file");

        let link = self.download_link(issue_id, filename);
        let stored = self
            .storage
            .with(|storage| storage.insert_attachment(issue_id, &link, filename));

        let attachment = match stored {
            Ok(attachment) => attachment,
            Err(err) => {
                discard(&staged);
                return Err(err);
            }
        };

        if let Err(err) = fs::rename(&staged, &file_path) {
            discard(&staged);
            if let Err(rollback) = self
                .storage
                .with(|storage| storage.delete_attachment(attachment.id))
            {
                warn!(attachment_id = attachment.id, error = %rollback, "Failed to roll back attachment row");
            }
            return Err(TrackerError::WithContext {
                context: format!("moving attachment into {}", file_path.display()),
                source: Box::new(err),
            });
        }

        self.cache.clear();
        info!(issue_id, attachment_id = attachment.id, filename, "Saved attachment");
        Ok(attachment)
    }

    /// Delete the stored file (if present) and its metadata row.
    ///
    /// # Errors
    ///
    /// Returns `AttachmentNotFound` if the id does not exist, or an I/O error
    /// if an existing file cannot be removed.
    pub fn delete(&self, id: i64) -> Result<Attachment> {
        let attachment = self
            .storage
            .with(|storage| storage.get_attachment(id))?
            .or_not_found(|| TrackerError::AttachmentNotFound { id })?;

        let file_path = attachment_file(
            &self.root,
            attachment.issue_id,
            &attachment.original_filename,
        );
        if file_path.is_file() {
            fs::remove_file(&file_path)
                .with_context(|| format!("removing attachment {}", file_path.display()))?;
        } else {
            debug!(path = %file_path.display(), "Attachment file already absent");
        }

        let removed = self.storage.with(|storage| storage.delete_attachment(id))?;
        self.cache.clear();
        info!(attachment_id = id, issue_id = removed.issue_id, "Deleted attachment");
        Ok(removed)
    }

    /// Resolve the on-disk path of a stored file for download.
    ///
    /// # Errors
    ///
    /// Returns `AttachmentFileNotFound` if the name is unsafe or no such
    /// file exists.
    pub fn resolve_download(&self, issue_id: i64, filename: &str) -> Result<PathBuf> {
        let not_found = || TrackerError::AttachmentFileNotFound {
            issue_id,
            filename: filename.to_string(),
        };

        if AttachmentValidator::validate_filename(filename).is_err() {
            return Err(not_found());
        }

        let path = attachment_file(&self.root, issue_id, filename);
        if path.is_file() {
            Ok(path)
        } else {
            Err(not_found())
        }
    }

    /// Attachments of one issue, newest first.
    ///
    /// # Errors
    ///
    /// Returns `IssueNotFound` if the issue does not exist.
    pub fn list(&self, issue_id: i64) -> Result<Vec<Attachment>> {
        self.storage.with(|storage| {
            if storage.get_issue(issue_id)?.is_none() {
                return Err(TrackerError::IssueNotFound { id: issue_id });
            }
            storage.list_attachments(issue_id)
        })
    }

    /// Remove an issue's attachment directory. Failures are logged and ignored.
    pub fn remove_issue_dir(&self, issue_id: i64) {
        let dir = attachment_dir(&self.root, issue_id);
        if !dir.exists() {
            return;
        }
        match fs::remove_dir_all(&dir) {
            Ok(()) => debug!(path = %dir.display(), "Removed attachment directory"),
            Err(err) => {
                warn!(path = %dir.display(), error = %err, "Failed to remove attachment directory");
            }
        }
    }

    fn download_link(&self, issue_id: i64, filename: &str) -> String {
        format!(
            "{}{}",
            self.download_endpoint,
            attachment_relative_path(issue_id, filename)
        )
    }
}

fn discard(staged: &Path) {
    if let Err(err) = fs::remove_file(staged) {
        warn!(path = %staged.display(), error = %err, "Failed to remove staged attachment file");
    }
}
