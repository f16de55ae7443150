//! Validation helpers for `issue_tracker`.
//!
//! These routines enforce data constraints on incoming requests and
//! return structured validation errors without touching storage.

use crate::error::{TrackerError, ValidationError};
use crate::model::{DescriptionUpdate, NewIssue};

/// Maximum title length in bytes (mirrors the `issues` CHECK constraint).
pub const MAX_TITLE_LEN: usize = 500;
/// Maximum description length in bytes.
pub const MAX_DESCRIPTION_LEN: usize = 102_400;
/// Maximum attachment filename length in bytes.
pub const MAX_FILENAME_LEN: usize = 255;

/// Validates issue request fields.
pub struct IssueValidator;

impl IssueValidator {
    /// Validate a create request and return all validation errors found.
    ///
    /// # Errors
    ///
    /// Returns a `Vec<ValidationError>` if any validation rules are violated.
    pub fn validate_new(issue: &NewIssue) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        check_title(&issue.title, &mut errors);

        if issue.author.trim().is_empty() {
            errors.push(ValidationError::new("author", "cannot be empty"));
        }

        check_description(&issue.description, &mut errors);

        // Empty inline attachments are skipped on create, name included.
        if let Some(attachment) = issue.attachment.as_ref().filter(|a| !a.bytes.is_empty()) {
            if let Err(err) = AttachmentValidator::validate_filename(&attachment.original_filename)
            {
                errors.push(err);
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Validate a description update.
    ///
    /// # Errors
    ///
    /// Returns a `Vec<ValidationError>` if any validation rules are violated.
    pub fn validate_description_update(
        update: &DescriptionUpdate,
    ) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();
        check_description(&update.description, &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

fn check_title(title: &str, errors: &mut Vec<ValidationError>) {
    if title.trim().is_empty() {
        errors.push(ValidationError::new("title", "cannot be empty"));
    }
    if title.len() > MAX_TITLE_LEN {
        errors.push(ValidationError::new("title", "exceeds 500 characters"));
    }
}

fn check_description(description: &str, errors: &mut Vec<ValidationError>) {
    if description.len() > MAX_DESCRIPTION_LEN {
        errors.push(ValidationError::new("description", "exceeds 100KB"));
    }
}

/// Validates attachment filenames before they touch the file system.
pub struct AttachmentValidator;

impl AttachmentValidator {
    /// Reject names that are empty, too long, or could escape the issue's
    /// attachment directory.
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` naming the offending rule.
    pub fn validate_filename(name: &str) -> Result<(), ValidationError> {
        let field = "original_filename";

        if name.trim().is_empty() {
            return Err(ValidationError::new(field, "cannot be empty"));
        }
        if name.len() > MAX_FILENAME_LEN {
            return Err(ValidationError::new(field, "exceeds 255 characters"));
        }
        if name.contains(['/', '\\']) {
            return Err(ValidationError::new(field, "cannot contain path separators"));
        }
        if name == "." || name.contains("..") {
            return Err(ValidationError::new(field, "cannot contain '..'"));
        }
        if name.chars().any(char::is_control) {
            return Err(ValidationError::new(field, "cannot contain control characters"));
        }

        Ok(())
    }

    /// Same as [`Self::validate_filename`], converted to a `TrackerError`.
    ///
    /// # Errors
    ///
    /// Returns `TrackerError::Validation` when the name is rejected.
    pub fn check_filename(name: &str) -> Result<(), TrackerError> {
        Self::validate_filename(name)
            .map_err(|err| TrackerError::from_validation_errors(vec![err]))
    }
}
