//! Error types and handling for `issue_tracker`.
//!
//! # Design
//!
//! - Uses `thiserror` for derive-based error types
//! - Supports `anyhow` integration through the `Other` variant
//! - Provides recovery hints for client-facing errors
//! - Maps every error onto a stable code and HTTP status (see `structured`)

mod context;
mod structured;

pub use context::{OptionExt, ResultExt};
pub use structured::{ErrorCode, StructuredError};

use std::path::PathBuf;
use thiserror::Error;

/// Primary error type for `issue_tracker` operations.
#[derive(Error, Debug)]
pub enum TrackerError {
    // === Storage Errors ===
    /// Database file could not be opened at the specified path.
    #[error("Database not available at '{path}'")]
    DatabaseUnavailable { path: PathBuf },

    /// `SQLite` database error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    // === Issue Errors ===
    /// Issue with the specified ID was not found.
    #[error("Requested issue report does not exist: id {id}")]
    IssueNotFound { id: i64 },

    /// Issue with the specified title was not found.
    #[error("Requested issue report does not exist: title '{title}'")]
    IssueTitleNotFound { title: String },

    /// Attempted to create an issue with a title that already exists.
    #[error("Issue with title '{title}' already exists")]
    DuplicateTitle { title: String },

    // === Attachment Errors ===
    /// Attachment metadata row not found.
    #[error("Requested attachment does not exist: id {id}")]
    AttachmentNotFound { id: i64 },

    /// Stored attachment file not found on disk.
    #[error("Requested file does not exist: {issue_id}/{filename}")]
    AttachmentFileNotFound { issue_id: i64, filename: String },

    /// Uploaded attachment has no content.
    #[error("Attachment file '{filename}' is empty")]
    EmptyAttachment { filename: String },

    // === Validation Errors ===
    /// Field validation failed.
    #[error("Validation failed: {field}: {reason}")]
    Validation { field: String, reason: String },

    /// Multiple validation errors occurred.
    #[error("Validation errors: {errors:?}")]
    ValidationErrors { errors: Vec<ValidationError> },

    /// Unknown value for a categorical issue property.
    #[error("Invalid {property}: {value}")]
    InvalidProperty {
        property: &'static str,
        value: String,
    },

    // === Configuration Errors ===
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    // === I/O Errors ===
    /// File system I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    // === Wrapped errors ===
    /// Error with additional context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Wrapped anyhow error.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// A single field validation error.
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// The field that failed validation.
    pub field: String,
    /// The reason for the validation failure.
    pub message: String,
}

impl ValidationError {
    /// Create a new validation error.
    #[must_use]
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

impl TrackerError {
    /// Can the client fix this by changing its request?
    #[must_use]
    pub const fn is_user_recoverable(&self) -> bool {
        matches!(
            self,
            Self::IssueNotFound { .. }
                | Self::IssueTitleNotFound { .. }
                | Self::DuplicateTitle { .. }
                | Self::AttachmentNotFound { .. }
                | Self::AttachmentFileNotFound { .. }
                | Self::EmptyAttachment { .. }
                | Self::Validation { .. }
                | Self::ValidationErrors { .. }
                | Self::InvalidProperty { .. }
        )
    }

    /// Is this one of the "lookup missed" errors?
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::IssueNotFound { .. }
                | Self::IssueTitleNotFound { .. }
                | Self::AttachmentNotFound { .. }
                | Self::AttachmentFileNotFound { .. }
        )
    }

    /// Human-friendly suggestion for fixing this error.
    #[must_use]
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::DuplicateTitle { .. } => Some("Choose a different title for the issue report"),
            Self::EmptyAttachment { .. } => Some("Upload a file with non-empty content"),
            Self::InvalidProperty { property, .. } => Some(match *property {
                "type" => "Valid types: BUG, SUGGESTION, ENHANCEMENT",
                "severity" => "Valid severities: CRITICAL, HIGH, MEDIUM, LOW",
                "status" => "Valid statuses: SUBMITTED, OPEN, SOLVED",
                "project" => "Valid projects: MWP, TRACKER, SUDOKU, DAP",
                _ => "Check the property value",
            }),
            Self::DatabaseUnavailable { .. } => {
                Some("Check the configured database path or run: issue-tracker init")
            }
            _ => None,
        }
    }

    /// Create a validation error for a specific field.
    #[must_use]
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create from multiple validation errors.
    #[must_use]
    pub fn from_validation_errors(errors: Vec<ValidationError>) -> Self {
        if errors.len() == 1 {
            let err = &errors[0];
            Self::Validation {
                field: err.field.clone(),
                reason: err.message.clone(),
            }
        } else {
            Self::ValidationErrors { errors }
        }
    }
}

/// Result type using `TrackerError`.
pub type Result<T> = std::result::Result<T, TrackerError>;
