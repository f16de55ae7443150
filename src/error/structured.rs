//! Structured error output for the HTTP client and the CLI.
//!
//! Provides machine-parseable error information with:
//! - Error codes for categorization
//! - HTTP status mapping
//! - Hints for self-correction
//! - Retryability flags
//! - Context for debugging
//!
//! Intent detection recognizes common misspellings of categorical
//! property values ("fixed" for SOLVED, "feature" for ENHANCEMENT, ...).

#![allow(clippy::option_if_let_else, clippy::manual_map)]

use crate::error::TrackerError;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::LazyLock;

/// Machine-readable error codes.
///
/// These codes are stable and can be used for programmatic error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // === Database Errors ===
    /// Database could not be opened
    DatabaseUnavailable,
    /// Database operation failed
    DatabaseError,

    // === Issue Errors ===
    /// Issue with specified ID or title not found
    IssueNotFound,
    /// Issue title already taken
    DuplicateTitle,

    // === Attachment Errors ===
    /// Attachment row or file not found
    AttachmentNotFound,
    /// Zero-byte upload
    EmptyAttachment,

    // === Validation Errors ===
    /// Field validation failed
    ValidationFailed,
    /// Unknown categorical property value
    InvalidProperty,

    // === Config Errors ===
    /// Configuration error
    ConfigError,

    // === I/O Errors ===
    /// File I/O error
    IoError,
    /// JSON serialization error
    JsonError,
    /// YAML parsing error
    YamlError,

    // === Internal Errors ===
    /// Unexpected internal error
    InternalError,
}

impl ErrorCode {
    /// Get the string representation for JSON output.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::DatabaseUnavailable => "DATABASE_UNAVAILABLE",
            Self::DatabaseError => "DATABASE_ERROR",
            Self::IssueNotFound => "ISSUE_NOT_FOUND",
            Self::DuplicateTitle => "DUPLICATE_TITLE",
            Self::AttachmentNotFound => "ATTACHMENT_NOT_FOUND",
            Self::EmptyAttachment => "EMPTY_ATTACHMENT",
            Self::ValidationFailed => "VALIDATION_FAILED",
            Self::InvalidProperty => "INVALID_PROPERTY",
            Self::ConfigError => "CONFIG_ERROR",
            Self::IoError => "IO_ERROR",
            Self::JsonError => "JSON_ERROR",
            Self::YamlError => "YAML_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Whether the client might succeed after fixing its input.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::DuplicateTitle
                | Self::EmptyAttachment
                | Self::ValidationFailed
                | Self::InvalidProperty
        )
    }

    /// HTTP status code for this error category.
    ///
    /// - 409: title conflict
    /// - 404: lookup misses
    /// - 400: malformed or invalid input
    /// - 503: database unavailable
    /// - 500: everything else
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        match self {
            Self::DuplicateTitle => 409,
            Self::IssueNotFound | Self::AttachmentNotFound => 404,
            Self::EmptyAttachment | Self::ValidationFailed | Self::InvalidProperty => 400,
            Self::DatabaseUnavailable => 503,
            Self::DatabaseError
            | Self::ConfigError
            | Self::IoError
            | Self::JsonError
            | Self::YamlError
            | Self::InternalError => 500,
        }
    }

    /// Process exit code used by the CLI.
    ///
    /// - 1: internal/unknown errors
    /// - 2: database errors
    /// - 3: issue/attachment errors
    /// - 4: validation errors
    /// - 7: config errors
    /// - 8: I/O errors
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::DatabaseUnavailable | Self::DatabaseError => 2,
            Self::IssueNotFound
            | Self::DuplicateTitle
            | Self::AttachmentNotFound
            | Self::EmptyAttachment => 3,
            Self::ValidationFailed | Self::InvalidProperty => 4,
            Self::ConfigError => 7,
            Self::IoError | Self::JsonError | Self::YamlError => 8,
            Self::InternalError => 1,
        }
    }
}

/// Structured error for machine-parseable output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredError {
    /// Machine-readable error code
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Optional hint for fixing the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    /// Whether the operation can be retried
    pub retryable: bool,
    /// Additional context data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
}

impl StructuredError {
    /// Create a new structured error from a `TrackerError`.
    #[must_use]
    pub fn from_error(err: &TrackerError) -> Self {
        let (code, context) = Self::extract_code_and_context(err);
        let hint = Self::generate_hint(err);

        Self {
            code,
            message: err.to_string(),
            hint,
            retryable: code.is_retryable(),
            context,
        }
    }

    /// HTTP status for this error.
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        self.code.http_status()
    }

    /// Serialize to JSON value.
    #[must_use]
    pub fn to_json(&self) -> Value {
        json!({
            "error": {
                "code": self.code.as_str(),
                "message": self.message,
                "hint": self.hint,
                "retryable": self.retryable,
                "context": self.context,
            }
        })
    }

    /// Format for human-readable output.
    #[must_use]
    pub fn to_human(&self, color: bool) -> String {
        let mut output = String::new();

        if color {
            output.push_str("\x1b[31mError:\x1b[0m ");
        } else {
            output.push_str("Error: ");
        }

        output.push_str(&self.message);

        if let Some(hint) = &self.hint {
            output.push('\n');
            if color {
                output.push_str("\x1b[33mHint:\x1b[0m ");
            } else {
                output.push_str("Hint: ");
            }
            output.push_str(hint);
        }

        output
    }

    fn extract_code_and_context(err: &TrackerError) -> (ErrorCode, Option<Value>) {
        match err {
            TrackerError::DatabaseUnavailable { path } => (
                ErrorCode::DatabaseUnavailable,
                Some(json!({"path": path.display().to_string()})),
            ),
            TrackerError::Database(_) => (ErrorCode::DatabaseError, None),
            TrackerError::IssueNotFound { id } => {
                (ErrorCode::IssueNotFound, Some(json!({"searched_id": id})))
            }
            TrackerError::IssueTitleNotFound { title } => (
                ErrorCode::IssueNotFound,
                Some(json!({"searched_title": title})),
            ),
            TrackerError::DuplicateTitle { title } => {
                (ErrorCode::DuplicateTitle, Some(json!({"title": title})))
            }
            TrackerError::AttachmentNotFound { id } => (
                ErrorCode::AttachmentNotFound,
                Some(json!({"searched_id": id})),
            ),
            TrackerError::AttachmentFileNotFound { issue_id, filename } => (
                ErrorCode::AttachmentNotFound,
                Some(json!({"issue_id": issue_id, "filename": filename})),
            ),
            TrackerError::EmptyAttachment { filename } => (
                ErrorCode::EmptyAttachment,
                Some(json!({"filename": filename})),
            ),
            TrackerError::Validation { field, reason } => (
                ErrorCode::ValidationFailed,
                Some(json!({"field": field, "reason": reason})),
            ),
            TrackerError::ValidationErrors { errors } => (
                ErrorCode::ValidationFailed,
                Some(json!({
                    "errors": errors.iter()
                        .map(|e| json!({"field": e.field, "message": e.message}))
                        .collect::<Vec<_>>()
                })),
            ),
            TrackerError::InvalidProperty { property, value } => (
                ErrorCode::InvalidProperty,
                Some(json!({
                    "property": property,
                    "provided": value,
                    "valid_values": valid_values(property),
                })),
            ),
            TrackerError::Config(_) => (ErrorCode::ConfigError, None),
            TrackerError::Io(_) => (ErrorCode::IoError, None),
            TrackerError::Json(_) => (ErrorCode::JsonError, None),
            TrackerError::Yaml(_) => (ErrorCode::YamlError, None),
            TrackerError::WithContext { context, source } => {
                let code = if source.is::<std::io::Error>() {
                    ErrorCode::IoError
                } else {
                    ErrorCode::InternalError
                };
                (code, Some(json!({"context": context})))
            }
            TrackerError::Other(_) => (ErrorCode::InternalError, None),
        }
    }

    fn generate_hint(err: &TrackerError) -> Option<String> {
        if let TrackerError::InvalidProperty { property, value } = err {
            if let Some(detected) = detect_property_intent(property, value) {
                return Some(format!("Did you mean {detected}?"));
            }
        }

        if let Some(suggestion) = err.suggestion() {
            return Some(suggestion.to_string());
        }

        match err {
            TrackerError::IssueNotFound { .. } | TrackerError::IssueTitleNotFound { .. } => {
                Some("Request /issue/all to see available issues.".to_string())
            }
            TrackerError::AttachmentNotFound { .. } => {
                Some("Request /issue/id/{id}/attachments to see stored files.".to_string())
            }
            _ => None,
        }
    }
}

// === Precomputed Valid Values ===

static VALID_VALUES: LazyLock<HashMap<&'static str, &'static [&'static str]>> =
    LazyLock::new(|| {
        [
            ("type", &["BUG", "SUGGESTION", "ENHANCEMENT"][..]),
            ("severity", &["CRITICAL", "HIGH", "MEDIUM", "LOW"][..]),
            ("status", &["SUBMITTED", "OPEN", "SOLVED"][..]),
            ("project", &["MWP", "TRACKER", "SUDOKU", "DAP"][..]),
        ]
        .into_iter()
        .collect()
    });

/// Synonyms for intent detection, keyed by property.
static PROPERTY_SYNONYMS: LazyLock<HashMap<(&'static str, &'static str), &'static str>> =
    LazyLock::new(|| {
        [
            (("type", "defect"), "BUG"),
            (("type", "error"), "BUG"),
            (("type", "feature"), "ENHANCEMENT"),
            (("type", "improvement"), "ENHANCEMENT"),
            (("type", "idea"), "SUGGESTION"),
            (("type", "proposal"), "SUGGESTION"),
            (("severity", "urgent"), "CRITICAL"),
            (("severity", "blocker"), "CRITICAL"),
            (("severity", "major"), "HIGH"),
            (("severity", "normal"), "MEDIUM"),
            (("severity", "minor"), "LOW"),
            (("severity", "trivial"), "LOW"),
            (("status", "new"), "SUBMITTED"),
            (("status", "reported"), "SUBMITTED"),
            (("status", "in_progress"), "OPEN"),
            (("status", "active"), "OPEN"),
            (("status", "fixed"), "SOLVED"),
            (("status", "done"), "SOLVED"),
            (("status", "closed"), "SOLVED"),
            (("status", "resolved"), "SOLVED"),
        ]
        .into_iter()
        .collect()
    });

fn valid_values(property: &str) -> Vec<&'static str> {
    VALID_VALUES
        .get(property)
        .map(|values| values.to_vec())
        .unwrap_or_default()
}

/// Detect what value the client likely meant for a categorical property.
fn detect_property_intent(property: &str, input: &str) -> Option<&'static str> {
    let lower = input.trim().to_lowercase();
    let upper = lower.to_uppercase();

    if let Some(values) = VALID_VALUES.get(property) {
        if let Some(found) = values.iter().find(|v| **v == upper) {
            return Some(found);
        }
    }

    PROPERTY_SYNONYMS
        .iter()
        .find(|((prop, synonym), _)| *prop == property && *synonym == lower)
        .map(|(_, canonical)| *canonical)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_title_maps_to_conflict() {
        let err = TrackerError::DuplicateTitle {
            title: "Crash".to_string(),
        };
        let structured = StructuredError::from_error(&err);
        assert_eq!(structured.code, ErrorCode::DuplicateTitle);
        assert_eq!(structured.http_status(), 409);
        assert!(structured.retryable);
    }

    #[test]
    fn not_found_family_maps_to_404() {
        for err in [
            TrackerError::IssueNotFound { id: 9 },
            TrackerError::IssueTitleNotFound {
                title: "missing".to_string(),
            },
            TrackerError::AttachmentNotFound { id: 2 },
            TrackerError::AttachmentFileNotFound {
                issue_id: 1,
                filename: "a.txt".to_string(),
            },
        ] {
            assert_eq!(StructuredError::from_error(&err).http_status(), 404);
        }
    }

    #[test]
    fn io_errors_map_to_500() {
        let err = TrackerError::Io(std::io::Error::other("boom"));
        let structured = StructuredError::from_error(&err);
        assert_eq!(structured.code, ErrorCode::IoError);
        assert_eq!(structured.http_status(), 500);
        assert!(!structured.retryable);
    }

    #[test]
    fn empty_attachment_is_bad_request() {
        let err = TrackerError::EmptyAttachment {
            filename: "empty.log".to_string(),
        };
        let structured = StructuredError::from_error(&err);
        assert_eq!(structured.http_status(), 400);
        assert_eq!(
            structured.hint.as_deref(),
            Some("Upload a file with non-empty content")
        );
    }

    #[test]
    fn invalid_property_detects_synonym() {
        let err = TrackerError::InvalidProperty {
            property: "status",
            value: "fixed".to_string(),
        };
        let structured = StructuredError::from_error(&err);
        assert_eq!(structured.hint.as_deref(), Some("Did you mean SOLVED?"));
        let context = structured.context.unwrap();
        assert_eq!(context["valid_values"][2], "SOLVED");
    }

    #[test]
    fn invalid_property_without_intent_uses_suggestion() {
        let err = TrackerError::InvalidProperty {
            property: "project",
            value: "zzz".to_string(),
        };
        let structured = StructuredError::from_error(&err);
        assert_eq!(
            structured.hint.as_deref(),
            Some("Valid projects: MWP, TRACKER, SUDOKU, DAP")
        );
    }

    #[test]
    fn to_json_shape() {
        let err = TrackerError::IssueNotFound { id: 5 };
        let json = StructuredError::from_error(&err).to_json();
        assert_eq!(json["error"]["code"], "ISSUE_NOT_FOUND");
        assert_eq!(json["error"]["context"]["searched_id"], 5);
        assert_eq!(json["error"]["retryable"], false);
    }

    #[test]
    fn to_human_without_color() {
        let err = TrackerError::DuplicateTitle {
            title: "Dup".to_string(),
        };
        let human = StructuredError::from_error(&err).to_human(false);
        assert!(human.starts_with("Error: Issue with title 'Dup' already exists"));
        assert!(human.contains("Hint: Choose a different title"));
    }

    #[test]
    fn exit_codes_grouped() {
        assert_eq!(ErrorCode::DatabaseError.exit_code(), 2);
        assert_eq!(ErrorCode::IssueNotFound.exit_code(), 3);
        assert_eq!(ErrorCode::InvalidProperty.exit_code(), 4);
        assert_eq!(ErrorCode::ConfigError.exit_code(), 7);
        assert_eq!(ErrorCode::IoError.exit_code(), 8);
        assert_eq!(ErrorCode::InternalError.exit_code(), 1);
    }
}
