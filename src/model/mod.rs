//! Core data types for `issue_tracker`.
//!
//! This module defines the fundamental types used throughout the application:
//! - `Issue` - The tracked issue report
//! - `IssueType`, `Severity`, `Status`, `Project` - Categorical properties
//! - `HistoryRecord` - Audit log entries
//! - `Attachment` - Uploaded file metadata
//! - Request payloads (`NewIssue`, `PropertyUpdate`, `DescriptionUpdate`,
//!   `IssueFilter`, `AttachmentUpload`)

use crate::error::TrackerError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Issue category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IssueType {
    Bug,
    Suggestion,
    Enhancement,
}

impl IssueType {
    pub const ALL: [Self; 3] = [Self::Bug, Self::Suggestion, Self::Enhancement];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Bug => "BUG",
            Self::Suggestion => "SUGGESTION",
            Self::Enhancement => "ENHANCEMENT",
        }
    }
}

impl fmt::Display for IssueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for IssueType {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "BUG" => Ok(Self::Bug),
            "SUGGESTION" => Ok(Self::Suggestion),
            "ENHANCEMENT" => Ok(Self::Enhancement),
            _ => Err(TrackerError::InvalidProperty {
                property: "type",
                value: s.to_string(),
            }),
        }
    }
}

/// How badly an issue hurts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Severity {
    pub const ALL: [Self; 4] = [Self::Critical, Self::High, Self::Medium, Self::Low];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "CRITICAL",
            Self::High => "HIGH",
            Self::Medium => "MEDIUM",
            Self::Low => "LOW",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Severity {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "CRITICAL" => Ok(Self::Critical),
            "HIGH" => Ok(Self::High),
            "MEDIUM" => Ok(Self::Medium),
            "LOW" => Ok(Self::Low),
            _ => Err(TrackerError::InvalidProperty {
                property: "severity",
                value: s.to_string(),
            }),
        }
    }
}

/// Issue lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Status {
    #[default]
    Submitted,
    Open,
    Solved,
}

impl Status {
    pub const ALL: [Self; 3] = [Self::Submitted, Self::Open, Self::Solved];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Submitted => "SUBMITTED",
            Self::Open => "OPEN",
            Self::Solved => "SOLVED",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Status {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "SUBMITTED" => Ok(Self::Submitted),
            "OPEN" => Ok(Self::Open),
            "SOLVED" => Ok(Self::Solved),
            _ => Err(TrackerError::InvalidProperty {
                property: "status",
                value: s.to_string(),
            }),
        }
    }
}

/// Project an issue belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Project {
    Mwp,
    Tracker,
    Sudoku,
    Dap,
}

impl Project {
    pub const ALL: [Self; 4] = [Self::Mwp, Self::Tracker, Self::Sudoku, Self::Dap];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Mwp => "MWP",
            Self::Tracker => "TRACKER",
            Self::Sudoku => "SUDOKU",
            Self::Dap => "DAP",
        }
    }
}

impl fmt::Display for Project {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Project {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "MWP" => Ok(Self::Mwp),
            "TRACKER" => Ok(Self::Tracker),
            "SUDOKU" => Ok(Self::Sudoku),
            "DAP" => Ok(Self::Dap),
            _ => Err(TrackerError::InvalidProperty {
                property: "project",
                value: s.to_string(),
            }),
        }
    }
}

// Categorical values travel as their upper-case names; input is matched
// case-insensitively through `FromStr`.
macro_rules! serde_via_str {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl Serialize for $ty {
                fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                    serializer.serialize_str(self.as_str())
                }
            }

            impl<'de> Deserialize<'de> for $ty {
                fn deserialize<D: serde::Deserializer<'de>>(
                    deserializer: D,
                ) -> Result<Self, D::Error> {
                    let value = String::deserialize(deserializer)?;
                    value.parse().map_err(serde::de::Error::custom)
                }
            }
        )+
    };
}

serde_via_str!(IssueType, Severity, Status, Project);

/// An issue report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Issue {
    /// Store-assigned identifier.
    pub id: i64,

    /// Unique title.
    pub title: String,

    /// Description with newlines rendered as `<br />`.
    pub description: String,

    pub author: String,

    /// Creation timestamp.
    pub date: DateTime<Utc>,

    #[serde(rename = "type")]
    pub issue_type: IssueType,

    pub severity: Severity,

    pub status: Status,

    pub project: Project,
}

impl Issue {
    /// The four categorical properties as one space-separated string.
    #[must_use]
    pub fn properties_summary(&self) -> String {
        properties_summary(self.issue_type, self.severity, self.status, self.project)
    }
}

/// Format categorical properties in their canonical history order.
#[must_use]
pub fn properties_summary(
    issue_type: IssueType,
    severity: Severity,
    status: Status,
    project: Project,
) -> String {
    format!("{issue_type} {severity} {status} {project}")
}

/// Audit trail entry for an issue.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HistoryRecord {
    pub id: i64,
    pub text: String,
    pub date: DateTime<Utc>,
    #[serde(skip)]
    pub issue_id: i64,
}

/// The kind of change a history record documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    Created(String),
    Updated(String),
    DescriptionChanged,
    FileUploaded(String),
    FileDeleted(String),
}

impl Change {
    /// Render the stored history text.
    #[must_use]
    pub fn text(&self) -> String {
        match self {
            Self::Created(props) => format!("CREATED with properties: {props}"),
            Self::Updated(props) => format!("UPDATED with properties: {props}"),
            Self::DescriptionChanged => "CHANGED DESCRIPTION".to_string(),
            Self::FileUploaded(name) => format!("UPLOADED file: {name}"),
            Self::FileDeleted(name) => format!("DELETED file: {name}"),
        }
    }
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text())
    }
}

/// Metadata for a stored attachment file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Attachment {
    pub id: i64,
    /// Download link (`<download endpoint><issue id>/<filename>`).
    pub path: String,
    pub original_filename: String,
    pub date: DateTime<Utc>,
    #[serde(skip)]
    pub issue_id: i64,
}

/// Request body for creating an issue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewIssue {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub author: String,
    #[serde(rename = "type")]
    pub issue_type: IssueType,
    pub severity: Severity,
    #[serde(default)]
    pub status: Option<Status>,
    pub project: Project,
    /// Optional file stored alongside the new issue.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment: Option<InlineAttachment>,
}

/// File content embedded in a create request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InlineAttachment {
    pub original_filename: String,
    #[serde(with = "base64_bytes", default)]
    pub bytes: Vec<u8>,
}

/// Request body for uploading an attachment to an existing issue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachmentUpload {
    pub issue_title: String,
    pub original_filename: String,
    #[serde(with = "base64_bytes", default)]
    pub bytes: Vec<u8>,
}

/// Request body for replacing all four categorical properties.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PropertyUpdate {
    pub id: i64,
    #[serde(rename = "type")]
    pub issue_type: IssueType,
    pub severity: Severity,
    pub status: Status,
    pub project: Project,
}

impl PropertyUpdate {
    #[must_use]
    pub fn summary(&self) -> String {
        properties_summary(self.issue_type, self.severity, self.status, self.project)
    }
}

/// Request body for replacing an issue description by title.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DescriptionUpdate {
    pub title: String,
    #[serde(default)]
    pub description: String,
}

/// Optional attribute values for the multi-property filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueFilter {
    #[serde(rename = "type", default)]
    pub issue_type: Option<IssueType>,
    #[serde(default)]
    pub severity: Option<Severity>,
    #[serde(default)]
    pub status: Option<Status>,
    #[serde(default)]
    pub project: Option<Project>,
}

impl IssueFilter {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.issue_type.is_none()
            && self.severity.is_none()
            && self.status.is_none()
            && self.project.is_none()
    }

    /// Whether an issue satisfies every set attribute.
    #[must_use]
    pub fn matches(&self, issue: &Issue) -> bool {
        self.issue_type.is_none_or(|t| t == issue.issue_type)
            && self.severity.is_none_or(|s| s == issue.severity)
            && self.status.is_none_or(|s| s == issue.status)
            && self.project.is_none_or(|p| p == issue.project)
    }
}

/// Single categorical property used for per-attribute lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyValue {
    Type(IssueType),
    Severity(Severity),
    Status(Status),
    Project(Project),
}

impl PropertyValue {
    /// Column holding this property in the `issues` table.
    #[must_use]
    pub const fn column(&self) -> &'static str {
        match self {
            Self::Type(_) => "issue_type",
            Self::Severity(_) => "severity",
            Self::Status(_) => "status",
            Self::Project(_) => "project",
        }
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Type(v) => v.as_str(),
            Self::Severity(v) => v.as_str(),
            Self::Status(v) => v.as_str(),
            Self::Project(v) => v.as_str(),
        }
    }
}

/// Base64 (standard alphabet) encoding for binary JSON fields.
mod base64_bytes {
    use base64::{Engine as _, engine::general_purpose::STANDARD};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
        STANDARD
            .decode(encoded.trim())
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_issue() -> Issue {
        Issue {
            id: 1,
            title: "Crash".to_string(),
            description: "Boom".to_string(),
            author: "Alice".to_string(),
            date: Utc::now(),
            issue_type: IssueType::Bug,
            severity: Severity::High,
            status: Status::Submitted,
            project: Project::Mwp,
        }
    }

    #[test]
    fn categorical_parse_is_case_insensitive() {
        assert_eq!("bug".parse::<IssueType>().unwrap(), IssueType::Bug);
        assert_eq!("High".parse::<Severity>().unwrap(), Severity::High);
        assert_eq!("solved".parse::<Status>().unwrap(), Status::Solved);
        assert_eq!("sudoku".parse::<Project>().unwrap(), Project::Sudoku);
    }

    #[test]
    fn categorical_parse_rejects_unknown() {
        let err = "feature".parse::<IssueType>().unwrap_err();
        assert!(matches!(
            err,
            TrackerError::InvalidProperty {
                property: "type",
                ..
            }
        ));
    }

    #[test]
    fn status_defaults_to_submitted() {
        assert_eq!(Status::default(), Status::Submitted);
    }

    #[test]
    fn issue_serializes_upper_case_and_type_key() {
        let json = serde_json::to_value(sample_issue()).unwrap();
        assert_eq!(json["type"], "BUG");
        assert_eq!(json["severity"], "HIGH");
        assert_eq!(json["status"], "SUBMITTED");
        assert_eq!(json["project"], "MWP");
    }

    #[test]
    fn properties_summary_order() {
        assert_eq!(sample_issue().properties_summary(), "BUG HIGH SUBMITTED MWP");
    }

    #[test]
    fn change_texts() {
        assert_eq!(
            Change::Created("BUG HIGH SUBMITTED MWP".to_string()).text(),
            "CREATED with properties: BUG HIGH SUBMITTED MWP"
        );
        assert_eq!(Change::DescriptionChanged.text(), "CHANGED DESCRIPTION");
        assert_eq!(
            Change::FileUploaded("log.txt".to_string()).text(),
            "UPLOADED file: log.txt"
        );
        assert_eq!(
            Change::FileDeleted("log.txt".to_string()).text(),
            "DELETED file: log.txt"
        );
    }

    #[test]
    fn filter_accepts_missing_and_null_fields() {
        let filter: IssueFilter =
            serde_json::from_value(json!({"type": "bug", "status": null})).unwrap();
        assert_eq!(filter.issue_type, Some(IssueType::Bug));
        assert_eq!(filter.status, None);
        assert!(!filter.is_empty());
        assert!(IssueFilter::default().is_empty());
    }

    #[test]
    fn filter_matches() {
        let issue = sample_issue();
        let filter = IssueFilter {
            issue_type: Some(IssueType::Bug),
            status: Some(Status::Open),
            ..IssueFilter::default()
        };
        assert!(!filter.matches(&issue));
        assert!(IssueFilter::default().matches(&issue));
    }

    #[test]
    fn upload_decodes_base64() {
        let upload: AttachmentUpload = serde_json::from_value(json!({
            "issue_title": "Crash",
            "original_filename": "log.txt",
            "bytes": "aGVsbG8="
        }))
        .unwrap();
        assert_eq!(upload.bytes, b"hello");
    }

    #[test]
    fn upload_rejects_invalid_base64() {
        let result: Result<AttachmentUpload, _> = serde_json::from_value(json!({
            "issue_title": "Crash",
            "original_filename": "log.txt",
            "bytes": "not base64!!"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn new_issue_without_status() {
        let new: NewIssue = serde_json::from_value(json!({
            "title": "T",
            "author": "A",
            "type": "ENHANCEMENT",
            "severity": "LOW",
            "project": "DAP"
        }))
        .unwrap();
        assert_eq!(new.status, None);
        assert!(new.attachment.is_none());
        assert!(new.description.is_empty());
    }
}
