//! Shared utilities for `issue_tracker`.
//!
//! Common functionality used across modules:
//! - Description normalization (newlines to `<br />`)
//! - Time parsing and formatting (RFC3339)
//! - Attachment path layout

pub mod html;
pub mod time;

pub use html::normalize_description;

use std::path::{Path, PathBuf};

/// Directory holding all files of one issue: `<root>/<issue id>`.
#[must_use]
pub fn attachment_dir(root: &Path, issue_id: i64) -> PathBuf {
    root.join(issue_id.to_string())
}

/// Location of a stored attachment: `<root>/<issue id>/<filename>`.
#[must_use]
pub fn attachment_file(root: &Path, issue_id: i64, filename: &str) -> PathBuf {
    attachment_dir(root, issue_id).join(filename)
}

/// Relative file path stored after the download endpoint.
#[must_use]
pub fn attachment_relative_path(issue_id: i64, filename: &str) -> String {
    format!("{issue_id}/{filename}")
}
