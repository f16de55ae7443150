//! Multi-property filter.

use super::IssueService;
use crate::error::Result;
use crate::model::{Issue, IssueFilter, PropertyValue};
use std::collections::HashSet;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct FilterService {
    issues: IssueService,
}

impl FilterService {
    #[must_use]
    pub const fn new(issues: IssueService) -> Self {
        Self { issues }
    }

    /// Issues matching every attribute set on `filter`, newest first.
    ///
    /// Starts from the full issue set and intersects it with the cached
    /// single-property subset of each set attribute. An empty filter
    /// returns every issue.
    ///
    /// # Errors
    ///
    /// Returns an error if a lookup fails.
    pub fn filter(&self, filter: &IssueFilter) -> Result<Vec<Issue>> {
        if filter.is_empty() {
            return self.issues.all();
        }

        let mut result = self.issues.all()?;

        for value in set_properties(filter) {
            let subset: HashSet<i64> = self
                .issues
                .by_property(value)?
                .into_iter()
                .map(|issue| issue.id)
                .collect();
            result.retain(|issue| subset.contains(&issue.id));
        }

        debug!(?filter, matched = result.len(), "Filtered issues");
        Ok(result)
    }
}

fn set_properties(filter: &IssueFilter) -> Vec<PropertyValue> {
    [
        filter.issue_type.map(PropertyValue::Type),
        filter.severity.map(PropertyValue::Severity),
        filter.status.map(PropertyValue::Status),
        filter.project.map(PropertyValue::Project),
    ]
    .into_iter()
    .flatten()
    .collect()
}
