//! Free-text search over title, author and description.

use super::IssueService;
use crate::error::Result;
use crate::model::Issue;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct SearchService {
    issues: IssueService,
}

impl SearchService {
    #[must_use]
    pub const fn new(issues: IssueService) -> Self {
        Self { issues }
    }

    /// Issues whose title, author or description contains `query`
    /// (case-insensitive), newest first. `None` or an empty query returns
    /// every issue.
    ///
    /// # Errors
    ///
    /// Returns an error if loading issues fails.
    pub fn search(&self, query: Option<&str>) -> Result<Vec<Issue>> {
        let all = self.issues.all()?;

        let Some(query) = query.filter(|q| !q.is_empty()) else {
            return Ok(all);
        };

        let needle = query.to_lowercase();
        let matched: Vec<Issue> = all
            .into_iter()
            .filter(|issue| matches_query(issue, &needle))
            .collect();

        debug!(query, matched = matched.len(), "Searched issues");
        Ok(matched)
    }
}

/// `needle` must already be lower-case.
#[must_use]
pub fn matches_query(issue: &Issue, needle: &str) -> bool {
    [&issue.title, &issue.author, &issue.description]
        .iter()
        .any(|field| field.to_lowercase().contains(needle))
}
