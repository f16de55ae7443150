#![allow(dead_code)]

use issue_tracker::model::{
    InlineAttachment, Issue, IssueType, NewIssue, Project, Severity, Status,
};
use issue_tracker::service::Services;

/// Builder for create requests with sensible defaults.
pub struct IssueBuilder {
    request: NewIssue,
}

impl IssueBuilder {
    pub fn new(title: &str) -> Self {
        Self {
            request: NewIssue {
                title: title.to_string(),
                description: format!("Description of {title}"),
                author: "tester".to_string(),
                issue_type: IssueType::Bug,
                severity: Severity::Medium,
                status: None,
                project: Project::Tracker,
                attachment: None,
            },
        }
    }

    pub fn with_type(mut self, t: IssueType) -> Self {
        self.request.issue_type = t;
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.request.severity = severity;
        self
    }

    pub fn with_status(mut self, status: Status) -> Self {
        self.request.status = Some(status);
        self
    }

    pub fn with_project(mut self, project: Project) -> Self {
        self.request.project = project;
        self
    }

    pub fn with_author(mut self, author: &str) -> Self {
        self.request.author = author.to_string();
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.request.description = description.to_string();
        self
    }

    pub fn with_attachment(mut self, filename: &str, bytes: &[u8]) -> Self {
        self.request.attachment = Some(InlineAttachment {
            original_filename: filename.to_string(),
            bytes: bytes.to_vec(),
        });
        self
    }

    pub fn build(self) -> NewIssue {
        self.request
    }

    pub fn create(self, services: &Services) -> Issue {
        services
            .issues
            .create(self.request)
            .expect("create issue")
    }
}

/// Stored-issue value for storage-level tests.
pub fn issue(title: &str) -> Issue {
    Issue {
        id: 0,
        title: title.to_string(),
        description: String::new(),
        author: "tester".to_string(),
        date: chrono::Utc::now(),
        issue_type: IssueType::Bug,
        severity: Severity::Medium,
        status: Status::Submitted,
        project: Project::Tracker,
    }
}
