//! Issue creation

use super::*;
use crate::batch::{apply_changes, Failure};
use crate::domain::IssueSummary;
use crate::patch::Change;
use crate::repo::split_repository;
use crate::service::NewIssue;
use anyhow::{anyhow, Context};
use serde::Serialize;
use tracing::info;

/// Input of `pmu create`
#[derive(Debug, Clone, Default)]
pub struct CreateRequest {
    pub title: String,
    pub body: String,
    pub status: Option<String>,
    pub priority: Option<String>,
    /// Added after the configured default labels
    pub labels: Vec<String>,
    /// `owner/name`; defaults to the first configured repository
    pub repository: Option<String>,
}

/// Result of `pmu create`
#[derive(Debug, Serialize)]
pub struct CreateOutcome {
    pub issue: IssueSummary,
    pub labels: Vec<String>,
    /// Field values set on the board item
    pub fields: Vec<Change>,
    /// Board steps that failed after the issue was created
    pub failed: Vec<Failure>,
}

impl<B: ProjectService> CommandExecutor<B> {
    /// Create an issue, add it to the board and set its status/priority.
    ///
    /// Field values are resolved before the issue is created. Failures after
    /// creation are reported in the outcome rather than as an error, since
    /// the issue already exists.
    pub fn create_issue(&self, request: CreateRequest) -> Result<CreateOutcome> {
        let repository = match &request.repository {
            Some(full_name) => {
                let (owner, name) = split_repository(full_name)
                    .ok_or_else(|| anyhow!("Invalid repository '{}': expected owner/name", full_name))?;
                Repository::new(owner, name)
            }
            None => self
                .default_repository()?
                .ok_or_else(|| anyhow!("No repository given and none configured in .pmu.toml"))?,
        };

        let mut patch = TriagePatch::default();
        if let Some(status) = request.status.as_ref().or(self.config.defaults.status.as_ref()) {
            patch.push_field("status", status);
        }
        if let Some(priority) = request.priority.as_ref().or(self.config.defaults.priority.as_ref()) {
            patch.push_field("priority", priority);
        }
        let cache = self.load_metadata()?;
        let resolved = self.resolve_patch(cache.metadata(), &patch)?;
        let project_id = cache.metadata().project_id.as_str();

        let labels = self.config.merge_labels(&request.labels);
        let new_issue = NewIssue {
            title: request.title,
            body: request.body,
            labels: labels.clone(),
        };
        let mut issue = self
            .backend
            .create_issue(&repository, &new_issue, None)
            .with_context(|| format!("Failed to create issue in {}", repository))?;
        info!("Created {}", issue.key());

        let mut failed = Vec::new();
        match self.backend.add_to_project(project_id, &issue) {
            Ok(item_id) => {
                issue.project_item_id = Some(item_id);
                if let Err(e) = apply_changes(&self.backend, project_id, &issue, &resolved.changes) {
                    failed.push(Failure::from(e));
                }
            }
            Err(e) => failed.push(Failure::new(
                issue.key().to_string(),
                format!("not added to the board: {:#}", e),
            )),
        }

        Ok(CreateOutcome {
            issue: issue.summary(),
            labels,
            fields: resolved.changes,
            failed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_helpers::setup;
    use super::*;

    #[test]
    fn test_create_with_defaults() {
        let (executor, backend) = setup();
        let outcome = executor
            .create_issue(CreateRequest {
                title: "New feature".to_string(),
                labels: vec!["enhancement".to_string()],
                ..Default::default()
            })
            .unwrap();

        assert!(outcome.failed.is_empty());
        assert_eq!(outcome.labels, vec!["pm-tracked", "enhancement"]);

        let stored = backend.issue(&outcome.issue.key()).unwrap();
        assert_eq!(stored.field_value("Status"), Some("Backlog"));
        assert!(stored.project_item_id.is_some());
    }

    #[test]
    fn test_create_overrides_status_and_priority() {
        let (executor, backend) = setup();
        let outcome = executor
            .create_issue(CreateRequest {
                title: "Urgent".to_string(),
                status: Some("in_progress".to_string()),
                priority: Some("P0".to_string()),
                repository: Some("octo/other".to_string()),
                ..Default::default()
            })
            .unwrap();

        assert_eq!(outcome.issue.repository, Repository::new("octo", "other"));
        let stored = backend.issue(&outcome.issue.key()).unwrap();
        assert_eq!(stored.field_value("Status"), Some("In progress"));
        assert_eq!(stored.field_value("Priority"), Some("P0"));
    }

    #[test]
    fn test_invalid_status_creates_nothing() {
        let (executor, backend) = setup();
        let err = executor
            .create_issue(CreateRequest {
                title: "x".to_string(),
                status: Some("shipped".to_string()),
                ..Default::default()
            })
            .unwrap_err();
        assert!(err.downcast_ref::<PmuError>().is_some());
        assert!(backend.issues().is_empty());
    }
}
