//! Service abstraction layer for the issue-tracking platform.
//!
//! The reconciliation components never talk to the network themselves. They
//! receive already-fetched data and call back out through these traits for
//! the handful of mutations they need. Query syntax, pagination, retries and
//! rate limits belong to the implementations.
//!
//! - [`GitHubClient`]: blocking GraphQL/REST client used by the binary
//! - [`InMemoryBackend`]: shared in-memory state for tests

use crate::domain::{Issue, IssueKey, ProjectMetadata, Repository};
use crate::resolver::ResolvedField;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

pub mod github;
pub mod memory;

pub use github::GitHubClient;
#[allow(unused_imports)] // Public API used only in tests, not in binary
pub use memory::InMemoryBackend;

/// A project board addressed by owner login and project number
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRef {
    pub owner: String,
    pub number: u64,
}

impl fmt::Display for ProjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/projects/{}", self.owner, self.number)
    }
}

/// Content of an issue to be created
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewIssue {
    pub title: String,
    pub body: String,
    pub labels: Vec<String>,
}

impl NewIssue {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }
}

/// Issue search in the platform's own query language.
pub trait IssueSearch {
    /// Run `query` unmodified and return matching issues in result order.
    ///
    /// # Errors
    ///
    /// Returns an error if the search cannot be executed.
    fn search(&self, query: &str) -> Result<Vec<Issue>>;

    /// Fetch a single issue with its body, field values, parent and sub-issues.
    ///
    /// # Errors
    ///
    /// Returns an error if the issue does not exist or cannot be fetched.
    fn fetch_issue(&self, repository: &Repository, number: u64) -> Result<Issue>;
}

/// Project board metadata and membership.
pub trait ProjectSource {
    /// Fetch field and option identifiers for a project.
    ///
    /// # Errors
    ///
    /// Returns an error if the project does not exist or cannot be read.
    fn fetch_metadata(&self, project: &ProjectRef) -> Result<ProjectMetadata>;

    /// Keys of all issues already on the board.
    ///
    /// # Errors
    ///
    /// Returns an error if the board items cannot be listed.
    fn tracked_keys(&self, project_id: &str) -> Result<HashSet<IssueKey>>;
}

/// State-changing calls.
///
/// Every method acts on exactly one issue so batch callers can attribute and
/// accumulate failures per item.
pub trait Mutations {
    /// Set one project field on an issue's board item.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is rejected or the call fails.
    fn update_field(&self, project_id: &str, issue: &Issue, field: &ResolvedField) -> Result<()>;

    /// Add a label to an issue.
    ///
    /// # Errors
    ///
    /// Returns an error if the label cannot be added.
    fn add_label(&self, issue: &Issue, label: &str) -> Result<()>;

    /// Add an issue to the board and return the new item's identifier.
    ///
    /// # Errors
    ///
    /// Returns an error if the issue cannot be added.
    fn add_to_project(&self, project_id: &str, issue: &Issue) -> Result<String>;

    /// Create an issue, optionally linked to `parent` as a sub-issue.
    ///
    /// # Errors
    ///
    /// Returns an error if creation or parent linking fails.
    fn create_issue(
        &self,
        repository: &Repository,
        issue: &NewIssue,
        parent: Option<&Issue>,
    ) -> Result<Issue>;
}

/// Everything the command layer needs from one backend
pub trait ProjectService: IssueSearch + ProjectSource + Mutations {}

impl<T: IssueSearch + ProjectSource + Mutations> ProjectService for T {}
