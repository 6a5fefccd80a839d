//! Core domain types for project board reconciliation.
//!
//! This module defines the data the reconciliation components work on:
//! project metadata (fields, options, opaque identifiers) and issues as
//! returned by a fetch, with their project field values and parent/sub-issue
//! projections.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Data type of a project field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldDataType {
    Text,
    Number,
    SingleSelect,
    Date,
    Iteration,
}

impl FieldDataType {
    /// Parse the platform's data type name (`SINGLE_SELECT`, `TEXT`, ...).
    ///
    /// Returns `None` for types the board exposes but that cannot be set
    /// through a field update (assignees, labels, linked PRs, ...).
    pub fn from_platform(name: &str) -> Option<Self> {
        match name {
            "TEXT" | "TITLE" => Some(FieldDataType::Text),
            "NUMBER" => Some(FieldDataType::Number),
            "SINGLE_SELECT" => Some(FieldDataType::SingleSelect),
            "DATE" => Some(FieldDataType::Date),
            "ITERATION" => Some(FieldDataType::Iteration),
            _ => None,
        }
    }
}

impl fmt::Display for FieldDataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldDataType::Text => "TEXT",
            FieldDataType::Number => "NUMBER",
            FieldDataType::SingleSelect => "SINGLE_SELECT",
            FieldDataType::Date => "DATE",
            FieldDataType::Iteration => "ITERATION",
        };
        f.write_str(name)
    }
}

/// One choice of a single-select field, or one iteration of an iteration field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionMetadata {
    pub id: String,
    pub name: String,
}

/// A named, typed project field and its opaque identifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMetadata {
    pub id: String,
    pub name: String,
    pub data_type: FieldDataType,
    /// Options of `SINGLE_SELECT` fields and iterations of `ITERATION` fields
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<OptionMetadata>,
}

/// Resolved field/option mapping for one project.
///
/// Fetched (or read from the cached snapshot) once per invocation and then
/// passed by reference into every component; never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectMetadata {
    pub project_id: String,
    #[serde(default)]
    pub fields: Vec<FieldMetadata>,
}

impl ProjectMetadata {
    /// Names of all fields, in board order
    pub fn field_names(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.name.clone()).collect()
    }
}

/// Issue lifecycle state on the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueState {
    Open,
    Closed,
}

impl fmt::Display for IssueState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssueState::Open => f.write_str("OPEN"),
            IssueState::Closed => f.write_str("CLOSED"),
        }
    }
}

/// Repository an issue lives in
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Repository {
    pub owner: String,
    pub name: String,
}

impl Repository {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Identity of an issue across repositories: `owner/repo#number`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IssueKey {
    pub repository: Repository,
    pub number: u64,
}

impl IssueKey {
    pub fn new(repository: Repository, number: u64) -> Self {
        Self { repository, number }
    }
}

impl fmt::Display for IssueKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.repository, self.number)
    }
}

/// Read-only projection of a related issue (parent or sub-issue).
///
/// These are summaries carried by the owning [`Issue`] record, not
/// independently mutable copies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueSummary {
    pub number: u64,
    pub title: String,
    pub state: IssueState,
    pub url: String,
    pub repository: Repository,
}

impl IssueSummary {
    pub fn key(&self) -> IssueKey {
        IssueKey::new(self.repository.clone(), self.number)
    }
}

/// An issue as returned by a fetch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    /// Platform node identifier
    pub id: String,
    pub number: u64,
    pub title: String,
    pub state: IssueState,
    pub url: String,
    pub repository: Repository,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub labels: Vec<String>,
    /// Current project field values by field name
    #[serde(default)]
    pub field_values: BTreeMap<String, String>,
    /// Board item identifier, when the issue is already on the project
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_item_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<IssueSummary>,
    #[serde(default)]
    pub sub_issues: Vec<IssueSummary>,
}

impl Issue {
    /// Create an open issue with no body, labels or field values
    pub fn new(repository: Repository, number: u64, title: impl Into<String>) -> Self {
        let url = format!(
            "https://github.com/{}/{}/issues/{}",
            repository.owner, repository.name, number
        );
        Self {
            id: format!("I_{}_{}_{}", repository.owner, repository.name, number),
            number,
            title: title.into(),
            state: IssueState::Open,
            url,
            repository,
            body: String::new(),
            labels: Vec::new(),
            field_values: BTreeMap::new(),
            project_item_id: None,
            parent: None,
            sub_issues: Vec::new(),
        }
    }

    pub fn key(&self) -> IssueKey {
        IssueKey::new(self.repository.clone(), self.number)
    }

    /// Current value of a project field, looked up case-insensitively by name
    pub fn field_value(&self, field_name: &str) -> Option<&str> {
        self.field_values
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(field_name))
            .map(|(_, value)| value.as_str())
    }

    /// Whether the issue carries `label` (label names are case-insensitive)
    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l.eq_ignore_ascii_case(label))
    }

    pub fn summary(&self) -> IssueSummary {
        IssueSummary {
            number: self.number,
            title: self.title.clone(),
            state: self.state,
            url: self.url.clone(),
            repository: self.repository.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_key_display() {
        let key = IssueKey::new(Repository::new("owner", "repo"), 42);
        assert_eq!(key.to_string(), "owner/repo#42");
    }

    #[test]
    fn test_field_value_lookup_ignores_case() {
        let mut issue = Issue::new(Repository::new("o", "r"), 1, "Title");
        issue
            .field_values
            .insert("Status".to_string(), "Backlog".to_string());

        assert_eq!(issue.field_value("status"), Some("Backlog"));
        assert_eq!(issue.field_value("STATUS"), Some("Backlog"));
        assert_eq!(issue.field_value("Priority"), None);
    }

    #[test]
    fn test_has_label_ignores_case() {
        let mut issue = Issue::new(Repository::new("o", "r"), 1, "Title");
        issue.labels.push("PM-Tracked".to_string());
        assert!(issue.has_label("pm-tracked"));
        assert!(!issue.has_label("bug"));
    }

    #[test]
    fn test_data_type_from_platform() {
        assert_eq!(
            FieldDataType::from_platform("SINGLE_SELECT"),
            Some(FieldDataType::SingleSelect)
        );
        assert_eq!(
            FieldDataType::from_platform("ITERATION"),
            Some(FieldDataType::Iteration)
        );
        assert_eq!(FieldDataType::from_platform("ASSIGNEES"), None);
    }

    #[test]
    fn test_data_type_serializes_as_platform_name() {
        let json = serde_json::to_string(&FieldDataType::SingleSelect).unwrap();
        assert_eq!(json, "\"SINGLE_SELECT\"");
    }
}
