//! In-memory backend for testing.
//!
//! Holds issues, project metadata and board membership in shared state and
//! records every mutation call. Failures can be injected per issue number or
//! for all mutations, which is how batch partial-failure and dry-run behaviour
//! are exercised without a network.

use crate::domain::{Issue, IssueKey, ProjectMetadata, Repository};
use crate::resolver::ResolvedField;
use crate::service::{IssueSearch, Mutations, NewIssue, ProjectRef, ProjectSource};
use anyhow::{anyhow, bail, Result};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

#[derive(Default)]
struct State {
    issues: Vec<Issue>,
    metadata: Option<ProjectMetadata>,
    search_results: HashMap<String, Vec<IssueKey>>,
    searches: Vec<String>,
    mutations: Vec<String>,
    metadata_fetches: usize,
    failing: HashSet<u64>,
    fail_all: bool,
    next_item: u64,
}

/// In-memory backend.
///
/// Clones share the same state, so a test can keep a handle for assertions
/// while the code under test owns another.
///
/// # Examples
///
/// ```
/// use pmu::domain::{Issue, Repository};
/// use pmu::service::{InMemoryBackend, IssueSearch};
///
/// let backend = InMemoryBackend::new();
/// backend.insert_issue(Issue::new(Repository::new("o", "r"), 1, "First"));
///
/// let found = backend.search("is:open").unwrap();
/// assert_eq!(found.len(), 1);
/// assert_eq!(backend.searches(), vec!["is:open".to_string()]);
/// ```
#[derive(Clone, Default)]
#[allow(dead_code)] // Public API used only in tests, not in binary
pub struct InMemoryBackend {
    state: Rc<RefCell<State>>,
}

#[allow(dead_code)] // Public API used only in tests, not in binary
impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend whose `fetch_metadata` returns `metadata`
    pub fn with_metadata(metadata: ProjectMetadata) -> Self {
        let backend = Self::new();
        backend.state.borrow_mut().metadata = Some(metadata);
        backend
    }

    /// Store (or replace, by key) an issue
    pub fn insert_issue(&self, issue: Issue) {
        let mut state = self.state.borrow_mut();
        let key = issue.key();
        match state.issues.iter_mut().find(|i| i.key() == key) {
            Some(existing) => *existing = issue,
            None => state.issues.push(issue),
        }
    }

    /// Make `search(query)` return exactly these issues, in this order.
    ///
    /// Queries without a registered result return every stored issue.
    pub fn set_search_result(&self, query: &str, keys: Vec<IssueKey>) {
        self.state
            .borrow_mut()
            .search_results
            .insert(query.to_string(), keys);
    }

    /// Fail every mutation that targets issue `number`
    pub fn fail_mutations_for(&self, number: u64) {
        self.state.borrow_mut().failing.insert(number);
    }

    /// Fail every mutation call
    pub fn fail_all_mutations(&self) {
        self.state.borrow_mut().fail_all = true;
    }

    /// Remove all injected failures
    pub fn clear_failures(&self) {
        let mut state = self.state.borrow_mut();
        state.failing.clear();
        state.fail_all = false;
    }

    /// Current copy of a stored issue
    pub fn issue(&self, key: &IssueKey) -> Option<Issue> {
        self.state
            .borrow()
            .issues
            .iter()
            .find(|i| &i.key() == key)
            .cloned()
    }

    pub fn issues(&self) -> Vec<Issue> {
        self.state.borrow().issues.clone()
    }

    /// Queries passed to `search`, in call order
    pub fn searches(&self) -> Vec<String> {
        self.state.borrow().searches.clone()
    }

    /// Successful and failed mutation calls, in call order
    pub fn mutations(&self) -> Vec<String> {
        self.state.borrow().mutations.clone()
    }

    pub fn metadata_fetches(&self) -> usize {
        self.state.borrow().metadata_fetches
    }

    fn check_failure(&self, number: Option<u64>, call: String) -> Result<()> {
        let mut state = self.state.borrow_mut();
        state.mutations.push(call.clone());
        if state.fail_all || number.is_some_and(|n| state.failing.contains(&n)) {
            bail!("injected failure: {}", call);
        }
        Ok(())
    }

    fn with_issue_mut<T>(&self, key: &IssueKey, f: impl FnOnce(&mut Issue) -> T) -> Result<T> {
        let mut state = self.state.borrow_mut();
        let issue = state
            .issues
            .iter_mut()
            .find(|i| &i.key() == key)
            .ok_or_else(|| anyhow!("Issue not found: {}", key))?;
        Ok(f(issue))
    }
}

impl IssueSearch for InMemoryBackend {
    fn search(&self, query: &str) -> Result<Vec<Issue>> {
        let mut state = self.state.borrow_mut();
        state.searches.push(query.to_string());
        let issues = match state.search_results.get(query) {
            Some(keys) => keys
                .iter()
                .filter_map(|key| state.issues.iter().find(|i| &i.key() == key).cloned())
                .collect(),
            None => state.issues.clone(),
        };
        Ok(issues)
    }

    fn fetch_issue(&self, repository: &Repository, number: u64) -> Result<Issue> {
        let key = IssueKey::new(repository.clone(), number);
        self.issue(&key)
            .ok_or_else(|| anyhow!("Issue not found: {}", key))
    }
}

impl ProjectSource for InMemoryBackend {
    fn fetch_metadata(&self, project: &ProjectRef) -> Result<ProjectMetadata> {
        let mut state = self.state.borrow_mut();
        state.metadata_fetches += 1;
        state
            .metadata
            .clone()
            .ok_or_else(|| anyhow!("Project not found: {}", project))
    }

    fn tracked_keys(&self, _project_id: &str) -> Result<HashSet<IssueKey>> {
        Ok(self
            .state
            .borrow()
            .issues
            .iter()
            .filter(|i| i.project_item_id.is_some())
            .map(Issue::key)
            .collect())
    }
}

impl Mutations for InMemoryBackend {
    fn update_field(&self, _project_id: &str, issue: &Issue, field: &ResolvedField) -> Result<()> {
        self.check_failure(
            Some(issue.number),
            format!(
                "update_field {} {}={}",
                issue.key(),
                field.field_name,
                field.display_value
            ),
        )?;
        self.with_issue_mut(&issue.key(), |stored| {
            stored
                .field_values
                .insert(field.field_name.clone(), field.display_value.clone());
        })
    }

    fn add_label(&self, issue: &Issue, label: &str) -> Result<()> {
        self.check_failure(
            Some(issue.number),
            format!("add_label {} {}", issue.key(), label),
        )?;
        self.with_issue_mut(&issue.key(), |stored| {
            if !stored.has_label(label) {
                stored.labels.push(label.to_string());
            }
        })
    }

    fn add_to_project(&self, _project_id: &str, issue: &Issue) -> Result<String> {
        self.check_failure(
            Some(issue.number),
            format!("add_to_project {}", issue.key()),
        )?;
        let item_id = {
            let mut state = self.state.borrow_mut();
            state.next_item += 1;
            format!("PVTI_{}", state.next_item)
        };
        self.with_issue_mut(&issue.key(), |stored| {
            stored.project_item_id = Some(item_id.clone());
        })?;
        Ok(item_id)
    }

    fn create_issue(
        &self,
        repository: &Repository,
        new_issue: &NewIssue,
        parent: Option<&Issue>,
    ) -> Result<Issue> {
        self.check_failure(
            None,
            format!("create_issue {} {}", repository, new_issue.title),
        )?;

        let mut state = self.state.borrow_mut();
        let number = state
            .issues
            .iter()
            .filter(|i| &i.repository == repository)
            .map(|i| i.number)
            .max()
            .unwrap_or(0)
            + 1;

        let mut issue = Issue::new(repository.clone(), number, new_issue.title.clone());
        issue.body = new_issue.body.clone();
        issue.labels = new_issue.labels.clone();
        if let Some(parent) = parent {
            issue.parent = Some(parent.summary());
            let summary = issue.summary();
            if let Some(stored) = state.issues.iter_mut().find(|i| i.key() == parent.key()) {
                stored.sub_issues.push(summary);
            }
        }
        state.issues.push(issue.clone());
        Ok(issue)
    }
}
