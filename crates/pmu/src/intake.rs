//! Intake: find issues in scope that are not on the board yet, and add them.

use crate::batch::{apply_changes, BatchPhase, Failure, RunMode};
use crate::domain::{Issue, IssueKey, IssueSummary};
use crate::patch::ResolvedPatch;
use crate::service::Mutations;
use serde::Serialize;
use std::collections::HashSet;
use tracing::{info, warn};

/// Issues from `scoped` whose key is not in `tracked`, in their original order.
///
/// # Examples
///
/// ```
/// use pmu::domain::{Issue, Repository};
/// use pmu::intake::reconcile;
/// use std::collections::HashSet;
///
/// let repo = Repository::new("o", "r");
/// let scoped: Vec<Issue> = (1..=3).map(|n| Issue::new(repo.clone(), n, "t")).collect();
/// let tracked: HashSet<_> = [scoped[1].key()].into_iter().collect();
///
/// let numbers: Vec<u64> = reconcile(&scoped, &tracked).iter().map(|i| i.number).collect();
/// assert_eq!(numbers, vec![1, 3]);
/// ```
pub fn reconcile<'a>(scoped: &'a [Issue], tracked: &HashSet<IssueKey>) -> Vec<&'a Issue> {
    scoped
        .iter()
        .filter(|issue| !tracked.contains(&issue.key()))
        .collect()
}

/// Outcome of an intake run
#[derive(Debug, Clone, Serialize)]
pub struct IntakeResult {
    pub phase: BatchPhase,
    pub untracked: Vec<IssueSummary>,
    /// Keys of issues now on the board
    pub added: Vec<String>,
    pub failed: Vec<Failure>,
}

impl IntakeResult {
    pub fn added_count(&self) -> usize {
        self.added.len()
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Adds untracked issues to one project.
pub struct IntakeEngine<'a, M: ?Sized> {
    mutations: &'a M,
    project_id: &'a str,
}

impl<'a, M: Mutations + ?Sized> IntakeEngine<'a, M> {
    pub fn new(mutations: &'a M, project_id: &'a str) -> Self {
        Self {
            mutations,
            project_id,
        }
    }

    /// Reconcile and, in apply mode, add each untracked issue to the board.
    ///
    /// When `patch` is given it is applied to every issue right after it is
    /// added. An issue whose add succeeded but whose patch failed counts as
    /// added and is also reported as failed.
    pub fn run(
        &self,
        scoped: &[Issue],
        tracked: &HashSet<IssueKey>,
        mode: RunMode,
        patch: Option<&ResolvedPatch>,
    ) -> IntakeResult {
        let untracked = reconcile(scoped, tracked);
        info!(
            "{} issue(s) in scope, {} not on the board",
            scoped.len(),
            untracked.len()
        );

        let summaries = untracked.iter().map(|issue| issue.summary()).collect();
        if mode == RunMode::DryRun {
            return IntakeResult {
                phase: BatchPhase::DryRunReported,
                untracked: summaries,
                added: Vec::new(),
                failed: Vec::new(),
            };
        }

        let (added, failed) = untracked.iter().fold(
            (Vec::new(), Vec::new()),
            |(mut added, mut failed), issue| {
                match self.add_one(issue, patch) {
                    Ok(None) => added.push(issue.key().to_string()),
                    Ok(Some(failure)) => {
                        added.push(issue.key().to_string());
                        failed.push(failure);
                    }
                    Err(failure) => failed.push(failure),
                }
                (added, failed)
            },
        );

        IntakeResult {
            phase: BatchPhase::after_apply(&failed),
            untracked: summaries,
            added,
            failed,
        }
    }

    /// `Err` when the issue did not make it onto the board, `Ok(Some(_))`
    /// when it did but the patch failed.
    fn add_one(&self, issue: &Issue, patch: Option<&ResolvedPatch>) -> Result<Option<Failure>, Failure> {
        let item_id = self
            .mutations
            .add_to_project(self.project_id, issue)
            .map_err(|e| {
                warn!("Failed to add {}: {:#}", issue.key(), e);
                Failure::new(issue.key().to_string(), format!("{:#}", e))
            })?;
        info!("Added {} to the board", issue.key());

        let Some(patch) = patch else {
            return Ok(None);
        };
        let mut on_board = issue.clone();
        on_board.project_item_id = Some(item_id);
        let changes = patch.diff(&on_board);

        Ok(apply_changes(self.mutations, self.project_id, &on_board, &changes)
            .err()
            .map(Failure::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Repository;
    use crate::patch::TriagePatch;
    use crate::resolver::test_fixtures::sample_metadata;
    use crate::service::InMemoryBackend;

    fn repo() -> Repository {
        Repository::new("o", "r")
    }

    fn scoped(numbers: &[u64], backend: &InMemoryBackend) -> Vec<Issue> {
        numbers
            .iter()
            .map(|&n| {
                let issue = Issue::new(repo(), n, format!("issue {}", n));
                backend.insert_issue(issue.clone());
                issue
            })
            .collect()
    }

    fn tracked(numbers: &[u64]) -> HashSet<IssueKey> {
        numbers.iter().map(|&n| IssueKey::new(repo(), n)).collect()
    }

    #[test]
    fn test_reconcile_preserves_order() {
        let backend = InMemoryBackend::new();
        let issues = scoped(&[1, 2, 3], &backend);
        let numbers: Vec<u64> = reconcile(&issues, &tracked(&[2]))
            .iter()
            .map(|i| i.number)
            .collect();
        assert_eq!(numbers, vec![1, 3]);
    }

    #[test]
    fn test_reconcile_distinguishes_repositories() {
        let backend = InMemoryBackend::new();
        let issues = scoped(&[1], &backend);
        let other_repo: HashSet<IssueKey> =
            [IssueKey::new(Repository::new("o", "other"), 1)].into_iter().collect();
        assert_eq!(reconcile(&issues, &other_repo).len(), 1);
    }

    #[test]
    fn test_dry_run_lists_without_mutating() {
        let backend = InMemoryBackend::new();
        backend.fail_all_mutations();
        let issues = scoped(&[1, 2, 3], &backend);

        let result = IntakeEngine::new(&backend, "PVT_test").run(
            &issues,
            &tracked(&[3]),
            RunMode::DryRun,
            None,
        );
        assert_eq!(result.phase, BatchPhase::DryRunReported);
        assert_eq!(result.untracked.len(), 2);
        assert!(backend.mutations().is_empty());
    }

    #[test]
    fn test_apply_adds_and_patches() {
        let backend = InMemoryBackend::with_metadata(sample_metadata());
        let issues = scoped(&[1, 2], &backend);
        let patch = TriagePatch::parse("status:backlog,label:pm-tracked")
            .unwrap()
            .resolve(&sample_metadata(), |k, v| (k.to_string(), v.to_string()))
            .unwrap();

        let result = IntakeEngine::new(&backend, "PVT_test").run(
            &issues,
            &HashSet::new(),
            RunMode::Apply,
            Some(&patch),
        );
        assert_eq!(result.phase, BatchPhase::Applied);
        assert_eq!(result.added_count(), 2);

        let stored = backend.issue(&IssueKey::new(repo(), 1)).unwrap();
        assert!(stored.project_item_id.is_some());
        assert_eq!(stored.field_value("Status"), Some("Backlog"));
        assert!(stored.has_label("pm-tracked"));
    }

    #[test]
    fn test_failed_add_does_not_abort_batch() {
        let backend = InMemoryBackend::new();
        let issues = scoped(&[1, 2, 3], &backend);
        backend.fail_mutations_for(1);

        let result = IntakeEngine::new(&backend, "PVT_test").run(
            &issues,
            &HashSet::new(),
            RunMode::Apply,
            None,
        );
        assert_eq!(result.phase, BatchPhase::PartiallyFailed);
        assert_eq!(result.added, vec!["o/r#2", "o/r#3"]);
        assert_eq!(result.failed.len(), 1);
        assert_eq!(result.failed[0].item, "o/r#1");
    }
}
