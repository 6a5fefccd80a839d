//! Split: turn a list of task titles into sub-issues of a parent.

use crate::batch::{Failure, RunMode};
use crate::domain::{Issue, IssueSummary};
use crate::service::{Mutations, NewIssue};
use serde::Serialize;
use tracing::{info, warn};

/// How a split ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SplitStatus {
    DryRun,
    NoTasks,
    Completed,
    PartiallyFailed,
}

/// Outcome of a split
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitResult {
    pub status: SplitStatus,
    pub parent: IssueSummary,
    pub tasks: Vec<String>,
    pub created: Vec<IssueSummary>,
    pub failed: Vec<Failure>,
    pub created_count: usize,
    pub failed_count: usize,
}

/// What to do with each created sub-issue
#[derive(Debug, Clone, Default)]
pub struct SplitOptions {
    pub labels: Vec<String>,
    /// Add each sub-issue to this project when set
    pub project_id: Option<String>,
}

/// Create one sub-issue of `parent` per task, in order.
///
/// Sub-issues go to the parent's repository. A failed title is recorded and
/// the remaining titles are still created.
pub fn split<M: Mutations + ?Sized>(
    mutations: &M,
    parent: &Issue,
    tasks: Vec<String>,
    options: &SplitOptions,
    mode: RunMode,
) -> SplitResult {
    let finish = |status, created: Vec<IssueSummary>, failed: Vec<Failure>, tasks| SplitResult {
        status,
        parent: parent.summary(),
        created_count: created.len(),
        failed_count: failed.len(),
        tasks,
        created,
        failed,
    };

    if tasks.is_empty() {
        return finish(SplitStatus::NoTasks, Vec::new(), Vec::new(), tasks);
    }
    if mode == RunMode::DryRun {
        return finish(SplitStatus::DryRun, Vec::new(), Vec::new(), tasks);
    }

    let (created, failed) = tasks.iter().fold(
        (Vec::new(), Vec::new()),
        |(mut created, mut failed), title| {
            let new_issue = NewIssue {
                title: title.clone(),
                body: String::new(),
                labels: options.labels.clone(),
            };
            match mutations.create_issue(&parent.repository, &new_issue, Some(parent)) {
                Ok(issue) => {
                    info!("Created {} '{}'", issue.key(), issue.title);
                    if let Some(project_id) = &options.project_id {
                        if let Err(e) = mutations.add_to_project(project_id, &issue) {
                            warn!("{} created but not added to the board: {:#}", issue.key(), e);
                            failed.push(Failure::new(
                                title.clone(),
                                format!("created as {} but not added to the board: {:#}", issue.key(), e),
                            ));
                        }
                    }
                    created.push(issue.summary());
                }
                Err(e) => {
                    warn!("Failed to create '{}': {:#}", title, e);
                    failed.push(Failure::new(title.clone(), format!("{:#}", e)));
                }
            }
            (created, failed)
        },
    );

    let status = if failed.is_empty() {
        SplitStatus::Completed
    } else {
        SplitStatus::PartiallyFailed
    };
    finish(status, created, failed, tasks)
}
