//! Shared pieces of the batch operations (triage, intake, split).

use crate::domain::Issue;
use crate::errors::PmuError;
use crate::patch::Change;
use crate::service::Mutations;
use serde::Serialize;
use tracing::{debug, warn};

/// Whether a batch may call mutating operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunMode {
    DryRun,
    Apply,
}

impl RunMode {
    pub fn from_dry_run(dry_run: bool) -> Self {
        if dry_run {
            RunMode::DryRun
        } else {
            RunMode::Apply
        }
    }
}

/// Where a batch ended up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BatchPhase {
    /// Changes were computed and reported, nothing was mutated
    DryRunReported,
    /// Every item succeeded
    Applied,
    /// At least one item failed; the others were still processed
    PartiallyFailed,
}

impl BatchPhase {
    /// Phase of a finished apply run
    pub fn after_apply(failed: &[Failure]) -> Self {
        if failed.is_empty() {
            BatchPhase::Applied
        } else {
            BatchPhase::PartiallyFailed
        }
    }
}

/// One item a batch could not process
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Failure {
    /// Issue key (`owner/repo#n`) or task title
    pub item: String,
    pub reason: String,
}

impl Failure {
    pub fn new(item: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            item: item.into(),
            reason: reason.into(),
        }
    }
}

impl From<PmuError> for Failure {
    fn from(error: PmuError) -> Self {
        match error {
            PmuError::MutationFailed { issue, cause } => Failure::new(issue, cause),
            other => Failure::new("", other.to_string()),
        }
    }
}

/// Execute `changes` against one issue, in order.
///
/// An issue that is not on the board yet is added once before its first
/// field update, and every update reuses that item. Stops at the first
/// failing call for this issue. Whatever went through stays applied; a later
/// run diffs it away.
///
/// # Errors
///
/// Returns [`PmuError::MutationFailed`] naming the issue.
pub fn apply_changes<M: Mutations + ?Sized>(
    mutations: &M,
    project_id: &str,
    issue: &Issue,
    changes: &[Change],
) -> Result<(), PmuError> {
    let failed = |what: String, e: anyhow::Error| {
        warn!("{}: {} failed: {:#}", issue.key(), what, e);
        PmuError::MutationFailed {
            issue: issue.key().to_string(),
            cause: format!("{}: {:#}", what, e),
        }
    };

    let needs_item = issue.project_item_id.is_none()
        && changes.iter().any(|c| matches!(c, Change::SetField(_)));
    let on_board;
    let issue = if needs_item {
        let item_id = mutations
            .add_to_project(project_id, issue)
            .map_err(|e| failed("add to board".to_string(), e))?;
        debug!("{}: added to the board as {}", issue.key(), item_id);
        let mut placed = issue.clone();
        placed.project_item_id = Some(item_id);
        on_board = placed;
        &on_board
    } else {
        issue
    };

    for change in changes {
        debug!("{}: {}", issue.key(), change);
        let outcome = match change {
            Change::SetField(field) => mutations.update_field(project_id, issue, field),
            Change::AddLabel(label) => mutations.add_label(issue, label),
        };
        outcome.map_err(|e| failed(change.to_string(), e))?;
    }
    Ok(())
}
