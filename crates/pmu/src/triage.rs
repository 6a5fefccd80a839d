//! Triage: match issues with a query and bring them in line with a patch.
//!
//! A run goes Collecting → Matched → DryRunReported, or Applying → Applied
//! or PartiallyFailed. The patch is resolved against project metadata before
//! anything is fetched or mutated, so a bad field or option never leaves a
//! half-applied batch. Per-issue mutation failures are collected and the
//! remaining issues are still processed.

use crate::batch::{apply_changes, BatchPhase, Failure, RunMode};
use crate::domain::{Issue, ProjectMetadata};
use crate::errors::PmuError;
use crate::patch::{Change, ResolvedPatch, TriagePatch};
use crate::service::{IssueSearch, Mutations};
use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, info};

/// Name reported for rules given inline with `--query`/`--apply`
pub const AD_HOC_RULE: &str = "ad-hoc";

/// A named triage rule as stored in configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TriageRule {
    pub name: String,
    pub query: String,
    pub apply: String,
    pub description: Option<String>,
}

/// Source of named triage rules
pub trait RuleProvider {
    fn lookup(&self, name: &str) -> Option<TriageRule>;

    /// All rule names, sorted
    fn rule_names(&self) -> Vec<String>;
}

/// A rule ready to run: query plus parsed patch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriageConfig {
    pub name: String,
    pub query: String,
    pub patch: TriagePatch,
}

/// What the user asked for on the command line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TriageRequest {
    pub config_name: Option<String>,
    pub query: Option<String>,
    pub apply: Option<String>,
}

impl TriageRequest {
    /// Turn the request into exactly one runnable rule.
    ///
    /// # Errors
    ///
    /// - [`PmuError::ConflictingMatchCriteria`] when a name and `--query` or
    ///   `--apply` are both given
    /// - [`PmuError::NoMatchCriteria`] when there is neither a name nor a query
    /// - [`PmuError::ConfigNotFound`] for an unknown rule name
    /// - [`PmuError::EmptyPatch`] when the rule would change nothing
    /// - [`PmuError::MalformedApplyToken`] from parsing the apply string
    pub fn into_config<P: RuleProvider + ?Sized>(self, rules: &P) -> Result<TriageConfig, PmuError> {
        let name = self.config_name.filter(|n| !n.trim().is_empty());
        let query = self.query.filter(|q| !q.trim().is_empty());

        let (name, query, apply) = match (name, query, self.apply) {
            (Some(_), Some(_), _) | (Some(_), _, Some(_)) => {
                return Err(PmuError::ConflictingMatchCriteria)
            }
            (Some(name), None, None) => {
                let rule = rules.lookup(&name).ok_or_else(|| PmuError::ConfigNotFound {
                    name: name.clone(),
                    available: rules.rule_names(),
                })?;
                (rule.name, rule.query, rule.apply)
            }
            (None, Some(query), Some(apply)) => (AD_HOC_RULE.to_string(), query, apply),
            (None, Some(_), None) => return Err(PmuError::EmptyPatch),
            (None, None, _) => return Err(PmuError::NoMatchCriteria),
        };

        let patch = TriagePatch::parse(&apply)?;
        if patch.is_empty() {
            return Err(PmuError::EmptyPatch);
        }
        Ok(TriageConfig { name, query, patch })
    }
}

/// Changes one issue needs
#[derive(Debug, Clone, Serialize)]
pub struct PlannedUpdate {
    /// `owner/repo#n`
    pub issue: String,
    pub number: u64,
    pub title: String,
    pub url: String,
    pub changes: Vec<Change>,
}

/// Outcome of a triage run
#[derive(Debug, Clone, Serialize)]
pub struct TriageResult {
    pub phase: BatchPhase,
    pub matched: usize,
    /// Issues that differ from the patch, with their changes
    pub planned: Vec<PlannedUpdate>,
    /// Issues that already matched the patch
    pub unchanged: usize,
    /// Keys of issues whose changes all went through
    pub updated: Vec<String>,
    pub failed: Vec<Failure>,
}

impl TriageResult {
    pub fn updated_count(&self) -> usize {
        self.updated.len()
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Runs resolved patches against a backend.
pub struct TriageEngine<'a, B: ?Sized> {
    backend: &'a B,
    metadata: &'a ProjectMetadata,
}

impl<'a, B: IssueSearch + Mutations + ?Sized> TriageEngine<'a, B> {
    pub fn new(backend: &'a B, metadata: &'a ProjectMetadata) -> Self {
        Self { backend, metadata }
    }

    /// Search with `query` (passed through untouched), then triage the hits.
    ///
    /// # Errors
    ///
    /// Only a failed search is an error; mutation failures end up in
    /// [`TriageResult::failed`].
    pub fn run(&self, query: &str, patch: &ResolvedPatch, mode: RunMode) -> Result<TriageResult> {
        debug!("Searching: {}", query);
        let issues = self
            .backend
            .search(query)
            .with_context(|| format!("Search failed for query: {}", query))?;
        Ok(self.run_on(&issues, patch, mode))
    }

    /// Triage an already-fetched set of issues.
    pub fn run_on(&self, issues: &[Issue], patch: &ResolvedPatch, mode: RunMode) -> TriageResult {
        let pending: Vec<(&Issue, Vec<Change>)> = issues
            .iter()
            .map(|issue| (issue, patch.diff(issue)))
            .filter(|(_, changes)| !changes.is_empty())
            .collect();

        let planned: Vec<PlannedUpdate> = pending
            .iter()
            .map(|(issue, changes)| PlannedUpdate {
                issue: issue.key().to_string(),
                number: issue.number,
                title: issue.title.clone(),
                url: issue.url.clone(),
                changes: changes.clone(),
            })
            .collect();
        let unchanged = issues.len() - planned.len();
        info!(
            "Matched {} issue(s): {} to update, {} already up to date",
            issues.len(),
            planned.len(),
            unchanged
        );

        if mode == RunMode::DryRun {
            return TriageResult {
                phase: BatchPhase::DryRunReported,
                matched: issues.len(),
                planned,
                unchanged,
                updated: Vec::new(),
                failed: Vec::new(),
            };
        }

        let (updated, failed) = pending.iter().fold(
            (Vec::new(), Vec::new()),
            |(mut updated, mut failed), (issue, changes)| {
                match apply_changes(self.backend, &self.metadata.project_id, issue, changes) {
                    Ok(()) => {
                        info!("Updated {}", issue.key());
                        updated.push(issue.key().to_string());
                    }
                    Err(e) => failed.push(Failure::from(e)),
                }
                (updated, failed)
            },
        );

        TriageResult {
            phase: BatchPhase::after_apply(&failed),
            matched: issues.len(),
            planned,
            unchanged,
            updated,
            failed,
        }
    }
}
