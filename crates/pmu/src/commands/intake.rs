//! Intake command

use super::*;
use crate::batch::RunMode;
use crate::domain::Issue;
use crate::intake::{IntakeEngine, IntakeResult};
use anyhow::{bail, Context};
use serde::Serialize;
use tracing::debug;

/// Result of `pmu intake`
#[derive(Debug, Serialize)]
pub struct IntakeOutcome {
    pub mode: RunMode,
    /// Repositories that were scanned
    pub repositories: Vec<String>,
    /// Patch applied to added issues, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patch: Option<String>,
    #[serde(flatten)]
    pub result: IntakeResult,
}

/// Query for open issues of one repository
fn scope_query(repository: &Repository) -> String {
    format!("repo:{} is:issue is:open", repository)
}

impl<B: ProjectService> CommandExecutor<B> {
    /// Find open issues in the configured repositories that are not on the
    /// board, and add them in apply mode.
    ///
    /// `fields` overrides the `[defaults]` patch for added issues.
    pub fn run_intake(&self, mode: RunMode, fields: Option<&str>) -> Result<IntakeOutcome> {
        let repositories = self.config.repositories()?;
        if repositories.is_empty() {
            bail!("No repositories configured; add repositories = [\"owner/name\"] to .pmu.toml");
        }

        let patch = match fields {
            Some(apply) => TriagePatch::parse(apply)?,
            None => self.config.default_patch(),
        };
        let cache = self.load_metadata()?;
        let resolved = if patch.is_empty() {
            None
        } else {
            Some(self.resolve_patch(cache.metadata(), &patch)?)
        };

        let mut scoped: Vec<Issue> = Vec::new();
        for repository in &repositories {
            let query = scope_query(repository);
            let found = self
                .backend
                .search(&query)
                .with_context(|| format!("Failed to list issues in {}", repository))?;
            debug!("{}: {} open issue(s)", repository, found.len());
            scoped.extend(found);
        }

        let project_id = cache.metadata().project_id.as_str();
        let tracked = self
            .backend
            .tracked_keys(project_id)
            .context("Failed to list board items")?;

        let result = IntakeEngine::new(&self.backend, project_id).run(&scoped, &tracked, mode, resolved.as_ref());

        Ok(IntakeOutcome {
            mode,
            repositories: repositories.iter().map(ToString::to_string).collect(),
            patch: resolved.map(|_| patch.to_string()),
            result,
        })
    }
}
