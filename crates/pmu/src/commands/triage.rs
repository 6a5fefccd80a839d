//! Triage command

use super::*;
use crate::batch::RunMode;
use crate::triage::{RuleProvider, TriageEngine, TriageRequest, TriageResult, TriageRule};
use serde::Serialize;
use tracing::info;

/// Result of `pmu triage`
#[derive(Debug, Serialize)]
pub struct TriageOutcome {
    pub rule: String,
    pub query: String,
    pub mode: RunMode,
    #[serde(flatten)]
    pub result: TriageResult,
}

impl<B: ProjectService> CommandExecutor<B> {
    /// Run a named or ad-hoc triage rule.
    ///
    /// Request and patch problems are returned as [`PmuError`] before any
    /// search or mutation happens.
    pub fn run_triage(&self, request: TriageRequest, mode: RunMode) -> Result<TriageOutcome> {
        let rule = request.into_config(&self.config)?;
        let cache = self.load_metadata()?;
        let patch = self.resolve_patch(cache.metadata(), &rule.patch)?;
        info!("Running triage rule '{}' ({:?})", rule.name, mode);

        let result = TriageEngine::new(&self.backend, cache.metadata()).run(&rule.query, &patch, mode)?;

        Ok(TriageOutcome {
            rule: rule.name,
            query: rule.query,
            mode,
            result,
        })
    }

    /// Configured triage rules, sorted by name
    pub fn list_triage_rules(&self) -> Vec<TriageRule> {
        self.config
            .rule_names()
            .iter()
            .filter_map(|name| self.config.lookup(name))
            .collect()
    }
}
