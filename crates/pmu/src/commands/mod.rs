//! Command execution logic for all CLI operations.
//!
//! `CommandExecutor` owns the backend and the loaded configuration and turns
//! command-line requests into calls on the reconciliation components. It
//! returns typed outcomes; rendering is left to the binary.
//!
//! Submodules by command:
//! - `init`: write `.pmu.toml`
//! - `triage`: named and ad-hoc triage rules
//! - `intake`: add untracked issues to the board
//! - `split`: checklist decomposition into sub-issues
//! - `create`: create a single issue on the board
//! - `view`: issue details
//! - `field`: project field listing

mod create;
mod field;
pub mod init;
mod intake;
mod split;
mod triage;
mod view;

#[cfg(test)]
mod test_helpers;

pub use create::{CreateOutcome, CreateRequest};
pub use init::{init_config, InitOutcome, InitRequest};
pub use intake::IntakeOutcome;
pub use triage::TriageOutcome;

use crate::config::PmuConfig;
use crate::domain::{ProjectMetadata, Repository};
use crate::errors::PmuError;
use crate::metadata::MetadataCache;
use crate::patch::{ResolvedPatch, TriagePatch};
use crate::service::ProjectService;
use anyhow::Result;

/// Runs commands against one backend and one configuration.
pub struct CommandExecutor<B: ProjectService> {
    backend: B,
    config: PmuConfig,
    refresh: bool,
}

impl<B: ProjectService> CommandExecutor<B> {
    /// `refresh` forces a remote metadata fetch even with a snapshot present.
    pub fn new(backend: B, config: PmuConfig, refresh: bool) -> Self {
        Self {
            backend,
            config,
            refresh,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn config(&self) -> &PmuConfig {
        &self.config
    }

    /// Metadata for this invocation (snapshot or one fetch)
    pub fn load_metadata(&self) -> Result<MetadataCache> {
        MetadataCache::load(&self.config, &self.backend, self.refresh)
    }

    /// Resolve `patch` through the configured aliases.
    fn resolve_patch(
        &self,
        metadata: &ProjectMetadata,
        patch: &TriagePatch,
    ) -> Result<ResolvedPatch, PmuError> {
        patch.resolve(metadata, |key, value| self.config.translate(key, value))
    }

    /// First configured repository, used for bare issue numbers
    fn default_repository(&self) -> Result<Option<Repository>> {
        Ok(self.config.repositories()?.into_iter().next())
    }
}
