//! Project metadata for one invocation.
//!
//! Loaded once, from the snapshot in `.pmu.toml` or from the platform, and
//! then passed by reference to everything that resolves fields.

use crate::config::PmuConfig;
use crate::domain::ProjectMetadata;
use crate::service::ProjectSource;
use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, info};

/// Where the metadata came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MetadataOrigin {
    Snapshot,
    Remote,
}

/// Metadata plus its origin.
#[derive(Debug, Clone)]
pub struct MetadataCache {
    metadata: ProjectMetadata,
    origin: MetadataOrigin,
}

impl MetadataCache {
    /// Use the configured snapshot unless `refresh` is set or there is none;
    /// otherwise fetch exactly once.
    pub fn load<P: ProjectSource + ?Sized>(
        config: &PmuConfig,
        source: &P,
        refresh: bool,
    ) -> Result<Self> {
        if !refresh {
            if let Some(snapshot) = &config.metadata {
                debug!(
                    "Using cached metadata for {} ({} fields)",
                    snapshot.project_id,
                    snapshot.fields.len()
                );
                return Ok(Self {
                    metadata: snapshot.clone(),
                    origin: MetadataOrigin::Snapshot,
                });
            }
        }

        let project = config.project_ref();
        info!("Fetching metadata for {}", project);
        let metadata = source
            .fetch_metadata(&project)
            .with_context(|| format!("Failed to load metadata for {}", project))?;
        Ok(Self {
            metadata,
            origin: MetadataOrigin::Remote,
        })
    }

    pub fn metadata(&self) -> &ProjectMetadata {
        &self.metadata
    }

    pub fn origin(&self) -> MetadataOrigin {
        self.origin
    }

    pub fn into_metadata(self) -> ProjectMetadata {
        self.metadata
    }
}
