//! `pmu init`: write `.pmu.toml`.

use crate::config::{PmuConfig, ProjectConfig, CONFIG_FILE};
use crate::errors;
use crate::repo::{detect_repository, split_repository};
use crate::service::{ProjectRef, ProjectSource};
use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

/// Input of `pmu init`
#[derive(Debug, Clone)]
pub struct InitRequest {
    pub owner: String,
    pub number: u64,
    pub name: Option<String>,
    /// `owner/name` entries; detected from the origin remote when empty
    pub repositories: Vec<String>,
    pub dir: PathBuf,
}

/// Result of `pmu init`
#[derive(Debug, Serialize)]
pub struct InitOutcome {
    pub path: PathBuf,
    pub project: ProjectRef,
    pub repositories: Vec<String>,
    /// Number of fields in the written snapshot, if one was fetched
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot_fields: Option<usize>,
}

/// Write a starter configuration into `request.dir`.
///
/// With a `source` the project is validated by fetching its metadata, which
/// is stored as the snapshot. An existing file is overwritten.
pub fn init_config<P: ProjectSource + ?Sized>(
    source: Option<&P>,
    request: InitRequest,
) -> Result<InitOutcome> {
    let repositories = if request.repositories.is_empty() {
        let detected = detect_repository(&request.dir).ok_or_else(errors::repository_undetected)?;
        info!("Detected repository {}", detected);
        vec![detected]
    } else {
        request.repositories
    };
    for entry in &repositories {
        if split_repository(entry).is_none() {
            bail!("Invalid repository '{}': expected owner/name", entry);
        }
    }

    let project = ProjectConfig {
        name: request.name,
        owner: request.owner,
        number: request.number,
    };
    let project_ref = ProjectRef {
        owner: project.owner.clone(),
        number: project.number,
    };

    let metadata = match source {
        Some(source) => Some(
            source
                .fetch_metadata(&project_ref)
                .with_context(|| format!("Could not read project {}", project_ref))?,
        ),
        None => None,
    };
    let snapshot_fields = metadata.as_ref().map(|m| m.fields.len());

    let config = PmuConfig::template(project, repositories.clone(), metadata);
    let path = request.dir.join(CONFIG_FILE);
    config.write(&path)?;
    info!("Wrote {}", path.display());

    Ok(InitOutcome {
        path,
        project: project_ref,
        repositories,
        snapshot_fields,
    })
}
