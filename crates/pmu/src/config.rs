//! Configuration file loading, writing and alias translation.
//!
//! A repository opts in with a `.pmu.toml` at (or above) its working
//! directory. The file names the project board, the repositories intake
//! scans, default labels and field values for new issues, field aliases,
//! named triage rules and an optional cached metadata snapshot.

use crate::domain::{ProjectMetadata, Repository};
use crate::errors;
use crate::patch::TriagePatch;
use crate::repo::split_repository;
use crate::service::ProjectRef;
use crate::triage::{RuleProvider, TriageRule};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Configuration file name
pub const CONFIG_FILE: &str = ".pmu.toml";

/// Label that marks an issue as tracked on the board
pub const TRACKED_LABEL: &str = "pm-tracked";

/// Root of `.pmu.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PmuConfig {
    /// Repositories in intake scope, as `owner/name`.
    #[serde(default)]
    pub repositories: Vec<String>,
    pub project: ProjectConfig,
    #[serde(default)]
    pub defaults: DefaultsConfig,
    /// Aliases keyed by the name used in apply strings.
    #[serde(default)]
    pub fields: BTreeMap<String, FieldAlias>,
    /// Named triage rules.
    #[serde(default)]
    pub triage: BTreeMap<String, TriageRuleConfig>,
    /// Cached project metadata; fetched remotely when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ProjectMetadata>,
}

/// The project board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// User or organization login owning the board.
    pub owner: String,
    pub number: u64,
}

/// Values applied to issues entering the board.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultsConfig {
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
}

/// Maps an alias to a board field and value aliases to option names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldAlias {
    /// Field name on the board.
    pub field: String,
    #[serde(default)]
    pub values: BTreeMap<String, String>,
}

/// A named triage rule as written in the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriageRuleConfig {
    pub query: String,
    pub apply: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl PmuConfig {
    /// Load configuration from `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: PmuConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(config)
    }

    /// Walk up from `start` looking for `.pmu.toml`.
    pub fn find(start: &Path) -> Option<PathBuf> {
        start
            .ancestors()
            .map(|dir| dir.join(CONFIG_FILE))
            .find(|candidate| candidate.is_file())
    }

    /// Find and load the nearest configuration.
    ///
    /// # Errors
    ///
    /// Returns an actionable error when no file exists, or the parse error
    /// when it is malformed.
    pub fn discover(start: &Path) -> Result<(PathBuf, Self)> {
        let path = Self::find(start).ok_or_else(errors::config_file_missing)?;
        let config = Self::load(&path)?;
        Ok((path, config))
    }

    /// Write configuration to `path`, replacing any existing file.
    pub fn write(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;
        std::fs::write(path, content)
            .with_context(|| format!("failed to write config file: {}", path.display()))
    }

    pub fn project_ref(&self) -> ProjectRef {
        ProjectRef {
            owner: self.project.owner.clone(),
            number: self.project.number,
        }
    }

    /// Configured repositories, parsed.
    ///
    /// # Errors
    ///
    /// Fails on an entry that is not `owner/name`.
    pub fn repositories(&self) -> Result<Vec<Repository>> {
        self.repositories
            .iter()
            .map(|entry| {
                split_repository(entry)
                    .map(|(owner, name)| Repository::new(owner, name))
                    .with_context(|| format!("Invalid repository '{}' in {}", entry, CONFIG_FILE))
            })
            .collect()
    }

    /// Map an apply-string key/value through the configured aliases.
    ///
    /// Keys and value aliases match case-insensitively. Anything without an
    /// alias passes through so resolution can still report it.
    pub fn translate(&self, key: &str, value: &str) -> (String, String) {
        let Some(alias) = self
            .fields
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(key))
            .map(|(_, alias)| alias)
        else {
            return (key.to_string(), value.to_string());
        };

        let value = alias
            .values
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(value))
            .map_or_else(|| value.to_string(), |(_, option)| option.clone());
        (alias.field.clone(), value)
    }

    /// Patch for issues entering the board: default status and priority,
    /// then default labels.
    pub fn default_patch(&self) -> TriagePatch {
        let mut patch = TriagePatch::default();
        if let Some(status) = &self.defaults.status {
            patch.push_field("status", status);
        }
        if let Some(priority) = &self.defaults.priority {
            patch.push_field("priority", priority);
        }
        for label in &self.defaults.labels {
            patch.push_label(label);
        }
        patch
    }

    /// Default labels followed by `extra`, without duplicates.
    pub fn merge_labels(&self, extra: &[String]) -> Vec<String> {
        let mut labels: Vec<String> = Vec::new();
        for label in self.defaults.labels.iter().chain(extra) {
            if !labels.iter().any(|l| l.eq_ignore_ascii_case(label)) {
                labels.push(label.clone());
            }
        }
        labels
    }

    /// Starter configuration written by `pmu init`.
    pub fn template(
        project: ProjectConfig,
        repositories: Vec<String>,
        metadata: Option<ProjectMetadata>,
    ) -> Self {
        let scope: Vec<String> = repositories.iter().map(|r| format!("repo:{}", r)).collect();
        let scope = scope.join(" ");
        let scoped = |rest: &str| {
            if scope.is_empty() {
                rest.to_string()
            } else {
                format!("{} {}", scope, rest)
            }
        };

        let mut fields = BTreeMap::new();
        fields.insert(
            "status".to_string(),
            FieldAlias {
                field: "Status".to_string(),
                values: alias_map(&[
                    ("backlog", "Backlog"),
                    ("ready", "Ready"),
                    ("in_progress", "In progress"),
                    ("in_review", "In review"),
                    ("done", "Done"),
                ]),
            },
        );
        fields.insert(
            "priority".to_string(),
            FieldAlias {
                field: "Priority".to_string(),
                values: alias_map(&[("p0", "P0"), ("p1", "P1"), ("p2", "P2")]),
            },
        );

        let mut triage = BTreeMap::new();
        triage.insert(
            "tracked".to_string(),
            TriageRuleConfig {
                query: scoped(&format!("is:issue is:open -label:{}", TRACKED_LABEL)),
                apply: format!("label:{},status:backlog", TRACKED_LABEL),
                description: Some("Label untracked open issues and move them to Backlog".to_string()),
            },
        );
        triage.insert(
            "estimate".to_string(),
            TriageRuleConfig {
                query: scoped(&format!("is:issue is:open label:{} -label:estimated", TRACKED_LABEL)),
                apply: "label:needs-estimate".to_string(),
                description: Some("Flag tracked issues that still need an estimate".to_string()),
            },
        );

        PmuConfig {
            repositories,
            project,
            defaults: DefaultsConfig {
                labels: vec![TRACKED_LABEL.to_string()],
                status: Some("backlog".to_string()),
                priority: None,
            },
            fields,
            triage,
            metadata,
        }
    }
}

fn alias_map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(alias, option)| (alias.to_string(), option.to_string()))
        .collect()
}

impl RuleProvider for PmuConfig {
    fn lookup(&self, name: &str) -> Option<TriageRule> {
        self.triage.get(name).map(|rule| TriageRule {
            name: name.to_string(),
            query: rule.query.clone(),
            apply: rule.apply.clone(),
            description: rule.description.clone(),
        })
    }

    fn rule_names(&self) -> Vec<String> {
        self.triage.keys().cloned().collect()
    }
}
