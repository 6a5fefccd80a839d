//! Project board manager library
//!
//! Reconciles GitHub issues with a project board: resolving field and option
//! names to board identifiers, rule-based triage, intake of untracked issues
//! and checklist decomposition into sub-issues. The `pmu` binary is a thin
//! layer over [`commands::CommandExecutor`].

pub mod batch;
pub mod checklist;
pub mod cli;
pub mod commands;
pub mod config;
pub mod domain;
pub mod errors;
pub mod intake;
pub mod metadata;
pub mod output;
pub mod patch;
pub mod repo;
pub mod resolver;
pub mod service;
pub mod split;
pub mod triage;

// Re-export commonly used types
pub use commands::CommandExecutor;
pub use config::PmuConfig;
pub use domain::{Issue, ProjectMetadata};
pub use errors::{ActionableError, PmuError};
pub use output::{ExitCode, JsonError, JsonOutput};
pub use service::{GitHubClient, InMemoryBackend};
