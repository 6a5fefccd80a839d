//! Shared fixtures for command tests.

use super::CommandExecutor;
use crate::config::{PmuConfig, ProjectConfig};
use crate::domain::{Issue, Repository};
use crate::resolver::test_fixtures::sample_metadata;
use crate::service::InMemoryBackend;

pub fn repo() -> Repository {
    Repository::new("octo", "app")
}

/// Template config for `octo/app` with the sample metadata as snapshot
pub fn config() -> PmuConfig {
    PmuConfig::template(
        ProjectConfig {
            name: Some("Roadmap".to_string()),
            owner: "octo".to_string(),
            number: 3,
        },
        vec!["octo/app".to_string()],
        Some(sample_metadata()),
    )
}

/// Executor plus a handle on the same backend state
pub fn setup() -> (CommandExecutor<InMemoryBackend>, InMemoryBackend) {
    let backend = InMemoryBackend::with_metadata(sample_metadata());
    let executor = CommandExecutor::new(backend.clone(), config(), false);
    (executor, backend)
}

pub fn add_issue(backend: &InMemoryBackend, number: u64, title: &str) -> Issue {
    let issue = Issue::new(repo(), number, title);
    backend.insert_issue(issue.clone());
    issue
}
