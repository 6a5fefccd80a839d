//! Split command

use super::*;
use crate::batch::RunMode;
use crate::checklist;
use crate::repo::parse_issue_reference;
use crate::split::{split, SplitOptions, SplitResult};
use anyhow::Context;
use std::path::Path;

impl<B: ProjectService> CommandExecutor<B> {
    /// Create sub-issues of `reference`.
    ///
    /// Titles come from `tasks` when given, else from the checklist in
    /// `from` (a file), else from the checklist in the parent's body.
    /// Sub-issues get the default labels and are added to the board.
    pub fn run_split(
        &self,
        reference: &str,
        tasks: Vec<String>,
        from: Option<&Path>,
        mode: RunMode,
    ) -> Result<SplitResult> {
        let reference = parse_issue_reference(reference)?;
        let repository = reference.repository_or(self.default_repository()?.as_ref())?;
        let parent = self
            .backend
            .fetch_issue(&repository, reference.number)
            .with_context(|| format!("Failed to fetch {}#{}", repository, reference.number))?;

        let tasks = if !tasks.is_empty() {
            tasks
        } else if let Some(path) = from {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            checklist::parse(&text)
        } else {
            checklist::parse(&parent.body)
        };

        let project_id = match mode {
            RunMode::Apply if !tasks.is_empty() => Some(self.load_metadata()?.into_metadata().project_id),
            _ => None,
        };
        let options = SplitOptions {
            labels: self.config.defaults.labels.clone(),
            project_id,
        };

        Ok(split(&self.backend, &parent, tasks, &options, mode))
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_helpers::{add_issue, repo, setup};
    use super::*;
    use crate::domain::IssueKey;
    use crate::split::SplitStatus;
    use tempfile::TempDir;

    fn epic(backend: &crate::service::InMemoryBackend) {
        let mut issue = add_issue(backend, 10, "Epic");
        issue.body = "## Tasks\n- [ ] Design\n- [x] Research\n- [ ] Build\n".to_string();
        backend.insert_issue(issue);
    }

    #[test]
    fn test_split_from_parent_body() {
        let (executor, backend) = setup();
        epic(&backend);

        let result = executor
            .run_split("#10", vec![], None, RunMode::Apply)
            .unwrap();
        assert_eq!(result.status, SplitStatus::Completed);
        assert_eq!(result.tasks, vec!["Design", "Build"]);

        let child = backend.issue(&IssueKey::new(repo(), 11)).unwrap();
        assert_eq!(child.parent.as_ref().map(|p| p.number), Some(10));
        assert!(child.has_label("pm-tracked"));
        assert!(child.project_item_id.is_some());
    }

    #[test]
    fn test_split_explicit_tasks_win() {
        let (executor, backend) = setup();
        epic(&backend);

        let result = executor
            .run_split("octo/app#10", vec!["Only this".to_string()], None, RunMode::DryRun)
            .unwrap();
        assert_eq!(result.status, SplitStatus::DryRun);
        assert_eq!(result.tasks, vec!["Only this"]);
        assert!(backend.mutations().is_empty());
    }

    #[test]
    fn test_split_from_file() {
        let (executor, backend) = setup();
        epic(&backend);
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("tasks.md");
        std::fs::write(&path, "- [ ] From file\n").unwrap();

        let result = executor
            .run_split("10", vec![], Some(&path), RunMode::DryRun)
            .unwrap();
        assert_eq!(result.tasks, vec!["From file"]);
    }

    #[test]
    fn test_split_without_checklist() {
        let (executor, backend) = setup();
        add_issue(&backend, 10, "Plain");

        let result = executor.run_split("10", vec![], None, RunMode::Apply).unwrap();
        assert_eq!(result.status, SplitStatus::NoTasks);
        assert!(backend.mutations().is_empty());
    }
}
