//! Issue view

use super::*;
use crate::domain::Issue;
use crate::repo::parse_issue_reference;
use anyhow::Context;

impl<B: ProjectService> CommandExecutor<B> {
    /// Fetch one issue by `123`, `#123`, `owner/repo#123` or URL.
    pub fn view_issue(&self, reference: &str) -> Result<Issue> {
        let reference = parse_issue_reference(reference)?;
        let repository = reference.repository_or(self.default_repository()?.as_ref())?;
        self.backend
            .fetch_issue(&repository, reference.number)
            .with_context(|| format!("Failed to fetch {}#{}", repository, reference.number))
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_helpers::{add_issue, setup};

    #[test]
    fn test_view_by_any_reference_form() {
        let (executor, backend) = setup();
        add_issue(&backend, 123, "Viewed");

        for reference in ["123", "#123", "octo/app#123", "https://github.com/octo/app/issues/123"] {
            let issue = executor.view_issue(reference).unwrap();
            assert_eq!(issue.title, "Viewed", "reference: {}", reference);
        }
    }

    #[test]
    fn test_view_missing_issue() {
        let (executor, _) = setup();
        let err = executor.view_issue("#9").unwrap_err();
        assert!(format!("{:#}", err).contains("octo/app#9"));
    }
}
