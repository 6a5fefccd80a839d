//! Repository and issue reference parsing.

use crate::domain::Repository;
use anyhow::{anyhow, bail, Result};
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;
use tracing::debug;

static ISSUE_URL_REGEX: OnceLock<Regex> = OnceLock::new();
static QUALIFIED_REF_REGEX: OnceLock<Regex> = OnceLock::new();

fn issue_url_regex() -> &'static Regex {
    ISSUE_URL_REGEX.get_or_init(|| {
        Regex::new(r"^https?://github\.com/([^/\s]+)/([^/\s]+)/issues/(\d+)/?(?:[?#].*)?$")
            .expect("Issue URL regex should compile")
    })
}

fn qualified_ref_regex() -> &'static Regex {
    QUALIFIED_REF_REGEX.get_or_init(|| {
        Regex::new(r"^([^/\s#]+)/([^/\s#]+)#(\d+)$").expect("Qualified reference regex should compile")
    })
}

/// `owner/repo` from a github.com remote URL.
///
/// Accepts HTTPS (`https://github.com/o/r(.git)`) and SSH
/// (`git@github.com:o/r(.git)`, `ssh://git@github.com/o/r(.git)`) forms.
/// Anything else, including other hosts, yields `None`.
///
/// # Examples
///
/// ```
/// use pmu::repo::parse_git_remote;
///
/// assert_eq!(parse_git_remote("git@github.com:octo/app.git").as_deref(), Some("octo/app"));
/// assert_eq!(parse_git_remote("https://gitlab.com/octo/app.git"), None);
/// ```
pub fn parse_git_remote(url: &str) -> Option<String> {
    let url = url.trim();
    let path = ["https://github.com/", "http://github.com/", "ssh://git@github.com/", "git@github.com:"]
        .iter()
        .find_map(|prefix| url.strip_prefix(prefix))?;

    let path = path.trim_end_matches('/');
    let path = path.strip_suffix(".git").unwrap_or(path);
    let (owner, name) = path.split_once('/')?;
    if owner.is_empty() || name.is_empty() || name.contains('/') {
        return None;
    }
    Some(format!("{}/{}", owner, name))
}

/// Split `owner/name` at the first `/`.
///
/// Returns `None` when either side is empty or there is no slash.
pub fn split_repository(full_name: &str) -> Option<(String, String)> {
    let (owner, name) = full_name.trim().split_once('/')?;
    if owner.is_empty() || name.is_empty() {
        return None;
    }
    Some((owner.to_string(), name.to_string()))
}

/// `owner/repo` of the `origin` remote of the git repository at `path`.
pub fn detect_repository(path: &Path) -> Option<String> {
    let repo = git2::Repository::discover(path).ok()?;
    let remote = repo.find_remote("origin").ok()?;
    let url = remote.url()?;
    debug!("origin remote: {}", url);
    parse_git_remote(url)
}

/// An issue named on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueReference {
    /// Set when the reference names its repository
    pub repository: Option<Repository>,
    pub number: u64,
}

impl IssueReference {
    /// The referenced repository, or `fallback` for bare numbers.
    pub fn repository_or(&self, fallback: Option<&Repository>) -> Result<Repository> {
        self.repository
            .clone()
            .or_else(|| fallback.cloned())
            .ok_or_else(|| {
                anyhow!(
                    "Issue #{} has no repository; use owner/repo#{} or list repositories in .pmu.toml",
                    self.number,
                    self.number
                )
            })
    }
}

/// Parse `123`, `#123`, `owner/repo#123` or an issue URL.
pub fn parse_issue_reference(input: &str) -> Result<IssueReference> {
    let input = input.trim();

    if let Some(captures) = issue_url_regex().captures(input) {
        return Ok(IssueReference {
            repository: Some(Repository::new(&captures[1], &captures[2])),
            number: captures[3].parse()?,
        });
    }
    if let Some(captures) = qualified_ref_regex().captures(input) {
        return Ok(IssueReference {
            repository: Some(Repository::new(&captures[1], &captures[2])),
            number: captures[3].parse()?,
        });
    }

    let digits = input.strip_prefix('#').unwrap_or(input);
    match digits.parse::<u64>() {
        Ok(number) if number > 0 => Ok(IssueReference {
            repository: None,
            number,
        }),
        _ => bail!(
            "Invalid issue reference '{}': expected 123, #123, owner/repo#123 or an issue URL",
            input
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_git_remote_forms() {
        let cases = [
            ("https://github.com/owner/repo.git", Some("owner/repo")),
            ("https://github.com/owner/repo", Some("owner/repo")),
            ("https://github.com/owner/repo/", Some("owner/repo")),
            ("git@github.com:owner/repo.git", Some("owner/repo")),
            ("git@github.com:owner/repo", Some("owner/repo")),
            ("ssh://git@github.com/owner/repo.git", Some("owner/repo")),
            ("https://gitlab.com/owner/repo.git", None),
            ("git@bitbucket.org:owner/repo.git", None),
            ("https://github.com/owner", None),
            ("", None),
        ];
        for (url, expected) in cases {
            assert_eq!(parse_git_remote(url).as_deref(), expected, "url: {}", url);
        }
    }

    #[test]
    fn test_split_repository_at_first_slash() {
        assert_eq!(
            split_repository("owner/repo"),
            Some(("owner".to_string(), "repo".to_string()))
        );
        assert_eq!(
            split_repository("owner/repo/extra"),
            Some(("owner".to_string(), "repo/extra".to_string()))
        );
        assert_eq!(split_repository("noslash"), None);
        assert_eq!(split_repository("/repo"), None);
        assert_eq!(split_repository("owner/"), None);
    }

    #[test]
    fn test_parse_issue_reference_forms() {
        let bare = parse_issue_reference("123").unwrap();
        assert_eq!(bare.number, 123);
        assert!(bare.repository.is_none());

        assert_eq!(parse_issue_reference("#42").unwrap().number, 42);

        let url = parse_issue_reference("https://github.com/octo/app/issues/7").unwrap();
        assert_eq!(url.repository, Some(Repository::new("octo", "app")));
        assert_eq!(url.number, 7);

        let qualified = parse_issue_reference("octo/app#9").unwrap();
        assert_eq!(qualified.repository, Some(Repository::new("octo", "app")));
    }

    #[test]
    fn test_parse_issue_reference_rejects_garbage() {
        assert!(parse_issue_reference("abc").is_err());
        assert!(parse_issue_reference("#").is_err());
        assert!(parse_issue_reference("0").is_err());
        assert!(parse_issue_reference("https://github.com/octo/app/pull/7").is_err());
    }

    #[test]
    fn test_repository_fallback() {
        let bare = parse_issue_reference("5").unwrap();
        let fallback = Repository::new("o", "r");
        assert_eq!(bare.repository_or(Some(&fallback)).unwrap(), fallback);
        assert!(bare.repository_or(None).is_err());
    }

    #[test]
    fn test_detect_repository_outside_git_is_none() {
        let temp = tempfile::TempDir::new().unwrap();
        let repo = git2::Repository::init(temp.path()).unwrap();
        assert_eq!(detect_repository(temp.path()), None);

        repo.remote("origin", "git@github.com:octo/app.git").unwrap();
        assert_eq!(detect_repository(temp.path()).as_deref(), Some("octo/app"));
    }
}
