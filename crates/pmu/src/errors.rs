//! Domain errors and actionable error formatting.
//!
//! `PmuError` carries the failures the reconciliation components can report.
//! Every variant except `MutationFailed` is fatal to the current operation and
//! is raised before any mutation is attempted. `MutationFailed` is per-item and
//! ends up in a batch result's failed list instead of aborting the batch.
//!
//! `ActionableError` renders an error together with possible causes and
//! remediation steps so the command line can tell users how to fix it.

use std::fmt;
use thiserror::Error;

/// Errors raised by field resolution, patch parsing and triage setup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PmuError {
    #[error("unknown field '{field}'")]
    UnknownField {
        field: String,
        available: Vec<String>,
    },

    #[error("unknown option '{value}' for field '{field}'")]
    UnknownOption {
        field: String,
        value: String,
        available: Vec<String>,
    },

    #[error("triage config '{name}' not found")]
    ConfigNotFound { name: String, available: Vec<String> },

    #[error("no match criteria: provide a triage config name or --query with --apply")]
    NoMatchCriteria,

    #[error("a triage config name cannot be combined with --query/--apply")]
    ConflictingMatchCriteria,

    #[error("--query requires --apply with at least one key:value change")]
    EmptyPatch,

    #[error("malformed apply token '{0}': expected key:value")]
    MalformedApplyToken(String),

    #[error("field '{field}' is set more than once in the patch")]
    DuplicateField { field: String },

    #[error("mutation failed for {issue}: {cause}")]
    MutationFailed { issue: String, cause: String },
}

impl PmuError {
    /// Whether the error reflects a bad request (as opposed to a missing resource)
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            PmuError::NoMatchCriteria
                | PmuError::ConflictingMatchCriteria
                | PmuError::EmptyPatch
                | PmuError::MalformedApplyToken(_)
                | PmuError::DuplicateField { .. }
        )
    }

    /// Whether the error names something that does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            PmuError::UnknownField { .. }
                | PmuError::UnknownOption { .. }
                | PmuError::ConfigNotFound { .. }
        )
    }

    /// Build the user-facing rendering with causes and remedies.
    pub fn to_actionable(&self) -> ActionableError {
        match self {
            PmuError::UnknownField { field, available } => {
                let mut error = ActionableError::new(self.to_string())
                    .with_cause(format!("The project has no field named '{}'", field))
                    .with_cause("The cached metadata in .pmu.toml may be out of date");
                if !available.is_empty() {
                    error = error.with_remedy(format!("Use one of: {}", available.join(", ")));
                }
                error
                    .with_remedy("List project fields: pmu field list")
                    .with_remedy("Refresh cached metadata: pmu field list --refresh")
            }
            PmuError::UnknownOption {
                field, available, ..
            } => {
                let mut error = ActionableError::new(self.to_string())
                    .with_cause(format!("'{}' only accepts its listed options", field));
                if !available.is_empty() {
                    error = error.with_remedy(format!(
                        "Valid options for {}: {}",
                        field,
                        available.join(", ")
                    ));
                }
                error.with_remedy("Add an alias under [fields] in .pmu.toml")
            }
            PmuError::ConfigNotFound { available, .. } => {
                let mut error = ActionableError::new(self.to_string())
                    .with_cause("No [triage.<name>] section with that name in .pmu.toml");
                if !available.is_empty() {
                    error = error.with_remedy(format!(
                        "Available triage configs: {}",
                        available.join(", ")
                    ));
                }
                error.with_remedy("List triage configs: pmu triage --list")
            }
            PmuError::NoMatchCriteria | PmuError::ConflictingMatchCriteria => {
                ActionableError::new(self.to_string())
                    .with_remedy("Run a named rule: pmu triage <name>")
                    .with_remedy("Run an ad-hoc rule: pmu triage --query \"is:open\" --apply \"status:backlog\"")
            }
            PmuError::EmptyPatch | PmuError::MalformedApplyToken(_) => {
                ActionableError::new(self.to_string())
                    .with_cause("Apply strings are comma-separated key:value pairs")
                    .with_remedy("Example: --apply \"status:backlog,priority:p1,label:pm-tracked\"")
            }
            PmuError::DuplicateField { field } => ActionableError::new(self.to_string())
                .with_cause("An alias and the board name may both point at the same field")
                .with_remedy(format!("Keep a single {} entry in the apply string", field)),
            PmuError::MutationFailed { .. } => ActionableError::new(self.to_string()),
        }
    }
}

/// An error with diagnostic context and remediation steps.
///
/// # Example
///
/// ```
/// use pmu::errors::ActionableError;
///
/// let error = ActionableError::new("No .pmu.toml found")
///     .with_cause("The current directory is not inside a configured repository")
///     .with_remedy("Create one: pmu init --owner <owner> --number <n>");
///
/// eprintln!("{}", error);
/// ```
#[derive(Debug, Clone)]
pub struct ActionableError {
    error: String,
    causes: Vec<String>,
    remediation: Vec<String>,
}

impl ActionableError {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            causes: Vec::new(),
            remediation: Vec::new(),
        }
    }

    /// Add a possible cause (diagnostic hint).
    pub fn with_cause(mut self, cause: impl Into<String>) -> Self {
        self.causes.push(cause.into());
        self
    }

    /// Add a remediation step (actionable fix).
    pub fn with_remedy(mut self, remedy: impl Into<String>) -> Self {
        self.remediation.push(remedy.into());
        self
    }

    pub fn message(&self) -> &str {
        &self.error
    }

    pub fn remedies(&self) -> &[String] {
        &self.remediation
    }

    /// Convert to a formatted error message suitable for display.
    pub fn to_error_message(&self) -> String {
        let mut msg = format!("Error: {}\n", self.error);

        if !self.causes.is_empty() {
            msg.push_str("\nPossible causes:\n");
            for cause in &self.causes {
                msg.push_str(&format!("  • {}\n", cause));
            }
        }

        if !self.remediation.is_empty() {
            msg.push_str("\nTo fix:\n");
            for remedy in &self.remediation {
                msg.push_str(&format!("  • {}\n", remedy));
            }
        }

        msg
    }
}

impl fmt::Display for ActionableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_error_message())
    }
}

impl std::error::Error for ActionableError {}

/// No configuration file above the working directory.
pub fn config_file_missing() -> ActionableError {
    ActionableError::new("No .pmu.toml found in this directory or any parent")
        .with_cause("The repository has not been configured for a project board")
        .with_remedy("Create one: pmu init --owner <owner> --number <project-number>")
}

/// No API token in the environment.
pub fn token_missing() -> ActionableError {
    ActionableError::new("No API token found")
        .with_cause("Neither GH_TOKEN nor GITHUB_TOKEN is set")
        .with_remedy("Export a token with repo and project scopes: export GH_TOKEN=<token>")
        .with_remedy("Reuse the gh CLI login: export GH_TOKEN=$(gh auth token)")
}

/// Repository could not be determined for `init`.
pub fn repository_undetected() -> ActionableError {
    ActionableError::new("Could not detect the repository")
        .with_cause("The origin remote is missing or does not point at github.com")
        .with_remedy("Pass it explicitly: pmu init --repo owner/name ...")
}
