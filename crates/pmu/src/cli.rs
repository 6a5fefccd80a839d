//! Command-line interface definitions using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Project board manager
///
/// Keeps issues and a GitHub project board in step: bulk triage with field
/// and label patches, intake of untracked issues, and splitting checklists
/// into sub-issues.
///
/// Exit Codes:
///   0  - Command succeeded
///   1  - Generic error occurred
///   2  - Invalid arguments or usage error
///   3  - Field, option, triage rule, issue or config not found
///   7  - Some items in a batch failed
///  10  - External dependency failed (network, git, file system)
#[derive(Parser)]
#[command(name = "pmu", version)]
#[command(about = "Project board manager for GitHub issues", long_about = None)]
pub struct Cli {
    /// Suppress non-essential output (for scripting)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Ignore the cached metadata snapshot and fetch from the platform
    #[arg(long, global = true)]
    pub refresh: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write .pmu.toml for the current repository
    Init {
        /// Project owner (user or organization login)
        #[arg(long)]
        owner: String,

        /// Project number
        #[arg(long)]
        number: u64,

        /// Display name for the project
        #[arg(long)]
        name: Option<String>,

        /// Repository in scope as owner/name (repeatable; default: origin remote)
        #[arg(long = "repo")]
        repositories: Vec<String>,

        /// Do not contact the platform; write the file without a metadata snapshot
        #[arg(long)]
        no_fetch: bool,

        /// Directory to write .pmu.toml into (default: current directory)
        #[arg(long)]
        dir: Option<PathBuf>,

        #[arg(long)]
        json: bool,
    },

    /// Apply a field/label patch to every issue matching a query
    ///
    /// Examples:
    ///   pmu triage tracked
    ///   pmu triage --query "repo:o/r is:open no:label" --apply "status:backlog,label:pm-tracked"
    ///   pmu triage --list
    Triage {
        /// Named rule from [triage.<name>] in .pmu.toml
        name: Option<String>,

        /// Search query, passed to the platform unmodified
        #[arg(long)]
        query: Option<String>,

        /// Changes as key:value pairs, comma-separated (label:<name> adds a label)
        #[arg(long)]
        apply: Option<String>,

        /// Show what would change without changing anything
        #[arg(long)]
        dry_run: bool,

        /// List configured triage rules
        #[arg(long, conflicts_with_all = ["name", "query", "apply"])]
        list: bool,

        #[arg(long)]
        json: bool,
    },

    /// Find open issues in scope that are not on the board
    ///
    /// Lists untracked issues unless --apply is given.
    #[command(alias = "in")]
    Intake {
        /// Add the untracked issues to the board
        #[arg(long)]
        apply: bool,

        /// Only report, even with --apply
        #[arg(long)]
        dry_run: bool,

        /// Patch for added issues (default: [defaults] from .pmu.toml)
        #[arg(long)]
        fields: Option<String>,

        #[arg(long)]
        json: bool,
    },

    /// Create sub-issues from a checklist or a list of titles
    ///
    /// Examples:
    ///   pmu split 42                     # unchecked items in #42's body
    ///   pmu split 42 "Write docs" "Add tests"
    ///   pmu split 42 --from tasks.md
    Split {
        /// Parent issue: 123, #123, owner/repo#123 or URL
        issue: String,

        /// Task titles (default: checklist in the parent's body)
        tasks: Vec<String>,

        /// Read the checklist from a file instead of the parent's body
        #[arg(long, conflicts_with = "tasks")]
        from: Option<PathBuf>,

        #[arg(long)]
        dry_run: bool,

        #[arg(long)]
        json: bool,
    },

    /// Create an issue and put it on the board
    Create {
        #[arg(short, long)]
        title: String,

        #[arg(short, long, default_value = "")]
        body: String,

        /// Status (default: [defaults].status)
        #[arg(short, long)]
        status: Option<String>,

        /// Priority (default: [defaults].priority)
        #[arg(short, long)]
        priority: Option<String>,

        /// Labels in addition to [defaults].labels (repeatable)
        #[arg(short, long = "label")]
        labels: Vec<String>,

        /// Repository as owner/name (default: first configured repository)
        #[arg(long)]
        repo: Option<String>,

        #[arg(long)]
        json: bool,
    },

    /// Show an issue with its board fields, parent and sub-issues
    View {
        /// 123, #123, owner/repo#123 or URL
        issue: String,

        #[arg(long)]
        json: bool,
    },

    /// Project field commands
    #[command(subcommand)]
    Field(FieldCommands),
}

#[derive(Subcommand)]
pub enum FieldCommands {
    /// List fields and their options
    List {
        #[arg(long)]
        json: bool,
    },
}

impl Commands {
    /// Name used in JSON metadata
    pub fn name(&self) -> &'static str {
        match self {
            Commands::Init { .. } => "init",
            Commands::Triage { .. } => "triage",
            Commands::Intake { .. } => "intake",
            Commands::Split { .. } => "split",
            Commands::Create { .. } => "create",
            Commands::View { .. } => "view",
            Commands::Field(FieldCommands::List { .. }) => "field list",
        }
    }

    /// Whether `--json` was given
    pub fn json(&self) -> bool {
        match self {
            Commands::Init { json, .. }
            | Commands::Triage { json, .. }
            | Commands::Intake { json, .. }
            | Commands::Split { json, .. }
            | Commands::Create { json, .. }
            | Commands::View { json, .. }
            | Commands::Field(FieldCommands::List { json }) => *json,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_intake_alias() {
        let cli = Cli::try_parse_from(["pmu", "in", "--apply"]).unwrap();
        assert!(matches!(cli.command, Commands::Intake { apply: true, .. }));
    }

    #[test]
    fn test_triage_list_conflicts_with_name() {
        assert!(Cli::try_parse_from(["pmu", "triage", "tracked", "--list"]).is_err());
        assert!(Cli::try_parse_from(["pmu", "triage", "--list"]).is_ok());
    }

    #[test]
    fn test_create_short_flags() {
        let cli = Cli::try_parse_from([
            "pmu", "create", "-t", "Title", "-s", "ready", "-p", "p1", "-l", "bug", "-l", "ui",
        ])
        .unwrap();
        match cli.command {
            Commands::Create {
                title,
                status,
                priority,
                labels,
                ..
            } => {
                assert_eq!(title, "Title");
                assert_eq!(status.as_deref(), Some("ready"));
                assert_eq!(priority.as_deref(), Some("p1"));
                assert_eq!(labels, vec!["bug", "ui"]);
            }
            _ => panic!("expected create"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["pmu", "field", "list", "--refresh", "-q"]).unwrap();
        assert!(cli.refresh);
        assert!(cli.quiet);
    }
}
