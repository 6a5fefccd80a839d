//! Project board manager
//!
//! Keeps GitHub issues and a project board in step. Configuration lives in
//! `.pmu.toml`; the API token comes from `GH_TOKEN` or `GITHUB_TOKEN`.
//! Diagnostics are logged to stderr, filtered by `PMU_LOG`.

use anyhow::Result;
use clap::Parser;
use pmu::batch::{BatchPhase, Failure, RunMode};
use pmu::cli::{Cli, Commands, FieldCommands};
use pmu::commands::{init_config, CommandExecutor, CreateRequest, InitRequest};
use pmu::config::PmuConfig;
use pmu::domain::{FieldDataType, Issue, IssueState};
use pmu::output::{truncate_title, ExitCode, JsonError, JsonOutput, OutputContext};
use pmu::service::{GitHubClient, ProjectRef};
use pmu::split::SplitStatus;
use pmu::triage::TriageRequest;
use pmu::{ActionableError, PmuError};
use std::env;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_env("PMU_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

fn report_error(error: &anyhow::Error, json: bool, command: &str) {
    if json {
        if let Ok(rendered) = JsonError::from_error(error, command).to_json_string() {
            println!("{}", rendered);
        }
        return;
    }
    if let Some(pmu) = error.downcast_ref::<PmuError>() {
        eprint!("{}", pmu.to_actionable());
    } else if let Some(actionable) = error.downcast_ref::<ActionableError>() {
        eprint!("{}", actionable);
    } else {
        eprintln!("Error: {:#}", error);
    }
}

fn main() {
    init_tracing();
    let cli = Cli::parse();
    let json = cli.command.json();
    let command = cli.command.name();

    let exit_code = match run(cli) {
        Ok(code) => code,
        Err(e) => {
            report_error(&e, json, command);
            ExitCode::for_error(&e)
        }
    };

    if exit_code != ExitCode::Success {
        std::process::exit(exit_code.code());
    }
}

/// Executor over the GitHub client for the nearest `.pmu.toml`
fn executor(refresh: bool) -> Result<CommandExecutor<GitHubClient>> {
    let (path, config) = PmuConfig::discover(&env::current_dir()?)?;
    tracing::debug!("Using {}", path.display());
    let client = GitHubClient::from_env(config.project_ref());
    Ok(CommandExecutor::new(client, config, refresh))
}

fn batch_exit(failed: &[Failure]) -> ExitCode {
    if failed.is_empty() {
        ExitCode::Success
    } else {
        ExitCode::PartialFailure
    }
}

fn print_failures(output: &OutputContext, failed: &[Failure]) -> Result<()> {
    if failed.is_empty() {
        return Ok(());
    }
    output.print_data(format!("\nFailed ({}):", failed.len()))?;
    for failure in failed {
        output.print_data(format!("  ✗ {}: {}", failure.item, failure.reason))?;
    }
    Ok(())
}

fn run(cli: Cli) -> Result<ExitCode> {
    let quiet = cli.quiet;
    let refresh = cli.refresh;

    match cli.command {
        Commands::Init {
            owner,
            number,
            name,
            repositories,
            no_fetch,
            dir,
            json,
        } => {
            let output = OutputContext::new(quiet, json);
            let dir = match dir {
                Some(dir) => dir,
                None => env::current_dir()?,
            };
            let request = InitRequest {
                owner: owner.clone(),
                number,
                name,
                repositories,
                dir,
            };
            let outcome = if no_fetch {
                init_config::<GitHubClient>(None, request)?
            } else {
                let client = GitHubClient::from_env(ProjectRef { owner, number });
                init_config(Some(&client), request)?
            };

            if json {
                output.print_json(&JsonOutput::success(&outcome, "init"))?;
            } else {
                output.print_data(format!(
                    "Wrote {} for project {}",
                    outcome.path.display(),
                    outcome.project
                ))?;
                output.print_info(format!("Repositories: {}", outcome.repositories.join(", ")))?;
                match outcome.snapshot_fields {
                    Some(count) => output.print_info(format!("Cached metadata for {} field(s)", count))?,
                    None => output.print_info("No metadata cached; it will be fetched on first use")?,
                }
            }
            Ok(ExitCode::Success)
        }

        Commands::Triage {
            name,
            query,
            apply,
            dry_run,
            list,
            json,
        } => {
            let output = OutputContext::new(quiet, json);
            let executor = executor(refresh)?;

            if list {
                let rules = executor.list_triage_rules();
                if json {
                    output.print_json(&JsonOutput::success(&rules, "triage list"))?;
                } else if rules.is_empty() {
                    output.print_data("No triage configs defined in .pmu.toml")?;
                } else {
                    output.print_data("Available triage configs:")?;
                    for rule in &rules {
                        output.print_data(format!(
                            "  {:<16} {}",
                            rule.name,
                            rule.description.as_deref().unwrap_or(&rule.query)
                        ))?;
                    }
                }
                return Ok(ExitCode::Success);
            }

            let request = TriageRequest {
                config_name: name,
                query,
                apply,
            };
            let outcome = executor.run_triage(request, RunMode::from_dry_run(dry_run))?;
            let result = &outcome.result;

            if json {
                output.print_json(&JsonOutput::with_outcome(&outcome, "triage", result.is_success()))?;
                return Ok(batch_exit(&result.failed));
            }

            if result.phase == BatchPhase::DryRunReported {
                output.print_data(format!(
                    "Dry run: would update {} of {} matching issue(s)",
                    result.planned.len(),
                    result.matched
                ))?;
                for planned in &result.planned {
                    output.print_data(format!(
                        "  Would update #{} {}",
                        planned.number,
                        truncate_title(&planned.title)
                    ))?;
                    for change in &planned.changes {
                        output.print_info(format!("      {}", change))?;
                    }
                }
            } else {
                for key in &result.updated {
                    output.print_info(format!("  ✓ Updated {}", key))?;
                }
                output.print_data(format!(
                    "Updated {} issue(s), {} already up to date, {} failed",
                    result.updated_count(),
                    result.unchanged,
                    result.failed.len()
                ))?;
                print_failures(&output, &result.failed)?;
            }
            Ok(batch_exit(&result.failed))
        }

        Commands::Intake {
            apply,
            dry_run,
            fields,
            json,
        } => {
            let output = OutputContext::new(quiet, json);
            let executor = executor(refresh)?;
            if apply && dry_run {
                output.print_warning("--dry-run given, nothing will be added")?;
            }
            let mode = RunMode::from_dry_run(dry_run || !apply);
            let outcome = executor.run_intake(mode, fields.as_deref())?;
            let result = &outcome.result;

            if json {
                output.print_json(&JsonOutput::with_outcome(&outcome, "intake", result.is_success()))?;
                return Ok(batch_exit(&result.failed));
            }

            if result.untracked.is_empty() {
                output.print_data("All issues are tracked")?;
                return Ok(ExitCode::Success);
            }

            if mode == RunMode::DryRun {
                output.print_data(format!("Found {} untracked issue(s):", result.untracked.len()))?;
                for issue in &result.untracked {
                    output.print_data(format!(
                        "  #{:<6} {:<50}  {}",
                        issue.number,
                        truncate_title(&issue.title),
                        issue.repository
                    ))?;
                }
                output.print_info("\nRun with --apply to add them to the project")?;
            } else {
                for key in &result.added {
                    output.print_info(format!("  ✓ Added {}", key))?;
                }
                output.print_data(format!(
                    "Added {} issue(s) to the project",
                    result.added_count()
                ))?;
                print_failures(&output, &result.failed)?;
            }
            Ok(batch_exit(&result.failed))
        }

        Commands::Split {
            issue,
            tasks,
            from,
            dry_run,
            json,
        } => {
            let output = OutputContext::new(quiet, json);
            let executor = executor(refresh)?;
            let result = executor.run_split(
                &issue,
                tasks,
                from.as_deref(),
                RunMode::from_dry_run(dry_run),
            )?;

            if json {
                let success = result.failed.is_empty();
                output.print_json(&JsonOutput::with_outcome(&result, "split", success))?;
                return Ok(batch_exit(&result.failed));
            }

            match result.status {
                SplitStatus::NoTasks => {
                    output.print_data(format!(
                        "No unchecked checklist items found in #{}",
                        result.parent.number
                    ))?;
                }
                SplitStatus::DryRun => {
                    output.print_data(format!(
                        "Dry run: would create {} sub-issue(s) under #{}:",
                        result.tasks.len(),
                        result.parent.number
                    ))?;
                    for task in &result.tasks {
                        output.print_data(format!("  - {}", task))?;
                    }
                }
                SplitStatus::Completed | SplitStatus::PartiallyFailed => {
                    for created in &result.created {
                        output.print_info(format!(
                            "  ✓ Created #{} {}",
                            created.number,
                            truncate_title(&created.title)
                        ))?;
                    }
                    output.print_data(format!(
                        "Created {} sub-issue(s) under #{}",
                        result.created_count, result.parent.number
                    ))?;
                    print_failures(&output, &result.failed)?;
                }
            }
            Ok(batch_exit(&result.failed))
        }

        Commands::Create {
            title,
            body,
            status,
            priority,
            labels,
            repo,
            json,
        } => {
            let output = OutputContext::new(quiet, json);
            let executor = executor(refresh)?;
            let outcome = executor.create_issue(CreateRequest {
                title,
                body,
                status,
                priority,
                labels,
                repository: repo,
            })?;

            if json {
                let success = outcome.failed.is_empty();
                output.print_json(&JsonOutput::with_outcome(&outcome, "create", success))?;
                return Ok(batch_exit(&outcome.failed));
            }

            output.print_data(format!(
                "Created #{}: {}",
                outcome.issue.number, outcome.issue.title
            ))?;
            output.print_data(&outcome.issue.url)?;
            for field in &outcome.fields {
                output.print_info(format!("  {}", field))?;
            }
            print_failures(&output, &outcome.failed)?;
            Ok(batch_exit(&outcome.failed))
        }

        Commands::View { issue, json } => {
            let output = OutputContext::new(quiet, json);
            let executor = executor(refresh)?;
            let issue = executor.view_issue(&issue)?;

            if json {
                output.print_json(&JsonOutput::success(&issue, "view"))?;
            } else {
                print_issue(&output, &issue)?;
            }
            Ok(ExitCode::Success)
        }

        Commands::Field(FieldCommands::List { json }) => {
            let output = OutputContext::new(quiet, json);
            let executor = executor(refresh)?;
            let cache = executor.list_fields()?;
            let metadata = cache.metadata();

            if json {
                output.print_json(&JsonOutput::success(metadata, "field list"))?;
                return Ok(ExitCode::Success);
            }

            output.print_info(format!(
                "Project {} ({:?} metadata)",
                metadata.project_id,
                cache.origin()
            ))?;
            for field in &metadata.fields {
                output.print_data(format!("{:<24} {}", field.name, field.data_type))?;
                if field.data_type == FieldDataType::SingleSelect {
                    for option in &field.options {
                        output.print_data(format!("  - {}", option.name))?;
                    }
                }
            }
            Ok(ExitCode::Success)
        }
    }
}

fn print_issue(output: &OutputContext, issue: &Issue) -> Result<()> {
    output.print_data(format!("{} #{}", issue.title, issue.number))?;
    output.print_data(format!("{} • {} • {}", issue.state, issue.repository, issue.url))?;

    if !issue.labels.is_empty() {
        output.print_data(format!("Labels: {}", issue.labels.join(", ")))?;
    }

    if issue.field_values.is_empty() {
        output.print_info("Not on the project board")?;
    } else {
        output.print_data("\nProject fields:")?;
        for (name, value) in &issue.field_values {
            output.print_data(format!("  {:<16} {}", name, value))?;
        }
    }

    if let Some(parent) = &issue.parent {
        output.print_data(format!(
            "\nParent: #{} {}",
            parent.number,
            truncate_title(&parent.title)
        ))?;
    }

    if !issue.sub_issues.is_empty() {
        let closed = issue
            .sub_issues
            .iter()
            .filter(|s| s.state == IssueState::Closed)
            .count();
        output.print_data(format!(
            "\nSub-issues ({}/{} done):",
            closed,
            issue.sub_issues.len()
        ))?;
        for sub in &issue.sub_issues {
            let mark = if sub.state == IssueState::Closed { "✓" } else { " " };
            output.print_data(format!(
                "  [{}] #{} {}",
                mark,
                sub.number,
                truncate_title(&sub.title)
            ))?;
        }
    }

    if !issue.body.trim().is_empty() {
        output.print_info(format!("\n{}", issue.body.trim()))?;
    }
    Ok(())
}
