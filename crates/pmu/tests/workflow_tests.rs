//! End-to-end workflows through the command layer against the in-memory backend.

use pmu::batch::{BatchPhase, RunMode};
use pmu::commands::CreateRequest;
use pmu::config::{PmuConfig, ProjectConfig, TRACKED_LABEL};
use pmu::domain::{
    FieldDataType, FieldMetadata, Issue, IssueKey, OptionMetadata, ProjectMetadata, Repository,
};
use pmu::split::SplitStatus;
use pmu::triage::TriageRequest;
use pmu::{CommandExecutor, InMemoryBackend};

fn app() -> Repository {
    Repository::new("octo", "app")
}

fn snapshot() -> ProjectMetadata {
    let option = |id: &str, name: &str| OptionMetadata {
        id: id.to_string(),
        name: name.to_string(),
    };
    ProjectMetadata {
        project_id: "PVT_flow".to_string(),
        fields: vec![
            FieldMetadata {
                id: "F_status".to_string(),
                name: "Status".to_string(),
                data_type: FieldDataType::SingleSelect,
                options: vec![
                    option("S_backlog", "Backlog"),
                    option("S_ready", "Ready"),
                    option("S_progress", "In progress"),
                ],
            },
            FieldMetadata {
                id: "F_priority".to_string(),
                name: "Priority".to_string(),
                data_type: FieldDataType::SingleSelect,
                options: vec![option("P_0", "P0"), option("P_1", "P1")],
            },
        ],
    }
}

fn setup() -> (CommandExecutor<InMemoryBackend>, InMemoryBackend) {
    let config = PmuConfig::template(
        ProjectConfig {
            name: None,
            owner: "octo".to_string(),
            number: 1,
        },
        vec!["octo/app".to_string()],
        Some(snapshot()),
    );
    let backend = InMemoryBackend::new();
    (CommandExecutor::new(backend.clone(), config, false), backend)
}

fn stored(backend: &InMemoryBackend, number: u64) -> Issue {
    backend.issue(&IssueKey::new(app(), number)).unwrap()
}

#[test]
fn test_intake_then_triage_converges() {
    let (executor, backend) = setup();
    for (number, title) in [(1, "Crash on start"), (2, "Typo in docs"), (3, "Slow search")] {
        backend.insert_issue(Issue::new(app(), number, title));
    }

    // Preview leaves the board untouched.
    let preview = executor.run_intake(RunMode::DryRun, None).unwrap();
    assert_eq!(preview.result.untracked.len(), 3);
    assert!(backend.mutations().is_empty());

    let added = executor.run_intake(RunMode::Apply, None).unwrap();
    assert_eq!(added.result.added_count(), 3);
    assert_eq!(added.result.phase, BatchPhase::Applied);
    for number in 1..=3 {
        let issue = stored(&backend, number);
        assert!(issue.project_item_id.is_some());
        assert!(issue.has_label(TRACKED_LABEL));
        assert_eq!(issue.field_value("Status"), Some("Backlog"));
    }

    let again = executor.run_intake(RunMode::Apply, None).unwrap();
    assert!(again.result.untracked.is_empty());

    // The tracked rule now has nothing left to do.
    let before = backend.mutations().len();
    let triage = executor
        .run_triage(
            TriageRequest {
                config_name: Some("tracked".to_string()),
                ..Default::default()
            },
            RunMode::Apply,
        )
        .unwrap();
    assert_eq!(triage.result.unchanged, 3);
    assert_eq!(triage.result.updated_count(), 0);
    assert_eq!(backend.mutations().len(), before);
}

#[test]
fn test_triage_partial_failure_then_retry() {
    let (executor, backend) = setup();
    for number in 1..=3 {
        backend.insert_issue(Issue::new(app(), number, format!("Issue {}", number)));
    }
    let request = || TriageRequest {
        query: Some("repo:octo/app is:open".to_string()),
        apply: Some("status:ready,priority:p1".to_string()),
        ..Default::default()
    };

    backend.fail_mutations_for(2);
    let first = executor.run_triage(request(), RunMode::Apply).unwrap();
    assert_eq!(first.rule, "ad-hoc");
    assert_eq!(first.result.phase, BatchPhase::PartiallyFailed);
    assert_eq!(first.result.updated, vec!["octo/app#1", "octo/app#3"]);
    assert_eq!(first.result.failed.len(), 1);
    assert_eq!(first.result.failed[0].item, "octo/app#2");
    assert_eq!(stored(&backend, 3).field_value("Priority"), Some("P1"));

    backend.clear_failures();
    let retry = executor.run_triage(request(), RunMode::Apply).unwrap();
    assert_eq!(retry.result.phase, BatchPhase::Applied);
    assert_eq!(retry.result.updated, vec!["octo/app#2"]);
    assert_eq!(retry.result.unchanged, 2);
    assert_eq!(stored(&backend, 2).field_value("Status"), Some("Ready"));
}

#[test]
fn test_split_checklist_into_sub_issues() {
    let (executor, backend) = setup();
    let mut parent = Issue::new(app(), 10, "Release 2.0");
    parent.body = "Plan:\n- [ ] Write changelog\n- [x] Bump version\n- [ ] Tag release\n".to_string();
    backend.insert_issue(parent);

    let preview = executor
        .run_split("#10", Vec::new(), None, RunMode::DryRun)
        .unwrap();
    assert_eq!(preview.status, SplitStatus::DryRun);
    assert_eq!(preview.tasks, vec!["Write changelog", "Tag release"]);
    assert!(backend.mutations().is_empty());

    let result = executor
        .run_split("octo/app#10", Vec::new(), None, RunMode::Apply)
        .unwrap();
    assert_eq!(result.status, SplitStatus::Completed);
    assert_eq!(result.created_count, 2);

    let parent = stored(&backend, 10);
    let titles: Vec<&str> = parent.sub_issues.iter().map(|s| s.title.as_str()).collect();
    assert_eq!(titles, vec!["Write changelog", "Tag release"]);
    for sub in &parent.sub_issues {
        let issue = stored(&backend, sub.number);
        assert!(issue.has_label(TRACKED_LABEL));
        assert!(issue.project_item_id.is_some());
    }
}

#[test]
fn test_split_without_checklist_creates_nothing() {
    let (executor, backend) = setup();
    backend.insert_issue(Issue::new(app(), 4, "Just prose"));

    let result = executor
        .run_split("4", Vec::new(), None, RunMode::Apply)
        .unwrap();
    assert_eq!(result.status, SplitStatus::NoTasks);
    assert!(backend.mutations().is_empty());
}

#[test]
fn test_create_places_issue_on_board() {
    let (executor, backend) = setup();

    let outcome = executor
        .create_issue(CreateRequest {
            title: "Add dark mode".to_string(),
            body: String::new(),
            status: Some("in_progress".to_string()),
            priority: Some("p0".to_string()),
            labels: vec!["ui".to_string()],
            repository: None,
        })
        .unwrap();
    assert!(outcome.failed.is_empty());

    let issue = stored(&backend, outcome.issue.number);
    assert_eq!(issue.field_value("Status"), Some("In progress"));
    assert_eq!(issue.field_value("Priority"), Some("P0"));
    assert!(issue.has_label("ui"));
    assert!(issue.has_label(TRACKED_LABEL));
}

#[test]
fn test_create_with_unknown_status_creates_nothing() {
    let (executor, backend) = setup();

    let result = executor.create_issue(CreateRequest {
        title: "Broken".to_string(),
        body: String::new(),
        status: Some("someday".to_string()),
        priority: None,
        labels: Vec::new(),
        repository: None,
    });
    assert!(result.is_err());
    assert!(backend.issues().is_empty());
    assert!(backend.mutations().is_empty());
}
