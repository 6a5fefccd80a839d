//! Blocking GitHub client (GraphQL for projects, REST for issues and labels).
//!
//! All calls are synchronous. Search and board listing follow cursors until
//! the last page; nothing else is retried.

use crate::domain::{
    FieldDataType, FieldMetadata, Issue, IssueKey, IssueState, IssueSummary, OptionMetadata,
    ProjectMetadata, Repository,
};
use crate::resolver::ResolvedField;
use crate::service::{IssueSearch, Mutations, NewIssue, ProjectRef, ProjectSource};
use anyhow::{anyhow, bail, Context, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashSet};
use std::time::Duration;
use tracing::debug;

/// Default REST base; GraphQL lives at `<base>/graphql`
pub const DEFAULT_API_URL: &str = "https://api.github.com";

const USER_AGENT: &str = concat!("pmu/", env!("CARGO_PKG_VERSION"));
const SEARCH_PAGE_SIZE: u32 = 50;
const ITEMS_PAGE_SIZE: u32 = 100;

const ISSUE_FRAGMENT: &str = r#"
fragment Summary on Issue {
  number title state url
  repository { name owner { login } }
}
fragment IssueFields on Issue {
  id number title state url body
  repository { name owner { login } }
  labels(first: 50) { nodes { name } }
  projectItems(first: 20) {
    nodes {
      id
      project { number owner { ... on Organization { login } ... on User { login } } }
      fieldValues(first: 50) {
        nodes {
          __typename
          ... on ProjectV2ItemFieldSingleSelectValue { name field { ... on ProjectV2FieldCommon { name } } }
          ... on ProjectV2ItemFieldTextValue { text field { ... on ProjectV2FieldCommon { name } } }
          ... on ProjectV2ItemFieldNumberValue { number field { ... on ProjectV2FieldCommon { name } } }
          ... on ProjectV2ItemFieldDateValue { date field { ... on ProjectV2FieldCommon { name } } }
          ... on ProjectV2ItemFieldIterationValue { title field { ... on ProjectV2FieldCommon { name } } }
        }
      }
    }
  }
  parent { ...Summary }
  subIssues(first: 50) { nodes { ...Summary } }
}
"#;

const SEARCH_QUERY: &str = r#"
query($q: String!, $first: Int!, $cursor: String) {
  search(query: $q, type: ISSUE, first: $first, after: $cursor) {
    pageInfo { hasNextPage endCursor }
    nodes { ...IssueFields }
  }
}
"#;

const ISSUE_QUERY: &str = r#"
query($owner: String!, $name: String!, $number: Int!) {
  repository(owner: $owner, name: $name) {
    issue(number: $number) { ...IssueFields }
  }
}
"#;

const METADATA_QUERY: &str = r#"
query($owner: String!, $number: Int!) {
  repositoryOwner(login: $owner) {
    ... on ProjectV2Owner {
      projectV2(number: $number) {
        id
        title
        fields(first: 100) {
          nodes {
            ... on ProjectV2FieldCommon { id name dataType }
            ... on ProjectV2SingleSelectField { options { id name } }
            ... on ProjectV2IterationField {
              configuration {
                iterations { id title }
                completedIterations { id title }
              }
            }
          }
        }
      }
    }
  }
}
"#;

const ITEMS_QUERY: &str = r#"
query($id: ID!, $first: Int!, $cursor: String) {
  node(id: $id) {
    ... on ProjectV2 {
      items(first: $first, after: $cursor) {
        pageInfo { hasNextPage endCursor }
        nodes { content { ... on Issue { number repository { name owner { login } } } } }
      }
    }
  }
}
"#;

const UPDATE_FIELD_MUTATION: &str = r#"
mutation($project: ID!, $item: ID!, $field: ID!, $value: ProjectV2FieldValue!) {
  updateProjectV2ItemFieldValue(input: {projectId: $project, itemId: $item, fieldId: $field, value: $value}) {
    projectV2Item { id }
  }
}
"#;

const ADD_ITEM_MUTATION: &str = r#"
mutation($project: ID!, $content: ID!) {
  addProjectV2ItemById(input: {projectId: $project, contentId: $content}) {
    item { id }
  }
}
"#;

const ADD_SUB_ISSUE_MUTATION: &str = r#"
mutation($parent: ID!, $child: ID!) {
  addSubIssue(input: {issueId: $parent, subIssueId: $child}) {
    issue { id }
  }
}
"#;

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageInfo {
    has_next_page: bool,
    end_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Nodes<T> {
    #[serde(default = "Vec::new")]
    nodes: Vec<Option<T>>,
}

impl<T> Nodes<T> {
    fn into_vec(self) -> Vec<T> {
        self.nodes.into_iter().flatten().collect()
    }
}

#[derive(Debug, Deserialize)]
struct Login {
    login: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireRepository {
    name: String,
    owner: Login,
}

impl WireRepository {
    fn into_domain(self) -> Repository {
        Repository::new(self.owner.login.unwrap_or_default(), self.name)
    }
}

#[derive(Debug, Deserialize)]
struct WireSummary {
    number: u64,
    title: String,
    state: IssueState,
    url: String,
    repository: WireRepository,
}

impl WireSummary {
    fn into_domain(self) -> IssueSummary {
        IssueSummary {
            number: self.number,
            title: self.title,
            state: self.state,
            url: self.url,
            repository: self.repository.into_domain(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireLabel {
    name: String,
}

#[derive(Debug, Deserialize)]
struct WireProjectNumber {
    number: u64,
    owner: Login,
}

#[derive(Debug, Deserialize)]
struct WireFieldName {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireFieldValue {
    name: Option<String>,
    text: Option<String>,
    number: Option<f64>,
    date: Option<String>,
    title: Option<String>,
    field: Option<WireFieldName>,
}

impl WireFieldValue {
    fn into_pair(self) -> Option<(String, String)> {
        let field = self.field?.name?;
        let value = self
            .name
            .or(self.text)
            .or(self.number.map(format_number))
            .or(self.date)
            .or(self.title)?;
        Some((field, value))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireProjectItem {
    id: String,
    project: WireProjectNumber,
    field_values: Nodes<WireFieldValue>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireIssue {
    id: String,
    number: u64,
    title: String,
    state: IssueState,
    url: String,
    #[serde(default)]
    body: String,
    repository: WireRepository,
    labels: Option<Nodes<WireLabel>>,
    project_items: Option<Nodes<WireProjectItem>>,
    parent: Option<WireSummary>,
    sub_issues: Option<Nodes<WireSummary>>,
}

impl WireIssue {
    /// Convert, keeping field values only from `project`'s board item
    fn into_domain(self, project: &ProjectRef) -> Issue {
        let item = self
            .project_items
            .map(Nodes::into_vec)
            .unwrap_or_default()
            .into_iter()
            .find(|item| {
                item.project.number == project.number
                    && item
                        .project
                        .owner
                        .login
                        .as_deref()
                        .is_some_and(|login| login.eq_ignore_ascii_case(&project.owner))
            });

        let (project_item_id, field_values) = match item {
            Some(item) => {
                let values: BTreeMap<String, String> = item
                    .field_values
                    .into_vec()
                    .into_iter()
                    .filter_map(WireFieldValue::into_pair)
                    .collect();
                (Some(item.id), values)
            }
            None => (None, BTreeMap::new()),
        };

        Issue {
            id: self.id,
            number: self.number,
            title: self.title,
            state: self.state,
            url: self.url,
            repository: self.repository.into_domain(),
            body: self.body,
            labels: self
                .labels
                .map(Nodes::into_vec)
                .unwrap_or_default()
                .into_iter()
                .map(|l| l.name)
                .collect(),
            field_values,
            project_item_id,
            parent: self.parent.map(WireSummary::into_domain),
            sub_issues: self
                .sub_issues
                .map(Nodes::into_vec)
                .unwrap_or_default()
                .into_iter()
                .map(WireSummary::into_domain)
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchData {
    search: SearchConnection,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchConnection {
    page_info: PageInfo,
    // Pull requests match the search but not the Issue fragment and come back
    // as empty objects.
    #[serde(default)]
    nodes: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct IssueData {
    repository: Option<IssueHolder>,
}

#[derive(Debug, Deserialize)]
struct IssueHolder {
    issue: Option<WireIssue>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MetadataData {
    repository_owner: Option<ProjectHolder>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProjectHolder {
    project_v2: Option<WireProject>,
}

#[derive(Debug, Deserialize)]
struct WireProject {
    id: String,
    fields: Nodes<WireField>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireField {
    id: Option<String>,
    name: Option<String>,
    data_type: Option<String>,
    #[serde(default)]
    options: Vec<OptionMetadata>,
    configuration: Option<WireIterationConfig>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireIterationConfig {
    #[serde(default)]
    iterations: Vec<WireIteration>,
    #[serde(default)]
    completed_iterations: Vec<WireIteration>,
}

#[derive(Debug, Deserialize)]
struct WireIteration {
    id: String,
    title: String,
}

impl WireIterationConfig {
    /// Active iterations first, then completed ones
    fn into_options(self) -> Vec<OptionMetadata> {
        self.iterations
            .into_iter()
            .chain(self.completed_iterations)
            .map(|i| OptionMetadata {
                id: i.id,
                name: i.title,
            })
            .collect()
    }
}

impl WireProject {
    fn into_domain(self) -> ProjectMetadata {
        let fields = self
            .fields
            .into_vec()
            .into_iter()
            .filter_map(|field| {
                let data_type = field.data_type.as_deref().and_then(FieldDataType::from_platform);
                match (field.id, field.name, data_type) {
                    (Some(id), Some(name), Some(data_type)) => Some(FieldMetadata {
                        id,
                        name,
                        data_type,
                        options: match data_type {
                            FieldDataType::SingleSelect => field.options,
                            FieldDataType::Iteration => field
                                .configuration
                                .map(WireIterationConfig::into_options)
                                .unwrap_or_default(),
                            _ => Vec::new(),
                        },
                    }),
                    (_, name, _) => {
                        debug!("Skipping unsupported project field {:?}", name);
                        None
                    }
                }
            })
            .collect();

        ProjectMetadata {
            project_id: self.id,
            fields,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ItemsData {
    node: Option<ItemsHolder>,
}

#[derive(Debug, Deserialize)]
struct ItemsHolder {
    items: ItemsConnection,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItemsConnection {
    page_info: PageInfo,
    nodes: Vec<Option<ItemNode>>,
}

#[derive(Debug, Deserialize)]
struct ItemNode {
    content: Option<ItemContent>,
}

#[derive(Debug, Deserialize)]
struct ItemContent {
    number: Option<u64>,
    repository: Option<WireRepository>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddItemData {
    add_project_v2_item_by_id: AddItemPayload,
}

#[derive(Debug, Deserialize)]
struct AddItemPayload {
    item: ItemId,
}

#[derive(Debug, Deserialize)]
struct ItemId {
    id: String,
}

#[derive(Debug, Deserialize)]
struct CreatedIssue {
    number: u64,
    node_id: String,
    html_url: String,
    title: String,
    #[serde(default)]
    body: Option<String>,
}

// ============================================================================
// Client
// ============================================================================

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// GraphQL value object for a field update, typed by the field's data type.
fn field_value_json(field: &ResolvedField) -> Result<Value> {
    let value = match field.data_type {
        FieldDataType::SingleSelect => json!({ "singleSelectOptionId": field.value }),
        FieldDataType::Text => json!({ "text": field.value }),
        FieldDataType::Number => {
            let number: f64 = field.value.trim().parse().with_context(|| {
                format!(
                    "Field {} expects a number, got '{}'",
                    field.field_name, field.value
                )
            })?;
            json!({ "number": number })
        }
        FieldDataType::Date => json!({ "date": field.value }),
        FieldDataType::Iteration => json!({ "iterationId": field.value }),
    };
    Ok(value)
}

/// Client for one project board.
pub struct GitHubClient {
    agent: ureq::Agent,
    token: Option<String>,
    api_url: String,
    project: ProjectRef,
}

impl GitHubClient {
    /// Create a client for `project` against `api_url`.
    ///
    /// Without a token every request fails with an actionable error, so
    /// commands that stay on the cached snapshot still work.
    pub fn new(token: Option<String>, api_url: impl Into<String>, project: ProjectRef) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(30)))
            .build();
        Self {
            agent: ureq::Agent::new_with_config(config),
            token,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            project,
        }
    }

    /// Build a client from `GH_TOKEN`/`GITHUB_TOKEN` and `PMU_API_URL`.
    pub fn from_env(project: ProjectRef) -> Self {
        let token = ["GH_TOKEN", "GITHUB_TOKEN"]
            .iter()
            .filter_map(|name| std::env::var(name).ok())
            .map(|value| value.trim().to_string())
            .find(|value| !value.is_empty());
        let api_url = std::env::var("PMU_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        Self::new(token, api_url, project)
    }

    fn authorization(&self) -> Result<String> {
        let token = self.token.as_deref().ok_or_else(crate::errors::token_missing)?;
        Ok(format!("Bearer {}", token))
    }

    pub fn project(&self) -> &ProjectRef {
        &self.project
    }

    fn graphql<T: DeserializeOwned>(&self, query: &str, variables: Value) -> Result<T> {
        let url = format!("{}/graphql", self.api_url);
        let body = json!({ "query": query, "variables": variables });
        let authorization = self.authorization()?;

        let mut response = self
            .agent
            .post(&url)
            .header("Authorization", &authorization)
            .header("User-Agent", USER_AGENT)
            .header("GraphQL-Features", "sub_issues")
            .send_json(&body)
            .with_context(|| format!("GraphQL request to {} failed", url))?;

        let parsed: GraphQlResponse<T> = response
            .body_mut()
            .read_json()
            .context("Failed to parse GraphQL response")?;

        if !parsed.errors.is_empty() {
            let messages: Vec<String> = parsed.errors.into_iter().map(|e| e.message).collect();
            bail!("GraphQL error: {}", messages.join("; "));
        }
        parsed
            .data
            .ok_or_else(|| anyhow!("GraphQL response contained no data"))
    }

    fn rest_post<T: DeserializeOwned>(&self, path: &str, body: &Value) -> Result<T> {
        let url = format!("{}{}", self.api_url, path);
        let authorization = self.authorization()?;
        let mut response = self
            .agent
            .post(&url)
            .header("Authorization", &authorization)
            .header("User-Agent", USER_AGENT)
            .header("Accept", "application/vnd.github+json")
            .send_json(body)
            .with_context(|| format!("POST {} failed", url))?;
        response
            .body_mut()
            .read_json()
            .with_context(|| format!("Failed to parse response from {}", url))
    }

    fn item_id_for(&self, project_id: &str, issue: &Issue) -> Result<String> {
        match &issue.project_item_id {
            Some(id) => Ok(id.clone()),
            None => {
                debug!("{} is not on the board yet, adding it", issue.key());
                self.add_to_project(project_id, issue)
            }
        }
    }
}

impl IssueSearch for GitHubClient {
    fn search(&self, query: &str) -> Result<Vec<Issue>> {
        let document = format!("{}{}", SEARCH_QUERY, ISSUE_FRAGMENT);
        let mut issues = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let data: SearchData = self.graphql(
                &document,
                json!({ "q": query, "first": SEARCH_PAGE_SIZE, "cursor": cursor }),
            )?;

            for node in data.search.nodes {
                if node.get("number").is_none() {
                    continue;
                }
                let issue: WireIssue =
                    serde_json::from_value(node).context("Failed to decode issue from search")?;
                issues.push(issue.into_domain(&self.project));
            }

            match (data.search.page_info.has_next_page, data.search.page_info.end_cursor) {
                (true, Some(next)) => cursor = Some(next),
                _ => break,
            }
        }

        debug!("Search '{}' returned {} issue(s)", query, issues.len());
        Ok(issues)
    }

    fn fetch_issue(&self, repository: &Repository, number: u64) -> Result<Issue> {
        let document = format!("{}{}", ISSUE_QUERY, ISSUE_FRAGMENT);
        let data: IssueData = self.graphql(
            &document,
            json!({ "owner": repository.owner, "name": repository.name, "number": number }),
        )?;

        data.repository
            .and_then(|r| r.issue)
            .map(|issue| issue.into_domain(&self.project))
            .ok_or_else(|| anyhow!("Issue not found: {}#{}", repository, number))
    }
}

impl ProjectSource for GitHubClient {
    fn fetch_metadata(&self, project: &ProjectRef) -> Result<ProjectMetadata> {
        let data: MetadataData = self.graphql(
            METADATA_QUERY,
            json!({ "owner": project.owner, "number": project.number }),
        )?;

        data.repository_owner
            .and_then(|owner| owner.project_v2)
            .map(WireProject::into_domain)
            .ok_or_else(|| anyhow!("Project not found: {}", project))
    }

    fn tracked_keys(&self, project_id: &str) -> Result<HashSet<IssueKey>> {
        let mut keys = HashSet::new();
        let mut cursor: Option<String> = None;

        loop {
            let data: ItemsData = self.graphql(
                ITEMS_QUERY,
                json!({ "id": project_id, "first": ITEMS_PAGE_SIZE, "cursor": cursor }),
            )?;
            let items = data
                .node
                .ok_or_else(|| anyhow!("Project not found: {}", project_id))?
                .items;

            for content in items.nodes.into_iter().flatten().filter_map(|n| n.content) {
                if let (Some(number), Some(repository)) = (content.number, content.repository) {
                    keys.insert(IssueKey::new(repository.into_domain(), number));
                }
            }

            match (items.page_info.has_next_page, items.page_info.end_cursor) {
                (true, Some(next)) => cursor = Some(next),
                _ => break,
            }
        }

        Ok(keys)
    }
}

impl Mutations for GitHubClient {
    fn update_field(&self, project_id: &str, issue: &Issue, field: &ResolvedField) -> Result<()> {
        let value = field_value_json(field)?;
        let item_id = self.item_id_for(project_id, issue)?;
        let _: Value = self.graphql(
            UPDATE_FIELD_MUTATION,
            json!({
                "project": project_id,
                "item": item_id,
                "field": field.field_id,
                "value": value,
            }),
        )?;
        Ok(())
    }

    fn add_label(&self, issue: &Issue, label: &str) -> Result<()> {
        let path = format!(
            "/repos/{}/{}/issues/{}/labels",
            issue.repository.owner, issue.repository.name, issue.number
        );
        let _: Value = self.rest_post(&path, &json!({ "labels": [label] }))?;
        Ok(())
    }

    fn add_to_project(&self, project_id: &str, issue: &Issue) -> Result<String> {
        let data: AddItemData = self.graphql(
            ADD_ITEM_MUTATION,
            json!({ "project": project_id, "content": issue.id }),
        )?;
        Ok(data.add_project_v2_item_by_id.item.id)
    }

    fn create_issue(
        &self,
        repository: &Repository,
        new_issue: &NewIssue,
        parent: Option<&Issue>,
    ) -> Result<Issue> {
        let path = format!("/repos/{}/{}/issues", repository.owner, repository.name);
        let created: CreatedIssue = self.rest_post(
            &path,
            &json!({
                "title": new_issue.title,
                "body": new_issue.body,
                "labels": new_issue.labels,
            }),
        )?;

        let mut issue = Issue::new(repository.clone(), created.number, created.title);
        issue.id = created.node_id;
        issue.url = created.html_url;
        issue.body = created.body.unwrap_or_default();
        issue.labels = new_issue.labels.clone();

        if let Some(parent) = parent {
            let _: Value = self
                .graphql(
                    ADD_SUB_ISSUE_MUTATION,
                    json!({ "parent": parent.id, "child": issue.id }),
                )
                .with_context(|| {
                    format!("Created {} but failed to link it to {}", issue.key(), parent.key())
                })?;
            issue.parent = Some(parent.summary());
        }

        Ok(issue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project() -> ProjectRef {
        ProjectRef {
            owner: "octo".to_string(),
            number: 3,
        }
    }

    fn issue_json() -> Value {
        json!({
            "id": "I_kw1",
            "number": 12,
            "title": "Parent Epic",
            "state": "OPEN",
            "url": "https://github.com/octo/app/issues/12",
            "body": "- [ ] one",
            "repository": { "name": "app", "owner": { "login": "octo" } },
            "labels": { "nodes": [{ "name": "pm-tracked" }] },
            "projectItems": { "nodes": [
                {
                    "id": "PVTI_other",
                    "project": { "number": 9, "owner": { "login": "octo" } },
                    "fieldValues": { "nodes": [
                        { "__typename": "ProjectV2ItemFieldSingleSelectValue", "name": "Wrong", "field": { "name": "Status" } }
                    ] }
                },
                {
                    "id": "PVTI_ours",
                    "project": { "number": 3, "owner": { "login": "Octo" } },
                    "fieldValues": { "nodes": [
                        { "__typename": "ProjectV2ItemFieldSingleSelectValue", "name": "Backlog", "field": { "name": "Status" } },
                        { "__typename": "ProjectV2ItemFieldNumberValue", "number": 3.0, "field": { "name": "Estimate" } },
                        { "__typename": "ProjectV2ItemFieldTextValue", "text": "note", "field": { "name": "Notes" } },
                        { "__typename": "ProjectV2ItemFieldRepositoryValue" },
                        null
                    ] }
                }
            ] },
            "parent": null,
            "subIssues": { "nodes": [
                { "number": 13, "title": "Child", "state": "CLOSED", "url": "u", "repository": { "name": "app", "owner": { "login": "octo" } } }
            ] }
        })
    }

    #[test]
    fn test_issue_conversion_uses_matching_project_item() {
        let wire: WireIssue = serde_json::from_value(issue_json()).unwrap();
        let issue = wire.into_domain(&project());

        assert_eq!(issue.project_item_id.as_deref(), Some("PVTI_ours"));
        assert_eq!(issue.field_value("Status"), Some("Backlog"));
        assert_eq!(issue.field_value("Estimate"), Some("3"));
        assert_eq!(issue.field_value("Notes"), Some("note"));
        assert_eq!(issue.labels, vec!["pm-tracked"]);
        assert_eq!(issue.sub_issues.len(), 1);
        assert_eq!(issue.sub_issues[0].state, IssueState::Closed);
    }

    #[test]
    fn test_issue_conversion_without_board_item() {
        let mut raw = issue_json();
        raw["projectItems"] = json!({ "nodes": [] });
        let issue: Issue = serde_json::from_value::<WireIssue>(raw)
            .unwrap()
            .into_domain(&project());

        assert!(issue.project_item_id.is_none());
        assert!(issue.field_values.is_empty());
    }

    #[test]
    fn test_metadata_conversion_skips_unsupported_fields() {
        let raw = json!({
            "id": "PVT_1",
            "fields": { "nodes": [
                { "id": "F1", "name": "Status", "dataType": "SINGLE_SELECT", "options": [{ "id": "o1", "name": "Done" }] },
                { "id": "F2", "name": "Assignees", "dataType": "ASSIGNEES" },
                { "id": "F3", "name": "Estimate", "dataType": "NUMBER" },
                {}
            ] }
        });
        let metadata = serde_json::from_value::<WireProject>(raw).unwrap().into_domain();

        assert_eq!(metadata.project_id, "PVT_1");
        assert_eq!(metadata.field_names(), vec!["Status", "Estimate"]);
        assert_eq!(metadata.fields[0].options.len(), 1);
    }

    #[test]
    fn test_metadata_conversion_lists_iterations() {
        let raw = json!({
            "id": "PVT_1",
            "fields": { "nodes": [
                { "id": "F4", "name": "Sprint", "dataType": "ITERATION", "configuration": {
                    "iterations": [{ "id": "it_123", "title": "Sprint 3" }],
                    "completedIterations": [{ "id": "it_122", "title": "Sprint 2" }]
                } },
                { "id": "F5", "name": "Due", "dataType": "DATE" }
            ] }
        });
        let metadata = serde_json::from_value::<WireProject>(raw).unwrap().into_domain();

        let sprint = &metadata.fields[0];
        assert_eq!(sprint.data_type, FieldDataType::Iteration);
        let titles: Vec<&str> = sprint.options.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(titles, vec!["Sprint 3", "Sprint 2"]);
        assert!(metadata.fields[1].options.is_empty());
    }

    #[test]
    fn test_board_values_and_resolved_patch_converge() {
        let mut raw = issue_json();
        raw["projectItems"]["nodes"][1]["fieldValues"]["nodes"] = json!([
            { "__typename": "ProjectV2ItemFieldNumberValue", "number": 3.0, "field": { "name": "Estimate" } },
            { "__typename": "ProjectV2ItemFieldIterationValue", "title": "Sprint 3", "field": { "name": "Sprint" } },
            { "__typename": "ProjectV2ItemFieldDateValue", "date": "2026-11-02", "field": { "name": "Due" } }
        ]);
        let issue = serde_json::from_value::<WireIssue>(raw)
            .unwrap()
            .into_domain(&project());

        let metadata = serde_json::from_value::<WireProject>(json!({
            "id": "PVT_1",
            "fields": { "nodes": [
                { "id": "F3", "name": "Estimate", "dataType": "NUMBER" },
                { "id": "F4", "name": "Sprint", "dataType": "ITERATION", "configuration": {
                    "iterations": [{ "id": "it_123", "title": "Sprint 3" }]
                } },
                { "id": "F5", "name": "Due", "dataType": "DATE" }
            ] }
        }))
        .unwrap()
        .into_domain();

        let patch = crate::patch::TriagePatch::parse("estimate:3.0,sprint:it_123,due:2026-11-02")
            .unwrap()
            .resolve(&metadata, |k, v| (k.to_string(), v.to_string()))
            .unwrap();
        assert!(patch.diff(&issue).is_empty());
    }

    #[test]
    fn test_field_value_json_by_type() {
        let mut field = ResolvedField {
            field_id: "F".to_string(),
            field_name: "Estimate".to_string(),
            data_type: FieldDataType::Number,
            value: "5".to_string(),
            display_value: "5".to_string(),
        };
        assert_eq!(field_value_json(&field).unwrap(), json!({ "number": 5.0 }));

        field.value = "five".to_string();
        assert!(field_value_json(&field)
            .unwrap_err()
            .to_string()
            .contains("expects a number"));

        field.data_type = FieldDataType::SingleSelect;
        field.value = "opt".to_string();
        assert_eq!(
            field_value_json(&field).unwrap(),
            json!({ "singleSelectOptionId": "opt" })
        );
    }

    #[test]
    fn test_graphql_errors_are_collected() {
        let raw = json!({ "data": null, "errors": [{ "message": "a" }, { "message": "b" }] });
        let parsed: GraphQlResponse<Value> = serde_json::from_value(raw).unwrap();
        assert!(parsed.data.is_none());
        assert_eq!(parsed.errors.len(), 2);
    }

    #[test]
    fn test_missing_token_fails_before_any_request() {
        let client = GitHubClient::new(None, "http://127.0.0.1:9", project());
        let err = client.fetch_metadata(&project()).unwrap_err();
        assert!(err.to_string().contains("No API token found"));
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(3.0), "3");
        assert_eq!(format_number(2.5), "2.5");
    }
}
