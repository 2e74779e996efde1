//! GitHub Projects status synchronization
//!
//! An issue can sit on zero, one or several project boards. Each linked item
//! has its status field resolved by name, the wanted option resolved by name,
//! and the option written. Field metadata is cached for the lifetime of one
//! [`ProjectBoard`], so an issue on several boards sharing a project fetches
//! each field once.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use gwi_core::{BoardConfig, Reporter};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::graphql::Var;
use crate::issues::Nodes;
use crate::{Error, GhClient, Result};

const REQUIRED_SCOPE: &str = "project";

const ISSUE_ITEMS_QUERY: &str = r#"
query($owner: String!, $repo: String!, $number: Int!) {
  repository(owner: $owner, name: $repo) {
    issue(number: $number) {
      projectItems(first: 10) {
        nodes {
          id
          project {
            id
            title
          }
        }
      }
    }
  }
}
"#;

const PROJECT_FIELDS_QUERY: &str = r#"
query($projectId: ID!) {
  node(id: $projectId) {
    ... on ProjectV2 {
      fields(first: 50) {
        nodes {
          ... on ProjectV2SingleSelectField {
            id
            name
            options {
              id
              name
            }
          }
        }
      }
    }
  }
}
"#;

/// Workflow stage on the board
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardStatus {
    Todo,
    InProgress,
    InReview,
    Done,
}

impl BoardStatus {
    /// Option name configured for this stage
    pub fn value<'a>(&self, settings: &'a BoardConfig) -> &'a str {
        match self {
            BoardStatus::Todo => &settings.todo_value,
            BoardStatus::InProgress => &settings.in_progress_value,
            BoardStatus::InReview => &settings.in_review_value,
            BoardStatus::Done => &settings.done_value,
        }
    }
}

/// An issue's appearance on one board
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectItem {
    pub id: String,
    pub project_id: String,
    pub project_title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FieldOption {
    pub id: String,
    pub name: String,
}

/// A single-select field and its options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectField {
    pub id: String,
    pub name: String,
    pub options: Vec<FieldOption>,
}

impl ProjectField {
    /// Option id for `name`, ignoring case
    pub fn option_id(&self, name: &str) -> Option<&str> {
        self.options
            .iter()
            .find(|o| o.name.eq_ignore_ascii_case(name))
            .map(|o| o.id.as_str())
    }
}

/// Field metadata keyed by project and lowercased field name
///
/// Entries are never invalidated; board schemas don't change within one
/// command.
#[derive(Debug, Default)]
pub struct FieldCache {
    fields: RwLock<HashMap<(String, String), ProjectField>>,
}

impl FieldCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(project_id: &str, field_name: &str) -> (String, String) {
        (project_id.to_string(), field_name.to_lowercase())
    }

    pub fn get(&self, project_id: &str, field_name: &str) -> Option<ProjectField> {
        let fields = self.fields.read().unwrap_or_else(PoisonError::into_inner);
        fields.get(&Self::key(project_id, field_name)).cloned()
    }

    pub fn insert(&self, project_id: &str, field: ProjectField) {
        let mut fields = self.fields.write().unwrap_or_else(PoisonError::into_inner);
        fields.insert(Self::key(project_id, &field.name), field);
    }

    pub fn len(&self) -> usize {
        self.fields.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Result of a status write across an issue's boards
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BoardUpdate {
    /// Board items linked to the issue
    pub linked: usize,
    /// Items whose status was written
    pub updated: usize,
}

#[derive(Debug, Deserialize)]
struct ItemsData {
    repository: Option<ItemsRepository>,
}

#[derive(Debug, Deserialize)]
struct ItemsRepository {
    issue: Option<ItemsIssue>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItemsIssue {
    project_items: Nodes<ItemNode>,
}

#[derive(Debug, Deserialize)]
struct ItemNode {
    id: String,
    project: ProjectRef,
}

#[derive(Debug, Deserialize)]
struct ProjectRef {
    id: String,
    #[serde(default)]
    title: String,
}

#[derive(Debug, Deserialize)]
struct FieldsData {
    node: Option<FieldsNode>,
}

#[derive(Debug, Deserialize)]
struct FieldsNode {
    fields: Option<Nodes<FieldNode>>,
}

/// Non-single-select fields come back as empty objects
#[derive(Debug, Deserialize)]
struct FieldNode {
    id: Option<String>,
    name: Option<String>,
    #[serde(default)]
    options: Vec<FieldOption>,
}

/// Writes workflow stages onto the project boards an issue is linked to
pub struct ProjectBoard {
    client: GhClient,
    settings: BoardConfig,
    cache: FieldCache,
    reporter: Arc<dyn Reporter>,
    scopes_checked: AtomicBool,
}

impl std::fmt::Debug for ProjectBoard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProjectBoard")
            .field("settings", &self.settings)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

impl ProjectBoard {
    pub fn new(client: GhClient, settings: BoardConfig, reporter: Arc<dyn Reporter>) -> Self {
        Self {
            client,
            settings,
            cache: FieldCache::new(),
            reporter,
            scopes_checked: AtomicBool::new(false),
        }
    }

    /// Whether board updates are configured on
    pub fn enabled(&self) -> bool {
        self.settings.projects_enabled
    }

    pub fn settings(&self) -> &BoardConfig {
        &self.settings
    }

    pub fn cache(&self) -> &FieldCache {
        &self.cache
    }

    /// Make sure the gh credential can read and write projects
    ///
    /// One interactive `gh auth refresh` is attempted when the scope is
    /// missing. Checked at most once per board instance.
    pub async fn ensure_scopes(&self) -> Result<()> {
        if self.scopes_checked.load(Ordering::Acquire) {
            return Ok(());
        }

        let status = self.client.auth_status().await?;
        if !status.contains(REQUIRED_SCOPE) {
            self.reporter
                .warn(&format!("GitHub token is missing the '{}' scope", REQUIRED_SCOPE));
            self.reporter.info("Refreshing gh authentication...");
            self.client.refresh_scope(REQUIRED_SCOPE).await?;
            self.reporter
                .success(&format!("Added '{}' scope", REQUIRED_SCOPE));
        }

        self.scopes_checked.store(true, Ordering::Release);
        Ok(())
    }

    /// Board items linked to an issue
    pub async fn items_for_issue(&self, issue: u64) -> Result<Vec<ProjectItem>> {
        let identity = self.client.identity();
        let data: ItemsData = self
            .client
            .graphql(
                ISSUE_ITEMS_QUERY,
                &[
                    Var::Str("owner", &identity.org),
                    Var::Str("repo", &identity.repo),
                    Var::Int("number", issue),
                ],
            )
            .await?;

        let items = data
            .repository
            .and_then(|repo| repo.issue)
            .map(|issue| issue.project_items.nodes)
            .unwrap_or_default()
            .into_iter()
            .map(|node| ProjectItem {
                id: node.id,
                project_id: node.project.id,
                project_title: node.project.title,
            })
            .collect();
        Ok(items)
    }

    /// Single-select field `name` on a project, case-insensitive, cached
    pub async fn project_field(&self, project_id: &str, name: &str) -> Result<ProjectField> {
        if let Some(field) = self.cache.get(project_id, name) {
            debug!(project_id, field = name, "Field cache hit");
            return Ok(field);
        }

        let data: FieldsData = self
            .client
            .graphql(PROJECT_FIELDS_QUERY, &[Var::Str("projectId", project_id)])
            .await?;

        let field = data
            .node
            .and_then(|node| node.fields)
            .map(|fields| fields.nodes)
            .unwrap_or_default()
            .into_iter()
            .find_map(|node| match (node.id, node.name) {
                (Some(id), Some(field_name)) if field_name.eq_ignore_ascii_case(name) => {
                    Some(ProjectField {
                        id,
                        name: field_name,
                        options: node.options,
                    })
                }
                _ => None,
            })
            .ok_or_else(|| Error::FieldNotFound(name.to_string()))?;

        self.cache.insert(project_id, field.clone());
        Ok(field)
    }

    /// Set one item's single-select value
    pub async fn update_item(
        &self,
        item: &ProjectItem,
        field: &ProjectField,
        option_id: &str,
    ) -> Result<()> {
        let command = self.client.command([
            "project",
            "item-edit",
            "--id",
            item.id.as_str(),
            "--project-id",
            item.project_id.as_str(),
            "--field-id",
            field.id.as_str(),
            "--single-select-option-id",
            option_id,
        ]);
        self.client.run_checked(&command).await?;
        Ok(())
    }

    async fn update_one(&self, item: &ProjectItem, value: &str) -> Result<()> {
        let field_name = &self.settings.status_field_name;
        let field = self.project_field(&item.project_id, field_name).await?;
        let option_id = field.option_id(value).ok_or_else(|| Error::OptionNotFound {
            option: value.to_string(),
            field: field.name.clone(),
        })?;
        self.update_item(item, &field, option_id).await
    }

    /// Move an issue to `status` on every board it is linked to
    ///
    /// Succeeds when no board is linked or when at least one item was
    /// written; otherwise returns the last per-item failure.
    pub async fn set_status(&self, issue: u64, status: BoardStatus) -> Result<BoardUpdate> {
        if !self.client.is_available() {
            return Err(gwi_core::Error::CommandNotFound(self.client.program().to_string()).into());
        }
        if self.settings.check_scopes {
            self.ensure_scopes().await?;
        }

        let items = self.items_for_issue(issue).await?;
        let mut update = BoardUpdate {
            linked: items.len(),
            updated: 0,
        };
        if items.is_empty() {
            debug!(issue, "Issue is not on any project board");
            return Ok(update);
        }

        let value = status.value(&self.settings);
        let mut last_error = None;
        for item in &items {
            match self.update_one(item, value).await {
                Ok(()) => {
                    debug!(issue, project = %item.project_title, value, "Board item updated");
                    update.updated += 1;
                }
                Err(e) => {
                    warn!(issue, project = %item.project_title, error = %e, "Board item update failed");
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) if update.updated == 0 => Err(e),
            _ => Ok(update),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::tests::client;
    use gwi_core::testing::{FakeInvoker, RecordingReporter};
    use gwi_core::ProcessOutput;

    const ITEMS: &[&str] = &["api", "graphql", "-f", "*", "-f", "owner=acme", "-f", "repo=widgets", "-F"];

    fn board(fake: &Arc<FakeInvoker>, check_scopes: bool) -> (ProjectBoard, Arc<RecordingReporter>) {
        let reporter = Arc::new(RecordingReporter::new());
        let settings = BoardConfig {
            check_scopes,
            ..BoardConfig::default()
        };
        (ProjectBoard::new(client(fake), settings, reporter.clone()), reporter)
    }

    fn items_response(items: &[(&str, &str)]) -> ProcessOutput {
        let nodes: Vec<String> = items
            .iter()
            .map(|(item, project)| {
                format!(
                    r#"{{"id":"{}","project":{{"id":"{}","title":"Board {}"}}}}"#,
                    item, project, project
                )
            })
            .collect();
        ProcessOutput::ok(format!(
            r#"{{"data":{{"repository":{{"issue":{{"projectItems":{{"nodes":[{}]}}}}}}}}}}"#,
            nodes.join(",")
        ))
    }

    fn fields_response(field_name: &str) -> ProcessOutput {
        ProcessOutput::ok(format!(
            r#"{{"data":{{"node":{{"fields":{{"nodes":[
                {{}},
                {{"id":"F-title","name":"Title"}},
                {{"id":"F-status","name":"{}","options":[
                    {{"id":"O-todo","name":"Todo"}},
                    {{"id":"O-prog","name":"In Progress"}},
                    {{"id":"O-review","name":"In Review"}},
                    {{"id":"O-done","name":"Done"}}
                ]}}
            ]}}}}}}}}"#,
            field_name
        ))
    }

    #[tokio::test]
    async fn test_no_linked_items_is_noop() {
        let fake = Arc::new(FakeInvoker::new());
        fake.on("gh", ITEMS, items_response(&[]));
        let (board, _) = board(&fake, false);

        let update = board.set_status(42, BoardStatus::InProgress).await.unwrap();
        assert_eq!(update, BoardUpdate { linked: 0, updated: 0 });
        assert!(!fake.called("gh", &["project", "item-edit"]));
    }

    #[tokio::test]
    async fn test_field_fetched_once_across_items() {
        let fake = Arc::new(FakeInvoker::new());
        fake.on("gh", ITEMS, items_response(&[("I-1", "P-1"), ("I-2", "P-1")]));
        fake.on("gh", &["api", "graphql", "-f", "*", "-f", "projectId=P-1"], fields_response("Status"));
        fake.on("gh", &["project", "item-edit"], ProcessOutput::ok(""));
        let (board, _) = board(&fake, false);

        let update = board.set_status(42, BoardStatus::InReview).await.unwrap();
        assert_eq!(update, BoardUpdate { linked: 2, updated: 2 });
        assert_eq!(fake.calls_matching("gh", &["api", "graphql", "-f", "*", "-f", "projectId=P-1"]).len(), 1);
        assert!(fake.called(
            "gh",
            &[
                "project",
                "item-edit",
                "--id",
                "I-2",
                "--project-id",
                "P-1",
                "--field-id",
                "F-status",
                "--single-select-option-id",
                "O-review",
            ]
        ));
        assert_eq!(board.cache().len(), 1);
    }

    #[tokio::test]
    async fn test_names_are_case_insensitive() {
        let fake = Arc::new(FakeInvoker::new());
        fake.on("gh", ITEMS, items_response(&[("I-1", "P-1")]));
        fake.on("gh", &["api", "graphql", "-f", "*", "-f", "projectId=P-1"], fields_response("STATUS"));
        fake.on("gh", &["project", "item-edit"], ProcessOutput::ok(""));
        let reporter: Arc<dyn Reporter> = Arc::new(RecordingReporter::new());
        let settings = BoardConfig {
            check_scopes: false,
            status_field_name: "status".to_string(),
            in_progress_value: "in progress".to_string(),
            ..BoardConfig::default()
        };
        let board = ProjectBoard::new(client(&fake), settings, reporter);

        board.set_status(7, BoardStatus::InProgress).await.unwrap();
        assert!(fake.called("gh", &["project", "item-edit", "--id", "I-1", "*", "*", "*", "F-status", "*", "O-prog"]));
        assert!(board.cache().get("P-1", "Status").is_some());
    }

    #[tokio::test]
    async fn test_one_failing_board_does_not_fail_update() {
        let fake = Arc::new(FakeInvoker::new());
        fake.on("gh", ITEMS, items_response(&[("I-1", "P-1"), ("I-2", "P-2")]));
        fake.on("gh", &["api", "graphql", "-f", "*", "-f", "projectId=P-1"], fields_response("Status"));
        fake.on("gh", &["api", "graphql", "-f", "*", "-f", "projectId=P-2"], fields_response("Stage"));
        fake.on("gh", &["project", "item-edit"], ProcessOutput::ok(""));
        let (board, _) = board(&fake, false);

        let update = board.set_status(42, BoardStatus::Done).await.unwrap();
        assert_eq!(update, BoardUpdate { linked: 2, updated: 1 });
    }

    #[tokio::test]
    async fn test_all_failing_returns_last_error() {
        let fake = Arc::new(FakeInvoker::new());
        fake.on("gh", ITEMS, items_response(&[("I-1", "P-1")]));
        fake.on("gh", &["api", "graphql", "-f", "*", "-f", "projectId=P-1"], fields_response("Status"));
        let reporter: Arc<dyn Reporter> = Arc::new(RecordingReporter::new());
        let settings = BoardConfig {
            check_scopes: false,
            done_value: "Shipped".to_string(),
            ..BoardConfig::default()
        };
        let board = ProjectBoard::new(client(&fake), settings, reporter);

        let err = board.set_status(42, BoardStatus::Done).await.unwrap_err();
        assert!(matches!(err, Error::OptionNotFound { ref option, .. } if option == "Shipped"));
        assert!(!fake.called("gh", &["project", "item-edit"]));
    }

    #[tokio::test]
    async fn test_missing_scope_refreshes_once() {
        let fake = Arc::new(FakeInvoker::new());
        fake.on("gh", &["auth", "status"], ProcessOutput::ok("Token scopes: 'gist', 'repo'"));
        fake.on("gh", &["auth", "refresh", "-s", "project"], ProcessOutput::ok(""));
        fake.on("gh", ITEMS, items_response(&[]));
        let (board, reporter) = board(&fake, true);

        board.set_status(1, BoardStatus::Todo).await.unwrap();
        board.set_status(1, BoardStatus::Todo).await.unwrap();
        assert_eq!(fake.calls_matching("gh", &["auth", "refresh"]).len(), 1);
        assert_eq!(fake.calls_matching("gh", &["auth", "status"]).len(), 1);
        assert!(reporter.mentions("'project' scope"));
    }

    #[tokio::test]
    async fn test_failed_scope_refresh_is_error() {
        let fake = Arc::new(FakeInvoker::new());
        fake.on("gh", &["auth", "status"], ProcessOutput::ok("Token scopes: 'repo'"));
        fake.on("gh", &["auth", "refresh"], ProcessOutput::failed(1, ""));
        let (board, _) = board(&fake, true);

        let err = board.set_status(1, BoardStatus::Todo).await.unwrap_err();
        assert!(matches!(err, Error::MissingScope(_)));
        assert!(!fake.called("gh", &["api", "graphql"]));
    }

    #[tokio::test]
    async fn test_missing_gh_fails_fast() {
        let fake = Arc::new(FakeInvoker::new());
        fake.without_program("gh");
        let (board, _) = board(&fake, true);
        let err = board.set_status(1, BoardStatus::Todo).await.unwrap_err();
        assert!(matches!(err, Error::Core(gwi_core::Error::CommandNotFound(_))));
        assert!(fake.calls().is_empty());
    }
}
