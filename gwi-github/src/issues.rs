//! Issue operations

use std::collections::HashMap;

use serde::Deserialize;
use tracing::debug;

use crate::graphql::Var;
use crate::{Error, GhClient, Result};

/// Issue state as reported by gh
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum IssueState {
    #[default]
    Open,
    Closed,
    #[serde(other)]
    Unknown,
}

/// An issue, fetched fresh per command
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Issue {
    pub number: u64,
    pub title: String,
    #[serde(default)]
    pub state: IssueState,
    /// Status on the first project board the issue appears on
    #[serde(skip)]
    pub project_status: Option<String>,
}

impl Issue {
    pub fn is_open(&self) -> bool {
        self.state == IssueState::Open
    }
}

const ISSUES_WITH_STATUS_QUERY: &str = r#"
query($owner: String!, $repo: String!, $limit: Int!, $field: String!) {
  repository(owner: $owner, name: $repo) {
    issues(first: $limit, states: OPEN, orderBy: {field: UPDATED_AT, direction: DESC}) {
      nodes {
        number
        projectItems(first: 10) {
          nodes {
            fieldValueByName(name: $field) {
              ... on ProjectV2ItemFieldSingleSelectValue {
                name
              }
            }
          }
        }
      }
    }
  }
}
"#;

#[derive(Debug, Deserialize)]
struct StatusData {
    repository: Option<StatusRepository>,
}

#[derive(Debug, Deserialize)]
struct StatusRepository {
    issues: Nodes<StatusIssue>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusIssue {
    number: u64,
    project_items: Nodes<StatusItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusItem {
    field_value_by_name: Option<FieldValue>,
}

#[derive(Debug, Deserialize)]
struct FieldValue {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Nodes<T> {
    pub(crate) nodes: Vec<T>,
}

impl GhClient {
    /// Fetch one issue
    ///
    /// A failed lookup reads as "not found"; gh doesn't distinguish a missing
    /// issue from other remote errors.
    pub async fn get_issue(&self, number: u64) -> Result<Issue> {
        let command = self
            .command(["issue", "view"])
            .arg(number.to_string())
            .args(["--json", "number,title,state"]);
        match self.json(&command).await {
            Ok(issue) => Ok(issue),
            Err(Error::Core(gwi_core::Error::CommandFailed { stderr, .. })) => {
                debug!(number, stderr = %stderr, "Issue lookup failed");
                Err(Error::IssueNotFound(number))
            }
            Err(e) => Err(e),
        }
    }

    /// Open issues, most recent first
    pub async fn list_open_issues(&self, limit: u32) -> Result<Vec<Issue>> {
        let command = self
            .command(["issue", "list", "--state", "open", "--limit"])
            .arg(limit.to_string())
            .args(["--json", "number,title"]);
        self.json(&command).await
    }

    /// Open issues annotated with their project board status
    ///
    /// The board lookup is optional decoration: if it fails for any reason the
    /// plain list is returned.
    pub async fn list_open_issues_with_status(&self, limit: u32, status_field: &str) -> Result<Vec<Issue>> {
        let mut issues = self.list_open_issues(limit).await?;

        let identity = self.identity();
        let result: Result<StatusData> = self
            .graphql(
                ISSUES_WITH_STATUS_QUERY,
                &[
                    Var::Str("owner", &identity.org),
                    Var::Str("repo", &identity.repo),
                    Var::Int("limit", u64::from(limit)),
                    Var::Str("field", status_field),
                ],
            )
            .await;

        let data = match result {
            Ok(data) => data,
            Err(e) => {
                debug!(error = %e, "Project status lookup failed, listing issues without status");
                return Ok(issues);
            }
        };

        let statuses: HashMap<u64, String> = data
            .repository
            .map(|repo| repo.issues.nodes)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|issue| {
                let status = issue
                    .project_items
                    .nodes
                    .into_iter()
                    .next()?
                    .field_value_by_name?
                    .name
                    .filter(|name| !name.is_empty())?;
                Some((issue.number, status))
            })
            .collect();

        for issue in &mut issues {
            issue.project_status = statuses.get(&issue.number).cloned();
        }
        Ok(issues)
    }

    pub async fn comment_on_issue(&self, number: u64, body: &str) -> Result<()> {
        let command = self
            .command(["issue", "comment"])
            .arg(number.to_string())
            .args(["--body", body]);
        self.run_checked(&command).await?;
        Ok(())
    }

    /// Close an issue, commenting first when a comment is given
    pub async fn close_issue(&self, number: u64, comment: Option<&str>) -> Result<()> {
        if let Some(comment) = comment.filter(|c| !c.is_empty()) {
            self.comment_on_issue(number, comment).await?;
        }
        let command = self.command(["issue", "close"]).arg(number.to_string());
        self.run_checked(&command).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::tests::client;
    use gwi_core::testing::FakeInvoker;
    use gwi_core::ProcessOutput;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_get_issue() {
        let fake = Arc::new(FakeInvoker::new());
        fake.on(
            "gh",
            &["issue", "view", "42", "--json", "number,title,state"],
            ProcessOutput::ok(r#"{"number":42,"title":"Add user authentication!!","state":"OPEN"}"#),
        );
        let issue = client(&fake).get_issue(42).await.unwrap();
        assert_eq!(issue.title, "Add user authentication!!");
        assert!(issue.is_open());
        assert_eq!(issue.project_status, None);
    }

    #[tokio::test]
    async fn test_get_issue_failure_is_not_found() {
        let fake = Arc::new(FakeInvoker::new());
        fake.on(
            "gh",
            &["issue", "view"],
            ProcessOutput::failed(1, "GraphQL: Could not resolve to an issue"),
        );
        let err = client(&fake).get_issue(9).await.unwrap_err();
        assert!(matches!(err, Error::IssueNotFound(9)));
        assert_eq!(err.to_string(), "issue #9 not found");
    }

    #[tokio::test]
    async fn test_list_with_status_merges_board_data() {
        let fake = Arc::new(FakeInvoker::new());
        fake.on(
            "gh",
            &["issue", "list"],
            ProcessOutput::ok(r#"[{"number":1,"title":"One"},{"number":2,"title":"Two"},{"number":3,"title":"Three"}]"#),
        );
        fake.on(
            "gh",
            &["api", "graphql"],
            ProcessOutput::ok(
                r#"{"data":{"repository":{"issues":{"nodes":[
                    {"number":1,"projectItems":{"nodes":[{"fieldValueByName":{"name":"In Progress"}}]}},
                    {"number":2,"projectItems":{"nodes":[]}},
                    {"number":3,"projectItems":{"nodes":[{"fieldValueByName":null}]}}
                ]}}}}"#,
            ),
        );

        let issues = client(&fake)
            .list_open_issues_with_status(50, "Status")
            .await
            .unwrap();
        assert_eq!(issues.len(), 3);
        assert_eq!(issues[0].project_status.as_deref(), Some("In Progress"));
        assert_eq!(issues[1].project_status, None);
        assert_eq!(issues[2].project_status, None);

        let graphql = &fake.calls_matching("gh", &["api", "graphql"])[0];
        assert!(graphql.args.contains(&"field=Status".to_string()));
        assert!(graphql.args.contains(&"limit=50".to_string()));
    }

    #[tokio::test]
    async fn test_list_with_status_degrades() {
        let fake = Arc::new(FakeInvoker::new());
        fake.on(
            "gh",
            &["issue", "list"],
            ProcessOutput::ok(r#"[{"number":5,"title":"Five"}]"#),
        );
        fake.on("gh", &["api", "graphql"], ProcessOutput::failed(1, "INSUFFICIENT_SCOPES"));

        let issues = client(&fake)
            .list_open_issues_with_status(10, "Status")
            .await
            .unwrap();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].project_status, None);
    }

    #[tokio::test]
    async fn test_close_issue_comments_first() {
        let fake = Arc::new(FakeInvoker::new());
        fake.on("gh", &["issue", "comment"], ProcessOutput::ok(""));
        fake.on("gh", &["issue", "close"], ProcessOutput::ok(""));

        client(&fake).close_issue(42, Some("Merged locally")).await.unwrap();
        let comment = fake.position("gh", &["issue", "comment", "42"]).unwrap();
        let close = fake.position("gh", &["issue", "close", "42"]).unwrap();
        assert!(comment < close);

        client(&fake).close_issue(43, None).await.unwrap();
        assert!(!fake.called("gh", &["issue", "comment", "43"]));
    }
}
