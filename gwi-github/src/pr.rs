//! Pull request operations

use std::path::Path;

use chrono::{DateTime, Utc};
use gwi_core::{issue_from_branch, MergeStrategy};
use serde::Deserialize;
use tracing::debug;

use crate::{Error, GhClient, Result};

/// Check conclusions/states that count as failing
const FAILING_CONCLUSIONS: &[&str] = &["FAILURE", "ERROR", "TIMED_OUT", "ACTION_REQUIRED"];

/// Pull request state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PrState {
    #[default]
    Open,
    Closed,
    Merged,
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for PrState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PrState::Open => "open",
            PrState::Closed => "closed",
            PrState::Merged => "merged",
            PrState::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// One entry of a PR's status check rollup
///
/// Check runs report `name`/`conclusion`, commit statuses `context`/`state`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CheckStatus {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default)]
    pub conclusion: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
}

impl CheckStatus {
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .or(self.context.as_deref())
            .unwrap_or("unnamed check")
    }

    pub fn is_failing(&self) -> bool {
        [&self.conclusion, &self.state]
            .into_iter()
            .flatten()
            .any(|value| FAILING_CONCLUSIONS.contains(&value.as_str()))
    }
}

/// Mergeability report for a PR
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequest {
    #[serde(default)]
    pub number: u64,
    #[serde(default)]
    pub state: PrState,
    /// `MERGEABLE`, `CONFLICTING` or `UNKNOWN`
    #[serde(default)]
    pub mergeable: String,
    /// `CLEAN`, `BLOCKED`, `BEHIND`, `UNSTABLE`, ...
    #[serde(default)]
    pub merge_state_status: String,
    #[serde(default)]
    pub head_ref_name: String,
    #[serde(default)]
    pub status_check_rollup: Vec<CheckStatus>,
}

impl PullRequest {
    pub fn is_conflicting(&self) -> bool {
        self.mergeable == "CONFLICTING"
    }

    pub fn is_blocked(&self) -> bool {
        self.merge_state_status == "BLOCKED"
    }

    /// Names of failing checks
    pub fn failing_checks(&self) -> Vec<String> {
        self.status_check_rollup
            .iter()
            .filter(|c| c.is_failing())
            .map(|c| c.display_name().to_string())
            .collect()
    }
}

/// Lightweight PR listing entry
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrSummary {
    pub number: u64,
    #[serde(default)]
    pub state: PrState,
    #[serde(default)]
    pub head_ref_name: String,
    #[serde(default)]
    pub merged_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub url: Option<String>,
}

impl GhClient {
    /// Open a PR for `branch` from inside its worktree, returning the PR URL
    ///
    /// gh's stderr is surfaced verbatim on failure.
    pub async fn create_pr(&self, worktree: &Path, title: &str, body: &str, branch: &str) -> Result<String> {
        let command = self.command_in(
            worktree,
            ["pr", "create", "--title", title, "--body", body, "--head", branch],
        );
        let output = self.run(&command).await?;
        if !output.success() {
            return Err(Error::PrCreate(output.stderr.trim().to_string()));
        }
        Ok(output.stdout_trimmed().to_string())
    }

    /// Most recent PR (any state) whose head is `branch`, if there is one
    pub async fn pr_summary_for_branch(&self, branch: &str) -> Result<Option<PrSummary>> {
        let command = self.command([
            "pr",
            "list",
            "--head",
            branch,
            "--state",
            "all",
            "--json",
            "number,state,headRefName,mergedAt,url",
        ]);
        let prs: Vec<PrSummary> = self.json(&command).await.map_err(|e| match e {
            Error::Core(source) => Error::PrLookup {
                branch: branch.to_string(),
                source,
            },
            other => other,
        })?;
        Ok(prs.into_iter().next())
    }

    /// Mergeability, checks and state for a PR
    pub async fn get_pr_status(&self, number: u64) -> Result<PullRequest> {
        let command = self
            .command(["pr", "view"])
            .arg(number.to_string())
            .args([
                "--json",
                "mergeable,mergeStateStatus,statusCheckRollup,state,headRefName",
            ]);
        let mut pr: PullRequest = self.json(&command).await?;
        pr.number = number;
        Ok(pr)
    }

    /// Just the state, for re-checking after a failed merge
    pub async fn get_pr_state(&self, number: u64) -> Result<PrState> {
        #[derive(Deserialize)]
        struct StateOnly {
            state: PrState,
        }

        let command = self
            .command(["pr", "view"])
            .arg(number.to_string())
            .args(["--json", "state"]);
        let state: StateOnly = self.json(&command).await?;
        Ok(state.state)
    }

    /// Merge with `strategy`, deleting the remote branch in the same call
    pub async fn merge_pr(&self, number: u64, strategy: MergeStrategy) -> Result<()> {
        let command = self
            .command(["pr", "merge"])
            .arg(number.to_string())
            .args([strategy.as_flag(), "--delete-branch"]);
        self.run_checked(&command).await?;
        Ok(())
    }

    pub async fn list_open_prs(&self) -> Result<Vec<PrSummary>> {
        let command = self.command([
            "pr",
            "list",
            "--state",
            "open",
            "--json",
            "number,state,headRefName,url",
        ]);
        self.json(&command).await
    }

    /// Head branch of an open PR whose branch name encodes `issue`
    pub async fn find_open_pr_branch_for_issue(&self, issue: u64) -> Result<Option<String>> {
        let branch = self
            .list_open_prs()
            .await?
            .into_iter()
            .map(|pr| pr.head_ref_name)
            .find(|head| issue_from_branch(head) == Some(issue));
        debug!(issue, branch = ?branch, "Searched open PRs for issue branch");
        Ok(branch)
    }
}
