//! Submit a worktree's branch for review

use gwi_core::record_for;
use gwi_github::BoardStatus;
use tracing::warn;

use crate::{Error, Lifecycle, Outcome, Result};

/// Status lines shown before asking about uncommitted changes
const STATUS_PREVIEW_LINES: usize = 5;

impl Lifecycle {
    /// Push the branch, open a PR that closes the issue, then drop the worktree
    ///
    /// Once the PR exists the remote branch is safe, so a failure to remove
    /// the worktree afterwards is only a warning.
    pub async fn submit_for_review(&self, issue: Option<u64>) -> Result<Outcome> {
        let issue = self.resolve_issue(issue).await?;
        let path = self.store.require(issue)?;
        let branch = record_for(&path)
            .map(|r| r.branch_name)
            .ok_or(gwi_core::Error::WorktreeNotFound(issue))?;

        if self.git.has_uncommitted_changes(&path).await {
            self.reporter.warn("Worktree has uncommitted changes");
            if let Some(status) = self.git.status_short(&path).await {
                for line in status.lines().take(STATUS_PREVIEW_LINES) {
                    self.reporter.detail(line);
                }
            }
            if !self.prompter.confirm("Continue anyway?").await? {
                return Err(Error::Core(gwi_core::Error::Aborted(
                    "Commit your changes first.".to_string(),
                )));
            }
        }

        self.reporter.info(&format!("Fetching issue #{}...", issue));
        let details = self.tracker.get_issue(issue).await?;

        self.reporter.info(&format!("Pushing branch: {}", branch));
        self.git.push(&path, &branch).await?;

        self.reporter.info("Creating pull request...");
        let body = format!("Closes #{}", issue);
        let url = self
            .tracker
            .create_pr(&path, &details.title, &body, &branch)
            .await?;
        self.reporter
            .success(&format!("Pull request created: {}", url));

        self.sync_board(issue, BoardStatus::InReview).await?;

        let relocate_to = self.relocation_away_from(&path);
        self.reporter.info("Removing worktree...");
        if let Err(e) = self.git.remove(&path, false).await {
            warn!(path = %path.display(), error = %e, "Worktree kept after PR creation");
            self.reporter
                .warn(&format!("Failed to remove worktree: {}", e));
        }

        self.reporter.success("Done! PR is ready for review.");
        Ok(Outcome {
            relocate_to,
            pr_url: Some(url),
        })
    }
}
