//! Merge an issue's work and clean up after it
//!
//! Two variants share the cleanup tail: merging the pull request on GitHub,
//! and merging the branch into the main worktree directly for trunk-based
//! repositories without review.

use std::path::{Path, PathBuf};

use gwi_core::record_for;
use gwi_github::{BoardStatus, PrState, PullRequest};
use tracing::{debug, warn};

use crate::{Error, Lifecycle, Outcome, Result};

/// Failing check names listed before asking to continue
const FAILING_CHECKS_SHOWN: usize = 3;

/// Whether a PR can be merged as it stands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeReadiness {
    /// Conflicts must be resolved outside gwi
    Conflicting,
    /// Mergeable, but the operator must agree to go ahead
    NeedsConfirmation {
        /// Branch protection is holding the PR back
        blocked: bool,
        failing_checks: Vec<String>,
    },
    Ready,
}

impl MergeReadiness {
    pub fn classify(pr: &PullRequest) -> Self {
        if pr.is_conflicting() {
            return MergeReadiness::Conflicting;
        }
        let blocked = pr.is_blocked();
        let failing_checks = pr.failing_checks();
        if blocked || !failing_checks.is_empty() {
            MergeReadiness::NeedsConfirmation {
                blocked,
                failing_checks,
            }
        } else {
            MergeReadiness::Ready
        }
    }
}

impl Lifecycle {
    /// Merge the issue's pull request and remove everything local about it
    ///
    /// Works without a worktree as long as an open PR's head branch names
    /// the issue. An already-merged PR skips straight to cleanup.
    pub async fn merge(&self, issue: Option<u64>) -> Result<Outcome> {
        let issue = self.resolve_issue(issue).await?;
        let worktree = self.store.find_by_issue(issue)?;
        let branch = match worktree.as_deref().and_then(record_for) {
            Some(record) => record.branch_name,
            None => self
                .tracker
                .find_open_pr_branch_for_issue(issue)
                .await?
                .ok_or(Error::NoWorktreeOrPr(issue))?,
        };

        let summary = self
            .tracker
            .pr_summary_for_branch(&branch)
            .await?
            .ok_or_else(|| gwi_github::Error::PrNotFound(branch.clone()))?;
        let number = summary.number;

        match summary.state {
            PrState::Merged => {
                self.reporter
                    .info(&format!("PR #{} is already merged", number));
            }
            PrState::Closed => return Err(Error::PrClosed(number)),
            PrState::Open | PrState::Unknown => {
                let pr = self.tracker.get_pr_status(number).await?;
                self.confirm_readiness(&pr).await?;

                let tip = if worktree.is_some() {
                    branch.clone()
                } else {
                    format!("origin/{}", branch)
                };
                self.post_merge_summary(issue, number, &tip).await?;

                self.reporter.info(&format!(
                    "Merging PR #{} ({})...",
                    number, self.config.merge_strategy
                ));
                match self
                    .tracker
                    .merge_pr(number, self.config.merge_strategy)
                    .await
                {
                    Ok(()) => self.reporter.success(&format!("PR #{} merged", number)),
                    Err(e) => self.recover_merge_failure(number, e.into()).await?,
                }
            }
        }

        self.close_if_open(issue, None).await?;
        self.sync_board(issue, BoardStatus::Done).await?;
        let outcome = self.clean_up_merged(worktree.as_deref(), &branch).await?;
        self.reporter.success("PR merged and cleaned up!");
        Ok(outcome)
    }

    /// Merge the branch into the main worktree, push, and close the issue
    pub async fn merge_local(&self, issue: Option<u64>) -> Result<Outcome> {
        let issue = self.resolve_issue(issue).await?;
        let worktree = self.store.require(issue)?;
        let branch = record_for(&worktree)
            .map(|r| r.branch_name)
            .ok_or(gwi_core::Error::WorktreeNotFound(issue))?;

        if self.git.has_uncommitted_changes(&worktree).await {
            return Err(Error::UncommittedChanges {
                path: worktree,
                hint: "Commit or stash them before merging.",
            });
        }

        let main = self.config.main_branch.clone();
        let main_dir = self.main_worktree.clone();
        let message = self
            .git
            .last_commit_message(Some(branch.as_str()))
            .await
            .unwrap_or_default();

        self.reporter
            .info(&format!("Checking out {} in {}", main, main_dir.display()));
        self.git.checkout(&main_dir, &main).await?;
        self.reporter.info(&format!("Updating {}...", main));
        self.git.pull_ff_only(&main_dir, &main).await?;

        self.reporter
            .info(&format!("Merging {} into {}...", branch, main));
        if let Err(source) = self.git.merge_branch(&main_dir, &branch).await {
            if let Err(e) = self.git.abort_merge(&main_dir).await {
                warn!(error = %e, "git merge --abort failed");
            }
            return Err(Error::LocalMerge {
                branch,
                main,
                source,
            });
        }

        self.reporter.info(&format!("Pushing {}...", main));
        self.git.push_branch(&main_dir, &main).await?;

        let head = self.git.head_commit(&main_dir).await.unwrap_or_default();
        let short = head.get(..7).unwrap_or(&head);
        let mut comment = format!("**Merged locally into {} ({})**", main, short);
        if !message.is_empty() {
            comment.push_str("\n\n");
            comment.push_str(&message);
        }
        self.close_if_open(issue, Some(&comment)).await?;
        self.sync_board(issue, BoardStatus::Done).await?;

        let outcome = self.clean_up_merged(Some(&worktree), &branch).await?;
        self.reporter
            .success(&format!("{} merged into {} and cleaned up!", branch, main));
        Ok(outcome)
    }

    async fn confirm_readiness(&self, pr: &PullRequest) -> Result<()> {
        match MergeReadiness::classify(pr) {
            MergeReadiness::Ready => Ok(()),
            MergeReadiness::Conflicting => Err(Error::MergeConflict(pr.number)),
            MergeReadiness::NeedsConfirmation {
                blocked,
                failing_checks,
            } => {
                if blocked {
                    self.reporter.warn(&format!(
                        "PR #{} is blocked (required checks or reviews pending)",
                        pr.number
                    ));
                }
                if !failing_checks.is_empty() {
                    self.reporter
                        .warn(&format!("PR #{} has failing checks:", pr.number));
                    for check in failing_checks.iter().take(FAILING_CHECKS_SHOWN) {
                        self.reporter.detail(&format!("- {}", check));
                    }
                    if failing_checks.len() > FAILING_CHECKS_SHOWN {
                        self.reporter.detail(&format!(
                            "... and {} more",
                            failing_checks.len() - FAILING_CHECKS_SHOWN
                        ));
                    }
                }
                if self.prompter.confirm("Continue anyway?").await? {
                    Ok(())
                } else {
                    Err(gwi_core::Error::Aborted(String::new()).into())
                }
            }
        }
    }

    /// gh can fail after GitHub has merged, e.g. deleting a local branch that
    /// is still checked out. A PR that now reads as merged lets the merge go on.
    async fn recover_merge_failure(&self, number: u64, error: Error) -> Result<()> {
        if error.is_cancelled() {
            return Err(error);
        }
        match self.tracker.get_pr_state(number).await {
            Ok(PrState::Merged) => {
                self.reporter.warn(&format!(
                    "PR #{} was merged, but gh reported an error: {}",
                    number, error
                ));
                Ok(())
            }
            Ok(state) => {
                debug!(number, %state, "PR not merged after failed merge");
                Err(error)
            }
            Err(e) => {
                debug!(number, error = %e, "Could not re-read PR state after failed merge");
                Err(error)
            }
        }
    }

    /// Comment the tip commit message on the issue, best-effort
    async fn post_merge_summary(&self, issue: u64, pr: u64, tip: &str) -> Result<()> {
        let message = match self.git.last_commit_message(Some(tip)).await {
            Ok(message) => message,
            Err(gwi_core::Error::Cancelled) => return Err(gwi_core::Error::Cancelled.into()),
            Err(e) => {
                debug!(tip, error = %e, "No commit message for merge summary");
                return Ok(());
            }
        };
        if message.is_empty() {
            return Ok(());
        }

        self.reporter
            .info(&format!("Adding summary to issue #{}...", issue));
        let body = format!("**Merged in PR #{}**\n\n{}", pr, message);
        if let Err(e) = self.tracker.comment_on_issue(issue, &body).await {
            let e = Error::from(e);
            if e.is_cancelled() {
                return Err(e);
            }
            self.reporter
                .warn(&format!("Failed to comment on issue #{}: {}", issue, e));
        }
        Ok(())
    }

    /// Close the issue if GitHub left it open, best-effort
    ///
    /// `Closes #N` only closes issues on merges into the default branch.
    async fn close_if_open(&self, issue: u64, comment: Option<&str>) -> Result<()> {
        let still_open = match self.tracker.get_issue(issue).await {
            Ok(details) => details.is_open(),
            Err(e) => {
                let e = Error::from(e);
                if e.is_cancelled() {
                    return Err(e);
                }
                debug!(issue, error = %e, "Could not re-read issue state");
                false
            }
        };
        if !still_open {
            return Ok(());
        }

        match self.tracker.close_issue(issue, comment).await {
            Ok(()) => self.reporter.info(&format!("Closed issue #{}", issue)),
            Err(e) => {
                let e = Error::from(e);
                if e.is_cancelled() {
                    return Err(e);
                }
                self.reporter
                    .warn(&format!("Failed to close issue #{}: {}", issue, e));
            }
        }
        Ok(())
    }

    /// Remove the worktree and both copies of the branch
    ///
    /// Everything here happens after the load-bearing merge, so failures are
    /// warnings.
    async fn clean_up_merged(&self, worktree: Option<&Path>, branch: &str) -> Result<Outcome> {
        let relocate_to: Option<PathBuf> = worktree.and_then(|w| self.relocation_away_from(w));

        if let Some(path) = worktree {
            self.reporter.info("Removing worktree...");
            let removed = match self.git.remove(path, false).await {
                Ok(()) => Ok(()),
                Err(e) => {
                    debug!(error = %e, "Retrying worktree removal with --force");
                    self.git.remove(path, true).await
                }
            };
            if let Err(e) = removed {
                self.reporter
                    .warn(&format!("Failed to remove worktree: {}", e));
            }
        }

        self.prune_quietly().await;
        if let Err(e) = self.git.fetch_prune().await {
            debug!(error = %e, "fetch --prune failed");
        }
        self.delete_branches(branch).await;

        Ok(Outcome {
            relocate_to,
            pr_url: None,
        })
    }

    pub(crate) async fn prune_quietly(&self) {
        if let Err(e) = self.git.prune().await {
            warn!(error = %e, "git worktree prune failed");
        }
    }

    /// Delete whichever of the local and remote branch still exist
    pub(crate) async fn delete_branches(&self, branch: &str) {
        if self.git.branch_exists(branch).await.unwrap_or(false) {
            self.reporter
                .info(&format!("Deleting local branch: {}", branch));
            match self.git.delete_branch(branch).await {
                Ok(()) => self.reporter.success("Local branch deleted."),
                Err(e) => self
                    .reporter
                    .warn(&format!("Failed to delete local branch: {}", e)),
            }
        }

        if self.git.remote_branch_exists(branch).await.unwrap_or(false) {
            self.reporter
                .info(&format!("Deleting remote branch: {}", branch));
            match self.git.delete_remote_branch(branch).await {
                Ok(()) => self.reporter.success("Remote branch deleted."),
                Err(e) => self
                    .reporter
                    .warn(&format!("Failed to delete remote branch: {}", e)),
            }
        }
    }
}
