//! Remove a worktree without merging

use std::path::PathBuf;

use gwi_core::{issue_from_branch, record_for};
use gwi_github::{BoardStatus, PrState};
use tracing::debug;

use crate::{Error, Lifecycle, Outcome, Result};

/// Flags for [`Lifecycle::remove`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemoveOptions {
    /// Remove even with uncommitted changes
    pub force: bool,
    /// Skip the confirmation prompt
    pub yes: bool,
    /// Also delete the local and remote branch
    pub delete_branch: bool,
}

impl Lifecycle {
    /// Delete an issue's worktree
    ///
    /// When the branch's PR is already merged the branches go too and the
    /// board is left at its merged state; otherwise the issue returns to Todo.
    /// Re-running after an interruption finishes whatever is left: with the
    /// directory already gone, pruning and branch deletion still run.
    pub async fn remove(&self, issue: Option<u64>, options: RemoveOptions) -> Result<Outcome> {
        let issue = self.resolve_issue(issue).await?;
        let worktree = self.store.find_by_issue(issue)?;
        let branch = match worktree.as_deref().and_then(record_for) {
            Some(record) => record.branch_name,
            None => self.leftover_branch(issue).await?,
        };
        if worktree.is_none() {
            self.reporter.warn(&format!(
                "No worktree directory for issue #{}, cleaning up branch {}",
                issue, branch
            ));
        }

        let mut relocate_to: Option<PathBuf> = None;
        if let Some(path) = &worktree {
            relocate_to = self.relocation_away_from(path);
            if relocate_to.is_some() {
                self.reporter
                    .warn("You are inside the worktree you want to remove");
            }
        }

        let pr_merged = self.pr_is_merged(&branch).await?;
        let delete_branch = options.delete_branch || pr_merged;

        if !options.yes {
            let target = if pr_merged && !options.delete_branch {
                format!("Remove worktree {} and delete branch (PR merged)?", branch)
            } else if delete_branch {
                format!("Remove worktree {} and delete branch?", branch)
            } else {
                format!("Remove worktree {}?", branch)
            };
            self.reporter.info(&target);
            if !self.prompter.confirm("Confirm").await? {
                return Err(gwi_core::Error::Aborted(String::new()).into());
            }
        }

        if let Some(path) = &worktree {
            self.reporter
                .info(&format!("Removing worktree: {}", path.display()));
            if let Err(e) = self.git.remove(path, options.force).await {
                if !options.force && self.git.has_uncommitted_changes(path).await {
                    return Err(Error::UncommittedChanges {
                        path: path.clone(),
                        hint: "Use --force to remove anyway.",
                    });
                }
                return Err(e.into());
            }
        }

        self.prune_quietly().await;
        if worktree.is_some() {
            self.reporter.success("Worktree removed.");
        }

        if pr_merged {
            self.reporter
                .info("PR has been merged. Deleting branches.");
        } else {
            self.sync_board(issue, BoardStatus::Todo).await?;
        }

        if delete_branch {
            self.delete_branches(&branch).await;
        }

        Ok(Outcome {
            relocate_to,
            pr_url: None,
        })
    }

    /// Whether the branch's PR has been merged; unknown reads as no
    async fn pr_is_merged(&self, branch: &str) -> Result<bool> {
        match self.tracker.pr_summary_for_branch(branch).await {
            Ok(summary) => Ok(summary.is_some_and(|pr| pr.state == PrState::Merged)),
            Err(e) => {
                let e = Error::from(e);
                if e.is_cancelled() {
                    return Err(e);
                }
                debug!(branch, error = %e, "PR lookup failed, treating as unmerged");
                Ok(false)
            }
        }
    }

    /// A local branch for the issue whose worktree directory is gone
    async fn leftover_branch(&self, issue: u64) -> Result<String> {
        let branches = self.git.local_branches().await?;
        let mut matching = branches
            .into_iter()
            .filter(|b| !b.contains('/') && issue_from_branch(b) == Some(issue));
        match (matching.next(), matching.next()) {
            (Some(branch), None) => Ok(branch),
            _ => Err(gwi_core::Error::WorktreeNotFound(issue).into()),
        }
    }
}
