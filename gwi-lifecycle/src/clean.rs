//! Orphaned worktree metadata and branches

use tracing::debug;

use crate::{Lifecycle, Result};

/// Branch names gwi never offers to delete
const PROTECTED_BRANCHES: &[&str] = &["main", "master"];

/// What `clean` found and did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanReport {
    /// Local branches with no worktree whose remote branch is gone
    pub orphaned: Vec<String>,
    pub deleted: Vec<String>,
}

impl Lifecycle {
    /// Prune stale worktree metadata and offer to delete orphaned branches
    pub async fn clean(&self) -> Result<CleanReport> {
        self.reporter.info("Checking for orphaned worktrees...");
        match self.git.prune().await {
            Ok(output) => {
                for line in output.lines().filter(|l| !l.trim().is_empty()) {
                    self.reporter.detail(line);
                }
            }
            Err(e) => self.reporter.warn(&format!("Failed to prune worktrees: {}", e)),
        }

        self.reporter.info("Checking for merged branches...");
        if let Err(e) = self.git.fetch_prune().await {
            self.reporter.warn(&format!("Failed to fetch: {}", e));
        }

        let mut report = CleanReport::default();
        for branch in self.git.local_branches().await? {
            if branch == self.config.main_branch || PROTECTED_BRANCHES.contains(&branch.as_str()) {
                continue;
            }
            if self.store.path_for(&branch).exists() {
                continue;
            }
            if self.git.remote_branch_exists(&branch).await? {
                continue;
            }
            debug!(branch, "Branch has no worktree and no remote");
            report.orphaned.push(branch);
        }

        if report.orphaned.is_empty() {
            self.reporter.success("No orphaned branches found.");
            return Ok(report);
        }

        self.reporter.info("Branches to clean up:");
        for branch in &report.orphaned {
            self.reporter.detail(&format!("- {} (remote deleted)", branch));
        }
        if !self.prompter.confirm("Delete these branches?").await? {
            return Ok(report);
        }

        for branch in &report.orphaned {
            match self.git.delete_branch(branch).await {
                Ok(()) => {
                    self.reporter.success(&format!("Deleted branch: {}", branch));
                    report.deleted.push(branch.clone());
                }
                Err(e) => self
                    .reporter
                    .warn(&format!("Failed to delete {}: {}", branch, e)),
            }
        }
        Ok(report)
    }
}
