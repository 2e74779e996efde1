//! Create a worktree for an issue

use std::path::Path;

use gwi_core::{branch_name, HookContext, HookOutcome};
use gwi_github::BoardStatus;
use tracing::{debug, warn};

use crate::{Lifecycle, Outcome, Result};

/// How the worktree's branch comes to exist
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BranchSource {
    Local,
    Remote,
    Fresh,
}

impl Lifecycle {
    /// Create (or, in machine mode, reuse) the worktree for an issue
    ///
    /// Without an issue number the operator picks one of the open issues.
    pub async fn create(&self, issue: Option<u64>, include_in_progress: bool) -> Result<Outcome> {
        let issue = match issue {
            Some(issue) => issue,
            None => self.select_issue(include_in_progress).await?,
        };

        self.tracker.check_auth().await?;
        self.reporter.info(&format!("Fetching issue #{}...", issue));
        let details = self.tracker.get_issue(issue).await?;
        if !details.is_open() {
            self.reporter.warn(&format!("Issue #{} is closed", issue));
        }

        let branch = branch_name(issue, &details.title);
        if let Some(existing) = self.store.find_by_issue(issue)? {
            self.reporter.reuse_existing(issue, &existing)?;
            debug!(issue, path = %existing.display(), "Reusing existing worktree");
            return Ok(Outcome::relocate(existing));
        }
        let path = self.store.path_for(&branch);

        self.reporter.info("Fetching from origin...");
        self.git.fetch().await?;

        match self.branch_source(&branch).await? {
            BranchSource::Local => {
                self.reporter
                    .info(&format!("Using existing local branch: {}", branch));
                self.git.create_from_local_branch(&path, &branch).await?;
            }
            BranchSource::Remote => {
                self.reporter
                    .info(&format!("Using existing remote branch: {}", branch));
                self.git.create_from_remote_branch(&path, &branch).await?;
            }
            BranchSource::Fresh => {
                self.reporter.info(&format!("Creating worktree: {}", branch));
                let base = format!("origin/{}", self.config.main_branch);
                self.git.create_from_base_ref(&path, &branch, &base).await?;
            }
        }
        self.reporter
            .success(&format!("Worktree created at: {}", path.display()));

        self.run_create_hook(&path).await?;
        self.sync_board(issue, BoardStatus::InProgress).await?;

        Ok(Outcome::relocate(path))
    }

    /// Local branch, then remote branch, then a fresh branch off main
    async fn branch_source(&self, branch: &str) -> Result<BranchSource> {
        if self.git.branch_exists(branch).await? {
            Ok(BranchSource::Local)
        } else if self.git.remote_branch_exists(branch).await? {
            Ok(BranchSource::Remote)
        } else {
            Ok(BranchSource::Fresh)
        }
    }

    /// A failing create hook leaves the worktree in place with a warning
    async fn run_create_hook(&self, worktree: &Path) -> Result<()> {
        let ctx = HookContext {
            worktree,
            main_worktree: Some(self.main_worktree.as_path()),
            identity: Some(&self.identity),
        };
        match self
            .hooks
            .run("create", &ctx, self.reporter.child_stdout())
            .await?
        {
            HookOutcome::Missing => {}
            HookOutcome::Succeeded(script) => {
                debug!(script = %script.display(), "create hook finished");
            }
            HookOutcome::Failed { script, code } => {
                warn!(script = %script.display(), code = ?code, "create hook failed");
                self.reporter.warn(&format!(
                    "create hook {} failed{}",
                    script.display(),
                    code.map(|c| format!(" (exit {})", c)).unwrap_or_default()
                ));
            }
        }
        Ok(())
    }
}
