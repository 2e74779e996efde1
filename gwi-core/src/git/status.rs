//! Read-only worktree state
//!
//! These queries feed status displays and never fail: any git error reads as
//! the zero value.

use std::path::Path;

use tracing::debug;

use super::Git;

/// Commit counts relative to `origin/<branch>`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AheadBehind {
    pub ahead: u32,
    pub behind: u32,
}

impl AheadBehind {
    /// Parse `git rev-list --left-right --count origin/B...HEAD` output
    ///
    /// The left column counts commits only on the remote (behind), the right
    /// column commits only on HEAD (ahead).
    fn parse(output: &str) -> Option<Self> {
        let mut fields = output.split_whitespace();
        let behind = fields.next()?.parse().ok()?;
        let ahead = fields.next()?.parse().ok()?;
        if fields.next().is_some() {
            return None;
        }
        Some(Self { ahead, behind })
    }
}

impl Git {
    pub async fn has_uncommitted_changes(&self, worktree: &Path) -> bool {
        match self.status_short(worktree).await {
            Some(status) => !status.is_empty(),
            None => false,
        }
    }

    /// Number of entries in `git status --short`
    pub async fn uncommitted_count(&self, worktree: &Path) -> usize {
        self.status_short(worktree)
            .await
            .map(|status| status.lines().filter(|l| !l.trim().is_empty()).count())
            .unwrap_or(0)
    }

    /// Trimmed `git status --short`, `None` if git failed
    pub async fn status_short(&self, worktree: &Path) -> Option<String> {
        let command = self.command_in(worktree, ["status", "--short"]);
        match self.run(&command).await {
            Ok(output) => Some(output.stdout.trim_end().to_string()),
            Err(e) => {
                debug!(worktree = %worktree.display(), error = %e, "git status failed");
                None
            }
        }
    }

    /// Ahead/behind against `origin/<branch>`, zero when unknown
    pub async fn ahead_behind(&self, worktree: &Path, branch: &str) -> AheadBehind {
        let range = format!("origin/{}...HEAD", branch);
        let command = self.command_in(worktree, ["rev-list", "--left-right", "--count", range.as_str()]);
        match self.run(&command).await {
            Ok(output) => AheadBehind::parse(&output.stdout).unwrap_or_default(),
            Err(e) => {
                debug!(branch, error = %e, "rev-list failed");
                AheadBehind::default()
            }
        }
    }
}
