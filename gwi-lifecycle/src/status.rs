//! Read-only overview of every worktree

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use gwi_core::{AheadBehind, RepositoryIdentity};
use gwi_github::PrState;
use tracing::debug;

use crate::{Lifecycle, Result};

/// Pull request state for a worktree's branch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrStatus {
    Open(u64),
    Merged {
        number: u64,
        merged_at: Option<DateTime<Utc>>,
    },
    Closed(u64),
    /// No PR has the branch as head
    None,
    /// The lookup failed
    Unknown,
    /// The directory isn't named after an issue
    NotApplicable,
}

/// One line of `gwi status`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorktreeStatus {
    pub name: String,
    pub path: PathBuf,
    pub issue: Option<u64>,
    /// Entries in `git status --short`
    pub changes: usize,
    pub ahead_behind: AheadBehind,
    pub pr: PrStatus,
}

impl WorktreeStatus {
    pub fn is_dirty(&self) -> bool {
        self.changes > 0
    }

    /// Render relative to `now` (for "merged 3d ago")
    pub fn render(&self, now: DateTime<Utc>) -> String {
        let mut line = format!("● {}", self.name);
        if self.is_dirty() {
            line.push_str(&format!(" ({} changes)", self.changes));
        }
        if self.ahead_behind.ahead > 0 {
            line.push_str(&format!(" ↑{}", self.ahead_behind.ahead));
        }
        if self.ahead_behind.behind > 0 {
            line.push_str(&format!(" ↓{}", self.ahead_behind.behind));
        }
        match &self.pr {
            PrStatus::Open(n) => line.push_str(&format!(" PR #{}", n)),
            PrStatus::Merged { number, merged_at } => {
                line.push_str(&format!(" PR #{} merged", number));
                if let Some(at) = merged_at {
                    let ago = format_duration((now - *at).num_seconds().max(0));
                    line.push_str(&format!(" {} ago", ago));
                }
            }
            PrStatus::Closed(n) => line.push_str(&format!(" PR #{} closed", n)),
            PrStatus::None => line.push_str(" no PR"),
            PrStatus::Unknown => line.push_str(" PR unknown"),
            PrStatus::NotApplicable => {}
        }
        line
    }
}

impl fmt::Display for WorktreeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(Utc::now()))
    }
}

/// Status of every worktree for a repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    pub identity: RepositoryIdentity,
    pub worktrees: Vec<WorktreeStatus>,
}

/// Human-friendly elapsed time: `45s`, `12m`, `3h 20m`, `2d 4h`
pub fn format_duration(seconds: i64) -> String {
    if seconds < 60 {
        format!("{}s", seconds)
    } else if seconds < 3600 {
        format!("{}m", seconds / 60)
    } else if seconds < 86400 {
        let hours = seconds / 3600;
        let mins = (seconds % 3600) / 60;
        if mins > 0 {
            format!("{}h {}m", hours, mins)
        } else {
            format!("{}h", hours)
        }
    } else {
        let days = seconds / 86400;
        let hours = (seconds % 86400) / 3600;
        if hours > 0 {
            format!("{}d {}h", days, hours)
        } else {
            format!("{}d", days)
        }
    }
}

impl Lifecycle {
    /// Gather status for every worktree
    ///
    /// Each query degrades on its own; only listing the directory can fail.
    pub async fn status(&self) -> Result<StatusReport> {
        let mut worktrees = Vec::new();
        for path in self.store.list()? {
            let record = gwi_core::record_for(&path);
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();

            let changes = self.git.uncommitted_count(&path).await;
            let ahead_behind = self.git.ahead_behind(&path, &name).await;
            let pr = match &record {
                Some(_) => self.pr_status(&name).await,
                None => PrStatus::NotApplicable,
            };

            worktrees.push(WorktreeStatus {
                issue: record.map(|r| r.issue_number),
                name,
                path,
                changes,
                ahead_behind,
                pr,
            });
        }

        Ok(StatusReport {
            identity: self.identity.clone(),
            worktrees,
        })
    }

    async fn pr_status(&self, branch: &str) -> PrStatus {
        match self.tracker.pr_summary_for_branch(branch).await {
            Ok(None) => PrStatus::None,
            Ok(Some(pr)) => match pr.state {
                PrState::Open => PrStatus::Open(pr.number),
                PrState::Merged => PrStatus::Merged {
                    number: pr.number,
                    merged_at: pr.merged_at,
                },
                PrState::Closed => PrStatus::Closed(pr.number),
                PrState::Unknown => PrStatus::Unknown,
            },
            Err(e) => {
                debug!(branch, error = %e, "PR lookup failed");
                PrStatus::Unknown
            }
        }
    }
}
