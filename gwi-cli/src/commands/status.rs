//! `gwi status`

use chrono::Utc;
use gwi_lifecycle::StatusReport;

use super::Context;

pub async fn execute(ctx: &Context) -> anyhow::Result<()> {
    let lifecycle = ctx.lifecycle().await?;
    let report = lifecycle.status().await?;
    print!("{}", render(&report));
    Ok(())
}

fn render(report: &StatusReport) -> String {
    let mut out = format!("gwi status for {}\n\n", report.identity);
    if report.worktrees.is_empty() {
        out.push_str("No worktrees found.\n");
        return out;
    }
    let now = Utc::now();
    for worktree in &report.worktrees {
        out.push_str("  ");
        out.push_str(&worktree.render(now));
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use gwi_core::{AheadBehind, RepositoryIdentity};
    use gwi_lifecycle::{PrStatus, WorktreeStatus};
    use std::path::PathBuf;

    #[test]
    fn test_render_empty() {
        let report = StatusReport {
            identity: RepositoryIdentity::new("github.com", "acme", "widgets"),
            worktrees: vec![],
        };
        assert_eq!(
            render(&report),
            "gwi status for acme/widgets\n\nNo worktrees found.\n"
        );
    }

    #[test]
    fn test_render_lines() {
        let report = StatusReport {
            identity: RepositoryIdentity::new("github.com", "acme", "widgets"),
            worktrees: vec![WorktreeStatus {
                name: "7-fix-typo".to_string(),
                path: PathBuf::from("/w/7-fix-typo"),
                issue: Some(7),
                changes: 0,
                ahead_behind: AheadBehind { ahead: 1, behind: 0 },
                pr: PrStatus::Open(12),
            }],
        };
        assert!(render(&report).ends_with("  ● 7-fix-typo ↑1 PR #12\n"));
    }
}
