//! `gwi merge`

use clap::Args;

use super::{parse_issue, Context};

/// Merge the issue's pull request and clean up
#[derive(Args, Debug)]
pub struct MergeArgs {
    /// Issue number (detected from the current worktree when omitted)
    #[arg(value_parser = parse_issue)]
    pub issue: Option<u64>,

    /// Merge the branch into the main branch locally instead of via the PR
    #[arg(long)]
    pub local: bool,
}

impl MergeArgs {
    pub async fn execute(&self, ctx: &Context) -> anyhow::Result<()> {
        let lifecycle = ctx.lifecycle().await?;
        let outcome = if self.local {
            lifecycle.merge_local(self.issue).await?
        } else {
            lifecycle.merge(self.issue).await?
        };
        ctx.emit(&outcome);
        Ok(())
    }
}
