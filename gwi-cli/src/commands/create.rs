//! Worktree creation commands

use clap::Args;

use super::{parse_issue, Context};

/// Create a worktree for an issue
#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Issue number (selected interactively when omitted)
    #[arg(value_parser = parse_issue)]
    pub issue: Option<u64>,

    /// Offer issues already in progress on the project board
    #[arg(short = 'a', long)]
    pub include_in_progress: bool,
}

impl CreateArgs {
    pub async fn execute(&self, ctx: &Context) -> anyhow::Result<()> {
        let lifecycle = ctx.lifecycle().await?;
        let outcome = lifecycle.create(self.issue, self.include_in_progress).await?;
        ctx.emit(&outcome);
        Ok(())
    }
}

/// Pick an open issue and create its worktree
#[derive(Args, Debug)]
pub struct StartArgs {
    /// Offer issues already in progress on the project board
    #[arg(short = 'a', long)]
    pub include_in_progress: bool,
}

impl StartArgs {
    pub async fn execute(&self, ctx: &Context) -> anyhow::Result<()> {
        let lifecycle = ctx.lifecycle().await?;
        let outcome = lifecycle.create(None, self.include_in_progress).await?;
        ctx.emit(&outcome);
        Ok(())
    }
}
