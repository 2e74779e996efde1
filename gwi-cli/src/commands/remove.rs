//! `gwi rm`

use clap::Args;
use gwi_lifecycle::RemoveOptions;

use super::{parse_issue, Context};

/// Remove an issue's worktree without merging
#[derive(Args, Debug)]
pub struct RmArgs {
    /// Issue number (detected from the current worktree when omitted)
    #[arg(value_parser = parse_issue)]
    pub issue: Option<u64>,

    /// Remove even with uncommitted changes
    #[arg(short, long)]
    pub force: bool,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Also delete the local and remote branch
    #[arg(short = 'D', long)]
    pub delete_branch: bool,
}

impl RmArgs {
    fn options(&self) -> RemoveOptions {
        RemoveOptions {
            force: self.force,
            yes: self.yes,
            delete_branch: self.delete_branch,
        }
    }

    pub async fn execute(&self, ctx: &Context) -> anyhow::Result<()> {
        let lifecycle = ctx.lifecycle().await?;
        let outcome = lifecycle.remove(self.issue, self.options()).await?;
        ctx.emit(&outcome);
        Ok(())
    }
}
