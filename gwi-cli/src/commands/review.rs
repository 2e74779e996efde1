//! `gwi pr`

use clap::Args;

use super::{parse_issue, Context};

/// Push the branch, open a pull request and remove the worktree
#[derive(Args, Debug)]
pub struct PrArgs {
    /// Issue number (detected from the current worktree when omitted)
    #[arg(value_parser = parse_issue)]
    pub issue: Option<u64>,
}

impl PrArgs {
    pub async fn execute(&self, ctx: &Context) -> anyhow::Result<()> {
        let lifecycle = ctx.lifecycle().await?;
        let outcome = lifecycle.submit_for_review(self.issue).await?;
        if ctx.is_machine() {
            if let Some(url) = &outcome.pr_url {
                eprintln!("{}", url);
            }
        }
        ctx.emit(&outcome);
        Ok(())
    }
}
