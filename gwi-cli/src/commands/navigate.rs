//! Moving between worktrees: `cd`, `main`, `list`

use clap::Args;

use super::Context;

const SHELL_HINT: &str = "Add shell integration to your shell config to change directory:\n  eval \"$(gwi init zsh)\"";

/// Change to an issue's worktree
#[derive(Args, Debug)]
pub struct CdArgs {
    /// Issue number or part of a worktree name (selected interactively when omitted)
    pub pattern: Option<String>,
}

impl CdArgs {
    pub async fn execute(&self, ctx: &Context) -> anyhow::Result<()> {
        let lifecycle = ctx.lifecycle().await?;
        let outcome = lifecycle.cd(self.pattern.as_deref()).await?;
        if !ctx.is_machine() {
            eprintln!("{}", SHELL_HINT);
        }
        ctx.emit(&outcome);
        Ok(())
    }
}

pub async fn main(ctx: &Context) -> anyhow::Result<()> {
    let lifecycle = ctx.lifecycle().await?;
    if !ctx.is_machine() {
        eprintln!("{}", SHELL_HINT);
    }
    ctx.emit(&lifecycle.main());
    Ok(())
}

/// Select a worktree with shell integration, print them all without
pub async fn list(ctx: &Context) -> anyhow::Result<()> {
    let lifecycle = ctx.lifecycle().await?;
    if ctx.is_machine() {
        let outcome = lifecycle.select_from_list().await?;
        ctx.emit(&outcome);
        return Ok(());
    }

    println!("Worktrees for {}:", lifecycle.identity());
    println!();
    for entry in lifecycle.list()? {
        println!("  {}", entry.label);
    }
    Ok(())
}
