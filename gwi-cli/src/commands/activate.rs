//! `gwi activate`

use anyhow::Context as _;
use gwi_core::HookResolver;
use gwi_lifecycle::run_activate_hook;

use super::Context;

/// Run the activate hook for the current worktree, or for the working
/// directory itself outside a repository
pub async fn execute(ctx: &Context) -> anyhow::Result<()> {
    let script = match ctx.lifecycle().await {
        Ok(lifecycle) => lifecycle.activate().await?,
        Err(e) => {
            // Outside a repository only the directory's own hook applies
            tracing::debug!(error = %e, "No repository, running local activate hook");
            let cwd = std::env::current_dir().context("Failed to read current directory")?;
            let hooks = HookResolver::new(ctx.invoker(), &ctx.config().hook_dir);
            let stdout = ctx.reporter().child_stdout();
            run_activate_hook(&hooks, &cwd, None, None, stdout).await?
        }
    };
    tracing::debug!(script = %script.display(), "activate hook finished");
    Ok(())
}
