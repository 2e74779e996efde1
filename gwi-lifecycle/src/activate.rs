//! The `activate` hook

use std::path::{Path, PathBuf};

use gwi_core::{HookContext, HookOutcome, HookResolver, RepositoryIdentity, StdoutMode};

use crate::{Error, Lifecycle, Result};

const ACTIVATE_HOOK: &str = "activate";

/// Run the activate hook for `worktree`; a missing or failing hook is an error
///
/// Usable outside a repository, where only the worktree-local location is
/// searched.
pub async fn run_activate_hook(
    hooks: &HookResolver,
    worktree: &Path,
    main_worktree: Option<&Path>,
    identity: Option<&RepositoryIdentity>,
    stdout: StdoutMode,
) -> Result<PathBuf> {
    let ctx = HookContext {
        worktree,
        main_worktree,
        identity,
    };
    match hooks.run(ACTIVATE_HOOK, &ctx, stdout).await? {
        HookOutcome::Succeeded(script) => Ok(script),
        HookOutcome::Missing => Err(Error::HookMissing {
            hook: ACTIVATE_HOOK.to_string(),
            locations: hooks.locations_hint(ACTIVATE_HOOK),
        }),
        HookOutcome::Failed { script, code } => Err(Error::HookFailed {
            hook: ACTIVATE_HOOK.to_string(),
            script,
            code,
        }),
    }
}

impl Lifecycle {
    /// Run the activate hook for the worktree containing the working directory
    pub async fn activate(&self) -> Result<PathBuf> {
        let worktree = self
            .store
            .containing_worktree(&self.cwd)
            .unwrap_or_else(|| self.cwd.clone());
        run_activate_hook(
            &self.hooks,
            &worktree,
            Some(self.main_worktree.as_path()),
            Some(&self.identity),
            self.reporter.child_stdout(),
        )
        .await
    }
}
