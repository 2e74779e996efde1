//! Hook scripts
//!
//! A hook is an executable named after the event (`create`, `activate`)
//! found in the first of:
//! 1. `<worktree>/.gwi/<hook>`
//! 2. `<main worktree>/.gwi/<hook>`
//! 3. `<hook_dir>/<org>/<repo>/<hook>`

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::process::{
    is_executable, ProcessCommand, ProcessInvoker, StderrMode, StdoutMode, TimeoutPolicy,
};
use crate::repo::RepositoryIdentity;
use crate::Result;

/// Directory name holding repository-local hooks
pub const HOOK_DIR_NAME: &str = ".gwi";

/// Where to look for a hook
#[derive(Debug, Clone, Copy)]
pub struct HookContext<'a> {
    /// The worktree the hook runs in (also its working directory)
    pub worktree: &'a Path,
    pub main_worktree: Option<&'a Path>,
    pub identity: Option<&'a RepositoryIdentity>,
}

/// Result of running a hook
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookOutcome {
    /// No executable hook in any location
    Missing,
    Succeeded(PathBuf),
    Failed { script: PathBuf, code: Option<i32> },
}

/// Finds and runs hook scripts
#[derive(Clone)]
pub struct HookResolver {
    invoker: Arc<dyn ProcessInvoker>,
    hook_dir: PathBuf,
}

impl std::fmt::Debug for HookResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookResolver")
            .field("hook_dir", &self.hook_dir)
            .finish_non_exhaustive()
    }
}

impl HookResolver {
    pub fn new(invoker: Arc<dyn ProcessInvoker>, hook_dir: impl Into<PathBuf>) -> Self {
        Self {
            invoker,
            hook_dir: hook_dir.into(),
        }
    }

    /// Candidate paths in search order
    pub fn candidates(&self, hook: &str, ctx: &HookContext<'_>) -> Vec<PathBuf> {
        let mut paths = vec![ctx.worktree.join(HOOK_DIR_NAME).join(hook)];
        if let Some(main) = ctx.main_worktree {
            paths.push(main.join(HOOK_DIR_NAME).join(hook));
        }
        if let Some(identity) = ctx.identity {
            paths.push(
                self.hook_dir
                    .join(&identity.org)
                    .join(&identity.repo)
                    .join(hook),
            );
        }
        paths
    }

    /// First executable candidate; resolved fresh on every call
    pub fn find(&self, hook: &str, ctx: &HookContext<'_>) -> Option<PathBuf> {
        self.candidates(hook, ctx)
            .into_iter()
            .find(|path| is_executable(path))
    }

    /// Human-readable list of places a hook can be created
    pub fn locations_hint(&self, hook: &str) -> Vec<String> {
        vec![
            format!("{}/{} (in worktree or main repo)", HOOK_DIR_NAME, hook),
            format!("{}/<org>/<repo>/{}", self.hook_dir.display(), hook),
        ]
    }

    /// Run the hook with the worktree as working directory
    ///
    /// The operator's terminal stays attached (stdin and stderr); stdout goes
    /// where `stdout` says. A missing hook is not an error.
    pub async fn run(
        &self,
        hook: &str,
        ctx: &HookContext<'_>,
        stdout: StdoutMode,
    ) -> Result<HookOutcome> {
        let Some(script) = self.find(hook, ctx) else {
            debug!(hook, worktree = %ctx.worktree.display(), "No hook found");
            return Ok(HookOutcome::Missing);
        };

        debug!(hook, script = %script.display(), "Running hook");
        let command = ProcessCommand::new(script.to_string_lossy())
            .current_dir(ctx.worktree)
            .stdout(stdout)
            .stderr(StderrMode::Inherit)
            .timeout(TimeoutPolicy::Unbounded);

        let output = self.invoker.run(&command).await?;
        if output.success() {
            Ok(HookOutcome::Succeeded(script))
        } else {
            Ok(HookOutcome::Failed {
                script,
                code: output.code,
            })
        }
    }
}
