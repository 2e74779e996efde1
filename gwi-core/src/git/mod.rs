//! Git worktree and branch primitives
//!
//! Thin wrappers over the `git` CLI. Every call carries an explicit working
//! directory: the repository directory given at construction (normally the
//! main worktree) unless the operation targets a specific worktree.

mod branch;
mod status;
mod worktree;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::process::{ProcessCommand, ProcessInvoker, ProcessOutput};
use crate::Result;

pub use status::AheadBehind;

/// Runs git for one repository
#[derive(Clone)]
pub struct Git {
    invoker: Arc<dyn ProcessInvoker>,
    program: String,
    repo_dir: PathBuf,
}

impl std::fmt::Debug for Git {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Git")
            .field("program", &self.program)
            .field("repo_dir", &self.repo_dir)
            .finish_non_exhaustive()
    }
}

impl Git {
    pub fn new(
        invoker: Arc<dyn ProcessInvoker>,
        program: impl Into<String>,
        repo_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            invoker,
            program: program.into(),
            repo_dir: repo_dir.into(),
        }
    }

    /// Directory repository-wide commands run in
    pub fn repo_dir(&self) -> &Path {
        &self.repo_dir
    }

    /// Same git, anchored at another directory
    pub fn with_repo_dir(&self, repo_dir: impl Into<PathBuf>) -> Self {
        Self {
            invoker: Arc::clone(&self.invoker),
            program: self.program.clone(),
            repo_dir: repo_dir.into(),
        }
    }

    fn command<I, S>(&self, args: I) -> ProcessCommand
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.command_in(&self.repo_dir, args)
    }

    fn command_in<I, S>(&self, dir: &Path, args: I) -> ProcessCommand
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ProcessCommand::new(&self.program).args(args).current_dir(dir)
    }

    /// Run and require success
    async fn run(&self, command: &ProcessCommand) -> Result<ProcessOutput> {
        self.invoker.run_checked(command).await
    }

    /// Run and report only whether git exited 0
    async fn succeeds(&self, command: &ProcessCommand) -> Result<bool> {
        Ok(self.invoker.run(command).await?.success())
    }
}
