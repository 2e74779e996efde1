//! GitHub client backed by the gh CLI

use std::path::{Path, PathBuf};
use std::sync::Arc;

use gwi_core::{ProcessCommand, ProcessInvoker, ProcessOutput, RepositoryIdentity};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::{Error, Result};

/// Runs `gh` for one repository
///
/// Commands run from the repository directory so gh resolves the repository
/// from its git remote.
#[derive(Clone)]
pub struct GhClient {
    invoker: Arc<dyn ProcessInvoker>,
    gh: String,
    identity: RepositoryIdentity,
    repo_dir: PathBuf,
}

impl std::fmt::Debug for GhClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GhClient")
            .field("gh", &self.gh)
            .field("identity", &self.identity)
            .field("repo_dir", &self.repo_dir)
            .finish_non_exhaustive()
    }
}

impl GhClient {
    pub fn new(
        invoker: Arc<dyn ProcessInvoker>,
        gh: impl Into<String>,
        identity: RepositoryIdentity,
        repo_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            invoker,
            gh: gh.into(),
            identity,
            repo_dir: repo_dir.into(),
        }
    }

    pub fn identity(&self) -> &RepositoryIdentity {
        &self.identity
    }

    /// Configured gh program
    pub fn program(&self) -> &str {
        &self.gh
    }

    /// Whether the gh binary can be found
    pub fn is_available(&self) -> bool {
        self.invoker.is_available(&self.gh)
    }

    pub(crate) fn command<I, S>(&self, args: I) -> ProcessCommand
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ProcessCommand::new(&self.gh)
            .args(args)
            .current_dir(&self.repo_dir)
    }

    pub(crate) fn command_in<I, S>(&self, dir: &Path, args: I) -> ProcessCommand
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ProcessCommand::new(&self.gh).args(args).current_dir(dir)
    }

    /// Run without interpreting the exit status
    pub(crate) async fn run(&self, command: &ProcessCommand) -> Result<ProcessOutput> {
        Ok(self.invoker.run(command).await?)
    }

    /// Run and require success
    pub(crate) async fn run_checked(&self, command: &ProcessCommand) -> Result<ProcessOutput> {
        Ok(self.invoker.run_checked(command).await?)
    }

    /// Run and decode stdout as JSON
    pub(crate) async fn json<T: DeserializeOwned>(&self, command: &ProcessCommand) -> Result<T> {
        let output = self.run_checked(command).await?;
        debug!(command = %command.summary(), bytes = output.stdout.len(), "Decoding gh output");
        Ok(serde_json::from_str(&output.stdout)?)
    }

    /// Verify gh is logged in
    pub async fn check_auth(&self) -> Result<()> {
        let output = self.run(&self.command(["auth", "status"])).await?;
        if output.success() {
            Ok(())
        } else {
            Err(Error::Auth)
        }
    }

    /// `gh auth status` text (stdout and stderr), requiring a login
    pub async fn auth_status(&self) -> Result<String> {
        let output = self.run(&self.command(["auth", "status"])).await?;
        if !output.success() {
            return Err(Error::Auth);
        }
        Ok(format!("{}{}", output.stdout, output.stderr))
    }

    /// Interactively add `scope` to the gh credential
    pub async fn refresh_scope(&self, scope: &str) -> Result<()> {
        let command = self.command(["auth", "refresh", "-s", scope]).interactive();
        let output = self.run(&command).await?;
        if output.success() {
            Ok(())
        } else {
            Err(Error::MissingScope(scope.to_string()))
        }
    }
}
