//! gwi lifecycle - drives an issue through worktree, pull request and board
//!
//! Each operation coordinates three systems with no shared transaction: local
//! git worktrees, GitHub issues and pull requests, and GitHub Projects boards.
//! Git and tracker steps are load-bearing and fail the operation; board
//! updates are best-effort and only ever produce a warning.

mod activate;
mod board;
mod clean;
mod create;
mod error;
mod merge;
mod navigate;
mod outcome;
mod remove;
mod review;
mod status;
mod target;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use gwi_core::{
    Config, Git, GitRepo, HookResolver, ProcessInvoker, Prompter, RepositoryIdentity, Reporter,
    WorktreeStore,
};
use gwi_github::{GhClient, ProjectBoard};
use tracing::debug;

pub use activate::run_activate_hook;
pub use clean::CleanReport;
pub use error::{Error, Result};
pub use merge::MergeReadiness;
pub use navigate::WorktreeEntry;
pub use outcome::Outcome;
pub use remove::RemoveOptions;
pub use status::{format_duration, PrStatus, StatusReport, WorktreeStatus};
pub use target::parse_issue_number;

/// The lifecycle orchestrator for one repository and one command
pub struct Lifecycle {
    config: Config,
    identity: RepositoryIdentity,
    store: WorktreeStore,
    git: Git,
    tracker: GhClient,
    board: ProjectBoard,
    hooks: HookResolver,
    reporter: Arc<dyn Reporter>,
    prompter: Arc<dyn Prompter>,
    main_worktree: PathBuf,
    cwd: PathBuf,
}

impl std::fmt::Debug for Lifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lifecycle")
            .field("identity", &self.identity)
            .field("store", &self.store)
            .field("main_worktree", &self.main_worktree)
            .field("cwd", &self.cwd)
            .finish_non_exhaustive()
    }
}

impl Lifecycle {
    /// Assemble the orchestrator from already-resolved parts
    ///
    /// Git and gh commands run from `main_worktree`, so removing the worktree
    /// the operator is standing in never strands later commands.
    pub fn new(
        config: Config,
        identity: RepositoryIdentity,
        main_worktree: impl Into<PathBuf>,
        cwd: impl Into<PathBuf>,
        invoker: Arc<dyn ProcessInvoker>,
        reporter: Arc<dyn Reporter>,
        prompter: Arc<dyn Prompter>,
    ) -> Self {
        let main_worktree = main_worktree.into();
        let store = WorktreeStore::new(config.worktree_base_path(&identity));
        let git = Git::new(Arc::clone(&invoker), &config.tools.git, &main_worktree);
        let tracker = GhClient::new(
            Arc::clone(&invoker),
            &config.tools.gh,
            identity.clone(),
            &main_worktree,
        );
        let board = ProjectBoard::new(tracker.clone(), config.github.clone(), Arc::clone(&reporter));
        let hooks = HookResolver::new(invoker, &config.hook_dir);

        Self {
            config,
            identity,
            store,
            git,
            tracker,
            board,
            hooks,
            reporter,
            prompter,
            main_worktree,
            cwd: cwd.into(),
        }
    }

    /// Locate the repository containing `cwd` and assemble the orchestrator
    pub async fn discover(
        config: Config,
        cwd: impl Into<PathBuf>,
        invoker: Arc<dyn ProcessInvoker>,
        reporter: Arc<dyn Reporter>,
        prompter: Arc<dyn Prompter>,
    ) -> Result<Self> {
        let cwd = cwd.into();
        let repo = GitRepo::open(&cwd)?;
        let identity = repo.identity()?;

        let git = Git::new(Arc::clone(&invoker), &config.tools.git, repo.root());
        let main_worktree = match git.main_worktree_path().await {
            Ok(path) => path,
            Err(e) => {
                debug!(error = %e, "Could not list worktrees, using repository root");
                repo.root().to_path_buf()
            }
        };
        debug!(
            identity = %identity.full_name(),
            main = %main_worktree.display(),
            "Repository discovered"
        );

        Ok(Self::new(config, identity, main_worktree, cwd, invoker, reporter, prompter))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn identity(&self) -> &RepositoryIdentity {
        &self.identity
    }

    pub fn store(&self) -> &WorktreeStore {
        &self.store
    }

    pub fn main_worktree(&self) -> &Path {
        &self.main_worktree
    }

    /// Relocation target when `worktree` is about to disappear under the operator
    fn relocation_away_from(&self, worktree: &Path) -> Option<PathBuf> {
        let inside = self
            .store
            .containing_worktree(&self.cwd)
            .is_some_and(|current| current == worktree);
        inside.then(|| self.main_worktree.clone())
    }
}
