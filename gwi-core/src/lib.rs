//! gwi Core - Core library for the git worktree issue workflow
//!
//! This crate provides the local building blocks shared by the workflow:
//! subprocess invocation, repository discovery, the worktree directory
//! layout, git worktree/branch primitives, hooks and interactive selection.

pub mod config;
pub mod error;
pub mod git;
pub mod hooks;
pub mod process;
pub mod repo;
pub mod reporter;
pub mod select;
pub mod slug;
pub mod store;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use config::{BoardConfig, Config, MergeStrategy, ToolsConfig};
pub use error::{Error, Result};
pub use git::{AheadBehind, Git};
pub use hooks::{HookContext, HookOutcome, HookResolver};
pub use process::{
    CancelHandle, CancelSignal, ProcessCommand, ProcessInvoker, ProcessOutput, StderrMode,
    StdoutMode, SystemInvoker, TimeoutPolicy,
};
pub use repo::{GitRepo, RepositoryIdentity};
pub use reporter::{InteractiveReporter, MachineReporter, Prompter, Reporter, TerminalPrompter};
pub use select::{SelectOption, SelectionService};
pub use slug::{branch_name, slugify};
pub use store::{issue_from_branch, record_for, WorktreeRecord, WorktreeStore};
