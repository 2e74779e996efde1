//! Error types for lifecycle operations

use std::path::PathBuf;

use thiserror::Error;

/// Result type for lifecycle operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that abort a lifecycle operation
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] gwi_core::Error),

    #[error(transparent)]
    GitHub(#[from] gwi_github::Error),

    /// The PR cannot be merged until its conflicts are resolved
    #[error("PR #{0} has merge conflicts. Resolve them first.")]
    MergeConflict(u64),

    /// The PR was closed without being merged
    #[error("PR #{0} is closed without being merged")]
    PrClosed(u64),

    #[error("No worktree or PR found for issue #{0}")]
    NoWorktreeOrPr(u64),

    #[error("No worktree found matching: {0}")]
    NoMatch(String),

    /// Local modifications block the operation
    #[error("Worktree has uncommitted changes. {hint}")]
    UncommittedChanges { path: PathBuf, hint: &'static str },

    /// A hook the operation needs does not exist
    #[error("No {hook} hook found. Create one of:\n{}", indent(.locations))]
    HookMissing { hook: String, locations: Vec<String> },

    #[error("{hook} hook {} failed{}", .script.display(), code_suffix(*.code))]
    HookFailed {
        hook: String,
        script: PathBuf,
        code: Option<i32>,
    },

    /// Merging the feature branch into the main branch locally failed
    #[error("Merging {branch} into {main} failed (merge aborted): {source}")]
    LocalMerge {
        branch: String,
        main: String,
        #[source]
        source: gwi_core::Error,
    },
}

fn indent(lines: &[String]) -> String {
    lines
        .iter()
        .map(|l| format!("  {}", l))
        .collect::<Vec<_>>()
        .join("\n")
}

fn code_suffix(code: Option<i32>) -> String {
    match code {
        Some(code) => format!(" (exit {})", code),
        None => String::new(),
    }
}

impl Error {
    /// Whether the operator caused this (bad input, dismissed prompt)
    pub fn is_user_input(&self) -> bool {
        match self {
            Error::Core(e) => e.is_user_input(),
            Error::GitHub(gwi_github::Error::Core(e)) => e.is_user_input(),
            _ => false,
        }
    }

    /// Whether the operator interrupted the command
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            Error::Core(gwi_core::Error::Cancelled)
                | Error::GitHub(gwi_github::Error::Core(gwi_core::Error::Cancelled))
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hook_missing_lists_locations() {
        let err = Error::HookMissing {
            hook: "activate".to_string(),
            locations: vec![
                ".gwi/activate (in worktree or main repo)".to_string(),
                "/etc/gwi/hooks/<org>/<repo>/activate".to_string(),
            ],
        };
        assert_eq!(
            err.to_string(),
            "No activate hook found. Create one of:\n  .gwi/activate (in worktree or main repo)\n  /etc/gwi/hooks/<org>/<repo>/activate"
        );
    }

    #[test]
    fn test_classification() {
        assert!(Error::Core(gwi_core::Error::NoSelection).is_user_input());
        assert!(Error::GitHub(gwi_github::Error::Core(gwi_core::Error::Cancelled)).is_cancelled());
        assert!(!Error::MergeConflict(3).is_user_input());
    }
}
