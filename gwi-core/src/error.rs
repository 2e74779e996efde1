//! Error types for gwi

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Result type alias for gwi operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for gwi core operations
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Git library error
    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// The working directory is not inside a usable repository
    #[error("{0}")]
    NotARepository(String),

    /// The remote URL could not be mapped to an org/repo pair
    #[error("Could not parse org/repo from remote URL: {0}")]
    RemoteUrl(String),

    /// An external program is not installed or not on PATH
    #[error("'{0}' not found in PATH")]
    CommandNotFound(String),

    /// An external program exited unsuccessfully
    #[error("{command} failed{}: {stderr}", exit_suffix(*.code))]
    CommandFailed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    /// An external program did not finish in time
    #[error("{command} timed out after {after:?}")]
    Timeout { command: String, after: Duration },

    /// The invocation was cancelled by the operator
    #[error("Cancelled")]
    Cancelled,

    /// User supplied an issue number that isn't one
    #[error("Invalid issue number: {0}")]
    InvalidIssueNumber(String),

    /// No worktree directory exists for the issue
    #[error("No worktree found for issue #{0}")]
    WorktreeNotFound(u64),

    /// More than one worktree directory claims the same issue number
    #[error("Multiple worktrees found for issue #{issue}: {}", display_paths(.matches))]
    AmbiguousWorktree { issue: u64, matches: Vec<PathBuf> },

    /// The worktree for an issue is already on disk
    #[error(
        "Worktree for issue #{issue} already exists.\n\n  Path: {}\n\n  Use 'gwi cd {issue}' to navigate to it, or 'gwi rm {issue}' to remove it first.",
        .path.display()
    )]
    WorktreeExists { issue: u64, path: PathBuf },

    /// Selection was requested over an empty list
    #[error("no options to select from")]
    NoOptions,

    /// Operator dismissed the selector
    #[error("no selection made")]
    NoSelection,

    /// Operator typed something that doesn't map to an option
    #[error("invalid selection")]
    InvalidSelection,

    /// Operator declined a confirmation
    #[error("Aborted{}", abort_suffix(.0))]
    Aborted(String),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

fn exit_suffix(code: Option<i32>) -> String {
    match code {
        Some(code) => format!(" (exit {})", code),
        None => String::new(),
    }
}

fn abort_suffix(reason: &str) -> String {
    if reason.is_empty() {
        String::new()
    } else {
        format!(". {}", reason)
    }
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl Error {
    /// Whether this error came from the operator rather than the environment
    pub fn is_user_input(&self) -> bool {
        matches!(
            self,
            Error::InvalidIssueNumber(_)
                | Error::NoOptions
                | Error::NoSelection
                | Error::InvalidSelection
                | Error::Aborted(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_failed_carries_stderr_verbatim() {
        let err = Error::CommandFailed {
            command: "gh pr create".to_string(),
            code: Some(1),
            stderr: "no commits between main and 42-fix".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "gh pr create failed (exit 1): no commits between main and 42-fix"
        );
    }

    #[test]
    fn test_worktree_exists_has_guidance() {
        let err = Error::WorktreeExists {
            issue: 7,
            path: PathBuf::from("/w/7-thing"),
        };
        let msg = err.to_string();
        assert!(msg.contains("gwi cd 7"));
        assert!(msg.contains("gwi rm 7"));
        assert!(msg.contains("/w/7-thing"));
    }

    #[test]
    fn test_aborted_message() {
        assert_eq!(Error::Aborted(String::new()).to_string(), "Aborted");
        assert_eq!(
            Error::Aborted("Commit your changes first.".to_string()).to_string(),
            "Aborted. Commit your changes first."
        );
        assert!(Error::Aborted(String::new()).is_user_input());
        assert!(!Error::Cancelled.is_user_input());
    }
}
