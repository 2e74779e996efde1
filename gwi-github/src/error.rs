//! Error types for GitHub operations

use thiserror::Error;

/// Result type for GitHub operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during GitHub operations
#[derive(Error, Debug)]
pub enum Error {
    /// Process, configuration or other core failure
    #[error(transparent)]
    Core(#[from] gwi_core::Error),

    /// Unexpected JSON from gh
    #[error("Failed to parse gh output: {0}")]
    Json(#[from] serde_json::Error),

    /// gh is not logged in
    #[error("GitHub CLI not authenticated. Run: gh auth login")]
    Auth,

    /// The credential lacks a scope and refreshing it failed
    #[error("Missing '{0}' scope. Please run manually: gh auth refresh -s {0}")]
    MissingScope(String),

    /// Issue lookup failed
    #[error("issue #{0} not found")]
    IssueNotFound(u64),

    /// No PR has the branch as its head
    #[error("No PR found for branch: {0}")]
    PrNotFound(String),

    /// The PR lookup itself failed
    #[error("Failed to look up PR for branch {branch}: {source}")]
    PrLookup {
        branch: String,
        #[source]
        source: gwi_core::Error,
    },

    /// gh refused to create the PR; carries gh's stderr
    #[error("failed to create PR: {0}")]
    PrCreate(String),

    /// GraphQL-level errors
    #[error("GraphQL error: {0}")]
    GraphQL(String),

    /// The project has no single-select field with this name
    #[error("field '{0}' not found in project")]
    FieldNotFound(String),

    /// The status field has no option with this name
    #[error("option '{option}' not found in field '{field}'")]
    OptionNotFound { option: String, field: String },

    /// Other error
    #[error("{0}")]
    Other(String),
}
