use std::path::PathBuf;

/// What a lifecycle operation leaves for the caller to act on
///
/// The orchestrator never prints paths itself. The CLI decides how a
/// relocation reaches the invoking shell.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Outcome {
    /// Directory the invoking shell should change into
    pub relocate_to: Option<PathBuf>,
    /// URL of a pull request opened by the operation
    pub pr_url: Option<String>,
}

impl Outcome {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn relocate(path: impl Into<PathBuf>) -> Self {
        Self {
            relocate_to: Some(path.into()),
            pr_url: None,
        }
    }
}
