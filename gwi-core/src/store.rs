//! Worktree directory store
//!
//! The directory tree under `<worktree_base>/<host>/<org>/<repo>` is the only
//! durable state gwi owns. Each worktree lives in a directory named
//! `<issue>-<slug>`, which is also the name of its branch.

use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};

use crate::{Error, Result};

/// A worktree directory and the issue it belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorktreeRecord {
    pub issue_number: u64,
    /// Always equal to the directory's leaf name
    pub branch_name: String,
    pub path: PathBuf,
}

/// Maps issue numbers to worktree directories for one repository
#[derive(Debug, Clone)]
pub struct WorktreeStore {
    base: PathBuf,
}

impl WorktreeStore {
    /// Create a store rooted at an already-namespaced base path
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Where the worktree for `branch` lives (whether or not it exists)
    pub fn path_for(&self, branch: &str) -> PathBuf {
        self.base.join(branch)
    }

    /// Locate the directory for an issue
    ///
    /// Returns `Ok(None)` when nothing matches (including a missing base) and
    /// [`Error::AmbiguousWorktree`] when several directories claim the issue.
    pub fn find_by_issue(&self, issue: u64) -> Result<Option<PathBuf>> {
        let prefix = format!("{}-", issue);
        let mut matches: Vec<PathBuf> = self
            .list()?
            .into_iter()
            .filter(|path| leaf_name(path).is_some_and(|name| name.starts_with(&prefix)))
            .collect();

        match matches.len() {
            0 => Ok(None),
            1 => Ok(matches.pop()),
            _ => Err(Error::AmbiguousWorktree { issue, matches }),
        }
    }

    /// Like [`find_by_issue`](Self::find_by_issue) but a miss is an error
    pub fn require(&self, issue: u64) -> Result<PathBuf> {
        self.find_by_issue(issue)?
            .ok_or(Error::WorktreeNotFound(issue))
    }

    /// All immediate subdirectories of the base, sorted by name
    ///
    /// A base that does not exist yet simply has no worktrees.
    pub fn list(&self) -> Result<Vec<PathBuf>> {
        let entries = match std::fs::read_dir(&self.base) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Error::Io(e)),
        };

        let mut dirs = Vec::new();
        for entry in entries {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                dirs.push(entry.path());
            }
        }
        dirs.sort();
        Ok(dirs)
    }

    /// Records for every directory that follows the `<issue>-<slug>` layout
    pub fn records(&self) -> Result<Vec<WorktreeRecord>> {
        let mut records: Vec<WorktreeRecord> =
            self.list()?.iter().filter_map(|p| record_for(p)).collect();
        records.sort_by(|a, b| {
            a.issue_number
                .cmp(&b.issue_number)
                .then_with(|| a.branch_name.cmp(&b.branch_name))
        });
        Ok(records)
    }

    /// Issue numbers that currently have a worktree
    pub fn existing_issues(&self) -> Result<BTreeSet<u64>> {
        Ok(self.records()?.into_iter().map(|r| r.issue_number).collect())
    }

    /// Issue number of the worktree containing `cwd`, if any
    pub fn detect_issue(&self, cwd: &Path) -> Option<u64> {
        self.containing_worktree(cwd)
            .and_then(|dir| leaf_name(&dir).and_then(leading_issue_number))
    }

    /// The worktree directory that contains `cwd`, if any
    pub fn containing_worktree(&self, cwd: &Path) -> Option<PathBuf> {
        let first = first_component_below(&self.base, cwd).or_else(|| {
            let base = self.base.canonicalize().ok()?;
            let cwd = cwd.canonicalize().ok()?;
            first_component_below(&base, &cwd)
        })?;
        Some(self.base.join(first))
    }
}

fn first_component_below(base: &Path, path: &Path) -> Option<String> {
    match path.strip_prefix(base).ok()?.components().next()? {
        Component::Normal(name) => name.to_str().map(str::to_string),
        _ => None,
    }
}

fn leaf_name(path: &Path) -> Option<&str> {
    path.file_name().and_then(|n| n.to_str())
}

/// `N` from a name of the form `N-rest`
fn leading_issue_number(name: &str) -> Option<u64> {
    let (digits, _) = name.split_once('-')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Build a record from a worktree directory path
pub fn record_for(path: &Path) -> Option<WorktreeRecord> {
    let name = leaf_name(path)?;
    let issue_number = leading_issue_number(name)?;
    Some(WorktreeRecord {
        issue_number,
        branch_name: name.to_string(),
        path: path.to_path_buf(),
    })
}

/// Issue number encoded in a branch name
///
/// Matches digits at the start of the name or of any `/`-separated segment,
/// followed by `-` or `_`: `42-fix`, `feature/42_fix`.
pub fn issue_from_branch(branch: &str) -> Option<u64> {
    branch.split('/').find_map(|segment| {
        let end = segment
            .bytes()
            .position(|b| !b.is_ascii_digit())
            .filter(|&end| end > 0)?;
        match segment.as_bytes()[end] {
            b'-' | b'_' => segment[..end].parse().ok(),
            _ => None,
        }
    })
}
