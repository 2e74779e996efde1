//! Moving between worktrees

use std::path::{Path, PathBuf};

use gwi_core::SelectOption;

use crate::{parse_issue_number, Error, Lifecycle, Outcome, Result};

/// A place `gwi list` can take the operator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorktreeEntry {
    pub label: String,
    pub path: PathBuf,
    pub is_main: bool,
}

fn leaf(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

impl Lifecycle {
    /// Find a worktree by issue number or name fragment
    ///
    /// An exact issue number wins; otherwise every worktree whose name
    /// contains `pattern` is a candidate, with a selection when several match.
    pub async fn cd(&self, pattern: Option<&str>) -> Result<Outcome> {
        let Some(pattern) = pattern else {
            let issue = self.select_worktree().await?;
            return Ok(Outcome::relocate(self.store.require(issue)?));
        };

        if let Ok(issue) = parse_issue_number(pattern) {
            if let Some(path) = self.store.find_by_issue(issue)? {
                return Ok(Outcome::relocate(path));
            }
        }

        let mut matches: Vec<PathBuf> = self
            .store
            .list()?
            .into_iter()
            .filter(|path| leaf(path).contains(pattern))
            .collect();

        match matches.len() {
            0 => Err(Error::NoMatch(pattern.to_string())),
            1 => Ok(Outcome::relocate(matches.remove(0))),
            _ => {
                let options: Vec<SelectOption> = matches
                    .iter()
                    .map(|path| SelectOption::new(leaf(path), path.to_string_lossy()))
                    .collect();
                let header = format!("Multiple matches ({})", self.identity);
                let selected = self.prompter.select(&header, &options).await?;
                Ok(Outcome::relocate(selected))
            }
        }
    }

    /// The primary checkout
    pub fn main(&self) -> Outcome {
        Outcome::relocate(&self.main_worktree)
    }

    /// Main worktree first, then every issue worktree
    pub fn list(&self) -> Result<Vec<WorktreeEntry>> {
        let mut entries = vec![WorktreeEntry {
            label: format!("main ({})", leaf(&self.main_worktree)),
            path: self.main_worktree.clone(),
            is_main: true,
        }];
        entries.extend(self.store.list()?.into_iter().map(|path| WorktreeEntry {
            label: leaf(&path),
            path,
            is_main: false,
        }));
        Ok(entries)
    }

    /// Pick any worktree, main included; dismissing the selector goes nowhere
    pub async fn select_from_list(&self) -> Result<Outcome> {
        let options: Vec<SelectOption> = self
            .list()?
            .into_iter()
            .map(|e| SelectOption::new(e.label, e.path.to_string_lossy()).highlighted(e.is_main))
            .collect();
        let header = format!("Worktrees for {}", self.identity);
        match self.prompter.select(&header, &options).await {
            Ok(selected) => Ok(Outcome::relocate(selected)),
            Err(gwi_core::Error::NoSelection) => Ok(Outcome::none()),
            Err(e) => Err(e.into()),
        }
    }
}
