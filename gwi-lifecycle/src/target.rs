//! Which issue an operation applies to

use gwi_core::SelectOption;
use tracing::debug;

use crate::{Lifecycle, Result};

/// Parse a user-supplied issue number (`42` or `#42`)
pub fn parse_issue_number(input: &str) -> gwi_core::Result<u64> {
    let trimmed = input.trim();
    let digits = trimmed.strip_prefix('#').unwrap_or(trimmed);
    match digits.parse::<u64>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(gwi_core::Error::InvalidIssueNumber(input.to_string())),
    }
}

impl Lifecycle {
    /// Explicit number, else the worktree containing the working directory,
    /// else an interactive choice among existing worktrees
    pub async fn resolve_issue(&self, explicit: Option<u64>) -> Result<u64> {
        if let Some(issue) = explicit {
            return Ok(issue);
        }
        if let Some(issue) = self.store.detect_issue(&self.cwd) {
            debug!(issue, cwd = %self.cwd.display(), "Issue detected from working directory");
            return Ok(issue);
        }
        self.select_worktree().await
    }

    /// Choose among existing issue worktrees
    pub async fn select_worktree(&self) -> Result<u64> {
        let records = self.store.records()?;
        if records.is_empty() {
            return Err(gwi_core::Error::Other(format!(
                "no worktrees found for {}",
                self.identity
            ))
            .into());
        }

        let options: Vec<SelectOption> = records
            .iter()
            .map(|r| SelectOption::new(&r.branch_name, r.issue_number.to_string()))
            .collect();
        let header = format!("Select worktree ({})", self.identity);
        let selected = self.prompter.select(&header, &options).await?;
        Ok(parse_issue_number(&selected)?)
    }

    /// Choose among open issues
    ///
    /// Issues that already have a worktree are offered but disabled. Issues
    /// already in progress on the board are disabled unless
    /// `include_in_progress` is set.
    pub async fn select_issue(&self, include_in_progress: bool) -> Result<u64> {
        self.tracker.check_auth().await?;

        let limit = self.config.issue_limit;
        let issues = if self.board.enabled() {
            self.tracker
                .list_open_issues_with_status(limit, &self.config.github.status_field_name)
                .await?
        } else {
            self.tracker.list_open_issues(limit).await?
        };
        if issues.is_empty() {
            return Err(gwi_core::Error::Other("no open issues found".to_string()).into());
        }

        let existing = self.store.existing_issues()?;
        let in_progress_value = &self.config.github.in_progress_value;
        let options: Vec<SelectOption> = issues
            .iter()
            .map(|issue| {
                let exists = existing.contains(&issue.number);
                let in_progress = issue
                    .project_status
                    .as_deref()
                    .is_some_and(|s| s.eq_ignore_ascii_case(in_progress_value));

                let mut option =
                    SelectOption::new(format!("#{} {}", issue.number, issue.title), issue.number.to_string())
                        .disabled(exists || (in_progress && !include_in_progress))
                        .highlighted(in_progress && !exists);
                if exists {
                    option = option.hint("already exists");
                } else if in_progress {
                    option = option.hint("in progress");
                }
                option
            })
            .collect();

        let header = format!("Select issue ({})", self.identity);
        let selected = self.prompter.select(&header, &options).await?;
        Ok(parse_issue_number(&selected)?)
    }
}
