//! Output and prompting strategies
//!
//! A command picks one [`Reporter`] up front: interactive for a human at a
//! terminal, machine when a wrapping shell function consumes the output.
//! Library code never prints directly.

use std::io::{IsTerminal, Write};
use std::path::Path;

use async_trait::async_trait;

use crate::process::StdoutMode;
use crate::select::{SelectOption, SelectionService};
use crate::{Error, Result};

/// Progress and warning output for one command
pub trait Reporter: Send + Sync {
    /// A step is starting
    fn info(&self, message: &str);

    /// A step completed
    fn success(&self, message: &str);

    /// Something went wrong but the command carries on
    fn warn(&self, message: &str);

    /// Indented supporting detail (status lines, paths)
    fn detail(&self, message: &str);

    /// Decide what an already-existing worktree means for `create`
    ///
    /// Interactive callers get [`Error::WorktreeExists`] with guidance;
    /// machine callers accept the existing path.
    fn reuse_existing(&self, issue: u64, path: &Path) -> Result<()>;

    /// Where hook and other child stdout should go
    fn child_stdout(&self) -> StdoutMode;
}

/// Human-facing output on stderr
#[derive(Debug, Clone)]
pub struct InteractiveReporter {
    color: bool,
}

impl Default for InteractiveReporter {
    fn default() -> Self {
        Self {
            color: std::io::stderr().is_terminal(),
        }
    }
}

impl InteractiveReporter {
    pub fn new() -> Self {
        Self::default()
    }

    fn line(&self, glyph: &str, color: &str, message: &str) {
        if self.color {
            eprintln!("{}{}\x1b[0m {}", color, glyph, message);
        } else {
            eprintln!("{} {}", glyph, message);
        }
    }
}

impl Reporter for InteractiveReporter {
    fn info(&self, message: &str) {
        self.line("→", "\x1b[0;34m", message);
    }

    fn success(&self, message: &str) {
        self.line("✓", "\x1b[0;32m", message);
    }

    fn warn(&self, message: &str) {
        self.line("!", "\x1b[0;33m", message);
    }

    fn detail(&self, message: &str) {
        eprintln!("  {}", message);
    }

    fn reuse_existing(&self, issue: u64, path: &Path) -> Result<()> {
        Err(Error::WorktreeExists {
            issue,
            path: path.to_path_buf(),
        })
    }

    fn child_stdout(&self) -> StdoutMode {
        StdoutMode::Inherit
    }
}

/// Quiet output for shell integration
///
/// Only warnings reach stderr; stdout belongs to the caller's protocol.
#[derive(Debug, Clone, Default)]
pub struct MachineReporter;

impl Reporter for MachineReporter {
    fn info(&self, _message: &str) {}

    fn success(&self, _message: &str) {}

    fn warn(&self, message: &str) {
        eprintln!("! {}", message);
    }

    fn detail(&self, _message: &str) {}

    fn reuse_existing(&self, _issue: u64, _path: &Path) -> Result<()> {
        Ok(())
    }

    fn child_stdout(&self) -> StdoutMode {
        StdoutMode::ToStderr
    }
}

/// Questions put to the operator
#[async_trait]
pub trait Prompter: Send + Sync {
    /// Choose one option, returning its value
    async fn select(&self, header: &str, options: &[SelectOption]) -> Result<String>;

    /// Yes/no question defaulting to no
    async fn confirm(&self, prompt: &str) -> Result<bool>;
}

/// Prompts on the controlling terminal
#[derive(Debug, Clone)]
pub struct TerminalPrompter {
    selection: SelectionService,
}

impl TerminalPrompter {
    pub fn new(selection: SelectionService) -> Self {
        Self { selection }
    }
}

#[async_trait]
impl Prompter for TerminalPrompter {
    async fn select(&self, header: &str, options: &[SelectOption]) -> Result<String> {
        self.selection.select(header, options).await
    }

    async fn confirm(&self, prompt: &str) -> Result<bool> {
        let prompt = prompt.to_string();
        tokio::task::spawn_blocking(move || -> Result<bool> {
            let mut stderr = std::io::stderr();
            write!(stderr, "{} [y/N]: ", prompt)?;
            stderr.flush()?;

            let mut line = String::new();
            if std::io::stdin().read_line(&mut line)? == 0 {
                return Ok(false);
            }
            Ok(is_affirmative(&line))
        })
        .await
        .map_err(|e| Error::Other(format!("confirmation prompt failed: {}", e)))?
    }
}

/// `y` or `yes`, case-insensitive
pub fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_is_affirmative() {
        assert!(is_affirmative("y\n"));
        assert!(is_affirmative(" YES "));
        assert!(!is_affirmative(""));
        assert!(!is_affirmative("n"));
        assert!(!is_affirmative("yep"));
    }

    #[test]
    fn test_reuse_policies() {
        let path = PathBuf::from("/w/5-x");
        assert!(matches!(
            InteractiveReporter::new().reuse_existing(5, &path),
            Err(Error::WorktreeExists { issue: 5, .. })
        ));
        assert!(MachineReporter.reuse_existing(5, &path).is_ok());
    }

    #[test]
    fn test_child_stdout_policies() {
        assert_eq!(InteractiveReporter::new().child_stdout(), StdoutMode::Inherit);
        assert_eq!(MachineReporter.child_stdout(), StdoutMode::ToStderr);
    }
}
