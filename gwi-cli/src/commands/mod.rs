//! CLI command implementations

pub mod activate;
pub mod clean;
pub mod config;
pub mod create;
pub mod init;
pub mod merge;
pub mod navigate;
pub mod review;
pub mod remove;
pub mod status;

use std::path::Path;
use std::sync::Arc;

use anyhow::Context as _;
use gwi_core::{
    Config, InteractiveReporter, MachineReporter, ProcessInvoker, Prompter, Reporter,
    SelectionService, SystemInvoker, TerminalPrompter,
};
use gwi_lifecycle::{parse_issue_number, Lifecycle, Outcome};

pub use create::{CreateArgs, StartArgs};
pub use init::InitArgs;
pub use merge::MergeArgs;
pub use navigate::CdArgs;
pub use remove::RmArgs;
pub use review::PrArgs;

/// Prefix marking a relocation line in interactive output
pub const RELOCATE_MARKER: &str = "__GWI_CD_TO__:";

/// Everything a command needs beyond its own arguments
pub struct Context {
    config: Config,
    invoker: Arc<dyn ProcessInvoker>,
    machine: bool,
}

impl Context {
    pub fn new(config: Config, invoker: SystemInvoker, machine: bool) -> Self {
        Self {
            config,
            invoker: Arc::new(invoker),
            machine,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn invoker(&self) -> Arc<dyn ProcessInvoker> {
        Arc::clone(&self.invoker)
    }

    pub fn is_machine(&self) -> bool {
        self.machine
    }

    pub fn reporter(&self) -> Arc<dyn Reporter> {
        if self.machine {
            Arc::new(MachineReporter)
        } else {
            Arc::new(InteractiveReporter::new())
        }
    }

    pub fn prompter(&self) -> Arc<dyn Prompter> {
        let selection = SelectionService::new(self.invoker(), &self.config.tools.fzf);
        Arc::new(TerminalPrompter::new(selection))
    }

    /// Orchestrator for the repository containing the working directory
    pub async fn lifecycle(&self) -> anyhow::Result<Lifecycle> {
        let cwd = std::env::current_dir().context("Failed to read current directory")?;
        let lifecycle = Lifecycle::discover(
            self.config.clone(),
            cwd,
            self.invoker(),
            self.reporter(),
            self.prompter(),
        )
        .await?;
        Ok(lifecycle)
    }

    /// Write the relocation target, if any, for the wrapping shell function
    pub fn emit(&self, outcome: &Outcome) {
        if let Some(path) = &outcome.relocate_to {
            println!("{}", encode_relocation(path, self.machine));
        }
    }
}

/// Bare path in machine mode, a marker line otherwise
pub fn encode_relocation(path: &Path, machine: bool) -> String {
    if machine {
        path.display().to_string()
    } else {
        format!("{}{}", RELOCATE_MARKER, path.display())
    }
}

/// clap value parser for issue numbers (`42` or `#42`)
pub fn parse_issue(input: &str) -> Result<u64, String> {
    parse_issue_number(input).map_err(|e| e.to_string())
}

/// Whether the command stopped because of Ctrl-C
pub fn is_cancelled(error: &anyhow::Error) -> bool {
    if let Some(e) = error.downcast_ref::<gwi_lifecycle::Error>() {
        return e.is_cancelled();
    }
    matches!(
        error.downcast_ref::<gwi_core::Error>(),
        Some(gwi_core::Error::Cancelled)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_encode_relocation() {
        let path = PathBuf::from("/w/github.com/acme/widgets/42-add-auth");
        assert_eq!(
            encode_relocation(&path, false),
            "__GWI_CD_TO__:/w/github.com/acme/widgets/42-add-auth"
        );
        assert_eq!(
            encode_relocation(&path, true),
            "/w/github.com/acme/widgets/42-add-auth"
        );
    }

    #[test]
    fn test_parse_issue() {
        assert_eq!(parse_issue("#12"), Ok(12));
        assert!(parse_issue("twelve").is_err());
    }

    #[test]
    fn test_is_cancelled() {
        let cancelled = anyhow::Error::new(gwi_lifecycle::Error::Core(gwi_core::Error::Cancelled));
        assert!(is_cancelled(&cancelled));
        assert!(is_cancelled(&anyhow::Error::new(gwi_core::Error::Cancelled)));
        let other = anyhow::Error::new(gwi_lifecycle::Error::MergeConflict(3));
        assert!(!is_cancelled(&other));
    }
}
