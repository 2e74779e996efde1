//! gwi CLI - one git worktree per GitHub issue
//!
//! Creates a worktree for an issue, opens its pull request, merges it and
//! cleans up, keeping the issue's GitHub Projects status in step.

mod commands;

use std::time::Duration;

use clap::{Parser, Subcommand};
use gwi_core::{CancelSignal, Config, SystemInvoker};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::{
    CdArgs, Context, CreateArgs, InitArgs, MergeArgs, PrArgs, RmArgs, StartArgs,
};

/// Exit status after Ctrl-C
const INTERRUPTED_EXIT: i32 = 130;

/// How long in-flight children get to wind down after Ctrl-C
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// gwi: Git Worktree Issue workflow
#[derive(Parser, Debug)]
#[command(name = "gwi")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print bare paths for shell integration instead of progress output
    #[arg(long, global = true, hide = true)]
    machine: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a worktree for an issue
    Create(CreateArgs),

    /// Pick an open issue and create its worktree
    Start(StartArgs),

    /// Push the branch, open a pull request and remove the worktree
    Pr(PrArgs),

    /// Merge the issue's pull request and clean up
    Merge(MergeArgs),

    /// Remove an issue's worktree without merging
    #[command(visible_alias = "remove")]
    Rm(RmArgs),

    /// Show every worktree with changes, push state and PR
    #[command(visible_alias = "st")]
    Status,

    /// Change to an issue's worktree
    Cd(CdArgs),

    /// Change to the main worktree
    Main,

    /// List worktrees (select one with shell integration)
    #[command(visible_alias = "ls")]
    List,

    /// Prune stale worktrees and delete orphaned branches
    Clean,

    /// Run the activate hook for the current worktree
    Activate,

    /// Print shell integration code
    Init(InitArgs),

    /// Show current configuration
    Config,

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration with overrides
    let config = Config::load_with_overrides(cli.verbose)?;
    init_tracing(config.verbose);

    let (cancel, signal) = CancelSignal::new();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::debug!("Interrupted, cancelling running commands");
            cancel.cancel();
            tokio::time::sleep(SHUTDOWN_GRACE).await;
            std::process::exit(INTERRUPTED_EXIT);
        }
    });

    let invoker = SystemInvoker::new(config.command_timeout, signal);
    let ctx = Context::new(config, invoker, cli.machine);

    match run(cli.command, &ctx).await {
        Err(e) if commands::is_cancelled(&e) => std::process::exit(INTERRUPTED_EXIT),
        result => result,
    }
}

async fn run(command: Option<Commands>, ctx: &Context) -> anyhow::Result<()> {
    match command {
        Some(Commands::Create(args)) => args.execute(ctx).await,
        Some(Commands::Start(args)) => args.execute(ctx).await,
        Some(Commands::Pr(args)) => args.execute(ctx).await,
        Some(Commands::Merge(args)) => args.execute(ctx).await,
        Some(Commands::Rm(args)) => args.execute(ctx).await,
        Some(Commands::Status) => commands::status::execute(ctx).await,
        Some(Commands::Cd(args)) => args.execute(ctx).await,
        Some(Commands::Main) => commands::navigate::main(ctx).await,
        Some(Commands::List) => commands::navigate::list(ctx).await,
        Some(Commands::Clean) => commands::clean::execute(ctx).await,
        Some(Commands::Activate) => commands::activate::execute(ctx).await,
        Some(Commands::Init(args)) => {
            print!("{}", args.script(ctx.config().auto_activate));
            Ok(())
        }
        Some(Commands::Config) => {
            commands::config::print(ctx.config());
            Ok(())
        }
        Some(Commands::Version) => {
            println!("gwi {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        None => {
            println!("gwi - Git Worktree Issue workflow");
            println!();
            println!("Use --help for usage information");
            Ok(())
        }
    }
}

/// Logs go to stderr; stdout carries relocation paths
fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "warn,gwi=debug,gwi_core=debug,gwi_github=debug,gwi_lifecycle=debug"
    } else {
        "warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_rm_flags_and_issue() {
        let cli = Cli::try_parse_from(["gwi", "rm", "-fyD", "#42"]).unwrap();
        match cli.command {
            Some(Commands::Rm(args)) => {
                assert_eq!(args.issue, Some(42));
                assert!(args.force && args.yes && args.delete_branch);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_rejects_bad_issue_number() {
        assert!(Cli::try_parse_from(["gwi", "create", "abc"]).is_err());
        assert!(Cli::try_parse_from(["gwi", "merge", "0"]).is_err());
    }

    #[test]
    fn test_machine_flag_is_global() {
        let cli = Cli::try_parse_from(["gwi", "cd", "--machine", "auth"]).unwrap();
        assert!(cli.machine);
        match cli.command {
            Some(Commands::Cd(args)) => assert_eq!(args.pattern.as_deref(), Some("auth")),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_merge_local_flag() {
        let cli = Cli::try_parse_from(["gwi", "merge", "--local", "7"]).unwrap();
        match cli.command {
            Some(Commands::Merge(args)) => {
                assert!(args.local);
                assert_eq!(args.issue, Some(7));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }
}
