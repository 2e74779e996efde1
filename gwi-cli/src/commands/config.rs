//! `gwi config`

use gwi_core::Config;

pub fn print(config: &Config) {
    println!("gwi Configuration");
    println!("=================");
    println!();
    println!("Worktrees:");
    println!("  worktree_base: {}", config.worktree_base.display());
    println!("  main_branch: {}", config.main_branch);
    println!("  merge_strategy: {}", config.merge_strategy);
    println!("  hook_dir: {}", config.hook_dir.display());
    println!("  auto_activate: {}", config.auto_activate);
    println!();
    println!("Behavior:");
    println!("  verbose: {}", config.verbose);
    println!("  issue_limit: {}", config.issue_limit);
    println!(
        "  command_timeout: {}",
        humanize(config.command_timeout.as_secs())
    );
    println!();
    println!("Tools:");
    println!("  git: {}", config.tools.git);
    println!("  gh: {}", config.tools.gh);
    println!("  fzf: {}", config.tools.fzf);
    println!();
    let board = &config.github;
    println!("GitHub Projects:");
    println!("  projects_enabled: {}", board.projects_enabled);
    println!("  status_field_name: {}", board.status_field_name);
    println!("  todo_value: {}", board.todo_value);
    println!("  in_progress_value: {}", board.in_progress_value);
    println!("  in_review_value: {}", board.in_review_value);
    println!("  done_value: {}", board.done_value);
    println!("  check_scopes: {}", board.check_scopes);
    println!();
    if let Some(path) = Config::default_config_path() {
        println!("Config file: {}", path.display());
        if path.exists() {
            println!("  (exists)");
        } else {
            println!("  (not found - using defaults)");
        }
    }
}

fn humanize(seconds: u64) -> String {
    if seconds > 0 && seconds % 60 == 0 {
        format!("{}m", seconds / 60)
    } else {
        format!("{}s", seconds)
    }
}
