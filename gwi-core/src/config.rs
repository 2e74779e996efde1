//! Configuration management for gwi
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables (GWI_*)
//! 3. Config file (~/.config/gwi/config.toml)
//! 4. Default values

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// How a pull request is merged
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeStrategy {
    #[default]
    Squash,
    Merge,
    Rebase,
}

impl MergeStrategy {
    /// Flag understood by `gh pr merge`
    pub fn as_flag(&self) -> &'static str {
        match self {
            MergeStrategy::Squash => "--squash",
            MergeStrategy::Merge => "--merge",
            MergeStrategy::Rebase => "--rebase",
        }
    }
}

impl fmt::Display for MergeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MergeStrategy::Squash => "squash",
            MergeStrategy::Merge => "merge",
            MergeStrategy::Rebase => "rebase",
        };
        f.write_str(name)
    }
}

impl FromStr for MergeStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "squash" => Ok(MergeStrategy::Squash),
            "merge" => Ok(MergeStrategy::Merge),
            "rebase" => Ok(MergeStrategy::Rebase),
            other => Err(Error::Config(format!(
                "Unknown merge strategy '{}'. Expected squash, merge or rebase",
                other
            ))),
        }
    }
}

/// Paths to the external programs gwi drives
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// Path to the git executable
    pub git: String,
    /// Path to the GitHub CLI
    pub gh: String,
    /// Path to fzf (optional at runtime)
    pub fzf: String,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            git: "git".to_string(),
            gh: "gh".to_string(),
            fzf: "fzf".to_string(),
        }
    }
}

/// GitHub Projects (board) integration settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BoardConfig {
    /// Whether board status updates are attempted at all
    pub projects_enabled: bool,
    /// Name of the single-select status field
    pub status_field_name: String,
    pub todo_value: String,
    pub in_progress_value: String,
    pub in_review_value: String,
    pub done_value: String,
    /// Verify the `project` scope on the gh credential before writing
    pub check_scopes: bool,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            projects_enabled: true,
            status_field_name: "Status".to_string(),
            todo_value: "Todo".to_string(),
            in_progress_value: "In Progress".to_string(),
            in_review_value: "In Review".to_string(),
            done_value: "Done".to_string(),
            check_scopes: true,
        }
    }
}

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Root directory under which worktrees are laid out
    pub worktree_base: PathBuf,

    /// How `gwi merge` merges pull requests
    pub merge_strategy: MergeStrategy,

    /// Directory holding global hooks, laid out as `<org>/<repo>/<hook>`
    pub hook_dir: PathBuf,

    /// Name of the trunk branch
    pub main_branch: String,

    /// Verbose diagnostics
    pub verbose: bool,

    /// Run the activate hook after the shell changes into a worktree
    pub auto_activate: bool,

    /// Number of open issues offered by the issue selector
    pub issue_limit: u32,

    /// Upper bound for non-interactive subprocess calls
    #[serde(with = "humantime_serde")]
    pub command_timeout: Duration,

    /// External program locations
    pub tools: ToolsConfig,

    /// GitHub Projects integration
    pub github: BoardConfig,
}

impl Default for Config {
    fn default() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        let hook_dir = dirs::config_dir()
            .unwrap_or_else(|| home.join(".config"))
            .join("gwi")
            .join("hooks");

        Self {
            worktree_base: home.join("worktrees"),
            merge_strategy: MergeStrategy::default(),
            hook_dir,
            main_branch: "main".to_string(),
            verbose: false,
            auto_activate: false,
            issue_limit: 50,
            command_timeout: Duration::from_secs(120),
            tools: ToolsConfig::default(),
            github: BoardConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the default config file location
    ///
    /// Returns default config if file doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();

        if let Some(path) = config_path {
            if path.exists() {
                return Self::load_from_file(&path);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(Error::Io)?;
        let config: Config = toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?;
        Ok(config.expand_home())
    }

    /// Get the default config file path
    ///
    /// Returns `~/.config/gwi/config.toml` on Unix
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("gwi").join("config.toml"))
    }

    /// Apply environment variable overrides from the process environment
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides using an arbitrary variable lookup
    ///
    /// Supported variables:
    /// - GWI_WORKTREE_BASE, GWI_MERGE_STRATEGY, GWI_HOOK_DIR, GWI_MAIN_BRANCH
    /// - GWI_VERBOSE=1, GWI_AUTO_ACTIVATE=1
    /// - GWI_ISSUE_LIMIT, GWI_COMMAND_TIMEOUT (e.g. "90s")
    /// - GWI_GIT_PATH, GWI_GH_PATH, GWI_FZF_PATH
    /// - GWI_GITHUB_PROJECTS_ENABLED, GWI_GITHUB_STATUS_FIELD, GWI_GITHUB_TODO,
    ///   GWI_GITHUB_IN_PROGRESS, GWI_GITHUB_IN_REVIEW, GWI_GITHUB_DONE,
    ///   GWI_GITHUB_CHECK_SCOPES
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(base) = var("GWI_WORKTREE_BASE") {
            self.worktree_base = PathBuf::from(base);
        }
        if let Some(strategy) = var("GWI_MERGE_STRATEGY") {
            self.merge_strategy = strategy.parse()?;
        }
        if let Some(dir) = var("GWI_HOOK_DIR") {
            self.hook_dir = PathBuf::from(dir);
        }
        if let Some(branch) = var("GWI_MAIN_BRANCH") {
            self.main_branch = branch;
        }
        if var("GWI_VERBOSE").as_deref() == Some("1") {
            self.verbose = true;
        }
        if var("GWI_AUTO_ACTIVATE").as_deref() == Some("1") {
            self.auto_activate = true;
        }
        if let Some(limit) = var("GWI_ISSUE_LIMIT") {
            self.issue_limit = limit
                .parse()
                .map_err(|_| Error::Config(format!("GWI_ISSUE_LIMIT is not a number: {}", limit)))?;
        }
        if let Some(timeout) = var("GWI_COMMAND_TIMEOUT") {
            self.command_timeout = humantime_serde::re::humantime::parse_duration(&timeout)
                .map_err(|e| Error::Config(format!("GWI_COMMAND_TIMEOUT: {}", e)))?;
        }

        if let Some(git) = var("GWI_GIT_PATH") {
            self.tools.git = git;
        }
        if let Some(gh) = var("GWI_GH_PATH") {
            self.tools.gh = gh;
        }
        if let Some(fzf) = var("GWI_FZF_PATH") {
            self.tools.fzf = fzf;
        }

        if let Some(enabled) = var("GWI_GITHUB_PROJECTS_ENABLED") {
            self.github.projects_enabled = enabled != "false" && enabled != "0";
        }
        if let Some(field) = var("GWI_GITHUB_STATUS_FIELD") {
            self.github.status_field_name = field;
        }
        if let Some(value) = var("GWI_GITHUB_TODO") {
            self.github.todo_value = value;
        }
        if let Some(value) = var("GWI_GITHUB_IN_PROGRESS") {
            self.github.in_progress_value = value;
        }
        if let Some(value) = var("GWI_GITHUB_IN_REVIEW") {
            self.github.in_review_value = value;
        }
        if let Some(value) = var("GWI_GITHUB_DONE") {
            self.github.done_value = value;
        }
        if let Some(check) = var("GWI_GITHUB_CHECK_SCOPES") {
            if check == "0" || check == "false" {
                self.github.check_scopes = false;
            }
        }

        Ok(self.expand_home())
    }

    /// Apply CLI flag overrides
    pub fn with_cli_overrides(mut self, verbose: bool) -> Self {
        if verbose {
            self.verbose = true;
        }
        self
    }

    /// Load configuration with all overrides applied
    ///
    /// Priority: CLI > env > config file > defaults
    pub fn load_with_overrides(verbose: bool) -> Result<Self> {
        Ok(Self::load()?.with_env_overrides()?.with_cli_overrides(verbose))
    }

    /// Worktree base directory for one repository: `<worktree_base>/<host>/<org>/<repo>`
    pub fn worktree_base_path(&self, identity: &crate::RepositoryIdentity) -> PathBuf {
        self.worktree_base
            .join(&identity.host)
            .join(&identity.org)
            .join(&identity.repo)
    }

    fn expand_home(mut self) -> Self {
        self.worktree_base = expand_tilde(&self.worktree_base);
        self.hook_dir = expand_tilde(&self.hook_dir);
        self
    }
}

fn expand_tilde(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => path.to_path_buf(),
        },
        Err(_) => path.to_path_buf(),
    }
}
