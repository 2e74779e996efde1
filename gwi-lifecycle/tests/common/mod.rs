//! Scripted repository for lifecycle scenarios

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use gwi_core::testing::{FakeInvoker, RecordingReporter, ScriptedPrompter};
use gwi_core::{Config, ProcessOutput, RepositoryIdentity};
use gwi_lifecycle::Lifecycle;
use tempfile::TempDir;

pub const BRANCH: &str = "42-add-user-authentication";

pub const ISSUE_42: &str = r#"{"number":42,"title":"Add user authentication!!","state":"OPEN"}"#;

pub const NO_PROJECT_ITEMS: &str =
    r#"{"data":{"repository":{"issue":{"projectItems":{"nodes":[]}}}}}"#;

pub struct Harness {
    pub tmp: TempDir,
    pub config: Config,
    pub identity: RepositoryIdentity,
    pub fake: Arc<FakeInvoker>,
    pub reporter: Arc<RecordingReporter>,
    pub prompter: Arc<ScriptedPrompter>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_prompter(ScriptedPrompter::new())
    }

    /// Git and gh answer the happy path; tests override single commands
    pub fn with_prompter(prompter: ScriptedPrompter) -> Self {
        let tmp = TempDir::new().unwrap();
        let mut config = Config::default();
        config.worktree_base = tmp.path().join("worktrees");
        config.hook_dir = tmp.path().join("hooks");
        config.github.check_scopes = false;
        std::fs::create_dir_all(tmp.path().join("main")).unwrap();

        let harness = Self {
            tmp,
            config,
            identity: RepositoryIdentity::new("github.com", "acme", "widgets"),
            fake: Arc::new(FakeInvoker::new()),
            reporter: Arc::new(RecordingReporter::new()),
            prompter: Arc::new(prompter),
        };
        harness.stub_git();
        harness.stub_gh();
        harness
    }

    fn stub_git(&self) {
        let fake = &self.fake;
        fake.on("git", &["fetch"], ProcessOutput::ok(""))
            .on("git", &["show-ref"], ProcessOutput::failed(1, ""))
            .on("git", &["worktree", "prune"], ProcessOutput::ok(""))
            .on("git", &["status", "--short"], ProcessOutput::ok(""))
            .on("git", &["rev-list"], ProcessOutput::ok("0\t0\n"))
            .on("git", &["push"], ProcessOutput::ok(""))
            .on("git", &["branch", "-D"], ProcessOutput::ok(""))
            .on("git", &["branch", "--format=%(refname:short)"], ProcessOutput::ok("main\n"))
            .on("git", &["log", "-1"], ProcessOutput::ok("Add login form\n"));

        fake.on_with("git", &["worktree", "add"], |cmd| {
            std::fs::create_dir_all(&cmd.args[2])?;
            Ok(ProcessOutput::ok(""))
        });
        fake.on_with("git", &["worktree", "remove"], |cmd| {
            std::fs::remove_dir_all(&cmd.args[2])?;
            Ok(ProcessOutput::ok(""))
        });
    }

    fn stub_gh(&self) {
        self.fake
            .on("gh", &["auth", "status"], ProcessOutput::ok("Logged in to github.com"))
            .on("gh", &["issue", "view", "42"], ProcessOutput::ok(ISSUE_42))
            .on("gh", &["issue", "comment"], ProcessOutput::ok(""))
            .on("gh", &["issue", "close"], ProcessOutput::ok(""))
            .on("gh", &["pr", "list", "--head"], ProcessOutput::ok("[]"))
            .on("gh", &["api", "graphql"], ProcessOutput::ok(NO_PROJECT_ITEMS));
    }

    pub fn main_dir(&self) -> PathBuf {
        self.tmp.path().join("main")
    }

    /// `<worktree_base>/github.com/acme/widgets`
    pub fn base(&self) -> PathBuf {
        self.config.worktree_base_path(&self.identity)
    }

    pub fn add_worktree(&self, name: &str) -> PathBuf {
        let path = self.base().join(name);
        std::fs::create_dir_all(&path).unwrap();
        path
    }

    /// Make a local branch visible to `show-ref`
    pub fn local_branch_exists(&self, branch: &str) {
        let reference = format!("refs/heads/{}", branch);
        self.fake.on(
            "git",
            &["show-ref", "--verify", "--quiet", reference.as_str()],
            ProcessOutput::ok(""),
        );
    }

    pub fn remote_branch_exists(&self, branch: &str) {
        let reference = format!("refs/remotes/origin/{}", branch);
        self.fake.on(
            "git",
            &["show-ref", "--verify", "--quiet", reference.as_str()],
            ProcessOutput::ok(""),
        );
    }

    /// `gh pr list --head <branch>` answers with one PR
    pub fn pr_for_branch(&self, number: u64, state: &str) {
        let json = format!(
            r#"[{{"number":{},"state":"{}","headRefName":"{}","mergedAt":null}}]"#,
            number, state, BRANCH
        );
        self.fake.on("gh", &["pr", "list", "--head"], ProcessOutput::ok(json));
    }

    pub fn pr_view(&self, number: u64, mergeable: &str, merge_state: &str) {
        let json = format!(
            r#"{{"mergeable":"{}","mergeStateStatus":"{}","statusCheckRollup":[],"state":"OPEN","headRefName":"{}"}}"#,
            mergeable, merge_state, BRANCH
        );
        let number = number.to_string();
        self.fake
            .on("gh", &["pr", "view", number.as_str()], ProcessOutput::ok(json));
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle_at(&self.main_dir())
    }

    pub fn lifecycle_at(&self, cwd: &Path) -> Lifecycle {
        Lifecycle::new(
            self.config.clone(),
            self.identity.clone(),
            self.main_dir(),
            cwd,
            self.fake.clone(),
            self.reporter.clone(),
            self.prompter.clone(),
        )
    }
}
