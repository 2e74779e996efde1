//! Branches, remotes and commits

use std::path::Path;

use super::Git;
use crate::process::{StderrMode, StdoutMode, TimeoutPolicy};
use crate::Result;

impl Git {
    pub async fn fetch(&self) -> Result<()> {
        self.run(&self.command(["fetch", "origin"])).await?;
        Ok(())
    }

    /// Fetch and drop remote-tracking refs that no longer exist upstream
    pub async fn fetch_prune(&self) -> Result<()> {
        self.run(&self.command(["fetch", "origin", "--prune"])).await?;
        Ok(())
    }

    /// `git push -u origin <branch>` from inside the worktree
    ///
    /// Not time-limited since credential helpers may prompt.
    pub async fn push(&self, worktree: &Path, branch: &str) -> Result<()> {
        let command = self
            .command_in(worktree, ["push", "-u", "origin", branch])
            .stdout(StdoutMode::ToStderr)
            .stderr(StderrMode::Inherit)
            .timeout(TimeoutPolicy::Unbounded);
        self.run(&command).await?;
        Ok(())
    }

    /// `git push origin <branch>` from `dir` without changing upstream config
    pub async fn push_branch(&self, dir: &Path, branch: &str) -> Result<()> {
        let command = self
            .command_in(dir, ["push", "origin", branch])
            .stdout(StdoutMode::ToStderr)
            .stderr(StderrMode::Inherit)
            .timeout(TimeoutPolicy::Unbounded);
        self.run(&command).await?;
        Ok(())
    }

    pub async fn branch_exists(&self, branch: &str) -> Result<bool> {
        let reference = format!("refs/heads/{}", branch);
        self.succeeds(&self.command(["show-ref", "--verify", "--quiet", reference.as_str()]))
            .await
    }

    /// Whether `origin/<branch>` is known locally (as of the last fetch)
    pub async fn remote_branch_exists(&self, branch: &str) -> Result<bool> {
        let reference = format!("refs/remotes/origin/{}", branch);
        self.succeeds(&self.command(["show-ref", "--verify", "--quiet", reference.as_str()]))
            .await
    }

    pub async fn delete_branch(&self, branch: &str) -> Result<()> {
        self.run(&self.command(["branch", "-D", branch])).await?;
        Ok(())
    }

    pub async fn delete_remote_branch(&self, branch: &str) -> Result<()> {
        self.run(&self.command(["push", "origin", "--delete", branch]))
            .await?;
        Ok(())
    }

    /// Full message of the tip commit of `reference` (HEAD when `None`)
    pub async fn last_commit_message(&self, reference: Option<&str>) -> Result<String> {
        let mut command = self.command(["log", "-1", "--pretty=%B"]);
        if let Some(reference) = reference {
            command = command.arg(reference);
        }
        let output = self.run(&command).await?;
        Ok(output.stdout_trimmed().to_string())
    }

    pub async fn local_branches(&self) -> Result<Vec<String>> {
        let output = self
            .run(&self.command(["branch", "--format=%(refname:short)"]))
            .await?;
        Ok(output
            .stdout
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect())
    }

    pub async fn checkout(&self, dir: &Path, branch: &str) -> Result<()> {
        self.run(&self.command_in(dir, ["checkout", branch])).await?;
        Ok(())
    }

    /// Fast-forward `branch` in `dir` from origin
    pub async fn pull_ff_only(&self, dir: &Path, branch: &str) -> Result<()> {
        let command = self
            .command_in(dir, ["pull", "--ff-only", "origin", branch])
            .stdout(StdoutMode::ToStderr);
        self.run(&command).await?;
        Ok(())
    }

    /// Merge commit of `branch` into whatever `dir` has checked out
    pub async fn merge_branch(&self, dir: &Path, branch: &str) -> Result<()> {
        let command = self
            .command_in(dir, ["merge", "--no-ff", "--no-edit", branch])
            .stdout(StdoutMode::ToStderr);
        self.run(&command).await?;
        Ok(())
    }

    pub async fn abort_merge(&self, dir: &Path) -> Result<()> {
        self.run(&self.command_in(dir, ["merge", "--abort"])).await?;
        Ok(())
    }

    pub async fn head_commit(&self, dir: &Path) -> Result<String> {
        let output = self.run(&self.command_in(dir, ["rev-parse", "HEAD"])).await?;
        Ok(output.stdout_trimmed().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::ProcessOutput;
    use crate::testing::FakeInvoker;
    use crate::Error;
    use std::sync::Arc;

    fn git(fake: &Arc<FakeInvoker>) -> Git {
        Git::new(fake.clone(), "git", "/src/widgets")
    }

    #[tokio::test]
    async fn test_branch_exists() {
        let fake = Arc::new(FakeInvoker::new());
        fake.on(
            "git",
            &["show-ref", "--verify", "--quiet", "refs/heads/42-x"],
            ProcessOutput::ok(""),
        );
        let g = git(&fake);
        assert!(g.branch_exists("42-x").await.unwrap());
        assert!(!g.branch_exists("43-y").await.unwrap());
        assert!(!g.remote_branch_exists("42-x").await.unwrap());
    }

    #[tokio::test]
    async fn test_local_branches() {
        let fake = Arc::new(FakeInvoker::new());
        fake.on(
            "git",
            &["branch", "--format=%(refname:short)"],
            ProcessOutput::ok("main\n42-x\n\n7-y\n"),
        );
        assert_eq!(
            git(&fake).local_branches().await.unwrap(),
            vec!["main", "42-x", "7-y"]
        );
    }

    #[tokio::test]
    async fn test_last_commit_message() {
        let fake = Arc::new(FakeInvoker::new());
        fake.on(
            "git",
            &["log", "-1", "--pretty=%B", "origin/42-x"],
            ProcessOutput::ok("Add login form\n\nWith validation.\n\n"),
        );
        let msg = git(&fake)
            .last_commit_message(Some("origin/42-x"))
            .await
            .unwrap();
        assert_eq!(msg, "Add login form\n\nWith validation.");
    }

    #[tokio::test]
    async fn test_push_runs_in_worktree_unbounded() {
        let fake = Arc::new(FakeInvoker::new());
        fake.on("git", &["push"], ProcessOutput::ok(""));
        git(&fake)
            .push(Path::new("/w/42-x"), "42-x")
            .await
            .unwrap();
        let call = &fake.calls()[0];
        assert_eq!(call.args, vec!["push", "-u", "origin", "42-x"]);
        assert_eq!(call.cwd.as_deref(), Some(Path::new("/w/42-x")));
        assert_eq!(call.timeout, TimeoutPolicy::Unbounded);
    }

    #[tokio::test]
    async fn test_delete_remote_branch_failure() {
        let fake = Arc::new(FakeInvoker::new());
        fake.on(
            "git",
            &["push", "origin", "--delete"],
            ProcessOutput::failed(1, "error: unable to delete '42-x': remote ref does not exist"),
        );
        let err = git(&fake).delete_remote_branch("42-x").await.unwrap_err();
        match err {
            Error::CommandFailed { stderr, .. } => assert!(stderr.contains("remote ref does not exist")),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
