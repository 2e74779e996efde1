//! Worktree creation, removal and discovery

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::Git;
use crate::process::{StderrMode, StdoutMode};
use crate::{Error, Result};

/// git's refusal message for worktrees with local modifications
const DIRTY_REFUSAL: &str = "contains modified or untracked files";

impl Git {
    /// New worktree at `path` on a new `branch` cut from `base_ref`
    pub async fn create_from_base_ref(&self, path: &Path, branch: &str, base_ref: &str) -> Result<()> {
        ensure_parent(path).await?;
        let command = self
            .command(["worktree", "add"])
            .path_arg(path)
            .args(["-b", branch, base_ref])
            .stdout(StdoutMode::ToStderr)
            .stderr(StderrMode::Inherit);
        self.run(&command).await?;
        Ok(())
    }

    /// New worktree at `path` checking out the existing local `branch`
    pub async fn create_from_local_branch(&self, path: &Path, branch: &str) -> Result<()> {
        ensure_parent(path).await?;
        let command = self
            .command(["worktree", "add"])
            .path_arg(path)
            .arg(branch)
            .stdout(StdoutMode::ToStderr)
            .stderr(StderrMode::Inherit);
        self.run(&command).await?;
        Ok(())
    }

    /// New worktree at `path` with a local `branch` tracking `origin/<branch>`
    pub async fn create_from_remote_branch(&self, path: &Path, branch: &str) -> Result<()> {
        let remote_ref = format!("origin/{}", branch);
        self.create_from_base_ref(path, branch, &remote_ref).await
    }

    /// Remove the worktree at `path`
    ///
    /// An absent directory is already removed. When git refuses but the
    /// directory is still on disk (stale worktree metadata), the directory is
    /// deleted directly. A non-forced removal of a worktree with local
    /// modifications is never forced this way.
    pub async fn remove(&self, path: &Path, force: bool) -> Result<()> {
        if !path.exists() {
            debug!(path = %path.display(), "Worktree already absent");
            return Ok(());
        }

        let mut command = self.command(["worktree", "remove"]).path_arg(path);
        if force {
            command = command.arg("--force");
        }

        let output = self.invoker.run(&command).await?;
        if output.success() || !path.exists() {
            return Ok(());
        }

        if !force && output.stderr.contains(DIRTY_REFUSAL) {
            return output.check(&command).map(|_| ());
        }

        warn!(
            path = %path.display(),
            stderr = %output.stderr.trim(),
            "git refused to remove worktree, deleting directory"
        );
        tokio::fs::remove_dir_all(path).await.map_err(|e| {
            Error::Other(format!(
                "git worktree remove failed ({}), manual removal failed: {}",
                output.stderr.trim(),
                e
            ))
        })
    }

    /// Drop metadata for worktrees whose directories are gone
    pub async fn prune(&self) -> Result<String> {
        let output = self.run(&self.command(["worktree", "prune", "-v"])).await?;
        Ok(output.stdout)
    }

    /// Paths of all worktrees git knows about, main worktree first
    pub async fn list_worktrees(&self) -> Result<Vec<PathBuf>> {
        let output = self
            .run(&self.command(["worktree", "list", "--porcelain"]))
            .await?;
        Ok(output
            .stdout
            .lines()
            .filter_map(|line| line.strip_prefix("worktree "))
            .map(PathBuf::from)
            .collect())
    }

    /// The primary checkout
    pub async fn main_worktree_path(&self) -> Result<PathBuf> {
        self.list_worktrees()
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::NotARepository("could not find main worktree".to_string()))
    }
}

async fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::ProcessOutput;
    use crate::testing::FakeInvoker;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn git(fake: &Arc<FakeInvoker>, dir: &Path) -> Git {
        Git::new(fake.clone(), "git", dir)
    }

    #[tokio::test]
    async fn test_create_from_base_ref_makes_parent() {
        let tmp = TempDir::new().unwrap();
        let fake = Arc::new(FakeInvoker::new());
        fake.on("git", &["worktree", "add"], ProcessOutput::ok(""));

        let path = tmp.path().join("github.com/acme/widgets/42-add-auth");
        git(&fake, tmp.path())
            .create_from_base_ref(&path, "42-add-auth", "origin/main")
            .await
            .unwrap();

        assert!(path.parent().unwrap().is_dir());
        let call = &fake.calls()[0];
        assert_eq!(
            call.args,
            vec![
                "worktree".to_string(),
                "add".to_string(),
                path.to_string_lossy().into_owned(),
                "-b".to_string(),
                "42-add-auth".to_string(),
                "origin/main".to_string(),
            ]
        );
        assert_eq!(call.cwd.as_deref(), Some(tmp.path()));
        assert_eq!(call.stdout, StdoutMode::ToStderr);
    }

    #[tokio::test]
    async fn test_create_failure_is_loud() {
        let tmp = TempDir::new().unwrap();
        let fake = Arc::new(FakeInvoker::new());
        fake.on(
            "git",
            &["worktree", "add"],
            ProcessOutput::failed(128, "fatal: a branch named '1-x' already exists"),
        );
        let err = git(&fake, tmp.path())
            .create_from_local_branch(&tmp.path().join("1-x"), "1-x")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::CommandFailed { code: Some(128), .. }));
    }

    #[tokio::test]
    async fn test_remove_absent_is_ok() {
        let tmp = TempDir::new().unwrap();
        let fake = Arc::new(FakeInvoker::new());
        git(&fake, tmp.path())
            .remove(&tmp.path().join("gone"), false)
            .await
            .unwrap();
        assert!(fake.calls().is_empty());
    }

    #[tokio::test]
    async fn test_remove_falls_back_to_directory_delete() {
        let tmp = TempDir::new().unwrap();
        let wt = tmp.path().join("7-broken");
        std::fs::create_dir_all(wt.join("src")).unwrap();

        let fake = Arc::new(FakeInvoker::new());
        fake.on(
            "git",
            &["worktree", "remove"],
            ProcessOutput::failed(128, "fatal: '7-broken' is not a working tree"),
        );

        git(&fake, tmp.path()).remove(&wt, false).await.unwrap();
        assert!(!wt.exists());
    }

    #[tokio::test]
    async fn test_remove_keeps_dirty_worktree_unless_forced() {
        let tmp = TempDir::new().unwrap();
        let wt = tmp.path().join("8-dirty");
        std::fs::create_dir_all(&wt).unwrap();

        let fake = Arc::new(FakeInvoker::new());
        fake.on(
            "git",
            &["worktree", "remove"],
            ProcessOutput::failed(
                128,
                "fatal: '8-dirty' contains modified or untracked files, use --force to delete it",
            ),
        );

        let err = git(&fake, tmp.path()).remove(&wt, false).await.unwrap_err();
        assert!(matches!(err, Error::CommandFailed { .. }));
        assert!(wt.exists());

        git(&fake, tmp.path()).remove(&wt, true).await.unwrap();
        assert!(!wt.exists());
        assert!(fake.called("git", &["worktree", "remove", "*", "--force"]));
    }

    #[tokio::test]
    async fn test_main_worktree_path() {
        let fake = Arc::new(FakeInvoker::new());
        fake.on(
            "git",
            &["worktree", "list", "--porcelain"],
            ProcessOutput::ok(
                "worktree /src/widgets\nHEAD abc\nbranch refs/heads/main\n\nworktree /w/42-x\nHEAD def\n",
            ),
        );
        let g = git(&fake, Path::new("/w/42-x"));
        assert_eq!(g.main_worktree_path().await.unwrap(), PathBuf::from("/src/widgets"));
        assert_eq!(g.list_worktrees().await.unwrap().len(), 2);
    }
}
