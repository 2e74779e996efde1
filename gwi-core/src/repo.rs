//! Repository discovery and identity
//!
//! Everything gwi stores or looks up is namespaced by the `host/org/repo`
//! identity derived from the repository's remote URL.

use std::fmt;
use std::path::{Path, PathBuf};

use git2::Repository;
use url::Url;

use crate::{Error, Result};

/// Host reported for proxy-style remotes (`https://proxy/git/org/repo`)
const PROXY_HOST: &str = "github.com";

/// The `{host, org, repo}` triple a repository is known by
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepositoryIdentity {
    pub host: String,
    pub org: String,
    pub repo: String,
}

impl RepositoryIdentity {
    pub fn new(host: impl Into<String>, org: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            org: org.into(),
            repo: repo.into(),
        }
    }

    /// `org/repo`
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.org, self.repo)
    }

    /// Parse a remote URL
    ///
    /// Supports:
    /// - `git@github.com:org/repo.git`
    /// - `ssh://git@github.com/org/repo.git`
    /// - `https://github.com/org/repo(.git)`
    /// - `http://user@proxy:8080/git/org/repo` (reported as github.com)
    pub fn from_remote_url(remote: &str) -> Result<Self> {
        let trimmed = remote.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            return Err(Error::RemoteUrl(remote.to_string()));
        }

        if trimmed.contains("://") {
            let url = Url::parse(trimmed).map_err(|_| Error::RemoteUrl(remote.to_string()))?;
            let segments: Vec<&str> = url
                .path_segments()
                .map(|s| s.filter(|seg| !seg.is_empty()).collect())
                .unwrap_or_default();

            if let Some(pos) = segments.iter().position(|seg| *seg == "git") {
                if let [org, repo] = &segments[pos + 1..] {
                    return Self::from_parts(PROXY_HOST, org, repo, remote);
                }
            }

            let host = url.host_str().unwrap_or(PROXY_HOST);
            return match segments.as_slice() {
                [.., org, repo] => Self::from_parts(host, org, repo, remote),
                _ => Err(Error::RemoteUrl(remote.to_string())),
            };
        }

        // scp-like: [user@]host:org/repo
        if let Some((prefix, path)) = trimmed.split_once(':') {
            if !prefix.contains('/') {
                let host = prefix.rsplit('@').next().unwrap_or(prefix);
                let parts: Vec<&str> = path.split('/').filter(|p| !p.is_empty()).collect();
                if let [.., org, repo] = parts.as_slice() {
                    return Self::from_parts(host, org, repo, remote);
                }
            }
        }

        // anything else: last two path components
        let parts: Vec<&str> = trimmed
            .split(['/', ':'])
            .filter(|p| !p.is_empty())
            .collect();
        match parts.as_slice() {
            [.., org, repo] => Self::from_parts(PROXY_HOST, org, repo, remote),
            _ => Err(Error::RemoteUrl(remote.to_string())),
        }
    }

    fn from_parts(host: &str, org: &str, repo: &str, remote: &str) -> Result<Self> {
        let repo = repo.strip_suffix(".git").unwrap_or(repo);
        if org.is_empty() || repo.is_empty() {
            return Err(Error::RemoteUrl(remote.to_string()));
        }
        Ok(Self::new(host, org, repo))
    }
}

impl fmt::Display for RepositoryIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.org, self.repo)
    }
}

/// A discovered, non-bare git repository
pub struct GitRepo {
    repo: Repository,
    root: PathBuf,
}

impl fmt::Debug for GitRepo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitRepo")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

impl GitRepo {
    /// Open the repository containing `path`, searching upward
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let repo = Repository::discover(path).map_err(|e| {
            if e.code() == git2::ErrorCode::NotFound {
                Error::NotARepository(format!(
                    "Not a git repository: {}. Run gwi from inside a clone.",
                    path.display()
                ))
            } else {
                Error::Git(e)
            }
        })?;

        let root = repo
            .workdir()
            .ok_or_else(|| Error::NotARepository("Bare repositories are not supported".to_string()))?
            .to_path_buf();

        Ok(Self { repo, root })
    }

    /// Working directory of the checkout that was discovered
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn is_git_repo(path: impl AsRef<Path>) -> bool {
        Repository::discover(path.as_ref()).is_ok()
    }

    /// URL of `origin`, or of the first remote that has one
    pub fn remote_url(&self) -> Result<String> {
        if let Ok(remote) = self.repo.find_remote("origin") {
            if let Some(url) = remote.url() {
                return Ok(url.to_string());
            }
        }

        let remotes = self.repo.remotes()?;
        for name in remotes.iter().flatten() {
            if let Ok(remote) = self.repo.find_remote(name) {
                if let Some(url) = remote.url() {
                    return Ok(url.to_string());
                }
            }
        }

        Err(Error::NotARepository(
            "No remotes configured. Add one with 'git remote add origin <url>'".to_string(),
        ))
    }

    /// Identity derived from the remote URL
    pub fn identity(&self) -> Result<RepositoryIdentity> {
        RepositoryIdentity::from_remote_url(&self.remote_url()?)
    }

    /// Current branch, `None` when detached or unborn
    pub fn current_branch(&self) -> Result<Option<String>> {
        let head = match self.repo.head() {
            Ok(h) => h,
            Err(e) if e.code() == git2::ErrorCode::UnbornBranch => return Ok(None),
            Err(e) => return Err(Error::Git(e)),
        };

        if head.is_branch() {
            Ok(head.shorthand().map(|s| s.to_string()))
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(url: &str) -> RepositoryIdentity {
        RepositoryIdentity::from_remote_url(url).unwrap()
    }

    #[test]
    fn test_parse_ssh_scp() {
        let id = parse("git@github.com:acme/widgets.git");
        assert_eq!(id, RepositoryIdentity::new("github.com", "acme", "widgets"));
        assert_eq!(parse("git@github.com:acme/widgets"), id);
    }

    #[test]
    fn test_parse_ssh_url() {
        let id = parse("ssh://git@github.com/acme/widgets.git");
        assert_eq!(id, RepositoryIdentity::new("github.com", "acme", "widgets"));
    }

    #[test]
    fn test_parse_https() {
        let id = parse("https://github.com/acme/widgets.git");
        assert_eq!(id, RepositoryIdentity::new("github.com", "acme", "widgets"));
        assert_eq!(parse("https://github.com/acme/widgets"), id);
        assert_eq!(parse("https://github.com/acme/widgets/"), id);
    }

    #[test]
    fn test_parse_enterprise_host() {
        let id = parse("https://git.example.org/platform/api.git");
        assert_eq!(id.host, "git.example.org");
        assert_eq!(id.full_name(), "platform/api");
    }

    #[test]
    fn test_parse_proxy_style() {
        let id = parse("http://local_proxy@127.0.0.1:43210/git/acme/widgets");
        assert_eq!(id, RepositoryIdentity::new("github.com", "acme", "widgets"));
        assert_eq!(parse("http://127.0.0.1:43210/git/acme/widgets.git"), id);
    }

    #[test]
    fn test_parse_local_path_fallback() {
        let id = parse("/srv/mirrors/acme/widgets.git");
        assert_eq!(id.full_name(), "acme/widgets");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(RepositoryIdentity::from_remote_url("").is_err());
        assert!(RepositoryIdentity::from_remote_url("widgets").is_err());
        assert!(RepositoryIdentity::from_remote_url("https://github.com/").is_err());
    }

    #[test]
    fn test_display() {
        let id = RepositoryIdentity::new("github.com", "acme", "widgets");
        assert_eq!(id.to_string(), "acme/widgets");
    }

    #[test]
    fn test_open_non_git_dir() {
        let dir = tempfile::tempdir().unwrap();
        let result = GitRepo::open(dir.path());
        assert!(matches!(result, Err(Error::NotARepository(_))));
    }

    #[test]
    fn test_open_reads_origin() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        repo.remote("origin", "git@github.com:acme/widgets.git")
            .unwrap();

        let nested = dir.path().join("src");
        std::fs::create_dir(&nested).unwrap();

        let opened = GitRepo::open(&nested).unwrap();
        assert_eq!(
            opened.identity().unwrap(),
            RepositoryIdentity::new("github.com", "acme", "widgets")
        );
        assert_eq!(opened.current_branch().unwrap(), None);
    }

    #[test]
    fn test_remote_fallback_and_missing() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        let opened = GitRepo::open(dir.path()).unwrap();
        assert!(opened.remote_url().is_err());

        repo.remote("upstream", "https://github.com/acme/widgets")
            .unwrap();
        let opened = GitRepo::open(dir.path()).unwrap();
        assert_eq!(opened.identity().unwrap().repo, "widgets");
    }
}
