pub mod git;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::workflow::types::{CloneOutcome, CloneStatus};
use git::CloneExecutor;

/// Turns accepted repositories into local working copies under one base
/// directory. Directories that existed before a clone attempt are never
/// touched; a failed attempt removes whatever it left behind.
pub struct Materializer {
    base_dir: PathBuf,
    executor: Arc<dyn CloneExecutor>,
}

impl Materializer {
    pub fn new(base_dir: impl Into<PathBuf>, executor: Arc<dyn CloneExecutor>) -> Self {
        Self {
            base_dir: base_dir.into(),
            executor,
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Clone `repo_url` unless its directory is already present.
    pub async fn materialize(&self, repo_url: &str) -> CloneOutcome {
        let Some(name) = dir_name_from_url(repo_url) else {
            return CloneOutcome::failed(
                repo_url,
                CloneStatus::Error,
                format!("Cannot derive a directory name from {repo_url}"),
            );
        };
        let path = self.base_dir.join(name);

        if path.exists() {
            tracing::info!(path = %path.display(), "Repository already cloned, skipping");
            return CloneOutcome {
                repo_url: repo_url.to_string(),
                local_path: Some(path),
                success: true,
                status: CloneStatus::AlreadyExists,
                message: "Repository already exists locally".to_string(),
                head: None,
            };
        }

        if let Err(e) = self.ensure_base_dir().await {
            return CloneOutcome::failed(repo_url, CloneStatus::Error, e.to_string());
        }

        tracing::info!(repo_url = %repo_url, path = %path.display(), "Cloning repository");

        match self.executor.clone_repo(repo_url, &path).await {
            Ok(()) => {
                let head = git::describe_head(&path);
                tracing::info!(
                    path = %path.display(),
                    head = head.as_ref().map(|h| h.to_string()).unwrap_or_default(),
                    "Repository cloned"
                );
                CloneOutcome {
                    repo_url: repo_url.to_string(),
                    local_path: Some(path),
                    success: true,
                    status: CloneStatus::Success,
                    message: "Repository cloned successfully".to_string(),
                    head,
                }
            }
            Err(e) => {
                // A killed or failed git leaves a partial checkout whose config
                // may still hold credentials, and which would look cloned next run.
                remove_partial(&path).await;
                match e {
                    AppError::Timeout(msg) => {
                        tracing::error!(repo_url = %repo_url, error = %msg, "Clone timed out");
                        CloneOutcome::failed(repo_url, CloneStatus::Timeout, msg)
                    }
                    e => {
                        tracing::error!(repo_url = %repo_url, error = %e, "Clone failed");
                        CloneOutcome::failed(repo_url, CloneStatus::Error, e.to_string())
                    }
                }
            }
        }
    }

    async fn ensure_base_dir(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.base_dir).await.map_err(|e| {
            AppError::Workspace(format!(
                "Failed to create {}: {e}",
                self.base_dir.display()
            ))
        })
    }
}

async fn remove_partial(path: &Path) {
    if !path.exists() {
        return;
    }
    match tokio::fs::remove_dir_all(path).await {
        Ok(()) => tracing::debug!(path = %path.display(), "Removed partial clone"),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Failed to remove partial clone")
        }
    }
}

/// Last path segment of a repository URL without trailing `/` or `.git`.
pub fn dir_name_from_url(repo_url: &str) -> Option<&str> {
    let trimmed = repo_url.trim().trim_end_matches('/');
    let last = trimmed.rsplit('/').next()?;
    let name = last.strip_suffix(".git").unwrap_or(last);
    if name.is_empty() || name == "." || name == ".." || name.contains(':') {
        return None;
    }
    Some(name)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Stand-in executor that creates the target directory instead of
    /// talking to a remote.
    #[derive(Default)]
    pub(crate) struct FakeExecutor {
        pub calls: Mutex<Vec<String>>,
        pub fail_with: Option<fn() -> AppError>,
    }

    #[async_trait]
    impl CloneExecutor for FakeExecutor {
        async fn clone_repo(&self, remote: &str, target: &Path) -> Result<()> {
            self.calls.lock().unwrap().push(remote.to_string());
            std::fs::create_dir_all(target)?;
            match self.fail_with {
                Some(make) => Err(make()),
                None => Ok(()),
            }
        }
    }

    #[test]
    fn test_dir_name_from_url() {
        assert_eq!(dir_name_from_url("https://github.com/octo/widgets"), Some("widgets"));
        assert_eq!(dir_name_from_url("https://github.com/octo/widgets.git"), Some("widgets"));
        assert_eq!(dir_name_from_url("https://github.com/octo/widgets/"), Some("widgets"));
        assert_eq!(dir_name_from_url("https://github.com/octo/widgets.git/"), Some("widgets"));
        assert_eq!(dir_name_from_url(""), None);
        assert_eq!(dir_name_from_url("https://github.com/octo/.."), None);
    }

    #[tokio::test]
    async fn test_fresh_clone_succeeds() {
        let tmp = tempfile::tempdir().unwrap();
        let base = tmp.path().join("cloned_repos");
        let executor = Arc::new(FakeExecutor::default());
        let materializer = Materializer::new(&base, executor.clone());

        let outcome = materializer.materialize("https://github.com/octo/widgets").await;

        assert_eq!(outcome.status, CloneStatus::Success);
        assert!(outcome.success);
        assert_eq!(outcome.local_path, Some(base.join("widgets")));
        assert_eq!(executor.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_existing_directory_is_not_cloned() {
        let tmp = tempfile::tempdir().unwrap();
        let base = tmp.path().join("cloned_repos");
        std::fs::create_dir_all(base.join("widgets")).unwrap();
        let executor = Arc::new(FakeExecutor::default());
        let materializer = Materializer::new(&base, executor.clone());

        let outcome = materializer.materialize("https://github.com/octo/widgets.git").await;

        assert_eq!(outcome.status, CloneStatus::AlreadyExists);
        assert!(outcome.success);
        assert_eq!(outcome.local_path, Some(base.join("widgets")));
        assert!(executor.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_second_materialize_reports_already_exists() {
        let tmp = tempfile::tempdir().unwrap();
        let executor = Arc::new(FakeExecutor::default());
        let materializer = Materializer::new(tmp.path(), executor.clone());

        let first = materializer.materialize("https://github.com/octo/widgets").await;
        let second = materializer.materialize("https://github.com/octo/widgets").await;

        assert_eq!(first.status, CloneStatus::Success);
        assert_eq!(second.status, CloneStatus::AlreadyExists);
        assert_eq!(first.local_path, second.local_path);
        assert_eq!(executor.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_timeout_maps_to_timeout_status() {
        let tmp = tempfile::tempdir().unwrap();
        let executor = Arc::new(FakeExecutor {
            fail_with: Some(|| AppError::Timeout("Clone timed out after 300 seconds".into())),
            ..Default::default()
        });
        let materializer = Materializer::new(tmp.path(), executor);

        let outcome = materializer.materialize("https://github.com/octo/widgets").await;

        assert_eq!(outcome.status, CloneStatus::Timeout);
        assert!(!outcome.success);
        assert!(outcome.message.contains("timed out"));
        assert!(outcome.local_path.is_none());
        assert!(!tmp.path().join("widgets").exists());
    }

    #[tokio::test]
    async fn test_failed_clone_is_retried_next_run() {
        let tmp = tempfile::tempdir().unwrap();
        let failing = Arc::new(FakeExecutor {
            fail_with: Some(|| AppError::Git("fatal: early EOF".into())),
            ..Default::default()
        });
        let first = Materializer::new(tmp.path(), failing)
            .materialize("https://github.com/octo/widgets")
            .await;

        let executor = Arc::new(FakeExecutor::default());
        let second = Materializer::new(tmp.path(), executor.clone())
            .materialize("https://github.com/octo/widgets")
            .await;

        assert_eq!(first.status, CloneStatus::Error);
        assert_eq!(second.status, CloneStatus::Success);
        assert_eq!(executor.calls.lock().unwrap().len(), 1);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_killed_git_leaves_no_credentials_behind() {
        use crate::workspace::git::GitCli;
        use std::os::unix::fs::PermissionsExt;
        use std::time::Duration;

        let tmp = tempfile::tempdir().unwrap();
        let script = tmp.path().join("fake-git");
        // Writes a config carrying the authenticated URL, then hangs like a stalled fetch.
        std::fs::write(
            &script,
            "#!/bin/sh\nmkdir -p \"$4/.git\"\nprintf '[remote \"origin\"]\\n\\turl = %s\\n' \"$3\" > \"$4/.git/config\"\nsleep 5\n",
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let base = tmp.path().join("cloned_repos");
        let cli = GitCli::new(&script, Duration::from_millis(500), Some("ghp_secret".to_string()));
        let materializer = Materializer::new(&base, Arc::new(cli));

        let first = materializer.materialize("https://github.com/octo/widgets").await;
        assert_eq!(first.status, CloneStatus::Timeout);
        assert!(!base.join("widgets").exists());

        let second = materializer.materialize("https://github.com/octo/widgets").await;
        assert_ne!(second.status, CloneStatus::AlreadyExists);
    }

    #[tokio::test]
    async fn test_git_failure_maps_to_error() {
        let tmp = tempfile::tempdir().unwrap();
        let executor = Arc::new(FakeExecutor {
            fail_with: Some(|| AppError::Git("fatal: repository not found".into())),
            ..Default::default()
        });
        let materializer = Materializer::new(tmp.path(), executor);

        let outcome = materializer.materialize("https://github.com/octo/widgets").await;

        assert_eq!(outcome.status, CloneStatus::Error);
        assert!(outcome.message.contains("repository not found"));
    }

    #[tokio::test]
    async fn test_unnameable_url_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let executor = Arc::new(FakeExecutor::default());
        let materializer = Materializer::new(tmp.path(), executor.clone());

        let outcome = materializer.materialize("   ").await;

        assert_eq!(outcome.status, CloneStatus::Error);
        assert!(executor.calls.lock().unwrap().is_empty());
    }
}
