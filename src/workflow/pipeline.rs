use std::sync::Arc;
use std::time::Duration;

use crate::accept::api::ApiAcceptor;
use crate::accept::browser::BrowserAcceptor;
use crate::accept::{self, AcceptanceSink, NoAcceptance};
use crate::advisor::{self, Advisor};
use crate::config::{AppConfig, Mode};
use crate::discovery::github::{InvitationSource, NotificationSource, PublicRepoSource};
use crate::discovery::gmail::GmailSource;
use crate::discovery::DiscoverySource;
use crate::error::{AppError, Result};
use crate::platform::github::GitHubPlatform;
use crate::platform::Platform;
use crate::workflow::types::RunLedger;
use crate::workspace::git::GitCli;
use crate::workspace::Materializer;

/// Discovery, acceptance and materialization wired together for one mode.
pub struct Pipeline {
    source: Box<dyn DiscoverySource>,
    sink: Box<dyn AcceptanceSink>,
    advisor: Option<Box<dyn Advisor>>,
    materializer: Materializer,
    max_items: usize,
}

impl Pipeline {
    pub fn new(
        source: Box<dyn DiscoverySource>,
        sink: Box<dyn AcceptanceSink>,
        advisor: Option<Box<dyn Advisor>>,
        materializer: Materializer,
        max_items: usize,
    ) -> Self {
        Self {
            source,
            sink,
            advisor,
            materializer,
            max_items,
        }
    }

    /// Build the components the configured mode calls for.
    pub async fn from_config(config: &AppConfig) -> Result<Self> {
        let timeout = config.request_timeout();
        let mode = config.pipeline.mode;

        let (source, sink): (Box<dyn DiscoverySource>, Box<dyn AcceptanceSink>) = match mode {
            Mode::Gmail => (
                Box::new(GmailSource::new(&config.gmail, &config.github.web_base, timeout)?),
                Box::new(BrowserAcceptor::new(&config.browser, &config.github, timeout)?),
            ),
            Mode::Invitations => {
                let platform = github_platform(config, timeout)?;
                (
                    Box::new(InvitationSource::new(platform.clone())),
                    Box::new(ApiAcceptor::new(platform)),
                )
            }
            Mode::Notifications => {
                let platform = github_platform(config, timeout)?;
                (
                    Box::new(NotificationSource::new(platform)),
                    Box::new(BrowserAcceptor::new(&config.browser, &config.github, timeout)?),
                )
            }
            Mode::Public => {
                let repo_url = config
                    .github
                    .public_repo_url
                    .as_deref()
                    .ok_or_else(|| AppError::Config("github.public_repo_url is required".into()))?;
                let platform = github_platform(config, timeout)?;
                (
                    Box::new(PublicRepoSource::new(platform, &config.github.web_base, repo_url)),
                    Box::new(NoAcceptance),
                )
            }
        };

        let executor = GitCli::new(
            config.workspace.git_program.clone(),
            Duration::from_secs(config.workspace.clone_timeout_secs),
            config.github_token().map(str::to_string),
        );
        let materializer = Materializer::new(config.workspace.base_dir.clone(), Arc::new(executor));

        let advisor = advisor::connect(&config.llm, timeout).await;

        tracing::info!(
            mode = %mode,
            source = source.name(),
            sink = sink.name(),
            advisor = advisor.as_ref().map(|a| a.name()).unwrap_or("none"),
            "Pipeline ready"
        );

        Ok(Self::new(
            source,
            sink,
            advisor,
            materializer,
            config.pipeline.max_items,
        ))
    }

    /// Run all stages in order, recording into `ledger` as results arrive.
    ///
    /// Per-item failures are recorded and never abort the run. A discovery
    /// failure ends the run early with one error and no candidates.
    pub async fn run(&self, ledger: &mut RunLedger) -> Result<()> {
        tracing::info!(source = self.source.name(), max_items = self.max_items, "Discovering invitations");

        let discovery = match self.source.discover(self.max_items).await {
            Ok(discovery) => discovery,
            Err(e) => {
                tracing::error!(source = self.source.name(), error = %e, "Discovery failed");
                ledger.record_error(format!("{} discovery failed: {e}", self.source.name()));
                return Ok(());
            }
        };
        ledger.items_checked = discovery.checked;
        ledger.candidates = discovery.candidates;

        tracing::info!(
            checked = ledger.items_checked,
            candidates = ledger.candidates.len(),
            "Discovery complete"
        );
        if ledger.candidates.is_empty() {
            return Ok(());
        }

        accept::accept_all(
            self.sink.as_ref(),
            self.advisor.as_deref(),
            &ledger.candidates,
            &mut ledger.acceptances,
        )
        .await;

        for acceptance in ledger.acceptances.iter().filter(|a| a.accepted) {
            let outcome = self.materializer.materialize(&acceptance.repo_url).await;
            ledger.clones.push(outcome);
        }

        tracing::info!(
            accepted = ledger.acceptances.iter().filter(|a| a.accepted).count(),
            cloned = ledger.clones.iter().filter(|c| c.success).count(),
            base_dir = %self.materializer.base_dir().display(),
            "Pipeline finished"
        );
        Ok(())
    }
}

fn github_platform(config: &AppConfig, timeout: Duration) -> Result<Arc<dyn Platform>> {
    Ok(Arc::new(GitHubPlatform::new(&config.github, timeout)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::github::tests::{invitation, FakePlatform};
    use crate::discovery::Discovery;
    use crate::workflow::report;
    use crate::workflow::types::{AcceptanceStatus, CloneStatus};
    use crate::workspace::tests::FakeExecutor;
    use async_trait::async_trait;

    struct BrokenSource;

    #[async_trait]
    impl DiscoverySource for BrokenSource {
        fn name(&self) -> &str {
            "broken"
        }

        async fn discover(&self, _max_items: usize) -> Result<Discovery> {
            Err(AppError::Gmail("401 Unauthorized".to_string()))
        }
    }

    fn pipeline_with(
        platform: Arc<FakePlatform>,
        executor: Arc<FakeExecutor>,
        base: &std::path::Path,
    ) -> Pipeline {
        Pipeline::new(
            Box::new(InvitationSource::new(platform.clone())),
            Box::new(ApiAcceptor::new(platform)),
            None,
            Materializer::new(base, executor),
            10,
        )
    }

    #[tokio::test]
    async fn test_invitation_is_accepted_and_cloned() {
        let tmp = tempfile::tempdir().unwrap();
        let base = tmp.path().join("cloned_repos");
        let platform = Arc::new(FakePlatform {
            invitations: vec![invitation(7, "octo/widgets")],
            accept_status_ok: true,
            ..Default::default()
        });
        let executor = Arc::new(FakeExecutor::default());
        let pipeline = pipeline_with(platform.clone(), executor.clone(), &base);

        let mut ledger = RunLedger::new();
        pipeline.run(&mut ledger).await.unwrap();
        let report = report::synthesize(&ledger);

        assert_eq!(report.valid_invitations, 1);
        assert_eq!(report.accepted, 1);
        assert_eq!(report.cloned, 1);
        assert!(report.errors.is_empty());
        assert_eq!(*platform.accepted.lock().unwrap(), vec![7]);
        assert!(base.join("widgets").is_dir());
        assert_eq!(
            report.repositories[0]["local_path"],
            base.join("widgets").display().to_string()
        );
    }

    #[tokio::test]
    async fn test_clone_timeout_still_reaches_report() {
        let tmp = tempfile::tempdir().unwrap();
        let platform = Arc::new(FakePlatform {
            invitations: vec![invitation(7, "octo/widgets"), invitation(8, "octo/gadgets")],
            accept_status_ok: true,
            ..Default::default()
        });
        let executor = Arc::new(FakeExecutor {
            fail_with: Some(|| AppError::Timeout("Clone timed out after 300 seconds".into())),
            ..Default::default()
        });
        let pipeline = pipeline_with(platform, executor.clone(), tmp.path());

        let mut ledger = RunLedger::new();
        pipeline.run(&mut ledger).await.unwrap();

        assert_eq!(ledger.clones.len(), 2);
        assert!(ledger.clones.iter().all(|c| c.status == CloneStatus::Timeout));
        assert_eq!(executor.calls.lock().unwrap().len(), 2);

        let report = report::synthesize(&ledger);
        assert_eq!(report.accepted, 2);
        assert_eq!(report.cloned, 0);
        assert_eq!(report.errors.len(), 2);
        assert!(report.errors.iter().all(|e| e.contains("timed out")));
    }

    #[tokio::test]
    async fn test_failed_acceptance_is_not_cloned() {
        let tmp = tempfile::tempdir().unwrap();
        let platform = Arc::new(FakePlatform {
            invitations: vec![invitation(7, "octo/widgets")],
            ..Default::default()
        });
        let executor = Arc::new(FakeExecutor::default());
        let pipeline = pipeline_with(platform, executor.clone(), tmp.path());

        let mut ledger = RunLedger::new();
        pipeline.run(&mut ledger).await.unwrap();

        assert_eq!(ledger.acceptances[0].status, AcceptanceStatus::Error);
        assert!(ledger.clones.is_empty());
        assert!(executor.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_no_invitations_gives_empty_report() {
        let tmp = tempfile::tempdir().unwrap();
        let executor = Arc::new(FakeExecutor::default());
        let pipeline = pipeline_with(Arc::new(FakePlatform::default()), executor, tmp.path());

        let mut ledger = RunLedger::new();
        pipeline.run(&mut ledger).await.unwrap();
        let report = report::synthesize(&ledger);

        assert_eq!(
            (report.emails_checked, report.valid_invitations, report.accepted, report.cloned),
            (0, 0, 0, 0)
        );
        assert!(report.errors.is_empty());
    }

    #[tokio::test]
    async fn test_discovery_failure_is_one_error() {
        let tmp = tempfile::tempdir().unwrap();
        let pipeline = Pipeline::new(
            Box::new(BrokenSource),
            Box::new(NoAcceptance),
            None,
            Materializer::new(tmp.path(), Arc::new(FakeExecutor::default())),
            10,
        );

        let mut ledger = RunLedger::new();
        pipeline.run(&mut ledger).await.unwrap();
        let report = report::synthesize(&ledger);

        assert_eq!(report.valid_invitations, 0);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].contains("401"));
    }

    #[tokio::test]
    async fn test_public_repo_is_cloned_without_acceptance() {
        let tmp = tempfile::tempdir().unwrap();
        let platform = Arc::new(FakePlatform {
            repo: Some(crate::platform::types::RepoInfo {
                full_name: "octo/widgets".to_string(),
                html_url: "https://github.com/octo/widgets".to_string(),
                clone_url: "https://github.com/octo/widgets.git".to_string(),
                private: false,
                default_branch: "main".to_string(),
            }),
            ..Default::default()
        });
        let executor = Arc::new(FakeExecutor::default());
        let pipeline = Pipeline::new(
            Box::new(PublicRepoSource::new(
                platform.clone(),
                "https://github.com",
                "https://github.com/octo/widgets",
            )),
            Box::new(NoAcceptance),
            None,
            Materializer::new(tmp.path(), executor.clone()),
            10,
        );

        let mut ledger = RunLedger::new();
        pipeline.run(&mut ledger).await.unwrap();
        let report = report::synthesize(&ledger);

        assert_eq!((report.accepted, report.cloned), (1, 1));
        assert!(platform.accepted.lock().unwrap().is_empty());
        assert!(tmp.path().join("widgets").is_dir());
    }
}
