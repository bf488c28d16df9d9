use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use octocrab::Octocrab;
use serde::Serialize;

use crate::config::GitHubConfig;
use crate::error::{AppError, Result};
use crate::platform::types::*;
use crate::platform::Platform;

use super::mapper;

/// GitHub REST client for the authenticated user's invitations.
pub struct GitHubPlatform {
    client: Octocrab,
    request_timeout: Duration,
}

#[derive(Serialize)]
struct PageParams {
    per_page: u8,
}

impl PageParams {
    fn for_limit(limit: usize) -> Self {
        Self {
            per_page: limit.clamp(1, 100) as u8,
        }
    }
}

impl GitHubPlatform {
    /// Build a client. Without a token, requests are anonymous (enough for
    /// public repository lookups).
    pub fn new(config: &GitHubConfig, request_timeout: Duration) -> Result<Self> {
        let mut builder = Octocrab::builder()
            .base_uri(config.api_base.as_str())
            .map_err(|e| AppError::Config(format!("Invalid github.api_base: {e}")))?;

        if let Some(token) = config.token.as_deref().filter(|t| !t.is_empty()) {
            builder = builder.personal_token(token.to_string());
        }

        let client = builder
            .build()
            .map_err(|e| AppError::GitHubApi(format!("Failed to build octocrab client: {e}")))?;

        Ok(Self {
            client,
            request_timeout,
        })
    }

    async fn bounded<T, F>(&self, what: &str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        tokio::time::timeout(self.request_timeout, fut)
            .await
            .map_err(|_| {
                AppError::Timeout(format!(
                    "{what} exceeded {}s request timeout",
                    self.request_timeout.as_secs()
                ))
            })?
    }

    fn parse_repo(repo_full_name: &str) -> Result<(&str, &str)> {
        let parts: Vec<&str> = repo_full_name.splitn(2, '/').collect();
        if parts.len() != 2 {
            return Err(AppError::GitHubApi(format!(
                "Invalid repo name: {repo_full_name}"
            )));
        }
        Ok((parts[0], parts[1]))
    }
}

#[async_trait]
impl Platform for GitHubPlatform {
    async fn list_notifications(&self, limit: usize) -> Result<Vec<Notification>> {
        let params = PageParams::for_limit(limit);
        let raw: Vec<mapper::RawNotification> = self
            .bounded("Listing notifications", async {
                self.client
                    .get("/notifications", Some(&params))
                    .await
                    .map_err(|e| AppError::GitHubApi(format!("Failed to list notifications: {e}")))
            })
            .await?;

        Ok(raw
            .into_iter()
            .take(limit)
            .map(mapper::map_notification)
            .collect())
    }

    async fn list_repository_invitations(&self, limit: usize) -> Result<Vec<RepositoryInvitation>> {
        let params = PageParams::for_limit(limit);
        let raw: Vec<mapper::RawInvitation> = self
            .bounded("Listing repository invitations", async {
                self.client
                    .get("/user/repository_invitations", Some(&params))
                    .await
                    .map_err(|e| {
                        AppError::GitHubApi(format!("Failed to list repository invitations: {e}"))
                    })
            })
            .await?;

        Ok(raw
            .into_iter()
            .take(limit)
            .map(mapper::map_invitation)
            .collect())
    }

    async fn accept_repository_invitation(&self, invitation_id: u64) -> Result<()> {
        let url = format!("/user/repository_invitations/{invitation_id}");

        self.bounded("Accepting invitation", async {
            let response = self.client._patch(url.as_str(), None::<&()>).await?;
            let status = response.status();

            if status.as_u16() == 204 {
                return Ok(());
            }

            let body = self
                .client
                .body_to_string(response)
                .await
                .unwrap_or_default();
            Err(AppError::GitHubApi(format!(
                "Failed to accept invitation {invitation_id}: {status} - {body}"
            )))
        })
        .await
    }

    async fn get_repository(&self, repo_full_name: &str) -> Result<Option<RepoInfo>> {
        let (owner, repo) = Self::parse_repo(repo_full_name)?;
        let url = format!("/repos/{owner}/{repo}");

        let result: std::result::Result<mapper::RawRepository, octocrab::Error> = self
            .bounded("Fetching repository", async {
                Ok(self.client.get(&url, None::<&()>).await)
            })
            .await?;

        match result {
            Ok(raw) => Ok(Some(mapper::map_repository(raw))),
            Err(octocrab::Error::GitHub { source, .. }) if source.status_code.as_u16() == 404 => {
                Ok(None)
            }
            Err(e) => Err(AppError::GitHubApi(format!(
                "Failed to fetch {repo_full_name}: {e}"
            ))),
        }
    }
}
