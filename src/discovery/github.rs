use std::sync::Arc;

use async_trait::async_trait;

use crate::discovery::extract::parse_repo_url;
use crate::discovery::{Discovery, DiscoverySource};
use crate::error::{AppError, Result};
use crate::platform::Platform;
use crate::workflow::types::{AcceptanceTarget, InvitationCandidate};

const REPOSITORY_INVITATION: &str = "RepositoryInvitation";

/// Pending invitations from `/user/repository_invitations`, accepted by ID.
pub struct InvitationSource {
    platform: Arc<dyn Platform>,
}

impl InvitationSource {
    pub fn new(platform: Arc<dyn Platform>) -> Self {
        Self { platform }
    }
}

#[async_trait]
impl DiscoverySource for InvitationSource {
    fn name(&self) -> &str {
        "invitations"
    }

    async fn discover(&self, max_items: usize) -> Result<Discovery> {
        let invitations = self.platform.list_repository_invitations(max_items).await?;
        let mut discovery = Discovery::new();
        discovery.checked = invitations.len();

        for inv in invitations {
            tracing::info!(
                repo = %inv.repo_full_name,
                invitation_id = inv.id,
                inviter = %inv.inviter,
                permissions = %inv.permissions,
                "Found pending invitation"
            );
            discovery.push(InvitationCandidate {
                sender: inv.inviter,
                repo_full_name: inv.repo_full_name,
                repo_url: inv.clone_url.unwrap_or(inv.repo_html_url),
                acceptance: AcceptanceTarget::Id(inv.id),
                received_at: inv.created_at,
                source_id: inv.id.to_string(),
            });
        }

        Ok(discovery)
    }
}

/// Notification feed entries tagged `RepositoryInvitation`, accepted through
/// the repository's invitation page.
pub struct NotificationSource {
    platform: Arc<dyn Platform>,
}

impl NotificationSource {
    pub fn new(platform: Arc<dyn Platform>) -> Self {
        Self { platform }
    }
}

#[async_trait]
impl DiscoverySource for NotificationSource {
    fn name(&self) -> &str {
        "notifications"
    }

    async fn discover(&self, max_items: usize) -> Result<Discovery> {
        let notifications = self.platform.list_notifications(max_items).await?;
        let mut discovery = Discovery::new();
        discovery.checked = notifications.len();

        for n in notifications {
            if n.subject_type != REPOSITORY_INVITATION {
                continue;
            }
            tracing::info!(
                repo = %n.repo_full_name,
                notification_id = %n.id,
                title = %n.subject_title,
                "Found invitation notification"
            );

            let repo_url = n.repo_html_url.trim_end_matches('/').to_string();
            discovery.push(InvitationCandidate {
                sender: "notifications@github.com".to_string(),
                repo_full_name: n.repo_full_name,
                acceptance: AcceptanceTarget::Url(format!("{repo_url}/invitations")),
                repo_url,
                received_at: n.updated_at,
                source_id: n.id,
            });
        }

        Ok(discovery)
    }
}

/// A single configured public repository. Needs no acceptance.
pub struct PublicRepoSource {
    platform: Arc<dyn Platform>,
    web_base: String,
    repo_url: String,
}

impl PublicRepoSource {
    pub fn new(platform: Arc<dyn Platform>, web_base: &str, repo_url: &str) -> Self {
        Self {
            platform,
            web_base: web_base.trim_end_matches('/').to_string(),
            repo_url: repo_url.trim().to_string(),
        }
    }
}

#[async_trait]
impl DiscoverySource for PublicRepoSource {
    fn name(&self) -> &str {
        "public"
    }

    async fn discover(&self, _max_items: usize) -> Result<Discovery> {
        let (owner, name) = parse_repo_url(&self.web_base, &self.repo_url).ok_or_else(|| {
            AppError::GitHubApi(format!(
                "Invalid GitHub URL format: {}. Expected: {}/owner/repo",
                self.repo_url, self.web_base
            ))
        })?;
        let full_name = format!("{owner}/{name}");

        let repo_url = match self.platform.get_repository(&full_name).await {
            Ok(Some(info)) if info.private => {
                return Err(AppError::GitHubApi(format!(
                    "Repository {full_name} is private; use an invitation mode instead"
                )));
            }
            Ok(Some(info)) => {
                tracing::info!(
                    repo = %full_name,
                    default_branch = %info.default_branch,
                    "Public repository verified"
                );
                info.clone_url
            }
            Ok(None) => {
                return Err(AppError::GitHubApi(format!(
                    "Repository {full_name} not found on GitHub"
                )));
            }
            Err(e) => {
                // Existence could not be checked; the URL pattern alone decides.
                tracing::warn!(repo = %full_name, error = %e, "Could not verify repository, proceeding");
                format!("{}/{full_name}", self.web_base)
            }
        };

        let mut discovery = Discovery::new();
        discovery.checked = 1;
        discovery.push(InvitationCandidate {
            sender: owner,
            repo_full_name: full_name.clone(),
            repo_url,
            acceptance: AcceptanceTarget::NotRequired,
            received_at: chrono::Utc::now().to_rfc3339(),
            source_id: full_name,
        });

        Ok(discovery)
    }
}
