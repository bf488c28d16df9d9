pub mod github;
pub mod types;

use async_trait::async_trait;

use crate::error::Result;
use types::*;

#[async_trait]
pub trait Platform: Send + Sync {
    /// List up to `limit` notifications, newest first.
    async fn list_notifications(&self, limit: usize) -> Result<Vec<Notification>>;

    /// List up to `limit` pending repository invitations.
    async fn list_repository_invitations(&self, limit: usize) -> Result<Vec<RepositoryInvitation>>;

    /// Accept a pending invitation. Succeeds only on `204 No Content`.
    async fn accept_repository_invitation(&self, invitation_id: u64) -> Result<()>;

    /// Fetch repository metadata. `None` when the repository does not exist
    /// or is not visible to the caller.
    async fn get_repository(&self, repo_full_name: &str) -> Result<Option<RepoInfo>>;
}
