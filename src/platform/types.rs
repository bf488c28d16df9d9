use serde::{Deserialize, Serialize};

/// An entry of the authenticated user's notification feed.
#[derive(Debug, Clone)]
pub struct Notification {
    pub id: String,
    /// `subject.type`, e.g. `RepositoryInvitation`.
    pub subject_type: String,
    pub subject_title: String,
    pub repo_full_name: String,
    pub repo_html_url: String,
    pub updated_at: String,
}

/// A pending collaboration invitation for the authenticated user.
#[derive(Debug, Clone)]
pub struct RepositoryInvitation {
    pub id: u64,
    pub repo_full_name: String,
    pub repo_html_url: String,
    pub clone_url: Option<String>,
    pub inviter: String,
    pub permissions: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoInfo {
    pub full_name: String,
    pub html_url: String,
    pub clone_url: String,
    pub private: bool,
    pub default_branch: String,
}
