use serde::Deserialize;

use crate::platform::types;

// Raw REST payloads. Only the fields we read are declared.

#[derive(Debug, Deserialize)]
pub struct RawNotification {
    pub id: String,
    pub subject: RawSubject,
    pub repository: RawRepository,
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RawSubject {
    #[serde(default)]
    pub title: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Deserialize)]
pub struct RawRepository {
    pub full_name: String,
    pub html_url: String,
    #[serde(default)]
    pub clone_url: Option<String>,
    #[serde(default)]
    pub private: bool,
    #[serde(default)]
    pub default_branch: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RawInvitation {
    pub id: u64,
    pub repository: RawRepository,
    #[serde(default)]
    pub inviter: Option<RawUser>,
    #[serde(default)]
    pub permissions: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RawUser {
    pub login: String,
}

pub fn map_notification(raw: RawNotification) -> types::Notification {
    types::Notification {
        id: raw.id,
        subject_type: raw.subject.kind,
        subject_title: raw.subject.title,
        repo_full_name: raw.repository.full_name,
        repo_html_url: raw.repository.html_url,
        updated_at: raw.updated_at.unwrap_or_default(),
    }
}

pub fn map_invitation(raw: RawInvitation) -> types::RepositoryInvitation {
    types::RepositoryInvitation {
        id: raw.id,
        repo_full_name: raw.repository.full_name,
        repo_html_url: raw.repository.html_url,
        clone_url: raw.repository.clone_url,
        inviter: raw.inviter.map(|u| u.login).unwrap_or_default(),
        permissions: raw.permissions.unwrap_or_default(),
        created_at: raw.created_at.unwrap_or_default(),
    }
}

pub fn map_repository(raw: RawRepository) -> types::RepoInfo {
    let clone_url = raw
        .clone_url
        .unwrap_or_else(|| format!("{}.git", raw.html_url));
    types::RepoInfo {
        full_name: raw.full_name,
        html_url: raw.html_url,
        clone_url,
        private: raw.private,
        default_branch: raw.default_branch.unwrap_or_else(|| "main".to_string()),
    }
}
