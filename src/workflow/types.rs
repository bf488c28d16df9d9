use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// How an invitation gets accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AcceptanceTarget {
    /// Web page with an "Accept invitation" button.
    Url(String),
    /// Pending-invitation ID for the REST API.
    Id(u64),
    /// Public repositories need no acceptance.
    NotRequired,
}

impl std::fmt::Display for AcceptanceTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AcceptanceTarget::Url(url) => f.write_str(url),
            AcceptanceTarget::Id(id) => write!(f, "invitation #{id}"),
            AcceptanceTarget::NotRequired => f.write_str("none"),
        }
    }
}

/// An unconfirmed invitation pulled out of an inbox or feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvitationCandidate {
    pub sender: String,
    /// `owner/name`
    pub repo_full_name: String,
    pub repo_url: String,
    pub acceptance: AcceptanceTarget,
    pub received_at: String,
    /// Message, notification, or invitation ID in the source system.
    pub source_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AcceptanceStatus {
    Accepted,
    Skipped,
    Error,
}

impl AcceptanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AcceptanceStatus::Accepted => "accepted",
            AcceptanceStatus::Skipped => "skipped",
            AcceptanceStatus::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptanceOutcome {
    pub repo_full_name: String,
    pub repo_url: String,
    pub accepted: bool,
    pub status: AcceptanceStatus,
    pub message: String,
}

impl AcceptanceOutcome {
    pub fn accepted(candidate: &InvitationCandidate, message: impl Into<String>) -> Self {
        Self::new(candidate, AcceptanceStatus::Accepted, message)
    }

    pub fn skipped(candidate: &InvitationCandidate, message: impl Into<String>) -> Self {
        Self::new(candidate, AcceptanceStatus::Skipped, message)
    }

    pub fn error(candidate: &InvitationCandidate, message: impl Into<String>) -> Self {
        Self::new(candidate, AcceptanceStatus::Error, message)
    }

    fn new(
        candidate: &InvitationCandidate,
        status: AcceptanceStatus,
        message: impl Into<String>,
    ) -> Self {
        Self {
            repo_full_name: candidate.repo_full_name.clone(),
            repo_url: candidate.repo_url.clone(),
            accepted: status == AcceptanceStatus::Accepted,
            status,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloneStatus {
    Success,
    AlreadyExists,
    Error,
    /// The git subprocess outlived its deadline and was killed.
    Timeout,
}

impl CloneStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CloneStatus::Success => "success",
            CloneStatus::AlreadyExists => "already_exists",
            CloneStatus::Error => "error",
            CloneStatus::Timeout => "timeout",
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, CloneStatus::Error | CloneStatus::Timeout)
    }
}

/// Checked-out branch and commit of a fresh clone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeadInfo {
    pub branch: Option<String>,
    pub commit: String,
}

impl std::fmt::Display for HeadInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.branch {
            Some(branch) => write!(f, "{branch}@{}", self.commit),
            None => f.write_str(&self.commit),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloneOutcome {
    pub repo_url: String,
    pub local_path: Option<PathBuf>,
    pub success: bool,
    pub status: CloneStatus,
    pub message: String,
    pub head: Option<HeadInfo>,
}

impl CloneOutcome {
    pub fn failed(repo_url: &str, status: CloneStatus, message: impl Into<String>) -> Self {
        Self {
            repo_url: repo_url.to_string(),
            local_path: None,
            success: false,
            status,
            message: message.into(),
            head: None,
        }
    }
}

/// Final summary of one run, persisted as JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowReport {
    pub emails_checked: u32,
    pub valid_invitations: u32,
    pub accepted: u32,
    pub cloned: u32,
    pub errors: Vec<String>,
    pub repositories: Vec<BTreeMap<String, String>>,
    pub timestamp: String,
}

/// Everything the stages produced so far. Survives an aborted run so a
/// partial report can still be written.
#[derive(Debug, Default)]
pub struct RunLedger {
    pub items_checked: usize,
    pub candidates: Vec<InvitationCandidate>,
    pub acceptances: Vec<AcceptanceOutcome>,
    pub clones: Vec<CloneOutcome>,
    pub errors: Vec<String>,
}

impl RunLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_error(&mut self, error: impl Into<String>) {
        self.errors.push(error.into());
    }
}
