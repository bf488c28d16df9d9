pub mod extract;
pub mod github;
pub mod gmail;

use std::collections::HashSet;

use async_trait::async_trait;

use crate::error::Result;
use crate::workflow::types::InvitationCandidate;

/// A place invitations can be found in.
#[async_trait]
pub trait DiscoverySource: Send + Sync {
    /// Short name used in logs and error records.
    fn name(&self) -> &str;

    /// Inspect at most `max_items` items and return the ones that look like
    /// invitations. Any error aborts the whole stage.
    async fn discover(&self, max_items: usize) -> Result<Discovery>;
}

/// Result of one discovery pass.
#[derive(Debug, Default)]
pub struct Discovery {
    /// Items inspected, qualifying or not.
    pub checked: usize,
    pub candidates: Vec<InvitationCandidate>,
    seen: HashSet<String>,
}

impl Discovery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a candidate unless its source ID was already seen or its repo name
    /// is not a plain `owner/name`. Returns whether it was kept.
    pub fn push(&mut self, candidate: InvitationCandidate) -> bool {
        if !is_valid_full_name(&candidate.repo_full_name) {
            tracing::debug!(
                repo = %candidate.repo_full_name,
                source_id = %candidate.source_id,
                "Dropping candidate with malformed repository name"
            );
            return false;
        }
        if !self.seen.insert(candidate.source_id.clone()) {
            tracing::debug!(source_id = %candidate.source_id, "Dropping duplicate candidate");
            return false;
        }
        self.candidates.push(candidate);
        true
    }
}

/// `owner/name` with no whitespace and exactly one slash.
pub fn is_valid_full_name(name: &str) -> bool {
    match name.split_once('/') {
        Some((owner, repo)) => {
            !owner.is_empty()
                && !repo.is_empty()
                && !repo.contains('/')
                && !name.chars().any(char::is_whitespace)
        }
        None => false,
    }
}
