use regex::Regex;

use crate::error::{AppError, Result};

/// Repository identity pulled out of an invitation email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedInvitation {
    pub repo_full_name: String,
    pub repo_url: String,
    pub invitation_url: String,
}

/// Case-insensitive invitation heuristic shared by subjects and bodies.
pub fn looks_like_invitation(text: &str) -> bool {
    let lower = text.to_lowercase();
    lower.contains("invit") || lower.contains("collaborate")
}

/// Pattern matcher for GitHub invitation emails.
///
/// Both the "collaborate on the <owner>/<name> repository" phrase and an
/// `<host>/<owner>/<name>/invitations` link must be present; anything less
/// yields `None`.
pub struct InvitationExtractor {
    web_base: String,
    repo_phrase: Regex,
    invitation_link: Regex,
}

impl InvitationExtractor {
    pub fn new(web_base: &str) -> Result<Self> {
        let web_base = web_base.trim_end_matches('/').to_string();
        let host = regex::escape(&web_base);

        let repo_phrase = Regex::new(r"collaborate on the\s+([^/\s]+/[^\s]+)\s+repository")
            .map_err(|e| AppError::Internal(format!("Invalid repository pattern: {e}")))?;
        let invitation_link = Regex::new(&format!(r"{host}/([^/\s]+/[^/\s]+)/invitations"))
            .map_err(|e| AppError::Internal(format!("Invalid invitation pattern: {e}")))?;

        Ok(Self {
            web_base,
            repo_phrase,
            invitation_link,
        })
    }

    pub fn extract(&self, body: &str) -> Option<ExtractedInvitation> {
        let repo_full_name = self.repo_phrase.captures(body)?.get(1)?.as_str().to_string();
        let invitation_url = self.invitation_link.find(body)?.as_str().to_string();

        Some(ExtractedInvitation {
            repo_url: format!("{}/{repo_full_name}", self.web_base),
            repo_full_name,
            invitation_url,
        })
    }
}

/// Split a GitHub repository URL into `(owner, name)`.
///
/// Accepts an optional `.git` suffix and trailing slash. The host must match
/// `web_base`.
pub fn parse_repo_url(web_base: &str, url: &str) -> Option<(String, String)> {
    let host = regex::escape(web_base.trim_end_matches('/'));
    let host = host.replacen("https", "https?", 1);
    let pattern = format!(r"^{host}/([A-Za-z0-9_.-]+)/([A-Za-z0-9_.-]+?)(?:\.git)?/?$");
    let re = Regex::new(&pattern).ok()?;
    let caps = re.captures(url.trim())?;
    Some((caps[1].to_string(), caps[2].to_string()))
}
