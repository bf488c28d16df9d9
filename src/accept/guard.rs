use crate::workflow::types::{AcceptanceTarget, InvitationCandidate};

/// Substrings that only show up in templated or made-up invitation data.
const PLACEHOLDER_TOKENS: &[&str] = &["owner/repo", "example", "org1", "repo1"];

/// Invitation page URLs never contain the REST API path.
const API_PATH_TOKEN: &str = "repository_invitations";

/// First placeholder token found in `text`, if any. Case-insensitive.
fn placeholder_token(text: &str) -> Option<&'static str> {
    let lower = text.to_lowercase();
    PLACEHOLDER_TOKENS
        .iter()
        .copied()
        .find(|token| lower.contains(token))
}

/// Why a candidate must not reach an acceptance sink, or `None` if it may.
pub fn rejection_reason(candidate: &InvitationCandidate) -> Option<String> {
    match &candidate.acceptance {
        AcceptanceTarget::Url(url) => {
            if url.trim().is_empty() {
                return Some("empty invitation URL".to_string());
            }
            if let Some(token) = placeholder_token(url) {
                return Some(format!("invitation URL contains placeholder {token:?}: {url}"));
            }
            if url.to_lowercase().contains(API_PATH_TOKEN) {
                return Some(format!("invitation URL is an API path, not a page: {url}"));
            }
        }
        AcceptanceTarget::Id(0) => {
            return Some("invitation ID 0 is not a real invitation".to_string());
        }
        AcceptanceTarget::Id(_) | AcceptanceTarget::NotRequired => {}
    }
    None
}

/// Whether `repo_url` is the unedited `https://<host>/owner/repo` template.
pub fn is_template_repo_url(repo_url: &str) -> bool {
    let Ok(url) = url::Url::parse(repo_url.trim()) else {
        return false;
    };
    let path = url.path().trim_end_matches('/');
    let path = path.strip_suffix(".git").unwrap_or(path);
    path.eq_ignore_ascii_case("/owner/repo")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(repo: &str, acceptance: AcceptanceTarget) -> InvitationCandidate {
        InvitationCandidate {
            sender: "noreply@github.com".to_string(),
            repo_full_name: repo.to_string(),
            repo_url: format!("https://github.com/{repo}"),
            acceptance,
            received_at: String::new(),
            source_id: "m1".to_string(),
        }
    }

    fn url(u: &str) -> AcceptanceTarget {
        AcceptanceTarget::Url(u.to_string())
    }

    #[test]
    fn test_real_invitation_passes() {
        let c = candidate("octo/widgets", url("https://github.com/octo/widgets/invitations"));
        assert_eq!(rejection_reason(&c), None);
        assert_eq!(rejection_reason(&candidate("octo/widgets", AcceptanceTarget::Id(42))), None);
    }

    #[test]
    fn test_placeholder_urls_are_rejected() {
        for bad in [
            "https://github.com/owner/repo/invitations",
            "https://github.com/example/widgets/invitations",
            "https://github.com/org1/widgets/invitations",
            "https://github.com/octo/repo1/invitations",
            "https://api.github.com/user/repository_invitations/12",
            "https://github.com/OWNER/REPO/invitations",
            "",
        ] {
            let c = candidate("octo/widgets", url(bad));
            assert!(rejection_reason(&c).is_some(), "expected rejection for {bad:?}");
        }
    }

    #[test]
    fn test_zero_id_is_rejected() {
        let c = candidate("octo/widgets", AcceptanceTarget::Id(0));
        assert!(rejection_reason(&c).is_some());
    }

    #[test]
    fn test_repo_name_alone_never_rejects() {
        let c = candidate("acme/examples", AcceptanceTarget::Id(4242));
        assert_eq!(rejection_reason(&c), None);

        let c = candidate("rust-lang/rust-by-example", AcceptanceTarget::NotRequired);
        assert_eq!(rejection_reason(&c), None);
    }

    #[test]
    fn test_template_repo_url() {
        assert!(is_template_repo_url("https://github.com/owner/repo"));
        assert!(is_template_repo_url("https://github.com/owner/repo.git/"));
        assert!(is_template_repo_url("https://ghe.internal/OWNER/REPO"));
        assert!(!is_template_repo_url("https://github.com/rust-lang/rust-by-example"));
        assert!(!is_template_repo_url("https://github.com/owner/repository"));
        assert!(!is_template_repo_url("not a url"));
    }

    #[test]
    fn test_placeholder_token_lookup() {
        assert_eq!(placeholder_token("https://github.com/owner/repo"), Some("owner/repo"));
        assert_eq!(placeholder_token("https://github.com/octo/widgets"), None);
    }
}
