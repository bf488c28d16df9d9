use crate::workflow::types::InvitationCandidate;

pub const SYSTEM_PROMPT: &str = r#"You review GitHub repository invitations before they are accepted automatically.

You receive one invitation that was extracted from an inbox or notification feed.
Decide whether it is a genuine collaboration invitation that should be accepted.

## Guidelines
- Skip invitations whose repository or link looks templated, made up, or inconsistent.
- Skip invitations whose sender is clearly not GitHub.
- Otherwise accept. Do not invent repositories or links.

## Output
Reply with a single JSON object and nothing else:
{"action": "accept" | "skip", "reason": "<one short sentence>"}"#;

pub fn review_request(candidate: &InvitationCandidate) -> String {
    format!(
        r#"## Invitation
- Sender: {sender}
- Repository: {repo}
- Repository URL: {repo_url}
- Accept via: {target}
- Received: {received}

Should this invitation be accepted?"#,
        sender = if candidate.sender.is_empty() {
            "(unknown)"
        } else {
            candidate.sender.as_str()
        },
        repo = candidate.repo_full_name,
        repo_url = candidate.repo_url,
        target = candidate.acceptance,
        received = if candidate.received_at.is_empty() {
            "(unknown)"
        } else {
            candidate.received_at.as_str()
        },
    )
}
