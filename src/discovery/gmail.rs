use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde::Deserialize;

use crate::config::GmailConfig;
use crate::discovery::extract::{looks_like_invitation, InvitationExtractor};
use crate::discovery::{Discovery, DiscoverySource};
use crate::error::{AppError, Result};
use crate::workflow::types::{AcceptanceTarget, InvitationCandidate};

/// Scans a Gmail mailbox for GitHub invitation emails.
pub struct GmailSource {
    client: Client,
    api_base: String,
    access_token: String,
    query: String,
    extractor: InvitationExtractor,
}

impl GmailSource {
    pub fn new(config: &GmailConfig, web_base: &str, request_timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(request_timeout).build()?;
        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            access_token: config.resolve_access_token()?,
            query: config.query.clone(),
            extractor: InvitationExtractor::new(web_base)?,
        })
    }

    async fn list_message_ids(&self, max_results: usize) -> Result<Vec<String>> {
        let url = format!(
            "{}/users/me/messages?q={}&maxResults={max_results}&includeSpamTrash=true",
            self.api_base,
            urlencoding::encode(&self.query)
        );
        let list: MessageList = self.get_json(&url).await?;
        Ok(list.messages.into_iter().map(|m| m.id).collect())
    }

    async fn get_message(&self, id: &str) -> Result<GmailMessage> {
        let url = format!(
            "{}/users/me/messages/{}?format=full",
            self.api_base,
            urlencoding::encode(id)
        );
        self.get_json(&url).await
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.access_token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Gmail(format!("API returned {status}: {body}")));
        }

        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl DiscoverySource for GmailSource {
    fn name(&self) -> &str {
        "gmail"
    }

    async fn discover(&self, max_items: usize) -> Result<Discovery> {
        let ids = self.list_message_ids(max_items).await?;
        let mut discovery = Discovery::new();

        for id in ids.into_iter().take(max_items) {
            let message = self.get_message(&id).await?;
            discovery.checked += 1;

            tracing::debug!(
                message_id = %message.id,
                subject = %message.header("Subject").unwrap_or_default(),
                "Scanned email"
            );

            if let Some(candidate) = candidate_from_message(&message, &self.extractor) {
                tracing::info!(repo = %candidate.repo_full_name, message_id = %id, "Found invitation email");
                discovery.push(candidate);
            }
        }

        Ok(discovery)
    }
}

/// Apply the invitation heuristic and extraction to one message.
///
/// Only the first MIME part (or the top-level body) is decoded.
pub fn candidate_from_message(
    message: &GmailMessage,
    extractor: &InvitationExtractor,
) -> Option<InvitationCandidate> {
    let subject = message.header("Subject").unwrap_or_default();
    let body = message.first_body_text()?;

    if !looks_like_invitation(subject) && !looks_like_invitation(&body) {
        return None;
    }

    let found = extractor.extract(&body)?;

    Some(InvitationCandidate {
        sender: message.header("From").unwrap_or_default().to_string(),
        repo_full_name: found.repo_full_name,
        repo_url: found.repo_url,
        acceptance: AcceptanceTarget::Url(found.invitation_url),
        received_at: message.received_at(),
        source_id: message.id.clone(),
    })
}

// --- Gmail API types ---

#[derive(Debug, Deserialize)]
struct MessageList {
    #[serde(default)]
    messages: Vec<MessageRef>,
}

#[derive(Debug, Deserialize)]
struct MessageRef {
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GmailMessage {
    pub id: String,
    /// Milliseconds since the epoch, as a decimal string.
    pub internal_date: Option<String>,
    pub payload: MessagePart,
}

#[derive(Debug, Default, Deserialize)]
pub struct MessagePart {
    #[serde(default)]
    pub headers: Vec<Header>,
    #[serde(default)]
    pub body: PartBody,
    #[serde(default)]
    pub parts: Vec<MessagePart>,
}

#[derive(Debug, Deserialize)]
pub struct Header {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct PartBody {
    pub data: Option<String>,
}

impl GmailMessage {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.payload
            .headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
    }

    fn first_body_text(&self) -> Option<String> {
        let data = match self.payload.parts.first() {
            Some(part) => part.body.data.as_deref(),
            None => self.payload.body.data.as_deref(),
        }?;
        decode_body(data)
    }

    fn received_at(&self) -> String {
        let from_internal = self
            .internal_date
            .as_deref()
            .and_then(|ms| ms.parse::<i64>().ok())
            .and_then(chrono::DateTime::from_timestamp_millis)
            .map(|dt| dt.to_rfc3339());

        from_internal
            .or_else(|| {
                self.header("Date")
                    .and_then(|d| chrono::DateTime::parse_from_rfc2822(d).ok())
                    .map(|dt| dt.to_rfc3339())
            })
            .or_else(|| self.header("Date").map(|d| d.to_string()))
            .unwrap_or_default()
    }
}

/// Gmail bodies are base64url, with or without padding.
fn decode_body(data: &str) -> Option<String> {
    let trimmed = data.trim_end_matches('=');
    let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(trimmed)
        .ok()?;
    if bytes.is_empty() {
        return None;
    }
    Some(String::from_utf8_lossy(&bytes).into_owned())
}
