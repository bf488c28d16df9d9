use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::advisor::{parse_advice, prompt, Advice, Advisor};
use crate::config::LlmConfig;
use crate::error::{AppError, Result};
use crate::workflow::types::InvitationCandidate;

const CLAUDE_API_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";

pub struct ClaudeAdvisor {
    client: Client,
    api_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl ClaudeAdvisor {
    pub fn new(config: &LlmConfig, request_timeout: Duration) -> Result<Self> {
        let api_key = config
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| AppError::Advisor("llm.api_key is required for anthropic".to_string()))?;

        // The Ollama default base URL does not apply here.
        let api_url = if config.base_url.contains("anthropic") {
            format!("{}/v1/messages", config.base_url.trim_end_matches('/'))
        } else {
            CLAUDE_API_URL.to_string()
        };

        Ok(Self {
            client: Client::builder().timeout(request_timeout).build()?,
            api_url,
            api_key: api_key.to_string(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        })
    }

    async fn send_message(&self, request: &MessagesRequest) -> Result<MessagesResponse> {
        let response = self
            .client
            .post(&self.api_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .header("content-type", "application/json")
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Advisor(format!("API returned {status}: {body}")));
        }

        let body = response.json::<MessagesResponse>().await?;
        Ok(body)
    }
}

#[async_trait]
impl Advisor for ClaudeAdvisor {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn review(&self, candidate: &InvitationCandidate) -> Result<Advice> {
        let request = MessagesRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            system: prompt::SYSTEM_PROMPT.to_string(),
            messages: vec![Message {
                role: "user".to_string(),
                content: prompt::review_request(candidate),
            }],
        };

        let response = self.send_message(&request).await?;
        tracing::debug!(
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            "Advisor response"
        );

        Ok(parse_advice(&extract_text(&response.content)))
    }
}

// --- Request types ---

#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    temperature: f32,
    system: String,
    messages: Vec<Message>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

// --- Response types ---

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    usage: Usage,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct Usage {
    input_tokens: u32,
    output_tokens: u32,
}

fn extract_text(content: &[ContentBlock]) -> String {
    content
        .iter()
        .filter_map(|block| {
            if let ContentBlock::Text { text } = block {
                Some(text.as_str())
            } else {
                None
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
