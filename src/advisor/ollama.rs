use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::advisor::{parse_advice, prompt, Advice, Advisor};
use crate::config::LlmConfig;
use crate::error::{AppError, Result};
use crate::workflow::types::InvitationCandidate;

/// Probe timeout for `/api/tags`.
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Local model served by Ollama.
pub struct OllamaAdvisor {
    client: Client,
    base_url: String,
    model: String,
    temperature: f32,
}

impl OllamaAdvisor {
    /// Probe the server and check the model is pulled. `Ok(None)` when the
    /// server answers but lacks the model.
    pub async fn connect(config: &LlmConfig, request_timeout: Duration) -> Result<Option<Self>> {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        let client = Client::builder().timeout(request_timeout).build()?;

        tracing::info!(model = %config.model, base_url = %base_url, "Probing Ollama");

        let response = client
            .get(format!("{base_url}/api/tags"))
            .timeout(PROBE_TIMEOUT)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(AppError::Advisor(format!(
                "Ollama not responding: {}",
                response.status()
            )));
        }

        let tags: TagsResponse = response.json().await?;
        tracing::info!(models = tags.models.len(), "Ollama running");
        if !has_model(&tags, &config.model) {
            tracing::warn!(model = %config.model, "Model not found; run `ollama pull {}`", config.model);
            return Ok(None);
        }

        Ok(Some(Self {
            client,
            base_url,
            model: config.model.clone(),
            temperature: config.temperature,
        }))
    }
}

#[async_trait]
impl Advisor for OllamaAdvisor {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn review(&self, candidate: &InvitationCandidate) -> Result<Advice> {
        let request = ChatRequest {
            model: &self.model,
            stream: false,
            format: "json",
            options: ChatOptions {
                temperature: self.temperature,
            },
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: prompt::SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: prompt::review_request(candidate),
                },
            ],
        };

        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Advisor(format!("Ollama returned {status}: {body}")));
        }

        let reply: ChatResponse = response.json().await?;
        Ok(parse_advice(&reply.message.content))
    }
}

fn has_model(tags: &TagsResponse, model: &str) -> bool {
    tags.models.iter().any(|m| m.name.contains(model))
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    stream: bool,
    format: &'a str,
    options: ChatOptions,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
struct ChatOptions {
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: String,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelTag>,
}

#[derive(Debug, Deserialize)]
struct ModelTag {
    name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_presence_uses_substring_match() {
        let tags: TagsResponse = serde_json::from_str(
            r#"{"models": [{"name": "qwen2.5:7b-instruct"}, {"name": "llama3:latest"}]}"#,
        )
        .unwrap();
        assert!(has_model(&tags, "qwen2.5:7b-instruct"));
        assert!(has_model(&tags, "llama3"));
        assert!(!has_model(&tags, "mistral"));
    }

    #[test]
    fn test_empty_tags_payload() {
        let tags: TagsResponse = serde_json::from_str("{}").unwrap();
        assert!(!has_model(&tags, "qwen2.5:7b-instruct"));
    }
}
