pub mod claude;
pub mod ollama;
pub mod prompt;

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::{LlmConfig, LlmProvider};
use crate::error::Result;
use crate::workflow::types::InvitationCandidate;

/// A model's verdict on one candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advice {
    Accept,
    Skip { reason: String },
}

/// Optional reasoning step consulted before accepting an invitation.
///
/// It can only veto. Extraction and the placeholder guard already decided
/// the candidate is acceptable; the pipeline runs unchanged without one.
#[async_trait]
pub trait Advisor: Send + Sync {
    fn name(&self) -> &str;

    async fn review(&self, candidate: &InvitationCandidate) -> Result<Advice>;
}

/// Build the configured advisor, or `None` when disabled or unreachable.
pub async fn connect(config: &LlmConfig, request_timeout: Duration) -> Option<Box<dyn Advisor>> {
    if !config.enabled {
        tracing::info!("LLM disabled in configuration, running in direct execution mode");
        return None;
    }

    let result: Result<Option<Box<dyn Advisor>>> = match config.provider {
        LlmProvider::Ollama => {
            match ollama::OllamaAdvisor::connect(config, request_timeout).await {
                Ok(Some(advisor)) => Ok(Some(Box::new(advisor))),
                Ok(None) => Ok(None),
                Err(e) => Err(e),
            }
        }
        LlmProvider::Anthropic => claude::ClaudeAdvisor::new(config, request_timeout)
            .map(|advisor| Some(Box::new(advisor) as Box<dyn Advisor>)),
    };

    match result {
        Ok(Some(advisor)) => {
            tracing::info!(provider = advisor.name(), model = %config.model, "LLM advisor active");
            Some(advisor)
        }
        Ok(None) => {
            tracing::warn!(model = %config.model, "LLM model unavailable, continuing without advisor");
            None
        }
        Err(e) => {
            tracing::warn!(error = %e, "LLM advisor unavailable, continuing without advisor");
            None
        }
    }
}

#[derive(Debug, Deserialize)]
struct Verdict {
    action: String,
    #[serde(default)]
    reason: String,
}

/// Interpret a model reply. Anything that is not a clear "skip" verdict
/// counts as accept.
pub fn parse_advice(reply: &str) -> Advice {
    let json = match (reply.find('{'), reply.rfind('}')) {
        (Some(start), Some(end)) if end > start => &reply[start..=end],
        _ => {
            tracing::warn!("Advisor reply has no JSON object, falling back to accept");
            return Advice::Accept;
        }
    };

    match serde_json::from_str::<Verdict>(json) {
        Ok(v) if v.action.eq_ignore_ascii_case("skip") => Advice::Skip {
            reason: if v.reason.is_empty() {
                "advisor declined".to_string()
            } else {
                v.reason
            },
        },
        Ok(_) => Advice::Accept,
        Err(e) => {
            tracing::warn!(error = %e, "Unparseable advisor verdict, falling back to accept");
            Advice::Accept
        }
    }
}
