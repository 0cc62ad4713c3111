use std::time::Duration;

use serde::Serialize;

use super::{compose_prompt, http_error, EnhancementProvider};
use crate::error::EnhancementError;
use crate::ext::serde_json::JsonFetch;

pub const DEFAULT_OPENAI_ENDPOINT: &str = "https://api.openai.com";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-3.5-turbo-instruct";
pub const DEFAULT_MAX_TOKENS: u32 = 1024;

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
  model: &'a str,
  prompt: String,
  max_tokens: u32,
}

/// Cloud completion endpoint (`POST /v1/completions`) with bearer auth.
pub struct OpenAiProvider {
  endpoint: String,
  model: String,
  api_key: Option<String>,
  max_tokens: u32,
  agent: ureq::Agent,
}

impl OpenAiProvider {
  pub fn new(
    endpoint: impl Into<String>,
    model: impl Into<String>,
    api_key: Option<String>,
    max_tokens: u32,
    timeout: Duration,
  ) -> Self {
    Self {
      endpoint: endpoint.into().trim_end_matches('/').to_string(),
      model: model.into(),
      api_key: api_key.filter(|k| !k.trim().is_empty()),
      max_tokens,
      agent: ureq::AgentBuilder::new().timeout(timeout).build(),
    }
  }
}

impl EnhancementProvider for OpenAiProvider {
  fn name(&self) -> &'static str {
    "openai"
  }

  fn enhance(&self, text: &str) -> Result<String, EnhancementError> {
    // no key, no request
    let key = self.api_key.as_deref().ok_or(EnhancementError::MissingCredential)?;

    let request = CompletionRequest {
      model: &self.model,
      prompt: compose_prompt(text),
      max_tokens: self.max_tokens,
    };
    tracing::debug!(model = %self.model, bytes = text.len(), "openai completion");

    let body: serde_json::Value = self
      .agent
      .post(&format!("{}/v1/completions", self.endpoint))
      .set("Content-Type", "application/json")
      .set("Authorization", &format!("Bearer {}", key))
      .send_json(&request)
      .map_err(http_error)?
      .into_json()
      .map_err(|e| EnhancementError::Malformed(e.to_string()))?;

    body
      .fetch("choices.0.text")
      .to::<String>()
      .map(|t| t.trim().to_string())
      .filter(|t| !t.is_empty())
      .ok_or_else(|| EnhancementError::Malformed("no completion choices".into()))
  }
}
