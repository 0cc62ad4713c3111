use std::time::Duration;

use serde::Serialize;

use super::{compose_prompt, http_error, EnhancementProvider};
use crate::error::EnhancementError;
use crate::ext::serde_json::JsonFetch;

pub const DEFAULT_OLLAMA_ENDPOINT: &str = "http://ollama:11434";
pub const DEFAULT_OLLAMA_MODEL: &str = "llama3";

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
  model: &'a str,
  prompt: String,
  stream: bool,
}

/// Self-hosted generation endpoint (`POST /api/generate`, non-streaming).
pub struct OllamaProvider {
  endpoint: String,
  model: String,
  agent: ureq::Agent,
}

impl OllamaProvider {
  pub fn new(endpoint: impl Into<String>, model: impl Into<String>, timeout: Duration) -> Self {
    Self {
      endpoint: endpoint.into().trim_end_matches('/').to_string(),
      model: model.into(),
      agent: ureq::AgentBuilder::new().timeout(timeout).build(),
    }
  }
}

impl EnhancementProvider for OllamaProvider {
  fn name(&self) -> &'static str {
    "ollama"
  }

  fn enhance(&self, text: &str) -> Result<String, EnhancementError> {
    let request = GenerateRequest {
      model: &self.model,
      prompt: compose_prompt(text),
      stream: false,
    };
    tracing::debug!(model = %self.model, bytes = text.len(), "ollama generate");

    let body: serde_json::Value = self
      .agent
      .post(&format!("{}/api/generate", self.endpoint))
      .set("Content-Type", "application/json")
      .send_json(&request)
      .map_err(http_error)?
      .into_json()
      .map_err(|e| EnhancementError::Malformed(e.to_string()))?;

    if body.fetch("done").to::<bool>() != Some(true) {
      return Err(EnhancementError::Incomplete);
    }
    body
      .fetch("response")
      .to::<String>()
      .ok_or_else(|| EnhancementError::Malformed("missing `response` field".into()))
  }
}
