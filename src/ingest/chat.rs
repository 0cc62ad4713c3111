// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Chat-history API seam and its Slack-compatible HTTP implementation
// role: ingestion/chat-api
// inputs: channel id, oldest Unix timestamp, limit; bearer token; base URL
// outputs: Ordered chat messages {text, ts}
// side_effects: Network call to {base}/conversations.history
// invariants:
// - every request carries the agent timeout; a timeout is an IngestionError
// - `ok: false`, non-2xx statuses and malformed bodies are errors, never an empty result
// errors: IngestionError::ChatApi naming the channel
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::IngestionError;
use crate::ext::serde_json::JsonFetch;

pub const DEFAULT_SLACK_API: &str = "https://slack.com/api";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
  pub text: String,
  /// Provider timestamp, e.g. Slack's "1717400000.000200".
  pub ts: String,
}

impl ChatMessage {
  pub fn epoch(&self) -> f64 {
    self.ts.parse::<f64>().unwrap_or(0.0)
  }
}

pub trait ChatHistory: Send + Sync {
  fn history(&self, channel: &str, oldest: i64, limit: usize) -> Result<Vec<ChatMessage>, IngestionError>;
}

pub struct SlackHistory {
  base_url: String,
  token: String,
  agent: ureq::Agent,
}

impl SlackHistory {
  pub fn new(base_url: impl Into<String>, token: impl Into<String>, timeout: Duration) -> Self {
    Self {
      base_url: base_url.into().trim_end_matches('/').to_string(),
      token: token.into(),
      agent: ureq::AgentBuilder::new().timeout(timeout).build(),
    }
  }
}

impl ChatHistory for SlackHistory {
  fn history(&self, channel: &str, oldest: i64, limit: usize) -> Result<Vec<ChatMessage>, IngestionError> {
    let fail = |message: String| IngestionError::ChatApi {
      channel: channel.to_string(),
      message,
    };

    let url = format!("{}/conversations.history", self.base_url);
    let response = self
      .agent
      .get(&url)
      .query("channel", channel)
      .query("oldest", &oldest.to_string())
      .query("limit", &limit.to_string())
      .set("Authorization", &format!("Bearer {}", self.token))
      .set("User-Agent", "team-update-report")
      .call();

    let body: serde_json::Value = match response {
      Ok(resp) => resp.into_json().map_err(|e| fail(format!("unreadable body: {}", e)))?,
      Err(ureq::Error::Status(code, resp)) => {
        let text = resp.into_string().unwrap_or_default();
        return Err(fail(format!("status {}: {}", code, text.trim())));
      }
      Err(e) => return Err(fail(e.to_string())),
    };

    if body.fetch("ok").to::<bool>() != Some(true) {
      let reason = body.fetch("error").to::<String>().unwrap_or_else(|| "ok=false".into());
      return Err(fail(reason));
    }

    let Some(items) = body.fetch("messages").value().and_then(|v| v.as_array()) else {
      return Err(fail("response has no messages array".into()));
    };

    Ok(
      items
        .iter()
        .map(|m| ChatMessage {
          text: m.fetch("text").to_or_default::<String>(),
          ts: m.fetch("ts").to_or_default::<String>(),
        })
        .collect(),
    )
  }
}
