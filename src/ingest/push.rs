// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Push-mode ingestion: accept a submitted {text} payload, extract the team id, store the raw update
// role: ingestion/push
// inputs: JSON body {text}; WeekPeriod
// outputs: Stored RawTeamUpdate + location; SubmissionResponse (status + plain-text body) for any transport
// invariants:
// - a payload without a `Team:` line fails with ParseError::TeamNotFound and stores nothing
// - resubmitting a team overwrites its artifact
// errors: ParseError → 400, IngestionError → 500
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use serde::{Deserialize, Serialize};

use super::UpdateIngestor;
use crate::error::{IngestionError, ParseError};
use crate::model::RawTeamUpdate;
use crate::parse::team_marker_value;
use crate::store::is_safe_team_id;
use crate::week::WeekPeriod;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionPayload {
  pub text: String,
}

#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
  #[error("error parsing team name: {0}")]
  Parse(#[from] ParseError),
  #[error("error storing update: {0}")]
  Ingestion(#[from] IngestionError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionResponse {
  pub status: u16,
  pub body: String,
}

impl SubmissionResponse {
  pub fn is_success(&self) -> bool {
    (200..300).contains(&self.status)
  }
}

/// Team id from the first `Team:` line.
pub fn parse_team_id(text: &str) -> Result<String, ParseError> {
  let team = text
    .lines()
    .find_map(team_marker_value)
    .filter(|t| !t.is_empty())
    .ok_or(ParseError::TeamNotFound)?;
  if !is_safe_team_id(team) {
    return Err(ParseError::InvalidTeamId(team.to_string()));
  }
  Ok(team.to_string())
}

impl UpdateIngestor {
  /// Push mode: store one submitted update for `period`.
  pub fn receive(&self, period: &WeekPeriod, payload: &SubmissionPayload) -> Result<(RawTeamUpdate, String), SubmitError> {
    let team_id = parse_team_id(&payload.text).inspect_err(|e| {
      tracing::warn!(error = %e, "rejecting submission");
    })?;
    let raw = RawTeamUpdate {
      team_id,
      week_key: period.key.clone(),
      text: payload.text.clone(),
    };
    let location = self.store.put(&raw)?;
    tracing::info!(team = %raw.team_id, location = %location, "update processed and stored");
    Ok((raw, location))
  }

  /// Transport-agnostic handler for a raw request body.
  pub fn handle_submission(&self, period: &WeekPeriod, body: &[u8]) -> SubmissionResponse {
    let payload: SubmissionPayload = match serde_json::from_slice(body) {
      Ok(p) => p,
      Err(e) => {
        return SubmissionResponse {
          status: 400,
          body: ParseError::Payload(e.to_string()).to_string(),
        }
      }
    };

    match self.receive(period, &payload) {
      Ok((_, location)) => SubmissionResponse {
        status: 200,
        body: format!("Update processed and stored successfully in {}", location),
      },
      Err(e @ SubmitError::Parse(_)) => SubmissionResponse {
        status: 400,
        body: e.to_string(),
      },
      Err(e @ SubmitError::Ingestion(_)) => SubmissionResponse {
        status: 500,
        body: e.to_string(),
      },
    }
  }
}
