// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Obtain raw per-team updates (pull from chat history, or pushed submissions) and persist them per week
// role: ingestion/orchestrator
// inputs: WeekPeriod, team ids + team→channel mapping, submission marker, pushed payloads
// outputs: RawTeamUpdate values keyed by team id; storage locations
// side_effects: Chat API calls on a bounded pool; writes through UpdateStore
// invariants:
// - a pull persists nothing unless every team's history call succeeded
// - teams with zero qualifying messages are absent, not errors
// - the most recent qualifying message wins
// errors: IngestionError aborts the whole pull; push failures are per-submission (see push.rs)
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

pub mod chat;
pub mod push;

use std::collections::BTreeMap;
use std::sync::Arc;

use rayon::prelude::*;

use crate::error::IngestionError;
use crate::model::RawTeamUpdate;
use crate::store::UpdateStore;
use crate::util::build_pool;
use crate::week::WeekPeriod;

use self::chat::{ChatHistory, ChatMessage};

pub const DEFAULT_MARKER: &str = "weekly update";
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

#[derive(Debug, Clone)]
pub struct PullSettings {
  /// team id → channel id
  pub channels: BTreeMap<String, String>,
  pub marker: String,
  pub limit: usize,
  pub workers: usize,
}

impl Default for PullSettings {
  fn default() -> Self {
    Self {
      channels: BTreeMap::new(),
      marker: DEFAULT_MARKER.into(),
      limit: DEFAULT_HISTORY_LIMIT,
      workers: 4,
    }
  }
}

pub struct UpdateIngestor {
  store: Arc<dyn UpdateStore>,
  chat: Option<Arc<dyn ChatHistory>>,
  settings: PullSettings,
}

/// True when the first non-blank line starts with the marker (case-insensitive).
pub fn is_submission(text: &str, marker: &str) -> bool {
  let Some(first) = text.lines().map(str::trim).find(|l| !l.is_empty()) else {
    return false;
  };
  first.to_lowercase().starts_with(&marker.trim().to_lowercase())
}

fn latest_submission(messages: Vec<ChatMessage>, marker: &str) -> Option<ChatMessage> {
  messages
    .into_iter()
    .filter(|m| is_submission(&m.text, marker))
    .max_by(|a, b| a.epoch().total_cmp(&b.epoch()))
}

impl UpdateIngestor {
  pub fn new(store: Arc<dyn UpdateStore>, chat: Option<Arc<dyn ChatHistory>>, settings: PullSettings) -> Self {
    Self { store, chat, settings }
  }

  /// Pull mode: query each team's channel since the start of `period` and store qualifying updates.
  pub fn fetch_for_teams(
    &self,
    period: &WeekPeriod,
    team_ids: &[String],
    oldest: i64,
  ) -> Result<BTreeMap<String, RawTeamUpdate>, IngestionError> {
    let chat = self.chat.as_ref().ok_or_else(|| IngestionError::ChatApi {
      channel: "-".into(),
      message: "no chat history client configured".into(),
    })?;

    let mut jobs: Vec<(&str, &str)> = Vec::with_capacity(team_ids.len());
    for team in team_ids {
      let channel = self
        .settings
        .channels
        .get(team)
        .ok_or_else(|| IngestionError::UnknownTeam(team.clone()))?;
      jobs.push((team.as_str(), channel.as_str()));
    }

    tracing::info!(week = %period.key, teams = jobs.len(), "fetching chat history");

    let pool = build_pool(self.settings.workers).map_err(|e| IngestionError::Pool(e.to_string()))?;
    let marker = self.settings.marker.as_str();
    let limit = self.settings.limit;
    let results: Vec<Result<(String, Option<ChatMessage>), IngestionError>> = pool.install(|| {
      jobs
        .par_iter()
        .map(|(team, channel)| {
          let messages = chat.history(channel, oldest, limit)?;
          Ok((team.to_string(), latest_submission(messages, marker)))
        })
        .collect()
    });

    let mut selected = Vec::with_capacity(results.len());
    for r in results {
      match r {
        Ok(pair) => selected.push(pair),
        Err(e) => {
          tracing::error!(error = %e, "chat history fetch failed; aborting pull");
          return Err(e);
        }
      }
    }

    let mut out = BTreeMap::new();
    for (team, message) in selected {
      let Some(message) = message else {
        tracing::info!(team = %team, "no weekly update found");
        continue;
      };
      let raw = RawTeamUpdate {
        team_id: team.clone(),
        week_key: period.key.clone(),
        text: message.text,
      };
      let location = self.store.put(&raw)?;
      tracing::info!(team = %team, location = %location, "stored raw update");
      out.insert(team, raw);
    }
    Ok(out)
  }

  /// Every configured team, in team-id order.
  pub fn fetch_all(&self, period: &WeekPeriod, oldest: i64) -> Result<BTreeMap<String, RawTeamUpdate>, IngestionError> {
    let teams: Vec<String> = self.settings.channels.keys().cloned().collect();
    self.fetch_for_teams(period, &teams, oldest)
  }
}
