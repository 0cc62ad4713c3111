// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Enhancement capability (trait + providers) and the per-team/per-section enhancement stage
// role: enhancement/stage
// inputs: TeamUpdates, one injected EnhancementProvider, granularity, strictness, CancelToken
// outputs: EnhancedTeamUpdate per team (input order), or None for teams dropped under strict mode
// side_effects: Provider network calls on a bounded rayon pool
// invariants:
// - provider is chosen once from configuration; call sites never branch on the backend
// - no call is issued once the run is cancelled; a skipped call is never treated as enhanced
// - per-section failures fall back to the original lines unless strict
// - enhancement cannot add or remove sections
// errors: EnhancementError recorded per section (or per team for whole-document calls)
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

pub mod ollama;
pub mod openai;

use clap::ValueEnum;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::EnhancementError;
use crate::model::{EnhancedTeamUpdate, SectionFailure, SectionKind, TeamUpdate};
use crate::parse::{bullet_body, parse_text, ParsePolicy};
use crate::util::CancelToken;

pub use self::ollama::OllamaProvider;
pub use self::openai::OpenAiProvider;

pub trait EnhancementProvider: Send + Sync {
  fn name(&self) -> &'static str;
  fn enhance(&self, text: &str) -> Result<String, EnhancementError>;
}

/// Returns its input unchanged. Used for `--provider none` and in tests.
pub struct Passthrough;

impl EnhancementProvider for Passthrough {
  fn name(&self) -> &'static str {
    "none"
  }

  fn enhance(&self, text: &str) -> Result<String, EnhancementError> {
    Ok(text.to_string())
  }
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
#[value(rename_all = "lowercase")]
pub enum ProviderKind {
  Ollama,
  Openai,
  None,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
#[value(rename_all = "kebab-case")]
pub enum Granularity {
  /// One call per non-empty section per team.
  #[default]
  PerSection,
  /// One call per team over the whole re-serialized update.
  WholeDocument,
}

#[derive(Debug, Clone, Copy)]
pub struct EnhanceSettings {
  pub granularity: Granularity,
  /// Drop a team's contribution on any enhancement failure instead of falling back.
  pub strict: bool,
  pub workers: usize,
}

impl Default for EnhanceSettings {
  fn default() -> Self {
    Self {
      granularity: Granularity::PerSection,
      strict: false,
      workers: 4,
    }
  }
}

/// Backend selection, resolved once from configuration.
#[derive(Debug, Clone)]
pub enum ProviderConfig {
  Ollama {
    endpoint: String,
    model: String,
  },
  OpenAi {
    endpoint: String,
    model: String,
    api_key: Option<String>,
    max_tokens: u32,
  },
  None,
}

impl ProviderConfig {
  pub fn build(&self, timeout: std::time::Duration) -> Box<dyn EnhancementProvider> {
    match self {
      ProviderConfig::Ollama { endpoint, model } => Box::new(OllamaProvider::new(endpoint.as_str(), model.as_str(), timeout)),
      ProviderConfig::OpenAi {
        endpoint,
        model,
        api_key,
        max_tokens,
      } => Box::new(OpenAiProvider::new(
        endpoint.as_str(),
        model.as_str(),
        api_key.clone(),
        *max_tokens,
        timeout,
      )),
      ProviderConfig::None => Box::new(Passthrough),
    }
  }
}

pub(crate) fn compose_prompt(text: &str) -> String {
  format!("Enhance the following team update by maintaining the same format \n\n{}", text)
}

pub(crate) fn http_error(err: ureq::Error) -> EnhancementError {
  match err {
    ureq::Error::Status(status, resp) => EnhancementError::Status {
      status,
      body: resp.into_string().unwrap_or_default().trim().to_string(),
    },
    other => EnhancementError::Transport(other.to_string()),
  }
}

fn section_text(lines: &[String]) -> String {
  lines.iter().map(|l| format!("• {}", l)).collect::<Vec<_>>().join("\n")
}

/// Split a provider reply for one section back into lines, dropping bullet glyphs and
/// any echoed section header.
fn reply_lines(kind: SectionKind, reply: &str) -> Vec<String> {
  reply
    .lines()
    .map(str::trim)
    .filter(|l| !l.is_empty())
    .filter(|l| SectionKind::from_header(l.strip_suffix(':').unwrap_or(l)) != Some(kind))
    .map(|l| bullet_body(l).unwrap_or(l).to_string())
    .filter(|l| !l.is_empty())
    .collect()
}

fn enhance_per_section(
  provider: &dyn EnhancementProvider,
  update: &TeamUpdate,
  cancel: &CancelToken,
) -> EnhancedTeamUpdate {
  let mut out = EnhancedTeamUpdate::unenhanced(update.clone());
  for kind in SectionKind::ALL {
    let lines = update.lines(kind);
    if lines.is_empty() {
      continue;
    }
    if cancel.is_cancelled() {
      out.failures.push(SectionFailure {
        section: Some(kind),
        message: EnhancementError::Cancelled.to_string(),
      });
      continue;
    }
    let result = provider.enhance(&section_text(lines)).and_then(|reply| {
      let enhanced = reply_lines(kind, &reply);
      if enhanced.is_empty() {
        Err(EnhancementError::Malformed("empty enhancement".into()))
      } else {
        Ok(enhanced)
      }
    });
    match result {
      Ok(enhanced) => {
        out.enhanced.insert(kind, enhanced);
      }
      Err(e) => {
        tracing::warn!(team = %update.team_id, section = %kind, error = %e, "enhancement failed; keeping original text");
        out.failures.push(SectionFailure {
          section: Some(kind),
          message: e.to_string(),
        });
      }
    }
  }
  out
}

fn enhance_whole(
  provider: &dyn EnhancementProvider,
  update: &TeamUpdate,
  cancel: &CancelToken,
) -> EnhancedTeamUpdate {
  let mut out = EnhancedTeamUpdate::unenhanced(update.clone());
  if update.is_empty() {
    return out;
  }
  if cancel.is_cancelled() {
    out.failures.push(SectionFailure {
      section: None,
      message: EnhancementError::Cancelled.to_string(),
    });
    return out;
  }
  let result = provider.enhance(&update.to_text()).and_then(|reply| {
    let parsed = parse_text(&update.team_id, &reply, ParsePolicy::Strict);
    if parsed.is_empty() {
      Err(EnhancementError::Malformed("reply has no recognizable sections".into()))
    } else {
      Ok(parsed)
    }
  });
  match result {
    Ok(parsed) => {
      // only sections the team actually wrote are replaced
      for kind in SectionKind::ALL {
        if !update.lines(kind).is_empty() && !parsed.lines(kind).is_empty() {
          out.enhanced.insert(kind, parsed.lines(kind).to_vec());
        }
      }
    }
    Err(e) => {
      tracing::warn!(team = %update.team_id, error = %e, "document enhancement failed; keeping original text");
      out.failures.push(SectionFailure {
        section: None,
        message: e.to_string(),
      });
    }
  }
  out
}

/// Enhance one team's update.
pub fn enhance_update(
  provider: &dyn EnhancementProvider,
  update: &TeamUpdate,
  granularity: Granularity,
  cancel: &CancelToken,
) -> EnhancedTeamUpdate {
  match granularity {
    Granularity::PerSection => enhance_per_section(provider, update, cancel),
    Granularity::WholeDocument => enhance_whole(provider, update, cancel),
  }
}

/// Enhance every team on a bounded pool. Output keeps input order; `None` marks a team
/// dropped under strict mode.
pub fn enhance_all(
  provider: &dyn EnhancementProvider,
  updates: &[TeamUpdate],
  settings: &EnhanceSettings,
  cancel: &CancelToken,
) -> Result<Vec<Option<EnhancedTeamUpdate>>, rayon::ThreadPoolBuildError> {
  let pool = crate::util::build_pool(settings.workers)?;
  tracing::info!(provider = provider.name(), teams = updates.len(), granularity = ?settings.granularity, "enhancing updates");

  let results: Vec<EnhancedTeamUpdate> = pool.install(|| {
    updates
      .par_iter()
      .map(|u| enhance_update(provider, u, settings.granularity, cancel))
      .collect()
  });

  Ok(
    results
      .into_iter()
      .map(|e| {
        if settings.strict && !e.failures.is_empty() {
          tracing::warn!(team = %e.team_id(), "strict enhancement: dropping team contribution");
          None
        } else {
          Some(e)
        }
      })
      .collect(),
  )
}
