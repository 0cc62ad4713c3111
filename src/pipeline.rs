// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Orchestrate one run: (optional pull) → parse → enhance → aggregate → render → publish or dry-run output
// role: processing/orchestrator
// inputs: EffectiveConfig, resolved WeekPeriod, UpdateStore, one EnhancementProvider, CancelToken
// outputs: ReportBuild (aggregate + document); PublishOutcome; JSON summaries on stdout for fetch/report
// side_effects: Writes enhanced_<team> artifacts; writes --out file or stdout; publish performs git operations
// invariants:
// - teams are processed in team-id order; aggregate order = team-id order
// - a team whose update has no recognized sections is skipped with a warning, never fatal
// - a cancelled run ends before aggregation and never publishes
// - publishing only ever receives a document built from a successful aggregate
// errors: RunError (Ingestion/Aggregation/Publish/Pool/Cancelled); anyhow at the CLI boundary with context
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::io::Read as _;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Local};

use crate::aggregate::aggregate;
use crate::cli::{Action, EffectiveConfig, PullConfig, ReportConfig};
use crate::enhance::{enhance_all, EnhanceSettings, EnhancementProvider};
use crate::error::{ParseError, RunError};
use crate::ingest::chat::SlackHistory;
use crate::ingest::{PullSettings, UpdateIngestor};
use crate::model::{AggregatedReport, DocFormat, EnhancedTeamUpdate, RenderedDocument};
use crate::parse::{parse, ParsePolicy};
use crate::publish::{GitOps, PublishOutcome, PublishWorkflow};
use crate::render::render;
use crate::store::{FsStore, UpdateStore};
use crate::util::CancelToken;
use crate::week::{self, WeekPeriod};

#[derive(Debug, Clone, Copy)]
pub struct ReportSettings {
  pub policy: ParsePolicy,
  pub enhance: EnhanceSettings,
  pub format: DocFormat,
}

impl Default for ReportSettings {
  fn default() -> Self {
    Self {
      policy: ParsePolicy::Strict,
      enhance: EnhanceSettings::default(),
      format: DocFormat::Markdown,
    }
  }
}

/// Everything a run produced before publishing.
#[derive(Debug, Clone)]
pub struct ReportBuild {
  pub period: WeekPeriod,
  pub updates: Vec<EnhancedTeamUpdate>,
  pub report: AggregatedReport,
  pub document: RenderedDocument,
  /// (team id, reason) for teams left out of the aggregate.
  pub skipped: Vec<(String, String)>,
}

/// Parse, enhance, aggregate and render every stored update of `period`.
pub fn build_report(
  store: &dyn UpdateStore,
  provider: &dyn EnhancementProvider,
  period: &WeekPeriod,
  settings: &ReportSettings,
  cancel: &CancelToken,
) -> Result<ReportBuild, RunError> {
  let raws = store.list(&period.key)?;
  tracing::info!(week = %period.key, teams = raws.len(), "building weekly report");

  let mut skipped = Vec::new();
  let mut parsed = Vec::with_capacity(raws.len());
  for raw in &raws {
    let update = parse(raw, settings.policy);
    if update.is_empty() {
      let err = ParseError::NoSections(raw.team_id.clone());
      tracing::warn!(team = %raw.team_id, error = %err, "skipping team");
      skipped.push((raw.team_id.clone(), err.to_string()));
      continue;
    }
    parsed.push(update);
  }

  let mut updates = Vec::with_capacity(parsed.len());
  for (team, enhanced) in parsed.iter().zip(enhance_all(provider, &parsed, &settings.enhance, cancel)?) {
    match enhanced {
      Some(e) => updates.push(e),
      None => skipped.push((team.team_id.clone(), "enhancement failed (strict)".into())),
    }
  }

  if cancel.is_cancelled() {
    tracing::warn!(week = %period.key, "run cancelled before aggregation");
    return Err(RunError::Cancelled);
  }

  for e in &updates {
    let location = store.put_enhanced(&period.key, &e.effective())?;
    tracing::debug!(team = %e.team_id(), location = %location, "stored enhanced update");
  }

  let report = aggregate(&period.key, &updates)?;
  let document = render(&report, period, settings.format);
  Ok(ReportBuild {
    period: period.clone(),
    updates,
    report,
    document,
    skipped,
  })
}

pub fn publish_report<G: GitOps>(
  build: &ReportBuild,
  workflow: &PublishWorkflow<G>,
  cancel: &CancelToken,
) -> Result<PublishOutcome, RunError> {
  if cancel.is_cancelled() {
    return Err(RunError::Cancelled);
  }
  Ok(workflow.publish(&build.document)?)
}

fn pull_ingestor(store: Arc<dyn UpdateStore>, pull: &PullConfig, cfg: &EffectiveConfig) -> UpdateIngestor {
  let chat = SlackHistory::new(pull.api_base.as_str(), pull.token.as_str(), cfg.http_timeout);
  let settings = PullSettings {
    channels: pull.channels.clone(),
    marker: pull.marker.clone(),
    limit: pull.limit,
    workers: cfg.workers,
  };
  UpdateIngestor::new(store, Some(Arc::new(chat)), settings)
}

fn run_fetch(cfg: &EffectiveConfig, store: Arc<dyn UpdateStore>, pull: &PullConfig, now: &DateTime<Local>) -> Result<()> {
  let period = &week::resolve(now);
  let ingestor = pull_ingestor(store, pull, cfg);
  let fetched = ingestor
    .fetch_all(period, period.pull_since(now))
    .with_context(|| format!("fetching updates for week {}", period.key))?;
  let summary = serde_json::json!({
    "week": period.key,
    "teams": fetched.keys().collect::<Vec<_>>(),
    "dir": cfg.data_dir.join(&period.key),
  });
  println!("{}", serde_json::to_string(&summary)?);
  Ok(())
}

fn read_payload(source: &str) -> Result<Vec<u8>> {
  if source == "-" {
    let mut buf = Vec::new();
    std::io::stdin().read_to_end(&mut buf).context("reading payload from stdin")?;
    Ok(buf)
  } else {
    std::fs::read(source).with_context(|| format!("reading payload from {}", source))
  }
}

fn run_submit(store: Arc<dyn UpdateStore>, payload: &str, period: &WeekPeriod) -> Result<()> {
  let body = read_payload(payload)?;
  let ingestor = UpdateIngestor::new(store, None, PullSettings::default());
  let response = ingestor.handle_submission(period, &body);
  if !response.is_success() {
    anyhow::bail!("submission rejected ({}): {}", response.status, response.body);
  }
  println!("{}", response.body);
  Ok(())
}

fn run_report(
  cfg: &EffectiveConfig,
  store: Arc<dyn UpdateStore>,
  rc: &ReportConfig,
  period: &WeekPeriod,
  now: &DateTime<Local>,
) -> Result<()> {
  let cancel = match cfg.deadline {
    Some(d) => CancelToken::with_deadline(d),
    None => CancelToken::new(),
  };

  if let Some(pull) = &rc.fetch {
    let ingestor = pull_ingestor(store.clone(), pull, cfg);
    ingestor
      .fetch_all(period, period.pull_since(now))
      .with_context(|| format!("fetching updates for week {}", period.key))?;
  }

  let provider = rc.provider.build(cfg.http_timeout);
  let settings = ReportSettings {
    policy: rc.policy,
    enhance: EnhanceSettings {
      granularity: rc.granularity,
      strict: rc.strict_enhancement,
      workers: cfg.workers,
    },
    format: rc.format,
  };
  let build = build_report(store.as_ref(), provider.as_ref(), period, &settings, &cancel)
    .with_context(|| format!("building report for week {}", period.key))?;

  let Some(publish) = &rc.publish else {
    if rc.out == "-" {
      print!("{}", build.document.body);
    } else {
      std::fs::write(&rc.out, &build.document.body).with_context(|| format!("writing {}", rc.out))?;
      tracing::info!(path = %rc.out, "wrote rendered document");
    }
    return Ok(());
  };

  let workflow = PublishWorkflow::new(publish.clone());
  let outcome = publish_report(&build, &workflow, &cancel).with_context(|| format!("publishing week {}", period.key))?;
  let summary = match &outcome {
    PublishOutcome::Pushed { path, commit } => serde_json::json!({
      "week": period.key, "status": "pushed", "path": path, "commit": commit,
      "teams": build.updates.len(), "skipped": build.skipped.len(),
    }),
    PublishOutcome::Unchanged { path } => serde_json::json!({
      "week": period.key, "status": "unchanged", "path": path,
      "teams": build.updates.len(), "skipped": build.skipped.len(),
    }),
  };
  println!("{}", serde_json::to_string(&summary)?);
  Ok(())
}

/// Dispatch one CLI invocation.
pub fn execute(cfg: &EffectiveConfig) -> Result<()> {
  let now = week::effective_now(week::parse_now_override(cfg.now_override.as_deref()));
  let store: Arc<dyn UpdateStore> = Arc::new(FsStore::new(&cfg.data_dir, cfg.artifact_format));

  match &cfg.action {
    Action::Fetch(pull) => run_fetch(cfg, store, pull, &now),
    Action::Submit { payload } => run_submit(store, payload, &week::resolve(&now)),
    Action::Report(rc) => {
      let period = match &rc.week {
        Some(key) => WeekPeriod::from_key(key)?,
        None => week::resolve(&now),
      };
      run_report(cfg, store, rc, &period, &now)
    }
  }
}
