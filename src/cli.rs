use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::enhance::openai::{DEFAULT_MAX_TOKENS, DEFAULT_OPENAI_ENDPOINT, DEFAULT_OPENAI_MODEL};
use crate::enhance::ollama::{DEFAULT_OLLAMA_ENDPOINT, DEFAULT_OLLAMA_MODEL};
use crate::enhance::{Granularity, ProviderConfig, ProviderKind};
use crate::ingest::chat::DEFAULT_SLACK_API;
use crate::ingest::{DEFAULT_HISTORY_LIMIT, DEFAULT_MARKER};
use crate::model::DocFormat;
use crate::parse::ParsePolicy;
use crate::publish::{GitCredential, PublishConfig, DEFAULT_AUTHOR_EMAIL, DEFAULT_AUTHOR_NAME, DEFAULT_BRANCH, DEFAULT_TARGET_DIR};
use crate::store::{is_safe_team_id, ArtifactFormat};
use crate::util;
use crate::week::WeekPeriod;

#[derive(Parser, Debug)]
#[command(
    name = "team-update-report",
    version,
    about = "Collect weekly team updates, enhance them and publish one weekly document",
    long_about = None
)]
pub struct Cli {
  /// Root of the per-week artifact folders
  #[arg(long, env = "UPDATES_DATA_DIR", default_value = "updates", global = true)]
  pub data_dir: PathBuf,

  /// On-disk format of raw and enhanced artifacts
  #[arg(long, value_enum, default_value_t = ArtifactFormat::Txt, global = true)]
  pub artifact_format: ArtifactFormat,

  /// Width of the worker pool used for chat and enhancement calls
  #[arg(long, default_value_t = 4, global = true)]
  pub workers: usize,

  /// Timeout for every chat-history and enhancement request
  #[arg(long, default_value_t = 30, global = true)]
  pub http_timeout_secs: u64,

  /// Timeout for every git subprocess during publishing
  #[arg(long, default_value_t = 120, global = true)]
  pub git_timeout_secs: u64,

  /// Cancel the run once this many seconds have passed (no new enhancement calls, no publish)
  #[arg(long, global = true)]
  pub deadline_secs: Option<u64>,

  /// Emit a troff man page to stdout (internal; for packaging)
  #[arg(long, hide = true)]
  pub gen_man: bool,

  /// Override the "now" instant used to resolve the current week (hidden; tests only)
  #[arg(long = "now-override", hide = true, global = true)]
  pub now_override: Option<String>,

  #[command(subcommand)]
  pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
  /// Pull this week's updates from each team's chat channel into the data dir
  Fetch(PullArgs),
  /// Store one pushed update (JSON `{"text": ...}`) for the current week
  Submit {
    /// Payload file, or "-" for stdin
    #[arg(long, default_value = "-")]
    payload: String,
  },
  /// Build the weekly document and publish it (or print it with --dry-run)
  Report(ReportArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct PullArgs {
  /// Team to channel mapping, TEAM=CHANNEL (repeatable)
  #[arg(long = "channel", value_name = "TEAM=CHANNEL")]
  pub channels: Vec<String>,

  /// First line of a qualifying chat message starts with this (case-insensitive)
  #[arg(long, default_value = DEFAULT_MARKER)]
  pub marker: String,

  /// Maximum messages read per channel
  #[arg(long, default_value_t = DEFAULT_HISTORY_LIMIT)]
  pub history_limit: usize,

  #[arg(long, env = "SLACK_API_BASE", default_value = DEFAULT_SLACK_API)]
  pub slack_api_base: String,

  #[arg(long, env = "SLACK_API_TOKEN", hide_env_values = true)]
  pub slack_token: Option<String>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ReportArgs {
  /// Week to build, as its Monday (YYYY-MM-DD); defaults to the current week
  #[arg(long)]
  pub week: Option<String>,

  /// Pull from chat before building (uses the --channel mapping)
  #[arg(long)]
  pub fetch: bool,

  #[command(flatten)]
  pub pull: PullArgs,

  /// Enhancement backend; defaults to ollama when USE_OLLAMA is set, openai otherwise
  #[arg(long, value_enum)]
  pub provider: Option<ProviderKind>,

  /// Any value other than an explicit falsey one (0, false, no, off, empty) selects Ollama
  #[arg(
    long,
    env = "USE_OLLAMA",
    hide = true,
    action = clap::ArgAction::SetTrue,
    value_parser = clap::builder::FalseyValueParser::new()
  )]
  pub use_ollama: bool,

  #[arg(long, env = "OLLAMA_ENDPOINT", default_value = DEFAULT_OLLAMA_ENDPOINT)]
  pub ollama_endpoint: String,

  #[arg(long, default_value = DEFAULT_OLLAMA_MODEL)]
  pub ollama_model: String,

  #[arg(long, env = "OPENAI_ENDPOINT", default_value = DEFAULT_OPENAI_ENDPOINT)]
  pub openai_endpoint: String,

  #[arg(long, default_value = DEFAULT_OPENAI_MODEL)]
  pub openai_model: String,

  #[arg(long, default_value_t = DEFAULT_MAX_TOKENS)]
  pub openai_max_tokens: u32,

  #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
  pub openai_api_key: Option<String>,

  /// One enhancement call per section, or one per team
  #[arg(long, value_enum, default_value_t = Granularity::PerSection)]
  pub granularity: Granularity,

  /// Drop a team from the document when any of its enhancement calls fails
  #[arg(long)]
  pub strict_enhancement: bool,

  /// Whether non-bullet lines inside a section count as content
  #[arg(long, value_enum, default_value_t = ParsePolicy::Strict)]
  pub parse_policy: ParsePolicy,

  #[arg(long, value_enum, default_value_t = DocFormat::Markdown)]
  pub format: DocFormat,

  /// Render only; write the document to --out instead of publishing
  #[arg(long)]
  pub dry_run: bool,

  /// Dry-run output path ("-" = stdout)
  #[arg(long, default_value = "-")]
  pub out: String,

  /// Publish repository (SSH URL or local path)
  #[arg(long, env = "PUBLISH_REPO_URL")]
  pub repo_url: Option<String>,

  #[arg(long, default_value = DEFAULT_BRANCH)]
  pub branch: String,

  /// Directory inside the repository that receives the document; must already exist
  #[arg(long, default_value = DEFAULT_TARGET_DIR)]
  pub target_dir: PathBuf,

  #[arg(long, default_value = DEFAULT_AUTHOR_NAME)]
  pub author_name: String,

  #[arg(long, default_value = DEFAULT_AUTHOR_EMAIL)]
  pub author_email: String,

  /// Base64-encoded SSH deploy key
  #[arg(long, env = "GIT_DEPLOY_KEY", hide_env_values = true)]
  pub deploy_key: Option<String>,

  /// known_hosts file for the publish host; scanned with ssh-keyscan when omitted
  #[arg(long, env = "GIT_KNOWN_HOSTS_FILE")]
  pub known_hosts: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct PullConfig {
  pub channels: BTreeMap<String, String>,
  pub marker: String,
  pub limit: usize,
  pub api_base: String,
  pub token: String,
}

#[derive(Debug, Clone)]
pub struct ReportConfig {
  pub week: Option<String>,
  pub fetch: Option<PullConfig>,
  pub provider: ProviderConfig,
  pub granularity: Granularity,
  pub strict_enhancement: bool,
  pub policy: ParsePolicy,
  pub format: DocFormat,
  pub out: String,
  /// `None` for dry runs.
  pub publish: Option<PublishConfig>,
}

#[derive(Debug, Clone)]
pub enum Action {
  Fetch(PullConfig),
  Submit { payload: String },
  Report(ReportConfig),
}

#[derive(Debug, Clone)]
pub struct EffectiveConfig {
  pub data_dir: PathBuf,
  pub artifact_format: ArtifactFormat,
  pub workers: usize,
  pub http_timeout: Duration,
  pub git_timeout: Duration,
  pub deadline: Option<Duration>,
  pub now_override: Option<String>,
  pub action: Action,
}

fn parse_channels(entries: &[String]) -> Result<BTreeMap<String, String>> {
  let mut out = BTreeMap::new();
  for entry in entries {
    let Some((team, channel)) = entry.split_once('=') else {
      bail!("Invalid --channel {:?}: expected TEAM=CHANNEL", entry);
    };
    let (team, channel) = (team.trim(), channel.trim());
    if !is_safe_team_id(team) || channel.is_empty() {
      bail!("Invalid --channel {:?}: expected TEAM=CHANNEL", entry);
    }
    if out.insert(team.to_string(), channel.to_string()).is_some() {
      bail!("Team {} mapped to more than one channel", team);
    }
  }
  Ok(out)
}

fn normalize_pull(args: &PullArgs) -> Result<PullConfig> {
  let channels = parse_channels(&args.channels)?;
  if channels.is_empty() {
    bail!("Provide at least one --channel TEAM=CHANNEL to fetch from chat");
  }
  let token = match args.slack_token.as_deref().map(str::trim) {
    Some(t) if !t.is_empty() => t.to_string(),
    _ => bail!("SLACK_API_TOKEN (or --slack-token) is required to fetch from chat"),
  };
  if args.history_limit == 0 {
    bail!("--history-limit must be at least 1");
  }
  Ok(PullConfig {
    channels,
    marker: args.marker.clone(),
    limit: args.history_limit,
    api_base: args.slack_api_base.clone(),
    token,
  })
}

fn provider_config(args: &ReportArgs) -> ProviderConfig {
  let kind = args.provider.unwrap_or(if args.use_ollama {
    ProviderKind::Ollama
  } else {
    ProviderKind::Openai
  });
  match kind {
    ProviderKind::Ollama => ProviderConfig::Ollama {
      endpoint: args.ollama_endpoint.clone(),
      model: args.ollama_model.clone(),
    },
    ProviderKind::Openai => ProviderConfig::OpenAi {
      endpoint: args.openai_endpoint.clone(),
      model: args.openai_model.clone(),
      api_key: args.openai_api_key.clone(),
      max_tokens: args.openai_max_tokens,
    },
    ProviderKind::None => ProviderConfig::None,
  }
}

fn normalize_publish(args: &ReportArgs, git_timeout: Duration) -> Result<Option<PublishConfig>> {
  if args.dry_run {
    return Ok(None);
  }
  let Some(repo_url) = args.repo_url.as_deref().map(str::trim).filter(|u| !u.is_empty()) else {
    bail!("Provide --repo-url (or PUBLISH_REPO_URL), or use --dry-run");
  };
  if args.target_dir.is_absolute() {
    bail!("--target-dir must be relative to the repository root");
  }

  let credential = match args.deploy_key.as_deref().map(str::trim) {
    Some(key) if !key.is_empty() => {
      let known_hosts = match &args.known_hosts {
        Some(p) => Some(std::fs::read_to_string(p).with_context(|| format!("reading known_hosts {}", p.display()))?),
        None => None,
      };
      GitCredential::Ssh {
        private_key_b64: key.to_string(),
        known_hosts,
      }
    }
    _ => GitCredential::None,
  };

  let mut cfg = PublishConfig::new(repo_url);
  cfg.branch = args.branch.clone();
  cfg.target_dir = args.target_dir.clone();
  cfg.author_name = args.author_name.clone();
  cfg.author_email = args.author_email.clone();
  cfg.credential = credential;
  cfg.git_timeout = git_timeout;
  Ok(Some(cfg))
}

pub fn normalize(cli: Cli) -> Result<EffectiveConfig> {
  if cli.workers == 0 {
    bail!("--workers must be at least 1");
  }
  if cli.http_timeout_secs == 0 || cli.git_timeout_secs == 0 {
    bail!("Timeouts must be at least one second");
  }
  let git_timeout = Duration::from_secs(cli.git_timeout_secs);

  let action = match cli.command {
    None => bail!("Provide a subcommand: fetch, submit or report"),
    Some(Command::Fetch(pull)) => Action::Fetch(normalize_pull(&pull)?),
    Some(Command::Submit { payload }) => Action::Submit { payload },
    Some(Command::Report(args)) => {
      if let Some(week) = &args.week {
        WeekPeriod::from_key(week).with_context(|| format!("Invalid --week {:?}", week))?;
      }
      let fetch = if args.fetch { Some(normalize_pull(&args.pull)?) } else { None };
      Action::Report(ReportConfig {
        week: args.week.clone(),
        fetch,
        provider: provider_config(&args),
        granularity: args.granularity,
        strict_enhancement: args.strict_enhancement,
        policy: args.parse_policy,
        format: args.format,
        out: args.out.clone(),
        publish: normalize_publish(&args, git_timeout)?,
      })
    }
  };

  Ok(EffectiveConfig {
    data_dir: PathBuf::from(util::canonicalize_lossy(&cli.data_dir)),
    artifact_format: cli.artifact_format,
    workers: cli.workers,
    http_timeout: Duration::from_secs(cli.http_timeout_secs),
    git_timeout,
    deadline: cli.deadline_secs.map(Duration::from_secs),
    now_override: cli.now_override,
    action,
  })
}
