// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Typed error taxonomy for each pipeline stage plus the run-level wrapper
// role: errors
// outputs: IngestionError, ParseError, EnhancementError, AggregationError, PublishError, RunError
// invariants:
// - timeouts surface as the owning stage's error kind, never a separate kind
// - ParseError and EnhancementError are per-team; the rest abort a run
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::path::PathBuf;

/// Chat-API or storage failure while fetching or writing a raw artifact.
#[derive(Debug, thiserror::Error)]
pub enum IngestionError {
  #[error("chat history request for channel {channel} failed: {message}")]
  ChatApi { channel: String, message: String },
  #[error("no channel configured for team {0}")]
  UnknownTeam(String),
  #[error("storage error at {path}: {source}")]
  Storage {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
  #[error("artifact encoding error: {0}")]
  Encoding(String),
  #[error("worker pool error: {0}")]
  Pool(String),
}

/// Team marker or expected structure missing from raw text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
  #[error("team not found")]
  TeamNotFound,
  #[error("invalid team id {0:?}")]
  InvalidTeamId(String),
  #[error("update for team {0} has no recognized sections")]
  NoSections(String),
  #[error("invalid submission payload: {0}")]
  Payload(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EnhancementError {
  #[error("missing credential")]
  MissingCredential,
  #[error("provider unreachable: {0}")]
  Transport(String),
  #[error("provider returned status {status}: {body}")]
  Status { status: u16, body: String },
  #[error("malformed provider response: {0}")]
  Malformed(String),
  #[error("incomplete response from provider")]
  Incomplete,
  #[error("run cancelled before the call was issued")]
  Cancelled,
}

/// Raised when a week cannot be aggregated.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AggregationError {
  #[error("week {0} has no successfully parsed team updates")]
  NoTeams(String),
  #[error("team {0} appears more than once")]
  DuplicateTeam(String),
}

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
  #[error("credential setup failed: {0}")]
  Credential(String),
  #[error("clone of {url} failed: {message}")]
  Clone { url: String, message: String },
  #[error("target directory {0} does not exist in the clone")]
  MissingTargetDir(PathBuf),
  #[error("writing {path} failed: {source}")]
  Write {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
  #[error("git {step} failed: {message}")]
  Git { step: &'static str, message: String },
}

/// Run-level failure surfaced to the caller (CLI exit or HTTP error).
#[derive(Debug, thiserror::Error)]
pub enum RunError {
  #[error(transparent)]
  Ingestion(#[from] IngestionError),
  #[error(transparent)]
  Aggregation(#[from] AggregationError),
  #[error(transparent)]
  Publish(#[from] PublishError),
  #[error("worker pool error: {0}")]
  Pool(#[from] rayon::ThreadPoolBuildError),
  #[error("run cancelled")]
  Cancelled,
}
