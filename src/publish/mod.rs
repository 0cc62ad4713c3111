// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Publish one RenderedDocument to the docs repository: credential, fresh clone, write, commit, push
// role: publishing/workflow
// inputs: RenderedDocument, PublishConfig (repo url, branch, target dir, identity, credential, timeout)
// outputs: PublishOutcome (Pushed with commit id, or Unchanged when the file already matched)
// side_effects: Temporary credential dir and clone dir (both removed on drop); git network calls
// invariants:
// - credential failure aborts before any clone
// - every run clones into a brand-new directory
// - the target directory must already exist in the clone; it is never created
// - a failed commit means push is never attempted
// - exactly one file (<target_dir>/<week_key>.<ext>) is written per run, overwriting
// errors: PublishError per step; all are fatal to the run
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

pub mod credential;
pub mod git;

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::PublishError;
use crate::model::RenderedDocument;

pub use self::credential::GitCredential;
pub use self::git::{CliGit, GitOps};

pub const DEFAULT_TARGET_DIR: &str = "docs/updates";
pub const DEFAULT_BRANCH: &str = "main";
pub const DEFAULT_AUTHOR_NAME: &str = "team-update-report";
pub const DEFAULT_AUTHOR_EMAIL: &str = "team-update-report@localhost";

#[derive(Debug, Clone)]
pub struct PublishConfig {
  pub repo_url: String,
  pub branch: String,
  /// Relative to the clone root.
  pub target_dir: PathBuf,
  pub author_name: String,
  pub author_email: String,
  pub credential: GitCredential,
  /// Parent for the temporary clone; system temp dir when `None`.
  pub work_root: Option<PathBuf>,
  pub git_timeout: Duration,
}

impl PublishConfig {
  pub fn new(repo_url: impl Into<String>) -> Self {
    Self {
      repo_url: repo_url.into(),
      branch: DEFAULT_BRANCH.into(),
      target_dir: PathBuf::from(DEFAULT_TARGET_DIR),
      author_name: DEFAULT_AUTHOR_NAME.into(),
      author_email: DEFAULT_AUTHOR_EMAIL.into(),
      credential: GitCredential::None,
      work_root: None,
      git_timeout: Duration::from_secs(120),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
  Pushed { path: PathBuf, commit: String },
  /// The document already matched the remote; nothing was committed or pushed.
  Unchanged { path: PathBuf },
}

impl PublishOutcome {
  pub fn path(&self) -> &Path {
    match self {
      PublishOutcome::Pushed { path, .. } | PublishOutcome::Unchanged { path } => path,
    }
  }
}

pub struct PublishWorkflow<G: GitOps = CliGit> {
  config: PublishConfig,
  git: G,
}

impl PublishWorkflow<CliGit> {
  pub fn new(config: PublishConfig) -> Self {
    let git = CliGit {
      author_name: config.author_name.clone(),
      author_email: config.author_email.clone(),
      timeout: config.git_timeout,
    };
    Self { config, git }
  }
}

impl<G: GitOps> PublishWorkflow<G> {
  pub fn with_git(config: PublishConfig, git: G) -> Self {
    Self { config, git }
  }

  pub fn git(&self) -> &G {
    &self.git
  }

  pub fn publish(&self, doc: &RenderedDocument) -> Result<PublishOutcome, PublishError> {
    let cfg = &self.config;
    let credential = cfg.credential.materialize(&cfg.repo_url, cfg.git_timeout)?;

    let mut builder = tempfile::Builder::new();
    builder.prefix("publish-");
    let work = match &cfg.work_root {
      Some(root) => builder.tempdir_in(root),
      None => builder.tempdir(),
    }
    .map_err(|e| PublishError::Clone {
      url: cfg.repo_url.clone(),
      message: format!("creating work directory: {}", e),
    })?;
    let clone_dir = work.path().join("repo");

    tracing::info!(url = %cfg.repo_url, branch = %cfg.branch, "cloning publish repository");
    self
      .git
      .clone_repo(&cfg.repo_url, &cfg.branch, &clone_dir, credential.envs())
      .map_err(|e| PublishError::Clone {
        url: cfg.repo_url.clone(),
        message: format!("{:#}", e),
      })?;

    if !clone_dir.join(&cfg.target_dir).is_dir() {
      return Err(PublishError::MissingTargetDir(cfg.target_dir.clone()));
    }

    let rel = cfg.target_dir.join(doc.file_name());
    let abs = clone_dir.join(&rel);
    std::fs::write(&abs, &doc.body).map_err(|source| PublishError::Write {
      path: rel.clone(),
      source,
    })?;

    let git_err = |step: &'static str| move |e: anyhow::Error| PublishError::Git {
      step,
      message: format!("{:#}", e),
    };
    self.git.add(&clone_dir, &rel).map_err(git_err("add"))?;
    if !self.git.has_changes(&clone_dir, &rel).map_err(git_err("status"))? {
      tracing::info!(path = %rel.display(), "document unchanged; nothing to publish");
      return Ok(PublishOutcome::Unchanged { path: rel });
    }

    let message = format!("Weekly update for week of {}", doc.week_key);
    let commit = self.git.commit(&clone_dir, &message).map_err(git_err("commit"))?;
    self
      .git
      .push(&clone_dir, &cfg.branch, credential.envs())
      .map_err(git_err("push"))?;

    tracing::info!(path = %rel.display(), commit = %commit, "published weekly document");
    Ok(PublishOutcome::Pushed { path: rel, commit })
  }
}
