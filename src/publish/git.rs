use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::util::run_git;

/// The git operations the publish workflow needs. `envs` carries credential environment.
pub trait GitOps {
  fn clone_repo(&self, url: &str, branch: &str, dest: &Path, envs: &[(String, String)]) -> Result<()>;
  fn add(&self, repo: &Path, path: &Path) -> Result<()>;
  /// True when `path` has staged changes relative to HEAD.
  fn has_changes(&self, repo: &Path, path: &Path) -> Result<bool>;
  /// Commit staged changes and return the new commit id.
  fn commit(&self, repo: &Path, message: &str) -> Result<String>;
  fn push(&self, repo: &Path, branch: &str, envs: &[(String, String)]) -> Result<()>;
}

/// `git` subprocesses, each bounded by `timeout`.
#[derive(Debug, Clone)]
pub struct CliGit {
  pub author_name: String,
  pub author_email: String,
  pub timeout: Duration,
}

fn path_arg(p: &Path) -> String {
  p.to_string_lossy().to_string()
}

impl GitOps for CliGit {
  fn clone_repo(&self, url: &str, branch: &str, dest: &Path, envs: &[(String, String)]) -> Result<()> {
    let parent = dest.parent().context("clone destination has no parent directory")?;
    let args: Vec<String> = vec![
      "clone".into(),
      "--branch".into(),
      branch.into(),
      "--single-branch".into(),
      url.into(),
      path_arg(dest),
    ];
    run_git(parent, &args, envs, Some(self.timeout))?;
    Ok(())
  }

  fn add(&self, repo: &Path, path: &Path) -> Result<()> {
    let args: Vec<String> = vec!["add".into(), "--".into(), path_arg(path)];
    run_git(repo, &args, &[], Some(self.timeout))?;
    Ok(())
  }

  fn has_changes(&self, repo: &Path, path: &Path) -> Result<bool> {
    let args: Vec<String> = vec!["status".into(), "--porcelain".into(), "--".into(), path_arg(path)];
    let out = run_git(repo, &args, &[], Some(self.timeout))?;
    Ok(!out.trim().is_empty())
  }

  fn commit(&self, repo: &Path, message: &str) -> Result<String> {
    let args: Vec<String> = vec![
      "-c".into(),
      format!("user.name={}", self.author_name),
      "-c".into(),
      format!("user.email={}", self.author_email),
      "-c".into(),
      "commit.gpgsign=false".into(),
      "commit".into(),
      "-m".into(),
      message.into(),
    ];
    run_git(repo, &args, &[], Some(self.timeout))?;
    let sha = run_git(repo, &["rev-parse".to_string(), "HEAD".to_string()], &[], Some(self.timeout))?;
    Ok(sha.trim().to_string())
  }

  fn push(&self, repo: &Path, branch: &str, envs: &[(String, String)]) -> Result<()> {
    let args: Vec<String> = vec!["push".into(), "origin".into(), format!("HEAD:{}", branch)];
    run_git(repo, &args, envs, Some(self.timeout))?;
    Ok(())
  }
}
