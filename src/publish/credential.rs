use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use base64::Engine as _;
use once_cell::sync::Lazy;
use regex::Regex;
use tempfile::TempDir;

use crate::error::PublishError;

// scp-like `git@host:org/repo.git` or `ssh://git@host[:port]/org/repo.git`
static SSH_HOST_RE: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"^(?:ssh://)?(?:[^@/\s]+@)?(?P<host>[A-Za-z0-9.\-]+)(?::\d+/|:|/)").unwrap());

/// How git authenticates against the publish remote.
#[derive(Debug, Clone, Default)]
pub enum GitCredential {
  /// Local paths and remotes that need no key.
  #[default]
  None,
  Ssh {
    /// Base64-encoded private key (deploy key).
    private_key_b64: String,
    /// known_hosts content; scanned with `ssh-keyscan` when absent.
    known_hosts: Option<String>,
  },
}

/// Credential files live as long as this value; the directory is removed on drop.
#[derive(Debug)]
pub struct MaterializedCredential {
  dir: Option<TempDir>,
  envs: Vec<(String, String)>,
}

impl MaterializedCredential {
  pub fn envs(&self) -> &[(String, String)] {
    &self.envs
  }

  pub fn dir(&self) -> Option<&Path> {
    self.dir.as_ref().map(|d| d.path())
  }
}

pub fn ssh_host(repo_url: &str) -> Option<String> {
  SSH_HOST_RE
    .captures(repo_url.trim())
    .and_then(|c| c.name("host"))
    .map(|m| m.as_str().to_string())
}

fn write_private(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
  std::fs::write(path, bytes)?;
  #[cfg(unix)]
  {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
  }
  Ok(())
}

fn keyscan(host: &str, timeout: Duration) -> Result<String, PublishError> {
  let out = Command::new("ssh-keyscan")
    .args(["-T", &timeout.as_secs().max(1).to_string(), host])
    .output()
    .map_err(|e| PublishError::Credential(format!("ssh-keyscan {}: {}", host, e)))?;
  let text = String::from_utf8_lossy(&out.stdout).to_string();
  if !out.status.success() || text.trim().is_empty() {
    return Err(PublishError::Credential(format!("ssh-keyscan returned no host keys for {}", host)));
  }
  Ok(text)
}

impl GitCredential {
  /// Write key material into a fresh private directory and build the git environment for it.
  pub fn materialize(&self, repo_url: &str, timeout: Duration) -> Result<MaterializedCredential, PublishError> {
    let (private_key_b64, known_hosts) = match self {
      GitCredential::None => {
        return Ok(MaterializedCredential {
          dir: None,
          envs: Vec::new(),
        })
      }
      GitCredential::Ssh {
        private_key_b64,
        known_hosts,
      } => (private_key_b64, known_hosts),
    };

    let compact: String = private_key_b64.chars().filter(|c| !c.is_whitespace()).collect();
    let key = base64::engine::general_purpose::STANDARD
      .decode(compact.as_bytes())
      .map_err(|e| PublishError::Credential(format!("deploy key is not valid base64: {}", e)))?;
    if key.is_empty() {
      return Err(PublishError::Credential("deploy key is empty".into()));
    }

    let known_hosts = match known_hosts {
      Some(kh) if !kh.trim().is_empty() => kh.clone(),
      _ => {
        let host = ssh_host(repo_url)
          .ok_or_else(|| PublishError::Credential(format!("cannot determine ssh host of {}", repo_url)))?;
        keyscan(&host, timeout)?
      }
    };

    let dir = tempfile::Builder::new()
      .prefix("git-credential-")
      .tempdir()
      .map_err(|e| PublishError::Credential(e.to_string()))?;
    let key_path: PathBuf = dir.path().join("id_deploy");
    let hosts_path: PathBuf = dir.path().join("known_hosts");
    write_private(&key_path, &key).map_err(|e| PublishError::Credential(e.to_string()))?;
    write_private(&hosts_path, known_hosts.as_bytes()).map_err(|e| PublishError::Credential(e.to_string()))?;

    let ssh_command = format!(
      "ssh -i {} -o IdentitiesOnly=yes -o UserKnownHostsFile={} -o StrictHostKeyChecking=yes",
      key_path.display(),
      hosts_path.display()
    );
    tracing::debug!(dir = %dir.path().display(), "materialized deploy key");
    Ok(MaterializedCredential {
      dir: Some(dir),
      envs: vec![("GIT_SSH_COMMAND".into(), ssh_command)],
    })
  }
}
