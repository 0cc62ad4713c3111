// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Utilities for paths, git subprocesses with timeouts, run cancellation, worker pools, and man page rendering
// role: utilities/helpers
// inputs: Various primitives; paths; clap CommandFactory
// outputs: Canonicalized paths, git stdout, cancellation state, bounded rayon pools, man page text
// side_effects: run_git invokes subprocesses (and kills them on timeout)
// invariants:
// - run_git never waits past its timeout; a timed-out child is killed and reaped
// - run_git drains stdout/stderr while waiting, so output size never stalls a child
// - CancelToken clones share one flag; a passed deadline counts as cancelled
// - worker pools have at least one thread
// errors: run_git surfaces command + stderr; IO errors bubble with context
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::CommandFactory;

pub fn canonicalize_lossy<P: AsRef<Path>>(p: P) -> String {
  let p = p.as_ref();
  let pb: PathBuf = match std::fs::canonicalize(p) {
    Ok(x) => x,
    Err(_) => match std::env::current_dir() {
      Ok(cwd) => cwd.join(p),
      Err(_) => PathBuf::from(p),
    },
  };
  pb.to_string_lossy().to_string()
}

/// Run `git <args>` in `dir` with extra environment, optionally bounded by `timeout`.
pub fn run_git(dir: &Path, args: &[String], envs: &[(String, String)], timeout: Option<Duration>) -> Result<String> {
  let mut child = Command::new("git")
    .args(args)
    .current_dir(dir)
    .env("GIT_TERMINAL_PROMPT", "0")
    .envs(envs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
    .stdin(Stdio::null())
    .stdout(Stdio::piped())
    .stderr(Stdio::piped())
    .spawn()
    .with_context(|| format!("spawning git {:?}", args))?;

  // pipes are drained while we wait so a chatty child never blocks on a full buffer
  let stdout = drain(child.stdout.take().context("git stdout not captured")?);
  let stderr = drain(child.stderr.take().context("git stderr not captured")?);

  let status = match timeout {
    None => child.wait().with_context(|| format!("waiting on git {:?}", args))?,
    Some(limit) => {
      let deadline = Instant::now() + limit;
      loop {
        if let Some(status) = child.try_wait().with_context(|| format!("waiting on git {:?}", args))? {
          break status;
        }
        if Instant::now() >= deadline {
          let _ = child.kill();
          let _ = child.wait();
          anyhow::bail!("git {:?} timed out after {}s", args, limit.as_secs());
        }
        std::thread::sleep(Duration::from_millis(25));
      }
    }
  };

  let stdout = stdout.join().unwrap_or_default();
  let stderr = stderr.join().unwrap_or_default();
  if status.success() {
    Ok(String::from_utf8_lossy(&stdout).to_string())
  } else {
    let stderr = String::from_utf8_lossy(&stderr);
    anyhow::bail!("git {:?} failed: {}", args, stderr.trim())
  }
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<Vec<u8>> {
  std::thread::spawn(move || {
    let mut buf = Vec::new();
    let _ = pipe.read_to_end(&mut buf);
    buf
  })
}

/// Run-level cancellation shared by every worker of one run.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
  flag: Arc<AtomicBool>,
  deadline: Option<Instant>,
}

impl CancelToken {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_deadline(limit: Duration) -> Self {
    Self {
      flag: Arc::new(AtomicBool::new(false)),
      deadline: Some(Instant::now() + limit),
    }
  }

  pub fn cancel(&self) {
    self.flag.store(true, Ordering::SeqCst);
  }

  pub fn is_cancelled(&self) -> bool {
    if self.flag.load(Ordering::SeqCst) {
      return true;
    }
    matches!(self.deadline, Some(d) if Instant::now() >= d)
  }
}

/// Bounded worker pool for independent outbound calls.
pub fn build_pool(workers: usize) -> Result<rayon::ThreadPool, rayon::ThreadPoolBuildError> {
  rayon::ThreadPoolBuilder::new()
    .num_threads(workers.max(1))
    .thread_name(|i| format!("update-worker-{}", i))
    .build()
}

/// Render a section-1 man page for a clap `CommandFactory` implementor.
/// Returns the troff content as a UTF-8 string.
pub fn render_man_page<T: CommandFactory>() -> anyhow::Result<String> {
  let cmd = T::command();
  let man = clap_mangen::Man::new(cmd);
  let mut buf: Vec<u8> = Vec::new();

  man.render(&mut buf)?;

  Ok(String::from_utf8_lossy(&buf).to_string())
}
