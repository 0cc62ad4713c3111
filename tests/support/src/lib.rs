//! test-support: helpers for robust, nextest-friendly tests.
//!
//! Add as a dev-dependency in your top-level `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! test_support = { path = "tests/support" }
//! ```
//!
//! Then in tests:
//! ```rust,ignore
//! use test_support::{init_tracing, http::{HttpStub, StubResponse}};
//!
//! #[test]
//! fn example() {
//!     init_tracing();
//!     let stub = HttpStub::serve(vec![StubResponse::text(200, "ok")]);
//!     // ... point a client at stub.base_url() ...
//!     let requests = stub.finish();
//! }
//! ```

use once_cell::sync::Lazy;
use tracing_subscriber::{fmt, EnvFilter};

use std::env;
use std::path::Path;
use std::process::Command;

pub mod http;

/// Initialize `tracing` once, honoring `RUST_LOG` and writing via the test writer.
///
/// Safe to call from multiple tests; only the first call configures the global subscriber.
pub fn init_tracing() {
    static INIT: Lazy<()> = Lazy::new(|| {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new("warn,team_update_report=info"))
            .unwrap();
        // with_test_writer() causes logs to appear alongside failing tests only (cargo/nextest)
        let _ = fmt().with_env_filter(filter).with_test_writer().try_init();
    });
    Lazy::force(&INIT);
}

/// Create a temp directory that deletes on drop.
pub fn tempdir() -> tempfile::TempDir {
    tempfile::tempdir().expect("create tempdir")
}

/// Set multiple environment variables for the duration of the returned guard.
pub fn with_env(vars: &[(&str, &str)]) -> EnvGuard {
    EnvGuard::set_many(vars)
}

/// Run a binary target with `assert_cmd`, returning the ready-to-run `Command`.
///
/// Update-related environment inherited from the developer's shell is cleared so
/// tests only see what they set explicitly.
pub fn cmd_bin(bin: &str) -> assert_cmd::Command {
    init_tracing();
    let mut cmd = assert_cmd::Command::cargo_bin(bin).expect("binary target not found");
    for var in [
        "UPDATES_DATA_DIR",
        "SLACK_API_TOKEN",
        "SLACK_API_BASE",
        "OPENAI_API_KEY",
        "OPENAI_ENDPOINT",
        "OLLAMA_ENDPOINT",
        "USE_OLLAMA",
        "PUBLISH_REPO_URL",
        "GIT_DEPLOY_KEY",
        "GIT_KNOWN_HOSTS_FILE",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

/// Guard for temporarily setting environment variables.
pub struct EnvGuard {
    prev: Vec<(String, Option<String>)>,
}

impl EnvGuard {
    pub fn set_many(kv: &[(&str, &str)]) -> Self {
        let mut prev = Vec::with_capacity(kv.len());
        for (k, v) in kv {
            let k_owned = k.to_string();
            prev.push((k_owned.clone(), env::var(k).ok()));
            env::set_var(k, v);
        }
        Self { prev }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (k, old) in self.prev.drain(..) {
            match old {
                Some(v) => env::set_var(&k, v),
                None => env::remove_var(&k),
            }
        }
    }
}

/// Run `git <args>` in `repo`, panicking on failure.
pub fn run(repo: &Path, args: &[&str]) {
    let status = Command::new("git")
        .args(args)
        .current_dir(repo)
        .env("GIT_TERMINAL_PROMPT", "0")
        .status()
        .unwrap();
    assert!(status.success(), "git {:?} failed", args);
}

/// stdout of `git <args>` in `repo`, panicking on failure.
pub fn git_output(repo: &Path, args: &[&str]) -> String {
    let out = Command::new("git").args(args).current_dir(repo).output().unwrap();
    assert!(
        out.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&out.stderr)
    );
    String::from_utf8_lossy(&out.stdout).to_string()
}

/// A bare repository on branch `main` whose tree holds `docs/updates/.gitkeep`.
///
/// Returns the temp dir owning everything and the bare repo path (usable as a clone URL).
pub fn init_bare_remote() -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempdir();
    let bare = dir.path().join("docs.git");
    let seed = dir.path().join("seed");
    std::fs::create_dir_all(&seed).unwrap();

    run(dir.path(), &["init", "-q", "--bare", "-b", "main", "docs.git"]);
    run(&seed, &["init", "-q", "-b", "main"]);
    run(&seed, &["config", "user.name", "Fixture Bot"]);
    run(&seed, &["config", "user.email", "fixture@example.com"]);
    run(&seed, &["config", "commit.gpgsign", "false"]);

    std::fs::create_dir_all(seed.join("docs/updates")).unwrap();
    std::fs::write(seed.join("docs/updates/.gitkeep"), "").unwrap();
    run(&seed, &["add", "."]);
    run(&seed, &["commit", "-q", "-m", "seed docs layout"]);
    run(&seed, &["push", "-q", bare.to_str().unwrap(), "main"]);

    (dir, bare)
}

/// Contents of `path` at the tip of `branch` in a (bare) repository.
pub fn read_remote_file(repo: &Path, branch: &str, path: &str) -> String {
    git_output(repo, &["show", &format!("{}:{}", branch, path)])
}

/// Number of commits reachable from `branch`.
pub fn commit_count(repo: &Path, branch: &str) -> usize {
    git_output(repo, &["rev-list", "--count", branch]).trim().parse().unwrap()
}
