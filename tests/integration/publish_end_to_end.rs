use std::path::PathBuf;
use std::time::Duration;

use team_update_report::error::PublishError;
use team_update_report::model::{DocFormat, RenderedDocument};
use team_update_report::publish::{PublishConfig, PublishOutcome, PublishWorkflow};
use test_support::{cmd_bin, commit_count, init_bare_remote, read_remote_file, tempdir};

use crate::cli_submit::{submit, WEDNESDAY};

fn doc(body: &str) -> RenderedDocument {
  RenderedDocument {
    week_key: "2024-06-03".into(),
    format: DocFormat::Markdown,
    body: body.into(),
  }
}

fn config(remote: &std::path::Path) -> PublishConfig {
  let mut cfg = PublishConfig::new(remote.to_string_lossy());
  cfg.git_timeout = Duration::from_secs(60);
  cfg
}

#[test]
fn publish_lands_one_file_and_republish_overwrites() {
  let (_td, remote) = init_bare_remote();
  let wf = PublishWorkflow::new(config(&remote));

  let first = wf.publish(&doc("# v1\n")).unwrap();
  assert!(matches!(first, PublishOutcome::Pushed { .. }));
  assert_eq!(first.path(), PathBuf::from("docs/updates/2024-06-03.md"));
  assert_eq!(read_remote_file(&remote, "main", "docs/updates/2024-06-03.md"), "# v1\n");
  assert_eq!(commit_count(&remote, "main"), 2);

  let same = wf.publish(&doc("# v1\n")).unwrap();
  assert!(matches!(same, PublishOutcome::Unchanged { .. }));
  assert_eq!(commit_count(&remote, "main"), 2);

  wf.publish(&doc("# v2\n")).unwrap();
  assert_eq!(read_remote_file(&remote, "main", "docs/updates/2024-06-03.md"), "# v2\n");
  assert_eq!(commit_count(&remote, "main"), 3);
}

#[test]
fn missing_target_directory_leaves_remote_untouched() {
  let (_td, remote) = init_bare_remote();
  let mut cfg = config(&remote);
  cfg.target_dir = PathBuf::from("site/weekly");
  let err = PublishWorkflow::new(cfg).publish(&doc("# x\n")).unwrap_err();
  assert!(matches!(err, PublishError::MissingTargetDir(_)));
  assert_eq!(commit_count(&remote, "main"), 1);
}

#[test]
fn unknown_remote_is_a_clone_error() {
  let td = tempdir();
  let err = PublishWorkflow::new(config(&td.path().join("nope.git")))
    .publish(&doc("# x\n"))
    .unwrap_err();
  assert!(matches!(err, PublishError::Clone { .. }));
}

#[test]
fn cli_report_publishes_to_the_docs_repository() {
  let (_remote_td, remote) = init_bare_remote();
  let data = tempdir();
  submit(data.path(), "Team: Alpha\nProgress:\n• shipped the thing").success();

  let out = cmd_bin("team-update-report")
    .args(["report", "--provider", "none", "--now-override", WEDNESDAY, "--data-dir"])
    .arg(data.path())
    .arg("--repo-url")
    .arg(&remote)
    .output()
    .unwrap();
  assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

  let summary: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
  assert_eq!(summary["status"], "pushed");
  assert_eq!(summary["path"], "docs/updates/2024-06-03.md");
  let published = read_remote_file(&remote, "main", "docs/updates/2024-06-03.md");
  assert!(published.contains("shipped the thing"));
}
