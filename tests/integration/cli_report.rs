use predicates::prelude::*;
use test_support::{cmd_bin, tempdir};

use crate::cli_submit::{submit, WEDNESDAY};

fn report(data_dir: &std::path::Path) -> assert_cmd::Command {
  let mut cmd = cmd_bin("team-update-report");
  cmd
    .args(["report", "--now-override", WEDNESDAY, "--provider", "none", "--data-dir"])
    .arg(data_dir);
  cmd
}

#[test]
fn dry_run_prints_alpha_before_beta() {
  let td = tempdir();
  submit(td.path(), "Team: Beta\nProgress:\n• beta shipped").success();
  submit(td.path(), "Team: Alpha\nProgress:\n• alpha shipped\nPlan:\n• alpha plans").success();

  let out = report(td.path()).arg("--dry-run").output().unwrap();
  assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
  let body = String::from_utf8_lossy(&out.stdout);
  assert!(body.starts_with("# Weekly progress updates"));
  assert!(body.contains("## Week of Monday 2024-06-03"));
  let alpha = body.find("alpha shipped").unwrap();
  let beta = body.find("beta shipped").unwrap();
  assert!(alpha < beta);
  assert!(body.find("__Progress__").unwrap() < body.find("__Plan__").unwrap());

  // enhanced siblings sit next to the raw artifacts
  assert!(td.path().join("2024-06-03/enhanced_Alpha.txt").is_file());
  assert!(td.path().join("2024-06-03/enhanced_Beta.txt").is_file());
}

#[test]
fn dry_run_html_to_file() {
  let td = tempdir();
  submit(td.path(), "Team: R&D\nProblems:\n• <flaky> tests").success();
  let out_path = td.path().join("week.html");
  report(td.path())
    .args(["--dry-run", "--format", "html", "--out"])
    .arg(&out_path)
    .assert()
    .success();
  let html = std::fs::read_to_string(&out_path).unwrap();
  assert!(html.contains("<h4>R&amp;D</h4>"));
  assert!(html.contains("&lt;flaky&gt; tests"));
}

#[test]
fn explicit_week_selects_older_folder() {
  let td = tempdir();
  submit(td.path(), "Team: Ops\nProgress:\n• june work").success();
  cmd_bin("team-update-report")
    .args(["report", "--provider", "none", "--dry-run", "--week", "2024-06-03"])
    .args(["--now-override", "2024-07-01T09:00:00", "--data-dir"])
    .arg(td.path())
    .assert()
    .success()
    .stdout(predicate::str::contains("june work"));
}

#[test]
fn empty_week_fails_without_output() {
  let td = tempdir();
  report(td.path())
    .arg("--dry-run")
    .assert()
    .failure()
    .stdout(predicate::str::is_empty())
    .stderr(predicate::str::contains("no successfully parsed team updates"));
}

#[test]
fn publishing_requires_a_repository() {
  let td = tempdir();
  report(td.path())
    .assert()
    .failure()
    .stderr(predicate::str::contains("--repo-url"));
}
