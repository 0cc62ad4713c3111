use test_support::cmd_bin;

#[test]
fn cli_generates_man_page() {
  let out = cmd_bin("team-update-report").args(["--gen-man"]).output().unwrap();
  assert!(out.status.success());
  let s = String::from_utf8_lossy(&out.stdout);
  // clap_mangen emits a roff manpage starting with .TH and mentions the binary name
  assert!(s.contains(".TH") || s.contains(".Nm"));
  assert!(s.contains("team-update-report"));
}

#[test]
fn errors_without_subcommand() {
  let out = cmd_bin("team-update-report").output().unwrap();
  assert!(!out.status.success());
  let err = String::from_utf8_lossy(&out.stderr);
  assert!(err.contains("Provide a subcommand: fetch, submit or report"));
}
