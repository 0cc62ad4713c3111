use test_support::http::{HttpStub, StubResponse};
use test_support::{cmd_bin, tempdir};

use crate::cli_submit::WEDNESDAY;

fn history(messages: serde_json::Value) -> StubResponse {
  StubResponse::json(200, serde_json::json!({ "ok": true, "messages": messages }))
}

#[test]
fn fetch_stores_latest_weekly_update_per_team() {
  let td = tempdir();
  let stub = HttpStub::serve(vec![
    history(serde_json::json!([
      { "text": "lunch?", "ts": "1717600000.000100" },
      { "text": "Weekly update\nProgress:\n• newest", "ts": "1717500000.000100" },
      { "text": "weekly update\nProgress:\n• stale", "ts": "1717400000.000100" },
    ])),
    history(serde_json::json!([{ "text": "weekly update\nPlan:\n• plan", "ts": "1717500000.000200" }])),
  ]);

  let out = cmd_bin("team-update-report")
    .env("SLACK_API_TOKEN", "xoxb-test")
    .args(["fetch", "--now-override", WEDNESDAY, "--workers", "1"])
    .args(["--channel", "Alpha=C1", "--channel", "Beta=C2", "--slack-api-base"])
    .arg(stub.base_url())
    .arg("--data-dir")
    .arg(td.path())
    .output()
    .unwrap();
  let requests = stub.finish();
  assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

  let summary: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
  assert_eq!(summary["week"], "2024-06-03");
  assert_eq!(summary["teams"], serde_json::json!(["Alpha", "Beta"]));
  assert_eq!(requests.len(), 2);
  assert!(requests.iter().all(|r| r.header("authorization").as_deref() == Some("Bearer xoxb-test")));

  let alpha = std::fs::read_to_string(td.path().join("2024-06-03/Alpha.txt")).unwrap();
  assert!(alpha.contains("newest"));
  assert!(!alpha.contains("stale"));
  assert!(td.path().join("2024-06-03/Beta.txt").is_file());
}

#[test]
fn chat_error_fails_the_fetch_and_stores_nothing() {
  let td = tempdir();
  let stub = HttpStub::serve(vec![StubResponse::json(
    200,
    serde_json::json!({ "ok": false, "error": "channel_not_found" }),
  )]);
  let out = cmd_bin("team-update-report")
    .env("SLACK_API_TOKEN", "xoxb-test")
    .args(["fetch", "--now-override", WEDNESDAY, "--channel", "Alpha=C404", "--slack-api-base"])
    .arg(stub.base_url())
    .arg("--data-dir")
    .arg(td.path())
    .output()
    .unwrap();
  stub.finish();
  assert!(!out.status.success());
  assert!(String::from_utf8_lossy(&out.stderr).contains("channel_not_found"));
  assert!(!td.path().join("2024-06-03").exists());
}

#[test]
fn report_fetches_then_enhances_each_section_with_ollama() {
  let td = tempdir();
  let stub = HttpStub::serve(vec![
    history(serde_json::json!([
      { "text": "Weekly update\nTeam: Alpha\nProgress:\n• rough progress\nPlan:\n• rough plan", "ts": "1717500000.000100" },
    ])),
    StubResponse::json(200, serde_json::json!({ "response": "• Polished progress", "done": true })),
    StubResponse::json(200, serde_json::json!({ "response": "• Polished plan", "done": true })),
  ]);

  let out = cmd_bin("team-update-report")
    .env("SLACK_API_TOKEN", "xoxb-test")
    .env("USE_OLLAMA", "true")
    .args(["report", "--fetch", "--dry-run", "--now-override", WEDNESDAY, "--channel", "Alpha=C1"])
    .arg("--slack-api-base")
    .arg(stub.base_url())
    .arg("--ollama-endpoint")
    .arg(stub.base_url())
    .arg("--data-dir")
    .arg(td.path())
    .output()
    .unwrap();
  let requests = stub.finish();
  assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

  let body = String::from_utf8_lossy(&out.stdout);
  assert!(body.contains("- Polished progress"));
  assert!(body.contains("- Polished plan"));
  assert!(!body.contains("rough"));

  assert_eq!(requests.len(), 3);
  assert_eq!(requests[1].path, "/api/generate");
  assert!(requests[1].json()["prompt"].as_str().unwrap().contains("• rough progress"));
  assert!(requests[2].json()["prompt"].as_str().unwrap().contains("• rough plan"));
}
