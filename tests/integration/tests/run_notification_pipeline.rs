use std::path::Path;

use clap::Parser;
use httpmock::Method::POST;
use httpmock::MockServer;
use serde_json::{json, Value};
use verdict_cli::{execute_run, Cli};
use verdict_notify::{load_run_summary_file, ChannelEnvironment, DeliveryStatus};
use verdict_report::{replay_lifecycle_stream, RunAggregator, RunStatus};

/// Ten results: six passed (one after a retry), three failed, one skipped,
/// across two projects.
fn ten_event_stream() -> String {
    let mut lines = vec![json!({"event": "begin", "timestamp": "2026-03-14T09:30:00Z"})];
    let results = [
        ("login", "chromium", "passed", 1_200, 0, None),
        ("logout", "chromium", "passed", 300, 0, None),
        ("search", "chromium", "passed", 2_500, 1, None),
        ("profile", "firefox", "passed", 800, 0, None),
        ("settings", "firefox", "passed", 4_100, 0, None),
        ("cart", "firefox", "passed", 950, 0, None),
        ("checkout", "chromium", "failed", 3_000, 0, Some("expected 200\nreceived 500")),
        ("payment", "firefox", "timedOut", 30_000, 0, Some("Timeout 30000ms exceeded")),
        ("refund", "firefox", "failed", 700, 0, None),
        ("wishlist", "chromium", "skipped", 0, 0, None),
    ];
    for (title, project, status, duration, retry, error) in results {
        let mut event = json!({
            "event": "test_end",
            "title": title,
            "file": format!("tests/{title}.spec.ts"),
            "project": project,
            "status": status,
            "duration": duration,
            "retry": retry,
        });
        if let Some(error) = error {
            event["error"] = json!(error);
        }
        lines.push(event);
    }
    lines.push(json!({"event": "end", "status": "failed", "timestamp": "2026-03-14T09:31:30Z"}));
    lines
        .into_iter()
        .map(|line| line.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

fn cli_for(config_path: &Path, summary_path: &Path) -> Cli {
    Cli::try_parse_from([
        "verdict".to_string(),
        "--config".to_string(),
        config_path.display().to_string(),
        "--summary-path".to_string(),
        summary_path.display().to_string(),
        "--http-timeout-ms".to_string(),
        "2000".to_string(),
    ])
    .expect("cli")
}

#[tokio::test]
async fn integration_failed_run_reaches_every_selected_channel() {
    let server = MockServer::start();
    let slack = server.mock(|when, then| {
        when.method(POST)
            .path("/slack")
            .body_includes("<@U0CHECKOUT>")
            .body_includes("View run");
        then.status(200).body("ok");
    });
    let discord = server.mock(|when, then| {
        when.method(POST).path("/discord").body_includes("6/10");
        then.status(204);
    });
    let teams = server.mock(|when, then| {
        when.method(POST).path("/teams");
        then.status(429).body("slow down");
    });
    let webhook = server.mock(|when, then| {
        when.method(POST)
            .path("/ci")
            .header("authorization", "Bearer pipeline-token")
            .header("x-custom-header", "e2e")
            .json_body_includes(
                json!({
                    "event": "test_completed",
                    "status": "failed",
                    "summary": {"total": 10, "passed": 6, "failed": 3, "skipped": 1, "flaky": 1},
                    "execution": {"projectName": "web-shop"}
                })
                .to_string(),
            );
        then.status(200);
    });

    let tempdir = tempfile::tempdir().expect("tempdir");
    let config_path = tempdir.path().join("verdict.json");
    std::fs::write(
        &config_path,
        json!({
            "channels": [
                { "type": "slack", "mentions": { "onFailure": ["U0CHECKOUT"] } },
                { "type": "discord", "webhookUrl": server.url("/discord") },
                { "type": "teams", "webhookUrl": server.url("/teams") },
                {
                    "type": "webhook",
                    "notifyOn": { "always": true },
                    "options": { "headers": { "X-Custom-Header": "e2e" } }
                },
                { "type": "console", "notifyOn": { "success": true } }
            ]
        })
        .to_string(),
    )
    .expect("write config");
    let summary_path = tempdir.path().join("test-results").join("test-summary.json");
    let mut cli = cli_for(&config_path, &summary_path);
    cli.project_name = Some("web-shop".to_string());

    let environment = ChannelEnvironment::from_pairs([
        ("SLACK_WEBHOOK_URL", server.url("/slack")),
        ("WEBHOOK_URL", server.url("/ci")),
        ("WEBHOOK_TOKEN", "pipeline-token".to_string()),
        ("GITHUB_SERVER_URL", "https://github.com".to_string()),
        ("GITHUB_REPOSITORY", "acme/web-shop".to_string()),
        ("GITHUB_RUN_ID", "4242".to_string()),
    ]);
    let stream = ten_event_stream();
    let outcome = execute_run(
        &cli,
        environment,
        stream.as_bytes(),
        std::future::pending::<()>(),
    )
    .await
    .expect("pipeline");

    let summary = &outcome.summary;
    assert!(outcome.completed);
    assert_eq!(summary.status, RunStatus::Failed);
    assert_eq!(
        (summary.total, summary.passed, summary.failed, summary.skipped, summary.flaky),
        (10, 6, 3, 1, 1)
    );
    assert_eq!(summary.success_rate, 60.0);
    assert_eq!(summary.duration_ms, 90_000);
    assert_eq!(
        summary.run_url.as_deref(),
        Some("https://github.com/acme/web-shop/actions/runs/4242")
    );
    assert_eq!(summary.slow_tests[0].title, "settings");
    assert_eq!(summary.slow_tests.len(), 5);

    let channels = outcome
        .report
        .receipts
        .iter()
        .map(|receipt| (receipt.channel.as_str(), receipt.status))
        .collect::<Vec<_>>();
    assert_eq!(
        channels,
        vec![
            ("slack", DeliveryStatus::Delivered),
            ("discord", DeliveryStatus::Delivered),
            ("teams", DeliveryStatus::Failed),
            ("webhook", DeliveryStatus::Delivered),
        ]
    );
    assert_eq!(
        outcome.report.receipts[2].reason_code.as_deref(),
        Some("delivery_rate_limited")
    );
    assert_eq!(outcome.report.suppressed.len(), 1);
    assert_eq!(outcome.report.suppressed[0].channel, "console");

    slack.assert_calls(1);
    discord.assert_calls(1);
    teams.assert_calls(1);
    webhook.assert_calls(1);

    let written = load_run_summary_file(&summary_path).expect("summary file");
    assert_eq!(&written, summary);
    let raw: Value =
        serde_json::from_str(&std::fs::read_to_string(&summary_path).expect("read")).expect("json");
    assert_eq!(raw["projects"]["firefox"]["failed"], 2);
    assert_eq!(raw["projects"]["chromium"]["skipped"], 1);
}

#[tokio::test]
async fn integration_passed_run_with_failure_only_channels_stays_quiet() {
    let server = MockServer::start();
    let any_post = server.mock(|when, then| {
        when.method(POST);
        then.status(200);
    });
    let tempdir = tempfile::tempdir().expect("tempdir");
    let config_path = tempdir.path().join("verdict.toml");
    std::fs::write(
        &config_path,
        format!(
            "[[channels]]\ntype = \"slack\"\nwebhookUrl = \"{}\"\n\n[[channels]]\ntype = \"discord\"\nwebhookUrl = \"{}\"\n[channels.notifyOn]\nfailure = true\n",
            server.url("/slack"),
            server.url("/discord")
        ),
    )
    .expect("write config");
    let summary_path = tempdir.path().join("summary.json");
    let cli = cli_for(&config_path, &summary_path);

    let stream = "{\"event\":\"begin\"}\n{\"event\":\"test_end\",\"title\":\"a\",\"file\":\"a.spec.ts\",\"status\":\"passed\",\"duration\":10}\n{\"event\":\"end\",\"status\":\"passed\"}\n";
    let outcome = execute_run(
        &cli,
        ChannelEnvironment::default(),
        stream.as_bytes(),
        std::future::pending::<()>(),
    )
    .await
    .expect("pipeline");

    assert_eq!(outcome.summary.status, RunStatus::Passed);
    assert!(outcome.report.receipts.is_empty());
    assert_eq!(outcome.report.suppressed.len(), 2);
    any_post.assert_calls(0);
    assert!(summary_path.exists());
}

#[tokio::test]
async fn integration_truncated_stream_is_dispatched_as_interrupted() {
    let server = MockServer::start();
    let webhook = server.mock(|when, then| {
        when.method(POST)
            .path("/ci")
            .json_body_includes(json!({"status": "interrupted"}).to_string());
        then.status(200);
    });
    let tempdir = tempfile::tempdir().expect("tempdir");
    let config_path = tempdir.path().join("verdict.json");
    std::fs::write(
        &config_path,
        json!({"channels": [{"type": "webhook", "webhookUrl": server.url("/ci")}]}).to_string(),
    )
    .expect("write config");
    let cli = cli_for(&config_path, &tempdir.path().join("summary.json"));

    let stream = ten_event_stream()
        .lines()
        .take(4)
        .collect::<Vec<_>>()
        .join("\n");
    let outcome = execute_run(
        &cli,
        ChannelEnvironment::default(),
        stream.as_bytes(),
        std::future::pending::<()>(),
    )
    .await
    .expect("pipeline");

    assert!(!outcome.completed);
    assert_eq!(outcome.summary.status, RunStatus::Interrupted);
    assert_eq!(outcome.summary.total, 3);
    assert_eq!(outcome.report.receipts[0].status, DeliveryStatus::Delivered);
    webhook.assert_calls(1);
}

#[test]
fn integration_replayed_stream_matches_streamed_summary_counts() {
    let mut aggregator = RunAggregator::new();
    let summary = replay_lifecycle_stream(&mut aggregator, &ten_event_stream())
        .expect("replay")
        .expect("finalized");
    assert_eq!(summary.total, 10);
    assert_eq!(summary.failures.len(), 3);
    assert_eq!(summary.failures[1].title, "payment");
    assert_eq!(summary.failures[0].error_headline(), "expected 200");
}
