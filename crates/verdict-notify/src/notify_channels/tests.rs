use chrono::{TimeZone, Utc};
use httpmock::Method::POST;
use httpmock::MockServer;
use serde_json::{json, Value};
use verdict_report::{
    NotifyOn, RunAggregator, RunStatus, RunSummary, TestCaseResult, TestCaseStatus,
};

use super::{
    build_discord_message, build_slack_message, build_teams_message, build_webhook_headers,
    build_webhook_payload, dispatch_notifications, load_run_summary_file,
    render_console_notification, render_run_report, DeliveryContext, NotificationChannel,
    SlackChannel, WebhookChannel,
};
use crate::notify_config::{ChannelKind, NotificationConfig};
use crate::notify_delivery::{DeliveryStatus, WebhookTransport};
use crate::notify_environment::ChannelEnvironment;

fn summary_with(
    status: RunStatus,
    failures: usize,
    passes: usize,
    run_url: Option<&str>,
) -> RunSummary {
    let start = Utc.with_ymd_and_hms(2026, 3, 14, 9, 30, 0).single().expect("start");
    let end = Utc.with_ymd_and_hms(2026, 3, 14, 9, 30, 12).single().expect("end");
    let mut aggregator = RunAggregator::new()
        .with_project_name(Some("web-shop".to_string()))
        .with_run_url(run_url.map(str::to_string));
    aggregator.begin_at(start).expect("begin");
    for index in 0..passes {
        aggregator
            .record(
                TestCaseResult::new(
                    format!("passes {index}"),
                    "tests/cart.spec.ts",
                    TestCaseStatus::Passed,
                    100 * (index as u64 + 1),
                )
                .with_project("chromium"),
            )
            .expect("record pass");
    }
    for index in 0..failures {
        aggregator
            .record(
                TestCaseResult::new(
                    format!("fails {index}"),
                    "tests/checkout.spec.ts",
                    TestCaseStatus::Failed,
                    250,
                )
                .with_project("firefox")
                .with_error(format!("expected 200 got 500\n    at step {index}")),
            )
            .expect("record failure");
    }
    aggregator.finish_at(status, end).expect("finish")
}

fn discord_json(summary: &RunSummary, config: &NotificationConfig) -> Value {
    serde_json::to_value(build_discord_message(summary, config)).expect("discord json")
}

fn teams_json(summary: &RunSummary, config: &NotificationConfig) -> Value {
    serde_json::to_value(build_teams_message(summary, config)).expect("teams json")
}

fn context() -> DeliveryContext {
    DeliveryContext::new(
        WebhookTransport::new(2_000).expect("transport"),
        ChannelEnvironment::default(),
    )
}

#[test]
fn unit_chat_renders_cap_failures_at_five() {
    let summary = summary_with(RunStatus::Failed, 7, 1, None);
    let config = NotificationConfig::new(ChannelKind::Slack);

    let slack = build_slack_message(&summary, &config).to_string();
    assert!(slack.contains("fails 4"));
    assert!(!slack.contains("fails 5"));
    assert!(slack.contains("and 2 more"));

    let discord = discord_json(&summary, &config).to_string();
    assert!(discord.contains("fails 4"));
    assert!(!discord.contains("fails 6"));

    let teams = teams_json(&summary, &config).to_string();
    assert!(!teams.contains("fails 5"));

    let console = render_console_notification(&summary);
    assert!(console.contains("fails 4"));
    assert!(!console.contains("fails 5"));
    assert!(console.contains("…and 2 more"));
}

#[test]
fn unit_webhook_payload_and_report_carry_every_failure() {
    let summary = summary_with(RunStatus::Failed, 7, 1, None);
    let timestamp = Utc.with_ymd_and_hms(2026, 3, 14, 9, 31, 0).single().expect("ts");
    let payload = build_webhook_payload(&summary, timestamp);
    assert_eq!(payload.failures.len(), 7);
    assert_eq!(payload.event, "test_completed");
    assert_eq!(payload.status, "failed");
    assert_eq!(payload.summary.total, 8);
    assert_eq!(payload.summary.duration, 12_000);
    assert_eq!(payload.execution.project_name.as_deref(), Some("web-shop"));

    let value = serde_json::to_value(&payload).expect("serialize");
    assert_eq!(value["summary"]["successRate"], json!(12.5));
    assert_eq!(value["execution"]["startTime"], "2026-03-14T09:30:00.000Z");
    assert!(value["execution"].get("runUrl").is_none());

    let report = render_run_report(&summary);
    assert!(report.contains("fails 6"));
    assert!(report.contains("expected 200 got 500"));
    assert!(!report.contains("at step"));
    assert!(report.contains("firefox: 0/7 passed"));
}

#[test]
fn unit_mentions_render_only_for_failed_runs() {
    let config =
        NotificationConfig::new(ChannelKind::Slack).with_failure_mentions(&["U123", "here"]);

    let failed = summary_with(RunStatus::Failed, 1, 1, None);
    let slack = build_slack_message(&failed, &config);
    let text = slack["text"].as_str().expect("text");
    assert!(text.contains("<@U123>"));
    assert!(text.contains("<!here>"));
    let discord = discord_json(&failed, &config);
    assert_eq!(discord["content"], "<@U123> <@here>");
    let teams = teams_json(&failed, &config);
    assert_eq!(teams["text"], "<at>U123</at> <at>here</at>");

    let passed = summary_with(RunStatus::Passed, 0, 2, None);
    assert!(!build_slack_message(&passed, &config).to_string().contains("<@U123>"));
    assert!(discord_json(&passed, &config).get("content").is_none());
    assert!(teams_json(&passed, &config).get("text").is_none());
}

#[test]
fn unit_run_url_becomes_a_link_when_known() {
    let url = "https://github.com/acme/web/actions/runs/42";
    let summary = summary_with(RunStatus::Passed, 0, 1, Some(url));
    let config = NotificationConfig::new(ChannelKind::Discord);

    let slack = build_slack_message(&summary, &config);
    let actions = slack["blocks"]
        .as_array()
        .expect("blocks")
        .iter()
        .find(|block| block["type"] == "actions")
        .expect("actions block");
    assert_eq!(actions["elements"][0]["url"], url);

    assert_eq!(discord_json(&summary, &config)["embeds"][0]["url"], url);
    assert_eq!(
        teams_json(&summary, &config)["potentialAction"][0]["targets"][0]["uri"],
        url
    );
    assert!(render_console_notification(&summary).contains(url));

    let without = summary_with(RunStatus::Passed, 0, 1, None);
    assert!(teams_json(&without, &config)
        .get("potentialAction")
        .is_none());
}

#[test]
fn unit_status_colors_follow_run_outcome() {
    let config = NotificationConfig::new(ChannelKind::Teams);
    let passed = summary_with(RunStatus::Passed, 0, 1, None);
    let failed = summary_with(RunStatus::Failed, 1, 0, None);
    assert_eq!(teams_json(&passed, &config)["themeColor"], "36a64f");
    assert_eq!(teams_json(&failed, &config)["themeColor"], "dc3545");
    assert_eq!(
        build_slack_message(&failed, &config)["attachments"][0]["color"],
        "#dc3545"
    );
    assert_eq!(
        discord_json(&passed, &config)["embeds"][0]["color"],
        json!(0x36a64f)
    );
}

#[test]
fn unit_webhook_headers_merge_custom_over_bearer_token() {
    let environment = ChannelEnvironment::from_pairs([("WEBHOOK_TOKEN", "s3cret")]);
    let config = NotificationConfig::new(ChannelKind::Webhook);
    let headers = build_webhook_headers(&config, &environment);
    assert_eq!(headers["Authorization"], "Bearer s3cret");

    let mut config = NotificationConfig::new(ChannelKind::Webhook);
    config
        .options
        .headers
        .insert("authorization".to_string(), "Token custom".to_string());
    config
        .options
        .headers
        .insert("X-Custom-Header".to_string(), "e2e".to_string());
    let headers = build_webhook_headers(&config, &environment);
    assert_eq!(headers.len(), 2);
    assert_eq!(headers["authorization"], "Token custom");
    assert_eq!(headers["X-Custom-Header"], "e2e");

    assert!(build_webhook_headers(
        &NotificationConfig::new(ChannelKind::Webhook),
        &ChannelEnvironment::default()
    )
    .is_empty());
}

#[tokio::test]
async fn functional_missing_target_skips_without_network_call() {
    let server = MockServer::start();
    let hook = server.mock(|when, then| {
        when.method(POST);
        then.status(200);
    });
    let summary = summary_with(RunStatus::Failed, 1, 0, None);
    let channel = SlackChannel::new(&context());
    let receipt = channel
        .send(&summary, &NotificationConfig::new(ChannelKind::Slack))
        .await;
    assert_eq!(receipt.status, DeliveryStatus::Skipped);
    assert_eq!(receipt.reason_code.as_deref(), Some("delivery_missing_target"));
    assert!(receipt.is_success());
    hook.assert_calls(0);
}

#[tokio::test]
async fn functional_webhook_channel_posts_full_payload_with_headers() {
    let server = MockServer::start();
    let hook = server.mock(|when, then| {
        when.method(POST)
            .path("/ci")
            .header("authorization", "Bearer s3cret")
            .header("content-type", "application/json")
            .json_body_includes(r#"{"event":"test_completed","status":"failed"}"#);
        then.status(202);
    });
    let context = DeliveryContext::new(
        WebhookTransport::new(2_000).expect("transport"),
        ChannelEnvironment::from_pairs([
            ("WEBHOOK_URL", server.url("/ci")),
            ("WEBHOOK_TOKEN", "s3cret".to_string()),
        ]),
    );
    let summary = summary_with(RunStatus::Failed, 2, 3, None);
    let receipt = WebhookChannel::new(&context)
        .send(&summary, &NotificationConfig::new(ChannelKind::Webhook))
        .await;
    assert_eq!(receipt.status, DeliveryStatus::Delivered);
    assert_eq!(receipt.http_status, Some(202));
    assert!(receipt
        .endpoint
        .as_deref()
        .is_some_and(|endpoint| endpoint.ends_with("/<redacted>")));
    hook.assert_calls(1);
}

#[tokio::test]
async fn functional_discord_channel_posts_typed_embed() {
    let server = MockServer::start();
    let hook = server.mock(|when, then| {
        when.method(POST)
            .path("/discord")
            .body_includes("verdict test results")
            .body_includes("**1/2** tests passed");
        then.status(204);
    });
    let summary = summary_with(RunStatus::Failed, 1, 1, None);
    let config =
        NotificationConfig::new(ChannelKind::Discord).with_webhook_url(server.url("/discord"));

    let message = build_discord_message(&summary, &config);
    assert_eq!(message.embeds.len(), 1);
    assert_eq!(message.embeds[0].color, 0xdc3545);
    assert!(message.embeds[0].fields.iter().any(|field| !field.inline));

    let receipt = super::build_notification_channel(ChannelKind::Discord, &context())
        .send(&summary, &config)
        .await;
    assert_eq!(receipt.status, DeliveryStatus::Delivered);
    assert_eq!(receipt.http_status, Some(204));
    hook.assert_calls(1);
}

#[test]
fn unit_teams_card_is_built_as_typed_message_card() {
    let summary = summary_with(RunStatus::Passed, 0, 3, None);
    let card = build_teams_message(&summary, &NotificationConfig::new(ChannelKind::Teams));
    assert_eq!(card.card_type, "MessageCard");
    assert_eq!(card.theme_color, "36a64f");
    assert!(card.potential_action.is_empty());
    assert_eq!(card.sections.len(), 1);
    assert!(card.sections[0]
        .facts
        .iter()
        .any(|fact| fact.title == "Total" && fact.value == "3"));
}

#[tokio::test]
async fn functional_passed_run_with_failure_only_policy_notifies_nobody() {
    let server = MockServer::start();
    let hook = server.mock(|when, then| {
        when.method(POST);
        then.status(200);
    });
    let failure_only = NotifyOn {
        success: false,
        failure: true,
        always: false,
    };
    let configs = vec![
        NotificationConfig::new(ChannelKind::Slack)
            .with_webhook_url(server.url("/slack"))
            .with_notify_on(failure_only),
        NotificationConfig::new(ChannelKind::Discord).with_webhook_url(server.url("/discord")),
        NotificationConfig::new(ChannelKind::Console).with_notify_on(failure_only),
    ];
    let summary = summary_with(RunStatus::Passed, 0, 4, None);
    let report = dispatch_notifications(&summary, &configs, &context()).await;
    assert!(report.receipts.is_empty());
    assert_eq!(report.suppressed.len(), 3);
    assert_eq!(report.suppressed[0].reason_code, "policy_suppressed");
    assert_eq!(report.run_status, "passed");
    hook.assert_calls(0);
}

#[tokio::test]
async fn regression_failing_channel_does_not_block_siblings() {
    let server = MockServer::start();
    let broken = server.mock(|when, then| {
        when.method(POST).path("/discord");
        then.status(500).body("boom");
    });
    let healthy = server.mock(|when, then| {
        when.method(POST).path("/teams");
        then.status(200);
    });
    let always = NotifyOn {
        success: false,
        failure: false,
        always: true,
    };
    let configs = vec![
        NotificationConfig::new(ChannelKind::Discord)
            .with_webhook_url(server.url("/discord"))
            .with_notify_on(always),
        NotificationConfig::new(ChannelKind::Teams)
            .with_webhook_url(server.url("/teams"))
            .with_notify_on(always),
        NotificationConfig::new(ChannelKind::Console).with_notify_on(always),
    ];
    let summary = summary_with(RunStatus::Failed, 1, 1, None);
    let report = dispatch_notifications(&summary, &configs, &context()).await;

    assert_eq!(report.receipts.len(), 3);
    assert_eq!(report.receipts[0].channel, "discord");
    assert_eq!(report.receipts[0].status, DeliveryStatus::Failed);
    assert_eq!(
        report.receipts[0].reason_code.as_deref(),
        Some("delivery_provider_unavailable")
    );
    assert_eq!(report.receipts[1].status, DeliveryStatus::Delivered);
    assert_eq!(report.receipts[2].status, DeliveryStatus::Delivered);
    assert_eq!(report.failed_count(), 1);
    broken.assert_calls(1);
    healthy.assert_calls(1);
}

#[tokio::test]
async fn functional_json_file_channel_writes_loadable_summary() {
    let tempdir = tempfile::tempdir().expect("tempdir");
    let default_path = tempdir.path().join("test-results").join("test-summary.json");
    let context = context().with_summary_path(&default_path);
    let summary = summary_with(RunStatus::Failed, 7, 6, None);
    let configs = vec![NotificationConfig::new(ChannelKind::JsonFile).with_notify_on(NotifyOn {
        success: false,
        failure: false,
        always: true,
    })];

    let report = dispatch_notifications(&summary, &configs, &context).await;
    assert_eq!(report.receipts[0].status, DeliveryStatus::Delivered);
    assert_eq!(
        report.receipts[0].endpoint.as_deref(),
        Some(default_path.display().to_string().as_str())
    );

    let loaded = load_run_summary_file(&default_path).expect("load");
    assert_eq!(loaded, summary);
    assert_eq!(loaded.failures.len(), 7);
    assert_eq!(loaded.slow_tests.len(), 5);
    assert_eq!(loaded.slow_tests[0].title, "passes 5");

    let raw = std::fs::read_to_string(&default_path).expect("read");
    let value: serde_json::Value = serde_json::from_str(&raw).expect("json");
    assert!(value.get("successRate").is_some());
    assert!(value.get("slowTests").is_some());
    assert!(value["projects"].get("chromium").is_some());
}

#[tokio::test]
async fn functional_json_file_channel_honors_output_path_override() {
    let tempdir = tempfile::tempdir().expect("tempdir");
    let override_path = tempdir.path().join("custom").join("run.json");
    let mut config = NotificationConfig::new(ChannelKind::JsonFile);
    config.options.output_path = Some(override_path.clone());
    let summary = summary_with(RunStatus::Passed, 0, 1, None);

    let channel = super::build_notification_channel(ChannelKind::JsonFile, &context());
    let receipt = channel.send(&summary, &config).await;
    assert_eq!(receipt.status, DeliveryStatus::Delivered);
    assert!(override_path.exists());
}

#[tokio::test]
async fn regression_json_file_channel_reports_unwritable_path() {
    let tempdir = tempfile::tempdir().expect("tempdir");
    let blocker = tempdir.path().join("blocker");
    std::fs::write(&blocker, "not a directory").expect("write blocker");
    let mut config = NotificationConfig::new(ChannelKind::JsonFile);
    config.options.output_path = Some(blocker.join("summary.json"));
    let summary = summary_with(RunStatus::Passed, 0, 1, None);

    let channel = super::build_notification_channel(ChannelKind::JsonFile, &context());
    let receipt = channel.send(&summary, &config).await;
    assert_eq!(receipt.status, DeliveryStatus::Failed);
    assert_eq!(
        receipt.reason_code.as_deref(),
        Some("delivery_file_write_failed")
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn regression_json_file_write_runs_alongside_network_channels() {
    let server = MockServer::start();
    let hook = server.mock(|when, then| {
        when.method(POST).path("/ci");
        then.status(200);
    });
    let tempdir = tempfile::tempdir().expect("tempdir");
    let summary_path = tempdir.path().join("nested").join("summary.json");
    let always = NotifyOn {
        success: false,
        failure: false,
        always: true,
    };
    let configs = vec![
        NotificationConfig::new(ChannelKind::JsonFile).with_notify_on(always),
        NotificationConfig::new(ChannelKind::Webhook)
            .with_webhook_url(server.url("/ci"))
            .with_notify_on(always),
    ];
    let summary = summary_with(RunStatus::Failed, 2, 2, None);

    let report =
        dispatch_notifications(&summary, &configs, &context().with_summary_path(&summary_path))
            .await;

    assert_eq!(report.receipts.len(), 2);
    assert!(report
        .receipts
        .iter()
        .all(|receipt| receipt.status == DeliveryStatus::Delivered));
    assert_eq!(load_run_summary_file(&summary_path).expect("load"), summary);
    hook.assert_calls(1);
}
