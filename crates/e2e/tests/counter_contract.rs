//! Contract tests for the counter HTTP API
//!
//! These run fully in-process against a `tally-web` server bound to a
//! loopback port, so they need no browser tooling. The YAML scenarios in
//! specs/ exercise the same contract through a real page.

use tally_core::{Command, CommandOutcome, CounterSnapshot};
use tally_web::{WebServer, WebServerConfig};

async fn start_server(test_mode: bool) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = WebServer::new(WebServerConfig { test_mode });
    tokio::spawn(server.serve_on(listener));

    format!("http://{}", addr)
}

async fn increment(client: &reqwest::Client, base: &str) -> CommandOutcome {
    client
        .post(format!("{}/api/counter/increment", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

async fn decrement(client: &reqwest::Client, base: &str) -> CommandOutcome {
    client
        .post(format!("{}/api/counter/decrement", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

async fn snapshot(client: &reqwest::Client, base: &str) -> CounterSnapshot {
    client
        .get(format!("{}/api/counter", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

#[tokio::test]
async fn test_health_endpoint_reports_ok() {
    let base = start_server(false).await;
    let client = reqwest::Client::new();

    let resp = client
        .get(format!("{}/api/health", base))
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_success());

    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "tally-web");
}

#[tokio::test]
async fn test_root_serves_counter_page() {
    let base = start_server(false).await;
    let client = reqwest::Client::new();

    let resp = client.get(&base).send().await.unwrap();
    assert!(resp.status().is_success());

    let content_type = resp
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(content_type.starts_with("text/html"));

    let body = resp.text().await.unwrap();
    assert!(body.contains("id=\"counter\""));
    assert!(body.contains("id=\"increment-btn\""));
    assert!(body.contains("id=\"decrement-btn\""));
    assert!(body.contains(">0</div>"));
}

#[tokio::test]
async fn test_increment_ramp_reports_each_value() {
    let base = start_server(false).await;
    let client = reqwest::Client::new();

    for expected in 1..=5 {
        let outcome = increment(&client, &base).await;
        assert_eq!(outcome.command, Command::Increment);
        assert_eq!(outcome.value, expected);
        assert_eq!(snapshot(&client, &base).await.value, expected);
    }
}

#[tokio::test]
async fn test_decrement_at_floor_is_a_noop() {
    let base = start_server(false).await;
    let client = reqwest::Client::new();

    assert_eq!(snapshot(&client, &base).await.value, 0);

    for _ in 0..5 {
        let outcome = decrement(&client, &base).await;
        assert_eq!(outcome.command, Command::Decrement);
        assert_eq!(outcome.value, 0);
    }
    assert_eq!(snapshot(&client, &base).await.value, 0);
}

#[tokio::test]
async fn test_boundary_returns_to_zero_and_stays() {
    let base = start_server(false).await;
    let client = reqwest::Client::new();

    assert_eq!(increment(&client, &base).await.value, 1);
    assert_eq!(decrement(&client, &base).await.value, 0);
    assert_eq!(decrement(&client, &base).await.value, 0);
    assert_eq!(decrement(&client, &base).await.value, 0);
    assert_eq!(snapshot(&client, &base).await.value, 0);
}

#[tokio::test]
async fn test_two_up_one_down_lands_on_one() {
    let base = start_server(false).await;
    let client = reqwest::Client::new();

    assert_eq!(increment(&client, &base).await.value, 1);
    assert_eq!(increment(&client, &base).await.value, 2);
    let outcome = decrement(&client, &base).await;
    assert_eq!(outcome.command, Command::Decrement);
    assert_eq!(outcome.value, 1);
    assert_eq!(snapshot(&client, &base).await.value, 1);
}

#[tokio::test]
async fn test_alternating_sequence_lands_on_one() {
    let base = start_server(false).await;
    let client = reqwest::Client::new();

    assert_eq!(increment(&client, &base).await.value, 1);
    assert_eq!(decrement(&client, &base).await.value, 0);
    assert_eq!(increment(&client, &base).await.value, 1);
    assert_eq!(decrement(&client, &base).await.value, 0);
    assert_eq!(increment(&client, &base).await.value, 1);
}

#[tokio::test]
async fn test_fifty_up_twenty_five_down() {
    let base = start_server(false).await;
    let client = reqwest::Client::new();

    for _ in 0..50 {
        increment(&client, &base).await;
    }
    assert_eq!(snapshot(&client, &base).await.value, 50);

    for _ in 0..25 {
        decrement(&client, &base).await;
    }
    assert_eq!(snapshot(&client, &base).await.value, 25);
}

#[tokio::test]
async fn test_thousand_sequential_increments_lose_nothing() {
    let base = start_server(false).await;
    let client = reqwest::Client::new();

    for expected in 1..=1000u64 {
        let outcome = increment(&client, &base).await;
        assert_eq!(outcome.value, expected);
    }
    assert_eq!(snapshot(&client, &base).await.value, 1000);
}

#[tokio::test]
async fn test_concurrent_bursts_are_serialized() {
    let base = start_server(false).await;
    let client = reqwest::Client::new();

    let mut tasks = tokio::task::JoinSet::new();
    for _ in 0..20 {
        let client = client.clone();
        let base = base.clone();
        tasks.spawn(async move {
            for _ in 0..50 {
                increment(&client, &base).await;
            }
        });
    }
    while let Some(joined) = tasks.join_next().await {
        joined.unwrap();
    }

    // 20 tasks x 50 increments, nothing lost to interleaving
    assert_eq!(snapshot(&client, &base).await.value, 1000);
}

#[tokio::test]
async fn test_snapshot_wire_shape_is_bare_digits() {
    let base = start_server(false).await;
    let client = reqwest::Client::new();

    for _ in 0..42 {
        increment(&client, &base).await;
    }

    let body = client
        .get(format!("{}/api/counter", base))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(body, "{\"value\":42}");
}

#[tokio::test]
async fn test_outcome_wire_shape_names_the_command() {
    let base = start_server(false).await;
    let client = reqwest::Client::new();

    let body = client
        .post(format!("{}/api/counter/increment", base))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(body.contains("\"command\":\"increment\""));
    assert!(body.contains("\"value\":1"));

    let body = client
        .post(format!("{}/api/counter/decrement", base))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(body.contains("\"command\":\"decrement\""));
    assert!(body.contains("\"value\":0"));
}

#[tokio::test]
async fn test_reset_is_available_in_test_mode_only() {
    let client = reqwest::Client::new();

    // Disabled: the route does not exist as far as callers can tell
    let base = start_server(false).await;
    increment(&client, &base).await;
    let resp = client
        .post(format!("{}/api/counter/reset", base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::NOT_FOUND);
    assert_eq!(snapshot(&client, &base).await.value, 1);

    // Enabled: restores the session-start state
    let base = start_server(true).await;
    for _ in 0..7 {
        increment(&client, &base).await;
    }
    let resp = client
        .post(format!("{}/api/counter/reset", base))
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_success());
    let after: CounterSnapshot = resp.json().await.unwrap();
    assert_eq!(after.value, 0);
    assert_eq!(snapshot(&client, &base).await.value, 0);
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let base = start_server(false).await;
    let client = reqwest::Client::new();

    let resp = client
        .get(format!("{}/api/nope", base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::NOT_FOUND);

    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "not found");
}
