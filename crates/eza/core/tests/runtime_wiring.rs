//! Configuration loading and runtime wiring against a mock backend.

use eza_client::HistoryQuery;
use eza_core::{init_tracing, EzaConfig, EzaRuntime, LoggingConfig};
use eza_types::{AnalysisMode, Completeness, EzaError, RiskLevel};
use serde_json::json;
use std::io::Write;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(server: &MockServer) -> EzaConfig {
    let mut config = EzaConfig::default();
    config.orchestrator.base_url = server.uri();
    config.telemetry.stream_url = format!("{}/api/telemetry/stream", server.uri());
    config
}

#[test]
fn load_layers_file_and_environment() {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .unwrap();
    writeln!(
        file,
        r#"
[orchestrator]
base_url = "http://eza.internal:9000"
request_timeout_ms = 5000

[telemetry]
buffer_capacity = 120
alerts_enabled = true
"#
    )
    .unwrap();

    std::env::set_var("EZA__LOGGING__LEVEL", "debug");
    let config = EzaConfig::load(Some(file.path())).unwrap();
    std::env::remove_var("EZA__LOGGING__LEVEL");

    assert_eq!(config.orchestrator.base_url, "http://eza.internal:9000");
    assert_eq!(config.orchestrator.request_timeout_ms, 5_000);
    // Untouched keys keep their defaults.
    assert_eq!(config.orchestrator.endpoints.fast, "/api/analyze/fast");
    assert_eq!(config.telemetry.buffer_capacity, 120);
    assert!(config.telemetry.alerts_enabled);
    assert_eq!(config.telemetry.reconnect_delay_ms, 3_000);
    assert_eq!(config.logging.level, "debug");
}

#[test]
fn load_rejects_missing_and_invalid_files() {
    let missing = EzaConfig::load(Some(std::path::Path::new("/nonexistent/eza.toml")));
    assert!(matches!(missing, Err(EzaError::Config(_))));

    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .unwrap();
    writeln!(file, "[aggregation]\nhigh_below = 95.0").unwrap();
    let inverted = EzaConfig::load(Some(file.path()));
    assert!(matches!(inverted, Err(EzaError::Config(_))));
}

#[test]
fn tracing_initialises_once() {
    let config = LoggingConfig::default();
    let _ = init_tracing(&config);
    assert!(matches!(init_tracing(&config), Err(EzaError::Config(_))));
}

#[tokio::test]
async fn submissions_feed_the_dashboard() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/analyze/fast"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"eza_score": {"eza_score": 82}})),
        )
        .mount(&server)
        .await;

    let runtime = EzaRuntime::new(config_for(&server)).await.unwrap();
    let first = runtime.submit("hello", AnalysisMode::Fast).completed().await;
    let second = runtime.submit("again", AnalysisMode::Fast).completed().await;
    assert_eq!(first.overall_score, Some(82.0));
    assert_eq!(second.risk_level, RiskLevel::Low);

    let snapshot = runtime.dashboard_snapshot().await.unwrap();
    assert_eq!(snapshot.total, 2);
    assert_eq!(snapshot.bands.low, 2);
    assert_eq!(snapshot.average_score, Some(82.0));
}

#[tokio::test]
async fn failed_requests_stay_out_of_the_dashboard() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let runtime = EzaRuntime::new(config_for(&server)).await.unwrap();
    let result = runtime.submit("hello", AnalysisMode::Deep).completed().await;
    assert!(result.is_failure());
    assert_eq!(result.completeness, Completeness::Complete);
    assert_eq!(runtime.dashboard_snapshot().await.unwrap().total, 0);
}

#[tokio::test]
async fn history_snapshot_aggregates_normalized_records() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/analyses/history"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "records": [
                {"eza_score": {"eza_score": 90}, "flags": ["pii"]},
                {"analysis": {"eza_score": {"final_score": 0.41}}, "flags": ["pii", "bias"]},
                {"note": "no score at all"}
            ]
        })))
        .mount(&server)
        .await;

    let runtime = EzaRuntime::new(config_for(&server)).await.unwrap();
    let snapshot = runtime
        .history_snapshot(&HistoryQuery::default())
        .await
        .unwrap();

    assert_eq!(snapshot.total, 3);
    assert_eq!(snapshot.bands.low, 1);
    assert_eq!(snapshot.bands.high, 1);
    assert_eq!(snapshot.bands.medium, 1);
    assert_eq!(snapshot.missing_scores, 1);
    assert_eq!(snapshot.flag_frequencies[0].value, "pii");
    assert_eq!(snapshot.flag_frequencies[0].count, 2);
}

#[tokio::test]
async fn audit_file_persists_across_runtimes() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"score": 30})))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let mut config = config_for(&server);
    config.audit_path = Some(dir.path().join("audit.jsonl"));

    let runtime = EzaRuntime::new(config.clone()).await.unwrap();
    runtime
        .submit("hello", AnalysisMode::Standalone)
        .completed()
        .await;
    drop(runtime);

    let reopened = EzaRuntime::new(config).await.unwrap();
    let snapshot = reopened.dashboard_snapshot().await.unwrap();
    assert_eq!(snapshot.total, 1);
    assert_eq!(snapshot.bands.high, 1);
}

#[tokio::test]
async fn stage_registry_uses_configured_breakdown() {
    let mut config = EzaConfig::default();
    config.normalize.requested_breakdown = vec!["legal".into()];
    let runtime = EzaRuntime::new(config).await.unwrap();

    let mut registry = runtime.stage_registry();
    let update = registry
        .apply(&json!({"analysis_id": "a1", "stage": "full", "score": 75}))
        .unwrap();
    let result = update.result.unwrap();
    assert!(result.is_complete());
    assert!(result.breakdown.contains_key("legal"));
}
