//! HTTP transport and history client against a mock analysis backend.

use eza_client::{
    HistoryClient, HistoryQuery, HistorySource, HttpAnalysisTransport,
    MemoryAuditTrail, Orchestrator, OrchestratorConfig,
};
use eza_types::{AnalysisMode, Completeness, RiskLevel};
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn orchestrator_for(base_url: &str) -> (Orchestrator, Arc<MemoryAuditTrail>) {
    let config = OrchestratorConfig {
        base_url: base_url.to_string(),
        ..OrchestratorConfig::default()
    };
    let transport = Arc::new(HttpAnalysisTransport::new(&config.base_url).unwrap());
    let audit = Arc::new(MemoryAuditTrail::new());
    (Orchestrator::new(config, transport, audit.clone()), audit)
}

#[tokio::test]
async fn single_json_answer() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/analyze/standalone"))
        .and(body_partial_json(json!({"content": "buy now", "mode": "standalone"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "_raw": {"eza_score": {"final_score": 0.35}, "flags": ["urgency"]}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (orchestrator, audit) = orchestrator_for(&server.uri());
    let result = orchestrator
        .submit("buy now", AnalysisMode::Standalone)
        .completed()
        .await;

    assert_eq!(result.overall_score, Some(35.0));
    assert_eq!(result.risk_level, RiskLevel::High);
    assert_eq!(result.flags, vec!["urgency"]);
    assert_eq!(audit.results().len(), 1);
}

#[tokio::test]
async fn ndjson_staged_answer() {
    let server = MockServer::start().await;
    let body = concat!(
        "{\"analysis_id\":\"an-9\",\"stage\":\"immediate\",\"eza_score\":77}\n",
        "{\"analysis_id\":\"an-9\",\"stage\":\"risk_summary\",\"risk_summary\":{\"flags\":[\"bias\"]}}\n",
        "{\"analysis_id\":\"an-9\",\"stage\":\"full\",\"analysis\":{\"eza_score\":{\"eza_score\":74},\"intent\":\"inform\"}}\n",
    );
    Mock::given(method("POST"))
        .and(path("/api/analyze/fast"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/x-ndjson"))
        .mount(&server)
        .await;

    let (orchestrator, _) = orchestrator_for(&server.uri());
    let result = orchestrator.submit("text", AnalysisMode::Fast).completed().await;

    assert_eq!(result.completeness, Completeness::Complete);
    assert_eq!(result.analysis_id.as_deref(), Some("an-9"));
    assert_eq!(result.overall_score, Some(74.0));
    assert_eq!(result.flags, vec!["bias"]);
    assert_eq!(result.intent.label, "inform");
}

#[tokio::test]
async fn sse_staged_answer() {
    let server = MockServer::start().await;
    let body = concat!(
        ": stream opened\n\n",
        "event: stage\ndata: {\"stage\":\"immediate\",\"score\":12}\n\n",
        "event: stage\ndata: {\"stage\":\"full\",\"score\":15,\"flags\":[\"threat\"]}\n\n",
        "data: [DONE]\n\n",
    );
    Mock::given(method("POST"))
        .and(path("/api/proxy/analyze"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let (orchestrator, _) = orchestrator_for(&server.uri());
    let result = orchestrator.submit("text", AnalysisMode::Proxy).completed().await;
    assert!(result.is_complete());
    assert_eq!(result.overall_score, Some(15.0));
    assert_eq!(result.flags, vec!["threat"]);
}

#[tokio::test]
async fn http_error_status_is_terminal_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(503).set_body_json(json!({"error": "analysis pool exhausted"})),
        )
        .mount(&server)
        .await;

    let (orchestrator, audit) = orchestrator_for(&server.uri());
    let result = orchestrator.submit("text", AnalysisMode::Deep).completed().await;
    assert!(result.is_failure());
    let message = result.error_message().unwrap();
    assert!(message.contains("503"));
    assert!(message.contains("analysis pool exhausted"));
    assert!(audit.results().is_empty());
}

#[tokio::test]
async fn connection_refused_is_terminal_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let (orchestrator, _) = orchestrator_for(&format!("http://{}", addr));
    let result = orchestrator.submit("text", AnalysisMode::Fast).completed().await;
    assert_eq!(result.risk_level, RiskLevel::Unknown);
    assert_eq!(result.completeness, Completeness::Complete);
    assert!(!result.error_message().unwrap().is_empty());
}

#[tokio::test]
async fn history_query_is_forwarded_and_normalized() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/analyses/history"))
        .and(query_param("risk_level", "high"))
        .and(query_param("flag", "pii"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "records": [
                {"eza_score": {"eza_score": 20}, "flags": ["pii"]},
                {"analysis": {"eza_score": {"final_score": 0.3}}, "flags": ["pii", "bias"]},
                "garbage"
            ]
        })))
        .mount(&server)
        .await;

    let history = HistoryClient::new(&server.uri(), "/api/analyses/history").unwrap();
    let query = HistoryQuery::default()
        .with_risk_level(RiskLevel::High)
        .with_flag("pii");
    let records = history.fetch(&query).await.unwrap();

    assert_eq!(records.len(), 3);
    assert_eq!(records[0].overall_score, Some(20.0));
    assert_eq!(records[1].overall_score, Some(30.0));
    assert_eq!(records[2].overall_score, None);
    assert!(records[2].is_complete());
}
