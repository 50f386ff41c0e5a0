use super::*;
use actix_web::{App, test, web};
use serde_json::{Value, json};
use std::sync::Arc;
use testgen_core::fixtures;
use testgen_core::llm::{ProviderError, RetryPolicy, ScriptedClient};
use testgen_core::store::InMemoryTestCaseStore;
use testgen_core::ticket::InMemoryTicketSource;

fn orchestrator(client: &ScriptedClient) -> Orchestrator {
    let tickets = Arc::new(InMemoryTicketSource::with_tickets([fixtures::sign_in_ticket("AUTH-1")]));
    Orchestrator::new(tickets, Arc::new(client.clone()), Arc::new(InMemoryTestCaseStore::new()))
        .with_retry_policy(RetryPolicy::none())
}

macro_rules! post {
    ($app:expr, $uri:expr, $body:expr) => {{
        let req = test::TestRequest::post().uri($uri).set_json($body).to_request();
        let resp = test::call_service(&$app, req).await;
        let status = resp.status();
        let body: Value = test::read_body_json(resp).await;
        (status, body)
    }};
}

#[actix_web::test]
async fn test_generate_then_cached_then_regenerate() {
    let client = ScriptedClient::always(fixtures::response(10));
    let app = test::init_service(
        App::new().app_data(web::Data::new(orchestrator(&client))).configure(configure),
    )
    .await;

    let (status, body) = post!(app, "/generate-tests", json!({"ticketKey": "AUTH-1"}));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 10);
    assert_eq!(body["testCases"].as_array().unwrap().len(), 10);
    assert_eq!(body["ticketKey"], "AUTH-1");
    assert_eq!(body["cacheHit"], false);
    assert_eq!(body["discarded"], 0);
    assert!(body.get("warning").is_none());

    let (_, cached) = post!(app, "/generate-tests", json!({"ticketKey": "AUTH-1"}));
    assert_eq!(cached["cacheHit"], true);
    assert_eq!(client.call_count(), 1);

    let (status, regenerated) = post!(app, "/regenerate-tests", json!({"ticketKey": "AUTH-1"}));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(regenerated["cacheHit"], false);
    assert_eq!(client.call_count(), 2);
}

#[actix_web::test]
async fn test_low_yield_warning_is_still_ok() {
    let client = ScriptedClient::always(fixtures::response(5));
    let app = test::init_service(
        App::new().app_data(web::Data::new(orchestrator(&client))).configure(configure),
    )
    .await;

    let (status, body) = post!(app, "/generate-tests", json!({"ticketKey": "AUTH-1", "includeSecurity": true}));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["warning"], json!({"kind": "lowYield", "produced": 5, "minimum": 8}));
    assert!(client.calls()[0].user.contains("Add security cases"));
}

#[actix_web::test]
async fn test_error_status_mapping() {
    let cases: Vec<(ScriptedClient, &str, StatusCode, &str)> = vec![
        (ScriptedClient::always(fixtures::response(8)), "NOPE-1", StatusCode::NOT_FOUND, "ticketNotFound"),
        (
            ScriptedClient::always(fixtures::response_with(vec![fixtures::stepless_case()])),
            "AUTH-1",
            StatusCode::UNPROCESSABLE_ENTITY,
            "noValidTestCases",
        ),
        (ScriptedClient::always("no test cases here"), "AUTH-1", StatusCode::BAD_GATEWAY, "parse"),
        (ScriptedClient::new(), "AUTH-1", StatusCode::BAD_GATEWAY, "provider"),
    ];

    for (client, key, expected_status, expected_kind) in cases {
        let app = test::init_service(
            App::new().app_data(web::Data::new(orchestrator(&client))).configure(configure),
        )
        .await;

        let (status, body) = post!(app, "/generate-tests", json!({"ticketKey": key}));
        assert_eq!(status, expected_status, "{}", expected_kind);
        assert_eq!(body["error"], expected_kind);
        assert!(body["message"].as_str().is_some_and(|m| !m.is_empty()));
    }

    let client = ScriptedClient::new();
    client.push_error(ProviderError::config_missing("OPENAI_API_KEY"));
    let app = test::init_service(
        App::new().app_data(web::Data::new(orchestrator(&client))).configure(configure),
    )
    .await;
    let (status, body) = post!(app, "/generate-tests", json!({"ticketKey": "AUTH-1"}));
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "configMissing");
}

#[actix_web::test]
async fn test_invalidate_and_health() {
    let client = ScriptedClient::always(fixtures::response(8));
    let app = test::init_service(
        App::new().app_data(web::Data::new(orchestrator(&client))).configure(configure),
    )
    .await;

    let _ = post!(app, "/generate-tests", json!({"ticketKey": "AUTH-1"}));
    let (status, body) = post!(app, "/tickets/AUTH-1/invalidate", json!({}));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"ticketKey": "AUTH-1", "removed": 8}));

    let req = test::TestRequest::get().uri("/health").to_request();
    let health_body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(health_body["status"], "ok");
}

#[actix_web::test]
async fn test_malformed_body_is_rejected() {
    let client = ScriptedClient::always(fixtures::response(8));
    let app = test::init_service(
        App::new().app_data(web::Data::new(orchestrator(&client))).configure(configure),
    )
    .await;

    let req = test::TestRequest::post().uri("/generate-tests").set_json(json!({"key": "AUTH-1"})).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(client.call_count(), 0);
}
