//! Integration tests for the Custom Search client
//!
//! These tests use wiremock to stand in for the search API.

use serde_json::json;
use term_sweep::provider::{BatchQuery, CseClient, Credentials, ProviderError, SearchProvider};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn credentials() -> Credentials {
    Credentials::new(Some("test-key"), Some("test-engine")).unwrap()
}

fn query(request_id: usize, text: &str) -> BatchQuery {
    BatchQuery {
        request_id,
        text: text.to_string(),
        result_count: 10,
        collection_id: "test-engine".to_string(),
    }
}

#[tokio::test]
async fn test_batch_sends_one_request_per_query() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/customsearch/v1"))
        .and(query_param("key", "test-key"))
        .and(query_param("cx", "test-engine"))
        .and(query_param("num", "10"))
        .and(query_param("q", "rust lang"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{"link": "https://www.rust-lang.org/"}],
            "searchInformation": {"totalResults": "1"}
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/customsearch/v1"))
        .and(query_param("q", "tokio"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "searchInformation": {"totalResults": "0"}
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client =
        CseClient::new(format!("{}/customsearch/v1", mock_server.uri()), 5).unwrap();
    let responses = client
        .execute_batch(&credentials(), &[query(0, "rust lang"), query(1, "tokio")])
        .await
        .unwrap();

    assert_eq!(responses.len(), 2);
    assert_eq!(responses[0].request_id, 0);
    let payload = responses[0].outcome.as_ref().unwrap();
    assert_eq!(payload["items"][0]["link"], "https://www.rust-lang.org/");
    assert!(responses[1].outcome.is_ok());
}

#[tokio::test]
async fn test_http_error_fails_only_that_term() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(query_param("q", "bad"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {"code": 400, "message": "Invalid Value"}
        })))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(query_param("q", "good"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": []})))
        .mount(&mock_server)
        .await;

    let client = CseClient::new(mock_server.uri(), 5).unwrap();
    let responses = client
        .execute_batch(&credentials(), &[query(0, "bad"), query(1, "good")])
        .await
        .unwrap();

    assert_eq!(
        responses[0].outcome,
        Err("HTTP 400: Invalid Value".to_string())
    );
    assert!(responses[1].outcome.is_ok());
}

#[tokio::test]
async fn test_undecodable_body_is_a_term_failure() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
        .mount(&mock_server)
        .await;

    let client = CseClient::new(mock_server.uri(), 5).unwrap();
    let responses = client
        .execute_batch(&credentials(), &[query(0, "anything")])
        .await
        .unwrap();

    let message = responses[0].outcome.as_ref().unwrap_err();
    assert!(message.starts_with("Invalid JSON payload"));
}

#[tokio::test]
async fn test_unreachable_endpoint_is_transient() {
    // Nothing listens on port 1
    let client = CseClient::new("http://127.0.0.1:1/customsearch/v1", 5).unwrap();
    let result = client
        .execute_batch(&credentials(), &[query(0, "anything")])
        .await;

    assert!(matches!(result, Err(ProviderError::Transient(_))));
}

#[tokio::test]
async fn test_dropped_connection_is_transient_and_hides_the_key() {
    let endpoint = crate::support::spawn_dropping_server().await;
    let client = CseClient::new(endpoint, 5).unwrap();

    let result = client
        .execute_batch(&credentials(), &[query(0, "anything")])
        .await;

    match result {
        Err(ProviderError::Transient(message)) => {
            assert!(!message.contains("test-key"), "key leaked: {}", message);
        }
        other => panic!("expected a transient fault, got {:?}", other),
    }
}
