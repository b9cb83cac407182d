//! Google Custom Search client
//!
//! This module handles all HTTP requests to the search API, including:
//! - Building the HTTP client with timeouts and a user agent string
//! - Issuing one GET per query of a batched submission
//! - Classifying failures as per-query faults or batch-wide connectivity faults

use crate::config::ProviderConfig;
use crate::provider::{BatchQuery, Credentials, ProviderError, QueryResponse, SearchProvider};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

/// Builds an HTTP client for the search API
///
/// # Example
///
/// ```no_run
/// use term_sweep::provider::build_http_client;
///
/// let client = build_http_client(30).unwrap();
/// ```
pub fn build_http_client(timeout_secs: u64) -> Result<Client, reqwest::Error> {
    let user_agent = format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));

    Client::builder()
        .user_agent(user_agent)
        .timeout(Duration::from_secs(timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Result of a single query request
#[derive(Debug)]
enum QueryFetch {
    /// JSON payload returned by the API
    Payload(Value),

    /// The API answered but the query failed
    Failed(String),
}

/// Custom Search JSON API client
///
/// The provider's batch endpoint is emulated by issuing the bundled queries one after
/// another; a connectivity fault on any of them aborts the whole submission so that it
/// can be resubmitted as a unit.
#[derive(Debug, Clone)]
pub struct CseClient {
    client: Client,
    endpoint: String,
}

impl CseClient {
    pub fn new(endpoint: impl Into<String>, timeout_secs: u64) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(timeout_secs)?,
            endpoint: endpoint.into(),
        })
    }

    pub fn from_config(config: &ProviderConfig) -> Result<Self, reqwest::Error> {
        Self::new(config.endpoint.clone(), config.request_timeout)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn fetch_query(
        &self,
        credentials: &Credentials,
        query: &BatchQuery,
    ) -> Result<QueryFetch, ProviderError> {
        let num = query.result_count.to_string();
        let request = self.client.get(&self.endpoint).query(&[
            ("key", credentials.api_key()),
            ("cx", query.collection_id.as_str()),
            ("q", query.text.as_str()),
            ("num", num.as_str()),
        ]);

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => return classify_send_error(e),
        };

        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return classify_send_error(e),
        };

        if !status.is_success() {
            return Ok(QueryFetch::Failed(format!(
                "HTTP {}: {}",
                status.as_u16(),
                api_error_message(&body).unwrap_or(body)
            )));
        }

        match serde_json::from_str::<Value>(&body) {
            Ok(payload) => Ok(QueryFetch::Payload(payload)),
            Err(e) => Ok(QueryFetch::Failed(format!("Invalid JSON payload: {}", e))),
        }
    }
}

#[async_trait]
impl SearchProvider for CseClient {
    async fn execute_batch(
        &self,
        credentials: &Credentials,
        queries: &[BatchQuery],
    ) -> Result<Vec<QueryResponse>, ProviderError> {
        let mut responses = Vec::with_capacity(queries.len());

        for query in queries {
            let response = match self.fetch_query(credentials, query).await? {
                QueryFetch::Payload(payload) => QueryResponse::success(query.request_id, payload),
                QueryFetch::Failed(message) => {
                    tracing::debug!("Query {} failed: {}", query.request_id, message);
                    QueryResponse::failure(query.request_id, message)
                }
            };
            responses.push(response);
        }

        Ok(responses)
    }
}

/// Classifies a transport error
///
/// Timeouts, refused connections and connections dropped while sending the request or
/// reading the body are batch-wide and retryable; anything else is reported against
/// the single query. The request URL is stripped from the message because it carries
/// the API key.
fn classify_send_error(e: reqwest::Error) -> Result<QueryFetch, ProviderError> {
    let e = e.without_url();
    if e.is_timeout() {
        Err(ProviderError::Transient(format!("Request timeout: {}", e)))
    } else if e.is_connect() {
        Err(ProviderError::Transient(format!("Connection failed: {}", e)))
    } else if e.is_request() || e.is_body() {
        Err(ProviderError::Transient(format!("Connection aborted: {}", e)))
    } else {
        Ok(QueryFetch::Failed(e.to_string()))
    }
}

/// Extracts `error.message` from an API error body
fn api_error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value
        .get("error")?
        .get("message")?
        .as_str()
        .map(str::to_string)
}
