//! Integration tests for whole campaigns
//!
//! A scripted provider covers the full-scale run; wiremock covers a small
//! campaign over real HTTP.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::json;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use term_sweep::campaign::{Campaign, CampaignEvent, ImmediateTrigger, MemorySink};
use term_sweep::config::{CampaignConfig, Config, OutputConfig, PacingConfig, ProviderConfig};
use term_sweep::provider::{
    BatchQuery, CseClient, Credentials, ProviderError, QueryResponse, SearchProvider,
};
use term_sweep::storage::{ResponseStatus, SqliteStorage, Storage, NOTE_NO_RESULTS};
use term_sweep::SweepError;
use wiremock::matchers::{method, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration without pacing delays
fn create_test_config(daily_length: usize, endpoint: &str, db_path: &Path) -> Config {
    Config {
        campaign: CampaignConfig {
            daily_length,
            results_per_term: 10,
            start_hour: 23,
            recheck_interval_minutes: 30,
            start_date: NaiveDate::from_ymd_opt(2017, 6, 25),
        },
        provider: ProviderConfig {
            endpoint: endpoint.to_string(),
            api_key: None,
            cse_id: None,
            request_timeout: 5,
        },
        pacing: PacingConfig {
            batch_size: 100,
            batch_interval_ms: 0,
            retry_initial_delay_ms: 0,
            retry_max_delay_ms: 0,
            max_attempts: 3,
        },
        output: OutputConfig {
            database_path: db_path.display().to_string(),
            backup_dir: None,
        },
    }
}

/// Records every submission and answers each query with one link
#[derive(Default)]
struct CountingProvider {
    submissions: Mutex<Vec<Vec<String>>>,
    transient_on_call: Option<usize>,
}

#[async_trait]
impl SearchProvider for CountingProvider {
    async fn execute_batch(
        &self,
        _credentials: &Credentials,
        queries: &[BatchQuery],
    ) -> Result<Vec<QueryResponse>, ProviderError> {
        let mut submissions = self.submissions.lock().unwrap();
        submissions.push(queries.iter().map(|q| q.text.clone()).collect());
        if self.transient_on_call == Some(submissions.len()) {
            return Err(ProviderError::Transient("connection reset by peer".into()));
        }

        Ok(queries
            .iter()
            .map(|q| {
                QueryResponse::success(
                    q.request_id,
                    json!({"items": [{"link": format!("https://example.com/{}", q.text)}]}),
                )
            })
            .collect())
    }
}

fn credentials() -> Credentials {
    Credentials::new(Some("test-key"), Some("test-engine")).unwrap()
}

#[tokio::test]
async fn test_campaign_of_25000_terms() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("terms.db");
    let config = create_test_config(10_000, "https://unused.example", &db_path);
    let provider = Arc::new(CountingProvider::default());
    let sink = Arc::new(MemorySink::new());

    let universe: Vec<String> = (0..25_000).map(|i| format!("term{}", i)).collect();
    let storage = SqliteStorage::new(&db_path).unwrap();

    let report = Campaign::new(config, storage, provider.clone(), credentials())
        .unwrap()
        .with_trigger(Box::new(ImmediateTrigger))
        .with_events(sink.clone())
        .run(universe)
        .await
        .unwrap();

    // Calendar of three days
    assert_eq!(report.days.len(), 3);
    assert_eq!(
        report.days[2].day,
        NaiveDate::from_ymd_opt(2017, 6, 27).unwrap()
    );

    // Day one is 100 sub-batches of 100 terms
    let submissions = provider.submissions.lock().unwrap().clone();
    assert_eq!(report.days[0].batches_submitted, 100);
    assert!(submissions[..100].iter().all(|batch| batch.len() == 100));
    assert_eq!(submissions.len(), 250);

    let storage = SqliteStorage::new(&db_path).unwrap();
    let rows = storage.responses().unwrap();
    assert_eq!(rows.len(), 25_000);

    // Every day-one id appears exactly once, in submission order
    let day_one: Vec<i64> = rows.iter().take(10_000).map(|r| r.term_id).collect();
    assert_eq!(day_one, (0..10_000).collect::<Vec<i64>>());
    assert!(rows[10_000..].iter().all(|r| r.term_id >= 10_000));

    assert_eq!(storage.count_url_records().unwrap(), 25_000);
    assert_eq!(storage.completed_batches(report.days[0].day).unwrap().len(), 100);

    let days_completed = sink
        .events()
        .iter()
        .filter(|e| matches!(e, CampaignEvent::DayCompleted(_)))
        .count();
    assert_eq!(days_completed, 3);
}

#[tokio::test]
async fn test_transient_fault_resubmits_exactly_once() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("terms.db");
    let config = create_test_config(500, "https://unused.example", &db_path);
    let provider = Arc::new(CountingProvider {
        transient_on_call: Some(2),
        ..CountingProvider::default()
    });

    let universe: Vec<String> = (0..300).map(|i| format!("term{}", i)).collect();
    let storage = SqliteStorage::new(&db_path).unwrap();

    let report = Campaign::new(config, storage, provider.clone(), credentials())
        .unwrap()
        .with_trigger(Box::new(ImmediateTrigger))
        .run(universe)
        .await
        .unwrap();

    let submissions = provider.submissions.lock().unwrap().clone();
    assert_eq!(submissions.len(), 4);
    assert_eq!(submissions[1], submissions[2]);
    assert_eq!(report.days[0].retries, 1);

    let storage = SqliteStorage::new(&db_path).unwrap();
    let ids: Vec<i64> = storage
        .responses()
        .unwrap()
        .iter()
        .map(|r| r.term_id)
        .collect();
    assert_eq!(ids, (0..300).collect::<Vec<i64>>());
}

#[tokio::test]
async fn test_campaign_over_http() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(query_param("q", "ferris"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [
                {"link": "https://rustacean.net/"},
                {"link": "https://www.rust-lang.org/"}
            ],
            "searchInformation": {"totalResults": "2"}
        })))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(query_param("q", "ferriss crab"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "spelling": {"correctedQuery": "ferris crab"},
            "searchInformation": {"totalResults": "0"}
        })))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(query_param("q", "forbidden"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "error": {"code": 403, "message": "Daily Limit Exceeded"}
        })))
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("terms.db");
    let config = create_test_config(2, &mock_server.uri(), &db_path);
    let client = Arc::new(CseClient::from_config(&config.provider).unwrap());
    let storage = SqliteStorage::new(&db_path).unwrap();

    let universe = vec![
        "ferris".to_string(),
        "ferriss crab".to_string(),
        "forbidden".to_string(),
    ];

    let report = Campaign::new(config, storage, client, credentials())
        .unwrap()
        .with_trigger(Box::new(ImmediateTrigger))
        .run(universe)
        .await
        .unwrap();

    assert_eq!(report.days.len(), 2);
    assert_eq!(report.succeeded(), 2);
    assert_eq!(report.failed(), 1);
    assert_eq!(report.url_records, 2);

    let storage = SqliteStorage::new(&db_path).unwrap();
    let responses = storage.responses().unwrap();
    assert_eq!(responses[2].status, ResponseStatus::Failure);
    assert_eq!(
        responses[2].exception.as_deref(),
        Some("HTTP 403: Daily Limit Exceeded")
    );

    let urls = storage.url_records().unwrap();
    assert_eq!(
        urls[0].urls.as_deref(),
        Some("https://rustacean.net/; https://www.rust-lang.org/")
    );
    assert_eq!(urls[1].corrected_term.as_deref(), Some("ferris crab"));
    assert_eq!(urls[1].notes.as_deref(), Some(NOTE_NO_RESULTS));
}

#[tokio::test]
async fn test_dropped_connections_exhaust_retries_without_leaking_the_key() {
    let endpoint = crate::support::spawn_dropping_server().await;
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("terms.db");
    let config = create_test_config(10, &endpoint, &db_path);
    let client = Arc::new(CseClient::from_config(&config.provider).unwrap());
    let sink = Arc::new(MemorySink::new());
    let storage = SqliteStorage::new(&db_path).unwrap();

    let result = Campaign::new(config, storage, client, credentials())
        .unwrap()
        .with_trigger(Box::new(ImmediateTrigger))
        .with_events(sink.clone())
        .run(vec!["ferris".to_string(), "crab".to_string()])
        .await;

    match result {
        Err(SweepError::RetriesExhausted {
            attempts,
            last_error,
            ..
        }) => {
            assert_eq!(attempts, 3);
            assert!(!last_error.contains("test-key"));
        }
        other => panic!("expected exhausted retries, got {:?}", other.map(|r| r.days)),
    }

    let retries: Vec<String> = sink
        .events()
        .into_iter()
        .filter_map(|e| match e {
            CampaignEvent::BatchRetrying { error, .. } => Some(error),
            _ => None,
        })
        .collect();
    assert_eq!(retries.len(), 2);
    assert!(retries.iter().all(|error| !error.contains("test-key")));

    let storage = SqliteStorage::new(&db_path).unwrap();
    assert!(storage.responses().unwrap().is_empty());
}
