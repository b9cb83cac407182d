//! Campaign orchestration
//!
//! Drives the whole campaign: schedules the universe over the calendar, waits for
//! each day's trigger, runs the day's executor and finally derives URL records
//! from the stored responses.

use crate::campaign::{
    BatchSearchExecutor, CampaignEvent, DailyTrigger, DayReport, EventSink, Pacing,
    SearchTerm, TermScheduler, TracingSink, WaitGate,
};
use crate::config::Config;
use crate::provider::{Credentials, SearchProvider};
use crate::storage::{CampaignStatus, Storage};
use crate::{Result, SweepError};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Outcome of a completed campaign
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CampaignReport {
    pub campaign_id: i64,
    pub days: Vec<DayReport>,
    pub url_records: usize,
}

impl CampaignReport {
    pub fn succeeded(&self) -> usize {
        self.days.iter().map(|d| d.succeeded).sum()
    }

    pub fn failed(&self) -> usize {
        self.days.iter().map(|d| d.failed).sum()
    }
}

/// Runs one campaign against a provider and a store
pub struct Campaign<S: Storage> {
    config: Config,
    store: S,
    provider: Arc<dyn SearchProvider>,
    credentials: Credentials,
    trigger: Box<dyn DailyTrigger>,
    events: Arc<dyn EventSink>,
    config_hash: String,
}

impl<S: Storage> Campaign<S> {
    /// Creates a campaign that starts each day at the configured hour
    pub fn new(
        config: Config,
        store: S,
        provider: Arc<dyn SearchProvider>,
        credentials: Credentials,
    ) -> Result<Self> {
        let gate = WaitGate::new(
            config.campaign.start_hour,
            config.campaign.recheck_interval_minutes,
        )?;

        Ok(Self {
            config,
            store,
            provider,
            credentials,
            trigger: Box::new(gate),
            events: Arc::new(TracingSink),
            config_hash: String::new(),
        })
    }

    pub fn with_trigger(mut self, trigger: Box<dyn DailyTrigger>) -> Self {
        self.trigger = trigger;
        self
    }

    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// Hash of the configuration file, recorded with the campaign run
    pub fn with_config_hash(mut self, config_hash: impl Into<String>) -> Self {
        self.config_hash = config_hash.into();
        self
    }

    /// Runs the campaign over an ordered universe of terms
    ///
    /// On success the urls table is filled and the store is closed. On failure the
    /// run is marked failed; rows of completed sub-batches stay committed, so a
    /// rerun with the same start date resumes after them.
    pub async fn run(&mut self, universe: Vec<String>) -> Result<CampaignReport> {
        let scheduler = TermScheduler::from_terms(
            SearchTerm::universe(universe),
            self.config.campaign.daily_length,
            self.config.campaign.start_date,
        )?;

        self.store.create_response_table()?;
        let campaign_id = self.store.create_campaign(&self.config_hash)?;
        self.store.save()?;

        self.events.record(&CampaignEvent::CampaignStarted {
            campaign_id,
            terms: scheduler.len(),
            days: scheduler.days_required(),
            last_day: scheduler.last_day(),
        });

        match self.execute(&scheduler).await {
            Ok((days, url_records)) => {
                self.store
                    .finish_campaign(campaign_id, CampaignStatus::Completed)?;
                self.store.save()?;
                self.store.close()?;

                self.events
                    .record(&CampaignEvent::CampaignCompleted { campaign_id });

                Ok(CampaignReport {
                    campaign_id,
                    days,
                    url_records,
                })
            }
            Err(e) => {
                if let Err(rollback_err) = self.store.rollback() {
                    tracing::error!("Failed to discard pending writes: {}", rollback_err);
                }
                self.events.record(&CampaignEvent::CampaignFailed {
                    campaign_id,
                    error: e.to_string(),
                });
                if let Err(mark_err) = self
                    .store
                    .finish_campaign(campaign_id, CampaignStatus::Failed)
                    .and_then(|_| self.store.save())
                {
                    tracing::error!("Failed to mark campaign {} failed: {}", campaign_id, mark_err);
                }
                Err(e)
            }
        }
    }

    async fn execute(&mut self, scheduler: &TermScheduler) -> Result<(Vec<DayReport>, usize)> {
        let pacing = Pacing::from_config(&self.config.pacing);
        let mut days = Vec::with_capacity(scheduler.days_required());

        for &day in scheduler.calendar() {
            self.events.record(&CampaignEvent::WaitingForDay { day });
            self.trigger.wait_for(day).await?;

            let chunk = scheduler.daily_task_for(day)?;
            let report = BatchSearchExecutor::new(chunk, &mut self.store, day)?
                .with_pacing(pacing.clone())
                .with_events(Arc::clone(&self.events))
                .search(
                    self.provider.as_ref(),
                    self.config.campaign.results_per_term,
                    &self.credentials,
                )
                .await?;
            days.push(report);
        }

        self.store.save()?;
        self.store.create_urls_table()?;
        let url_records = self.store.response_to_urls()?;
        self.events
            .record(&CampaignEvent::ExtractionCompleted { url_records });

        Ok((days, url_records))
    }
}

/// Copies a database file to `<backup_dir>/<stem>_backup.db`
///
/// The store must be closed first so the file is complete.
pub fn backup_database(db_path: &Path, backup_dir: &Path) -> Result<PathBuf> {
    let stem = db_path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| {
            SweepError::Validation(format!(
                "cannot derive a backup name from {}",
                db_path.display()
            ))
        })?;

    std::fs::create_dir_all(backup_dir)?;
    let target = backup_dir.join(format!("{}_backup.db", stem));
    std::fs::copy(db_path, &target)?;

    tracing::info!("Backed up {} to {}", db_path.display(), target.display());
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::campaign::{ImmediateTrigger, MemorySink};
    use crate::config::parse_config;
    use crate::provider::{BatchQuery, ProviderError, QueryResponse};
    use crate::storage::{ResponseStatus, SqliteStorage, StorageError};
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use serde_json::json;
    use tempfile::TempDir;

    struct EchoProvider {
        fail_after: Option<usize>,
        calls: std::sync::Mutex<usize>,
    }

    impl EchoProvider {
        fn new(fail_after: Option<usize>) -> Self {
            Self {
                fail_after,
                calls: std::sync::Mutex::new(0),
            }
        }
    }

    #[async_trait]
    impl SearchProvider for EchoProvider {
        async fn execute_batch(
            &self,
            _credentials: &Credentials,
            queries: &[BatchQuery],
        ) -> std::result::Result<Vec<QueryResponse>, ProviderError> {
            let mut calls = self.calls.lock().unwrap();
            *calls += 1;
            if self.fail_after.is_some_and(|limit| *calls > limit) {
                return Err(ProviderError::Fatal("quota revoked".into()));
            }

            Ok(queries
                .iter()
                .map(|q| {
                    let payload = if q.text.starts_with("empty") {
                        json!({"searchInformation": {"totalResults": "0"}})
                    } else {
                        json!({"items": [{"link": format!("https://{}.example", q.text)}]})
                    };
                    QueryResponse::success(q.request_id, payload)
                })
                .collect())
        }
    }

    fn config(db: &Path) -> Config {
        parse_config(&format!(
            r#"
[campaign]
daily-length = 4
results-per-term = 5
start-hour = 23
recheck-interval-minutes = 30
start-date = "2017-06-25"

[provider]
api-key = "key"
cse-id = "engine"

[pacing]
batch-size = 2
batch-interval-ms = 0
retry-initial-delay-ms = 0
retry-max-delay-ms = 0
max-attempts = 2

[output]
database-path = "{}"
"#,
            db.display()
        ))
        .unwrap()
    }

    fn universe(n: usize) -> Vec<String> {
        (0..n)
            .map(|i| if i == 3 { "empty".to_string() } else { format!("t{}", i) })
            .collect()
    }

    fn campaign(db: &Path, provider: EchoProvider) -> Campaign<SqliteStorage> {
        let store = SqliteStorage::new(db).unwrap();
        Campaign::new(
            config(db),
            store,
            Arc::new(provider),
            Credentials::new(Some("key"), Some("engine")).unwrap(),
        )
        .unwrap()
        .with_trigger(Box::new(ImmediateTrigger))
        .with_config_hash("abc123")
    }

    #[tokio::test]
    async fn test_full_campaign_fills_both_tables() {
        let dir = TempDir::new().unwrap();
        let db = dir.path().join("terms.db");
        let sink = Arc::new(MemorySink::new());

        let report = campaign(&db, EchoProvider::new(None))
            .with_events(sink.clone())
            .run(universe(10))
            .await
            .unwrap();

        assert_eq!(report.days.len(), 3);
        assert_eq!(
            report.days.iter().map(|d| d.day).collect::<Vec<_>>(),
            vec![
                NaiveDate::from_ymd_opt(2017, 6, 25).unwrap(),
                NaiveDate::from_ymd_opt(2017, 6, 26).unwrap(),
                NaiveDate::from_ymd_opt(2017, 6, 27).unwrap(),
            ]
        );
        assert_eq!(report.days[0].batches_total, 2);
        assert_eq!(report.days[2].batches_total, 1);
        assert_eq!(report.succeeded(), 10);
        assert_eq!(report.url_records, 10);

        let store = SqliteStorage::new(&db).unwrap();
        assert_eq!(store.count_responses(ResponseStatus::Success).unwrap(), 10);
        assert_eq!(store.count_notes().unwrap(), 1);

        let urls = store.url_records().unwrap();
        assert_eq!(urls[0].urls.as_deref(), Some("https://t0.example"));
        assert_eq!(urls[3].term, "empty");
        assert_eq!(urls[3].urls, None);

        let run = store.latest_campaign().unwrap().unwrap();
        assert_eq!(run.id, report.campaign_id);
        assert_eq!(run.status, CampaignStatus::Completed);
        assert_eq!(run.config_hash, "abc123");

        let events = sink.events();
        assert!(matches!(
            events.first(),
            Some(CampaignEvent::CampaignStarted { terms: 10, days: 3, .. })
        ));
        assert!(matches!(
            events.last(),
            Some(CampaignEvent::CampaignCompleted { .. })
        ));
    }

    #[tokio::test]
    async fn test_store_is_closed_after_run() {
        let dir = TempDir::new().unwrap();
        let db = dir.path().join("terms.db");
        let mut campaign = campaign(&db, EchoProvider::new(None));

        campaign.run(universe(2)).await.unwrap();

        assert!(matches!(
            campaign.store.responses(),
            Err(StorageError::Closed)
        ));
    }

    #[tokio::test]
    async fn test_failure_marks_run_and_rerun_resumes() {
        let dir = TempDir::new().unwrap();
        let db = dir.path().join("terms.db");

        // Three sub-batches succeed, the fourth call fails
        let result = campaign(&db, EchoProvider::new(Some(3)))
            .run(universe(10))
            .await;
        assert!(matches!(
            result,
            Err(SweepError::Provider(ProviderError::Fatal(_)))
        ));

        {
            let store = SqliteStorage::new(&db).unwrap();
            assert_eq!(store.responses().unwrap().len(), 6);
            let run = store.latest_campaign().unwrap().unwrap();
            assert_eq!(run.status, CampaignStatus::Failed);
        }

        let report = campaign(&db, EchoProvider::new(None))
            .run(universe(10))
            .await
            .unwrap();
        assert_eq!(report.days[0].batches_skipped, 2);
        assert_eq!(report.days[1].batches_skipped, 1);
        assert_eq!(report.succeeded(), 4);

        let store = SqliteStorage::new(&db).unwrap();
        let ids: Vec<i64> = store
            .responses()
            .unwrap()
            .iter()
            .map(|r| r.term_id)
            .collect();
        assert_eq!(ids, (0..10).collect::<Vec<i64>>());
    }

    #[tokio::test]
    async fn test_failed_write_is_not_committed_with_the_failed_run() {
        let dir = TempDir::new().unwrap();
        let db = dir.path().join("terms.db");
        rusqlite::Connection::open(&db)
            .unwrap()
            .execute_batch(
                "CREATE TABLE responses (
                    time TEXT NOT NULL,
                    id INTEGER NOT NULL,
                    term TEXT NOT NULL CHECK (term != 'empty'),
                    status TEXT NOT NULL,
                    response TEXT,
                    exception TEXT
                );",
            )
            .unwrap();

        let result = campaign(&db, EchoProvider::new(None))
            .run(universe(4))
            .await;
        assert!(matches!(
            result,
            Err(SweepError::StorageError(StorageError::Sqlite(_)))
        ));

        let store = SqliteStorage::new(&db).unwrap();
        let ids: Vec<i64> = store
            .responses()
            .unwrap()
            .iter()
            .map(|r| r.term_id)
            .collect();
        assert_eq!(ids, vec![0, 1]);

        let day = NaiveDate::from_ymd_opt(2017, 6, 25).unwrap();
        assert_eq!(store.completed_batches(day).unwrap().len(), 1);
        assert_eq!(
            store.latest_campaign().unwrap().map(|run| run.status),
            Some(CampaignStatus::Failed)
        );
    }

    #[test]
    fn test_backup_copies_database() {
        let dir = TempDir::new().unwrap();
        let db = dir.path().join("terms.db");
        std::fs::write(&db, b"sqlite bytes").unwrap();

        let target = backup_database(&db, &dir.path().join("backups")).unwrap();

        assert_eq!(target, dir.path().join("backups").join("terms_backup.db"));
        assert_eq!(std::fs::read(&target).unwrap(), b"sqlite bytes");
    }
}
