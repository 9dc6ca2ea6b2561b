use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use bucket_ingest_core::config::IngestConfig;
use bucket_ingest_core::contract::{
    JobOutcome, JobState, MockLoadService, MockNotifier, MockObjectStore, MockTrackingService,
    ObjectMetadata, TrackingResponse,
};
use bucket_ingest_core::event::FileEvent;
use bucket_ingest_core::pipeline::{Collaborators, IngestOutcome, IngestPipeline};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{layer::Context, Layer, Registry};

const PICKED_UP: &str = "The file has been picked up";

/// Custom Layer to collect emitted event messages.
struct EventCollector {
    events: Arc<Mutex<Vec<String>>>,
}

impl<S> Layer<S> for EventCollector
where
    S: tracing::Subscriber,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        use std::fmt::Write as FmtWrite;
        let mut msg = String::new();
        let _ = write!(&mut msg, "{:?}", event);
        self.events.lock().unwrap().push(msg);
    }
}

fn config(gate: &'static str) -> IngestConfig {
    let vars: HashMap<&str, &str> = HashMap::from([
        ("PROJECT_ID", "proj"),
        ("DATASET_ID", "forecasts"),
        ("TABLE_NAME", "forecast"),
        ("DAILY_TABLE_NAME", "forecast_daily"),
        ("WEEKLY_TABLE_NAME", "forecast_weekly"),
        ("DELIMITER", "|"),
        ("TRIGGER_FILE_PATHS", "in"),
        ("IN_PROGRESS_CODE", "IP"),
        ("SUCCESS_CODE", "OK"),
        ("FAILURE_CODE", "KO"),
        ("CHECKSUM_GATE", gate),
    ]);
    IngestConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string())).expect("valid test config")
}

async fn run_successful_load(cfg: &IngestConfig) -> Vec<String> {
    let events = Arc::new(Mutex::new(Vec::new()));
    let subscriber = Registry::default().with(EventCollector {
        events: events.clone(),
    });
    let _guard = tracing::subscriber::set_default(subscriber);

    let mut tracking = MockTrackingService::new();
    let mut store = MockObjectStore::new();
    let mut loader = MockLoadService::new();
    tracking
        .expect_update_status()
        .returning(|_, _| Ok(TrackingResponse::new("Row Updated")));
    tracking.expect_check_run_status().returning(|_| Ok(()));
    tracking
        .expect_get_checksum()
        .returning(|_| Ok(TrackingResponse::new("same==")));
    store.expect_object_metadata().returning(|_, _| {
        Ok(ObjectMetadata {
            md5_hash: Some("same==".into()),
            generation: None,
        })
    });
    loader.expect_run_load().times(1).returning(|_| {
        Ok(JobOutcome {
            job_id: "job-1".into(),
            state: JobState::Done,
            errors: vec![],
        })
    });
    let notifier = MockNotifier::new();

    let pipeline = IngestPipeline::new(
        cfg,
        Collaborators {
            loader: &loader,
            store: &store,
            tracking: &tracking,
            notifier: &notifier,
            dedup: None,
        },
    );
    let report = pipeline
        .handle(&FileEvent::new("b", "in/sales_forecast_daily.csv"))
        .await;
    assert_eq!(report.outcome, IngestOutcome::RunStatusChecked);

    let collected = events.lock().unwrap().clone();
    collected
}

#[tokio::test]
async fn picked_up_is_logged_once_without_checksum_gate() {
    let messages = run_successful_load(&config("false")).await;
    let count = messages.iter().filter(|m| m.contains(PICKED_UP)).count();
    assert_eq!(count, 1, "got: {messages:?}");
}

#[tokio::test]
async fn picked_up_is_logged_once_with_checksum_gate() {
    let messages = run_successful_load(&config("true")).await;
    let count = messages.iter().filter(|m| m.contains(PICKED_UP)).count();
    assert_eq!(count, 1, "got: {messages:?}");
}
