use assert_cmd::Command;
use predicates::prelude::*;
use std::fs::write;
use tempfile::NamedTempFile;

const ENV: &[(&str, &str)] = &[
    ("PROJECT_ID", "proj"),
    ("DATASET_ID", "forecasts"),
    ("TABLE_NAME", "sales_forecast"),
    ("DAILY_TABLE_NAME", "sales_forecast_daily"),
    ("WEEKLY_TABLE_NAME", "sales_forecast_weekly"),
    ("DELIMITER", "\\t"),
    ("TRIGGER_FILE_PATHS", "gs://landing/in/daily,gs://landing/in/weekly"),
    ("IN_PROGRESS_CODE", "10"),
    ("SUCCESS_CODE", "20"),
    ("FAILURE_CODE", "30"),
    ("TRACKING_BASE_URL", "http://127.0.0.1:9/tracking"),
    ("NOTIFY_URL", "http://127.0.0.1:9/notify"),
];

fn bucket_ingest() -> Command {
    let mut cmd = Command::cargo_bin("bucket-ingest").expect("Binary exists");
    cmd.envs(ENV.iter().copied()).env("RUST_LOG", "warn");
    cmd
}

#[test]
fn route_prints_destination_for_eligible_daily_file() {
    bucket_ingest()
        .args(["route", "--bucket", "landing", "--name", "in/daily/SALES_FORECAST_daily_0101.csv"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("\"eligible\": true")
                .and(predicate::str::contains("sales_forecast_daily")),
        );
}

#[test]
fn route_reports_ineligible_file_outside_trigger_paths() {
    bucket_ingest()
        .args(["route", "--bucket", "landing", "--name", "archive/sales_forecast_daily.csv"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("\"eligible\": false")
                .and(predicate::str::contains("\"table\": null")),
        );
}

#[test]
fn route_reads_storage_notification_payload() {
    let event = NamedTempFile::new().expect("temp file");
    write(
        event.path(),
        br#"{"bucket":"landing","name":"in/weekly/sales_forecast_weekly.csv","generation":"17","contentType":"text/csv"}"#,
    )
    .unwrap();

    bucket_ingest()
        .arg("route")
        .arg("--event")
        .arg(event.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("sales_forecast_weekly"));
}

#[test]
fn missing_configuration_fails_before_handling() {
    bucket_ingest()
        .env_remove("PROJECT_ID")
        .args(["handle", "--bucket", "landing", "--name", "in/daily/sales_forecast.csv"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("PROJECT_ID"));
}

#[test]
fn event_source_flags_conflict() {
    bucket_ingest()
        .args(["route", "--bucket", "landing", "--event", "payload.json"])
        .assert()
        .failure();
}

use std::sync::{Arc, Mutex};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{layer::Context, Layer, Registry};

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

#[tokio::test]
async fn emits_trace_initialised_event() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let collector = EventCollector {
        events: events.clone(),
    };
    let subscriber = Registry::default().with(collector);
    let _guard = tracing::subscriber::set_default(subscriber);

    use bucket_ingest::cli::{run, Cli, Commands, EventArgs};

    // Configuration is not set here, so run fails after the first event.
    let cli = Cli {
        config: Some(std::path::PathBuf::from("dummy.yaml")),
        command: Commands::Route {
            event: EventArgs {
                bucket: Some("landing".into()),
                name: Some("in/daily/sales_forecast.csv".into()),
                generation: None,
                event: None,
            },
        },
    };

    let _ = run(cli).await;

    let event_msgs = events.lock().unwrap();
    assert!(
        event_msgs.iter().any(|msg| msg.contains("trace_initialised")),
        "Expected a 'trace_initialised' trace event, got: {:?}",
        event_msgs
    );
}
