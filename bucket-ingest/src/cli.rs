/// # bucket-ingest CLI Interface (Module)
///
/// Command parsing and wiring for the `bucket-ingest` binary. The CLI resolves configuration,
/// builds the HTTP adapters and hands them to the pipeline in [`bucket_ingest_core`]; it holds
/// no workflow logic of its own.
///
/// ## Subcommands
/// - `handle`: run the ingestion workflow for one storage event and print the report as JSON
/// - `verify`: compare the stored object's hash against the expected checksum (read-only)
/// - `route`: print eligibility and destination table for an event, without side effects
///
/// ## How To Use
/// - From the command line: `bucket-ingest --help`.
/// - From tests or other Rust code: call [`run`] with a constructed [`Cli`].
use crate::dedup::FileDedupStore;
use crate::load_config::{load_config, AppConfig, EndpointConfig};
use crate::notify::EmailNotifier;
use crate::storage::GcsMetadata;
use crate::tracking::TrackingClient;
use crate::warehouse::BigQueryLoader;
use anyhow::{Context, Result};
use bucket_ingest_core::contract::{BoxError, DedupStore};
use bucket_ingest_core::event::FileEvent;
use bucket_ingest_core::pipeline::{Collaborators, IngestPipeline};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;

/// Load files landing in object storage into warehouse tables and report their status.
#[derive(Parser)]
#[clap(name = "bucket-ingest", version, about)]
pub struct Cli {
    /// Optional YAML file with configuration keys; environment variables take precedence
    #[clap(long, global = true)]
    pub config: Option<PathBuf>,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Handle one object-finalized event end to end
    Handle {
        #[clap(flatten)]
        event: EventArgs,
    },
    /// Check the stored object's checksum against the tracking service
    Verify {
        #[clap(flatten)]
        event: EventArgs,
    },
    /// Show where an event would be loaded, without loading it
    Route {
        #[clap(flatten)]
        event: EventArgs,
    },
}

/// The triggering event, given inline or as the notification JSON payload.
#[derive(Args, Debug, Clone)]
pub struct EventArgs {
    /// Bucket holding the object
    #[clap(long, required_unless_present = "event", conflicts_with = "event")]
    pub bucket: Option<String>,

    /// Full object name inside the bucket
    #[clap(long, required_unless_present = "event", conflicts_with = "event")]
    pub name: Option<String>,

    /// Object generation, used for redelivery detection
    #[clap(long, conflicts_with = "event")]
    pub generation: Option<String>,

    /// Path to a JSON file with the storage notification payload
    #[clap(long)]
    pub event: Option<PathBuf>,
}

impl EventArgs {
    pub fn into_event(self) -> Result<FileEvent> {
        if let Some(path) = self.event {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read event file {path:?}"))?;
            let event: FileEvent = serde_json::from_str(&raw)
                .with_context(|| format!("Event file {path:?} is not a valid storage event"))?;
            return Ok(event);
        }
        match (self.bucket, self.name) {
            (Some(bucket), Some(name)) => {
                let event = FileEvent::new(bucket, name);
                Ok(match self.generation {
                    Some(g) => event.with_generation(g),
                    None => event,
                })
            }
            _ => anyhow::bail!("either --event or both --bucket and --name are required"),
        }
    }
}

#[derive(Serialize)]
struct RouteReport<'a> {
    bucket: &'a str,
    file: &'a str,
    eligible: bool,
    table: Option<&'a str>,
}

#[derive(Serialize)]
struct VerifyReport<'a> {
    bucket: &'a str,
    file: &'a str,
    checksum_match: bool,
}

/// Concrete HTTP adapters, owned for the lifetime of one command.
struct Clients {
    loader: BigQueryLoader,
    store: GcsMetadata,
    tracking: TrackingClient,
    notifier: EmailNotifier,
    dedup: Option<FileDedupStore>,
}

impl Clients {
    fn from_config(endpoints: &EndpointConfig) -> Result<Self> {
        let boxed = |e: BoxError| anyhow::anyhow!("Failed to build HTTP client: {e}");
        Ok(Self {
            loader: BigQueryLoader::new(
                endpoints.warehouse_base_url.clone(),
                endpoints.access_token.clone(),
                endpoints.poll_interval,
            )
            .map_err(boxed)?,
            store: GcsMetadata::new(
                endpoints.storage_base_url.clone(),
                endpoints.access_token.clone(),
            )
            .map_err(boxed)?,
            tracking: TrackingClient::new(
                endpoints.tracking_base_url.clone(),
                endpoints.tracking_api_key.clone(),
            )
            .map_err(boxed)?,
            notifier: EmailNotifier::new(endpoints.notify_url.clone()).map_err(boxed)?,
            dedup: endpoints.dedup_dir.clone().map(FileDedupStore::new),
        })
    }

    fn collaborators(&self) -> Collaborators<'_> {
        Collaborators {
            loader: &self.loader,
            store: &self.store,
            tracking: &self.tracking,
            notifier: &self.notifier,
            dedup: self.dedup.as_ref().map(|d| d as &dyn DedupStore),
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Async CLI entrypoint shared by `main` and the integration tests.
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");

    let app = load_config(cli.config.as_deref())?;
    app.trace_loaded();
    let AppConfig { ingest, endpoints } = app;
    let clients = Clients::from_config(&endpoints)?;
    let pipeline = IngestPipeline::new(&ingest, clients.collaborators());

    match cli.command {
        Commands::Handle { event } => {
            let event = event.into_event()?;
            tracing::info!(command = "handle", bucket = %event.bucket, file = %event.name, "Handling event");
            let report = pipeline.handle(&event).await;
            tracing::info!(command = "handle", outcome = ?report.outcome, "Event handled");
            print_json(&report)
        }
        Commands::Verify { event } => {
            let event = event.into_event()?;
            let checksum_match = pipeline.verify(&event).await.map_err(|e| {
                tracing::error!(command = "verify", error = %e, "Checksum verification failed");
                anyhow::Error::new(e)
            })?;
            print_json(&VerifyReport {
                bucket: &event.bucket,
                file: &event.name,
                checksum_match,
            })
        }
        Commands::Route { event } => {
            let event = event.into_event()?;
            let table = pipeline.route(&event);
            print_json(&RouteReport {
                bucket: &event.bucket,
                file: &event.name,
                eligible: table.is_some(),
                table,
            })
        }
    }
}
