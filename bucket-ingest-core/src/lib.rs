#![doc = "bucket-ingest-core: orchestration logic for bucket-ingest."]

//! This crate holds the ingestion state machine for files landing in object storage:
//! deciding whether a file is relevant, routing it to a table, running the load job,
//! reporting status to the tracking service and alerting on failure.
//!
//! No network code lives here. External services are reached through the traits in
//! [`contract`]; the CLI crate provides HTTP implementations and tests provide mocks.
//!
//! # Usage
//! Build an [`config::IngestConfig`] once, borrow one client per collaborator into a
//! [`pipeline::Collaborators`], then call [`pipeline::IngestPipeline::handle`] per event.

pub mod checksum;
pub mod config;
pub mod contract;
pub mod eligibility;
pub mod error;
pub mod event;
pub mod load;
pub mod notify;
pub mod pipeline;
pub mod routing;
pub mod status;
