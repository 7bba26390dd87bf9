//! Arena Sync engine
//!
//! Pulls competition telemetry from the NOF1 APIs, normalizes it into typed
//! rows, and generates ordered upsert batches for the persistence layer.
//! The pipeline is four stages behind one entry point: fetch, normalize,
//! generate, execute.

pub mod api;
pub mod batch;
pub mod config;
pub mod normalize;
pub mod pipeline;
pub mod types;

pub use api::Nof1Client;
pub use config::{SchemaVersion, SyncConfig, DEFAULT_MODELS};
pub use pipeline::{run_sync, SyncReport};
