//! Sync pipeline — fetch, normalize, generate, execute
//!
//! One run is one pass through the four stages with a single timestamp fixed
//! up front. The generated batch is also written to a durable audit script
//! before execution, so the exact statements of the last run can always be
//! inspected or replayed.

use anyhow::{Context, Result};
use chrono::Utc;
use persistence::{BatchExecutor, UpsertBatch};
use serde::Serialize;
use tracing::{info, warn};

use crate::api::{fetch_snapshot, Nof1Client};
use crate::batch::build_batch;
use crate::config::SyncConfig;
use crate::normalize::normalize;

/// Outcome of one sync run
#[derive(Debug, Serialize)]
pub struct SyncReport {
    pub started_at: i64,
    pub duration_ms: i64,
    pub statements: usize,
    /// Rows written per table, in batch emission order
    pub table_counts: Vec<(String, usize)>,
    pub conversations: usize,
    /// Endpoints that failed and were skipped this run
    pub errors: Vec<String>,
}

impl SyncReport {
    fn from_batch(
        batch: &UpsertBatch,
        started_at: i64,
        conversations: usize,
        errors: Vec<String>,
    ) -> Self {
        let table_counts = persistence::schema::TABLES
            .iter()
            .map(|table| (table.to_string(), batch.count_for(table)))
            .collect();
        Self {
            started_at,
            duration_ms: Utc::now().timestamp_millis() - started_at * 1000,
            statements: batch.len(),
            table_counts,
            conversations,
            errors,
        }
    }
}

/// Build the batch for one run without executing it.
///
/// Shared by the sync entry point and the render-only mode.
pub async fn generate_batch(
    client: &Nof1Client,
    config: &SyncConfig,
) -> (UpsertBatch, i64, usize, Vec<String>) {
    let cached_at = Utc::now().timestamp();
    let snapshot = fetch_snapshot(client, config).await;
    let rows = normalize(&snapshot, cached_at, config);
    let batch = build_batch(&rows);
    (batch, cached_at, snapshot.conversations, snapshot.errors)
}

/// Run one full sync cycle
pub async fn run_sync(
    config: &SyncConfig,
    client: &Nof1Client,
    executor: &dyn BatchExecutor,
) -> Result<SyncReport> {
    let (batch, cached_at, conversations, errors) = generate_batch(client, config).await;

    if batch.is_empty() {
        warn!("No data fetched, nothing to write");
        return Ok(SyncReport::from_batch(&batch, cached_at, conversations, errors));
    }

    write_audit_script(config, &batch)?;

    info!(statements = batch.len(), "Executing batch");
    let outcome = executor.execute(&batch).await.context("Batch execution failed")?;

    let report = SyncReport::from_batch(&batch, cached_at, conversations, errors);
    info!(
        statements = outcome.statements,
        duration_ms = report.duration_ms,
        errors = report.errors.len(),
        "Sync complete"
    );
    Ok(report)
}

/// Write the rendered batch script next to the database for auditing
fn write_audit_script(config: &SyncConfig, batch: &UpsertBatch) -> Result<()> {
    if let Some(parent) = config.audit_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }
    std::fs::write(&config.audit_path, batch.to_script())
        .with_context(|| format!("Failed to write {}", config.audit_path.display()))?;
    Ok(())
}
