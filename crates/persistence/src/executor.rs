//! Batch executors
//!
//! Executes a generated [`UpsertBatch`] against the destination. The direct
//! executor binds typed parameters through sqlx inside one transaction; the
//! external executor hands a rendered script to an out-of-process tool.

use crate::ops::{SqlValue, UpsertBatch};
use async_trait::async_trait;
use serde::Serialize;
use sqlx::query::Query;
use sqlx::sqlite::{Sqlite, SqliteArguments};
use sqlx::SqlitePool;
use std::io::Write;
use std::process::Stdio;
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum ExecError {
    #[error("Statement failed on {table}: {source}")]
    Statement {
        table: &'static str,
        #[source]
        source: sqlx::Error,
    },

    #[error("Transaction error: {0}")]
    Transaction(#[from] sqlx::Error),

    #[error("Failed to stage batch file: {0}")]
    Staging(#[from] std::io::Error),

    #[error("Batch tool exited with {status}: {stderr}")]
    Tool { status: i32, stderr: String },
}

/// Outcome of a successful batch execution
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionReport {
    /// Number of statements applied
    pub statements: usize,
    /// Captured diagnostic output (empty for the direct executor)
    pub output: String,
}

/// Boundary to whatever applies a batch to the destination
#[async_trait]
pub trait BatchExecutor: Send + Sync {
    async fn execute(&self, batch: &UpsertBatch) -> Result<ExecutionReport, ExecError>;
}

fn bind_value<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    value: &'q SqlValue,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    match value {
        SqlValue::Text(s) => query.bind(s.as_str()),
        SqlValue::Integer(i) => query.bind(*i),
        SqlValue::Real(f) => query.bind(*f),
        SqlValue::Null => query.bind(Option::<i64>::None),
    }
}

/// Applies the batch with prepared statements, all inside one transaction
pub struct DirectExecutor {
    pool: SqlitePool,
}

impl DirectExecutor {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BatchExecutor for DirectExecutor {
    async fn execute(&self, batch: &UpsertBatch) -> Result<ExecutionReport, ExecError> {
        let mut tx = self.pool.begin().await?;

        for op in &batch.ops {
            let mut query = sqlx::query(op.sql);
            for value in &op.params {
                query = bind_value(query, value);
            }
            query
                .execute(&mut *tx)
                .await
                .map_err(|e| ExecError::Statement {
                    table: op.table,
                    source: e,
                })?;
        }

        tx.commit().await?;
        debug!(statements = batch.len(), "Batch committed");

        Ok(ExecutionReport {
            statements: batch.len(),
            output: String::new(),
        })
    }
}

/// Hands the rendered batch to an external command.
///
/// The script is staged in a named temp file that is removed on every exit
/// path, success or failure; removal errors are ignored. Invocation shape:
/// `<program> <destination> --file <path>`.
pub struct ExternalExecutor {
    program: String,
    destination: String,
}

impl ExternalExecutor {
    pub fn new(program: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            destination: destination.into(),
        }
    }
}

#[async_trait]
impl BatchExecutor for ExternalExecutor {
    async fn execute(&self, batch: &UpsertBatch) -> Result<ExecutionReport, ExecError> {
        let script = batch.to_script();

        let mut file = NamedTempFile::new()?;
        file.write_all(script.as_bytes())?;
        file.flush()?;

        info!(
            program = %self.program,
            destination = %self.destination,
            statements = batch.len(),
            "Invoking external batch tool"
        );

        let output = tokio::process::Command::new(&self.program)
            .arg(&self.destination)
            .arg("--file")
            .arg(file.path())
            .stdin(Stdio::null())
            .output()
            .await?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            warn!(status = ?output.status.code(), "Batch tool failed");
            return Err(ExecError::Tool {
                status: output.status.code().unwrap_or(-1),
                stderr,
            });
        }

        Ok(ExecutionReport {
            statements: batch.len(),
            output: stdout,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::UpsertOp;
    use crate::Database;

    fn leaderboard_op(model_id: &str, equity: f64, cached_at: i64) -> UpsertOp {
        UpsertOp {
            table: "leaderboard_cache",
            sql: "INSERT OR REPLACE INTO leaderboard_cache \
                  (model_id, num_trades, sharpe, win_dollars, lose_dollars, num_wins, \
                   num_losses, return_pct, equity, rank, cached_at) \
                  VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params: vec![
                SqlValue::from(model_id),
                SqlValue::Integer(10),
                SqlValue::Real(1.2),
                SqlValue::Real(500.0),
                SqlValue::Real(200.0),
                SqlValue::Integer(6),
                SqlValue::Integer(4),
                SqlValue::Real(3.5),
                SqlValue::Real(equity),
                SqlValue::Integer(1),
                SqlValue::Integer(cached_at),
            ],
        }
    }

    fn history_op(model_id: &str, cached_at: i64) -> UpsertOp {
        UpsertOp {
            table: "leaderboard_history",
            sql: "INSERT OR REPLACE INTO leaderboard_history \
                  (id, model_id, timestamp, rank, equity, return_pct, sharpe, num_trades, \
                   win_rate, cached_at) \
                  VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params: vec![
                SqlValue::Text(format!("{model_id}-{cached_at}")),
                SqlValue::from(model_id),
                SqlValue::Integer(cached_at),
                SqlValue::Integer(1),
                SqlValue::Real(10300.0),
                SqlValue::Real(3.0),
                SqlValue::Real(1.2),
                SqlValue::Integer(10),
                SqlValue::Real(60.0),
                SqlValue::Integer(cached_at),
            ],
        }
    }

    #[tokio::test]
    async fn test_direct_executor_applies_batch() {
        let db = Database::in_memory().await.unwrap();
        let executor = DirectExecutor::new(db.pool_clone());

        let batch = UpsertBatch {
            ops: vec![leaderboard_op("gpt-5", 10500.0, 1700000000)],
        };
        let report = executor.execute(&batch).await.unwrap();
        assert_eq!(report.statements, 1);
        assert_eq!(db.count_rows("leaderboard_cache").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_replay_is_idempotent_for_replace_tables() {
        let db = Database::in_memory().await.unwrap();
        let executor = DirectExecutor::new(db.pool_clone());

        let batch = UpsertBatch {
            ops: vec![
                leaderboard_op("gpt-5", 10500.0, 1700000000),
                history_op("gpt-5", 1700000000),
            ],
        };
        executor.execute(&batch).await.unwrap();
        executor.execute(&batch).await.unwrap();

        // Literal replay: one logical row per key everywhere
        assert_eq!(db.count_rows("leaderboard_cache").await.unwrap(), 1);
        assert_eq!(db.count_rows("leaderboard_history").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_new_run_appends_history_only() {
        let db = Database::in_memory().await.unwrap();
        let executor = DirectExecutor::new(db.pool_clone());

        let first = UpsertBatch {
            ops: vec![
                leaderboard_op("gpt-5", 10500.0, 1700000000),
                history_op("gpt-5", 1700000000),
            ],
        };
        let second = UpsertBatch {
            ops: vec![
                leaderboard_op("gpt-5", 10600.0, 1700000300),
                history_op("gpt-5", 1700000300),
            ],
        };
        executor.execute(&first).await.unwrap();
        executor.execute(&second).await.unwrap();

        assert_eq!(db.count_rows("leaderboard_cache").await.unwrap(), 1);
        assert_eq!(db.count_rows("leaderboard_history").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_blob_with_quote_round_trips() {
        let db = Database::in_memory().await.unwrap();
        let executor = DirectExecutor::new(db.pool_clone());

        let raw = r#"{"trader":"O'Brien","note":"it's fine"}"#;
        let batch = UpsertBatch {
            ops: vec![UpsertOp {
                table: "recent_trades_cache",
                sql: "INSERT OR REPLACE INTO recent_trades_cache \
                      (id, model_id, symbol, side, entry_time, exit_time, realized_net_pnl, \
                       trade_data, cached_at) \
                      VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params: vec![
                    SqlValue::from("t1"),
                    SqlValue::from("gpt-5"),
                    SqlValue::from("BTC"),
                    SqlValue::from("long"),
                    SqlValue::Integer(1700000000),
                    SqlValue::Null,
                    SqlValue::Null,
                    SqlValue::from(raw),
                    SqlValue::Integer(1700000000),
                ],
            }],
        };
        executor.execute(&batch).await.unwrap();

        let (stored,): (String,) =
            sqlx::query_as("SELECT trade_data FROM recent_trades_cache WHERE id = 't1'")
                .fetch_one(db.pool())
                .await
                .unwrap();
        assert_eq!(stored, raw);
    }

    #[tokio::test]
    async fn test_statement_failure_rolls_back() {
        let db = Database::in_memory().await.unwrap();
        let executor = DirectExecutor::new(db.pool_clone());

        let batch = UpsertBatch {
            ops: vec![
                leaderboard_op("gpt-5", 10500.0, 1700000000),
                UpsertOp {
                    table: "leaderboard_cache",
                    sql: "INSERT INTO no_such_table VALUES (?1)",
                    params: vec![SqlValue::Integer(1)],
                },
            ],
        };
        assert!(executor.execute(&batch).await.is_err());
        assert_eq!(db.count_rows("leaderboard_cache").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_external_executor_missing_program() {
        let executor = ExternalExecutor::new("arena-sync-no-such-tool", "cache-db");
        let batch = UpsertBatch {
            ops: vec![leaderboard_op("gpt-5", 10500.0, 1700000000)],
        };
        match executor.execute(&batch).await {
            Err(ExecError::Staging(_)) => {}
            other => panic!("expected spawn failure, got {other:?}"),
        }
    }
}
