//! Arena Sync — NOF1 competition telemetry to SQLite cache
//!
//! Usage:
//!   arena-sync run --db data/arena.db          — One sync cycle
//!   arena-sync run --every 300                 — Sync continuously
//!   arena-sync render --out batch.sql          — Generate without executing
//!   arena-sync verify --db data/arena.db       — Per-table row counts

use clap::{Parser, Subcommand};
use engine::{pipeline, SyncConfig};
use persistence::{BatchExecutor, Database, DirectExecutor, ExternalExecutor};
use std::path::PathBuf;
use tracing::{error, info};

const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "arena-sync")]
#[command(about = "Sync NOF1 competition telemetry into a SQLite cache", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch, normalize and write one batch (or loop with --every)
    Run {
        /// SQLite database path
        #[arg(long, default_value = "data/arena.db")]
        db: String,
        /// Hand batches to an external tool instead of writing directly
        #[arg(long)]
        external: Option<String>,
        /// Destination name passed to the external tool
        #[arg(long, default_value = "arena-cache")]
        destination: String,
        /// Sync repeatedly with this many seconds between cycles
        #[arg(long)]
        every: Option<u64>,
        /// Source schema variant: v1 or v2
        #[arg(long)]
        schema: Option<String>,
        /// Models to fetch analytics for (comma-separated)
        #[arg(long, value_delimiter = ',')]
        models: Vec<String>,
        /// Source API base URL
        #[arg(long)]
        base_url: Option<String>,
    },
    /// Generate the batch script without executing it
    Render {
        /// Output path for the rendered SQL
        #[arg(long, default_value = "batch.sql")]
        out: PathBuf,
        /// Source schema variant: v1 or v2
        #[arg(long)]
        schema: Option<String>,
        /// Models to fetch analytics for (comma-separated)
        #[arg(long, value_delimiter = ',')]
        models: Vec<String>,
        /// Source API base URL
        #[arg(long)]
        base_url: Option<String>,
    },
    /// Print row counts for every destination table
    Verify {
        /// SQLite database path
        #[arg(long, default_value = "data/arena.db")]
        db: String,
    },
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("debug,engine=debug,persistence=debug")
    } else {
        EnvFilter::new("info,engine=info,persistence=info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).compact())
        .with(filter)
        .init();
}

fn build_config(
    schema: Option<String>,
    models: Vec<String>,
    base_url: Option<String>,
) -> anyhow::Result<SyncConfig> {
    let mut config = SyncConfig::from_env()?;
    if let Some(schema) = schema {
        config.schema = schema.parse()?;
    }
    if !models.is_empty() {
        config.models = models;
    }
    if let Some(url) = base_url {
        config.base_url = url;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    dotenvy::dotenv().ok();

    match cli.command {
        Commands::Run {
            db,
            external,
            destination,
            every,
            schema,
            models,
            base_url,
        } => {
            let config = build_config(schema, models, base_url)?;
            cmd_run(&db, external, destination, every, config).await?;
        }
        Commands::Render {
            out,
            schema,
            models,
            base_url,
        } => {
            let config = build_config(schema, models, base_url)?;
            cmd_render(&out, config).await?;
        }
        Commands::Verify { db } => {
            cmd_verify(&db).await?;
        }
    }

    Ok(())
}

// ============================================================================
// Run command — one cycle or a fixed interval loop
// ============================================================================

async fn cmd_run(
    db_path: &str,
    external: Option<String>,
    destination: String,
    every: Option<u64>,
    config: SyncConfig,
) -> anyhow::Result<()> {
    info!("Arena Sync v{} starting", APP_VERSION);

    let executor: Box<dyn BatchExecutor> = match external {
        Some(program) => {
            info!(program = %program, destination = %destination, "Using external batch tool");
            Box::new(ExternalExecutor::new(program, destination))
        }
        None => {
            let db = Database::new(db_path).await.map_err(|e| {
                error!("Failed to initialize database: {}", e);
                anyhow::anyhow!("Database initialization failed: {}", e)
            })?;
            info!("Database initialized: {}", db_path);
            Box::new(DirectExecutor::new(db.pool_clone()))
        }
    };

    let client = engine::Nof1Client::new(&config.base_url, config.timeout_secs);

    match every {
        None => {
            let report = pipeline::run_sync(&config, &client, executor.as_ref()).await?;
            print_report(&report);
        }
        Some(secs) => {
            info!(interval_secs = secs, "Syncing continuously, Ctrl+C to stop");
            loop {
                // One failed cycle does not stop the loop
                match pipeline::run_sync(&config, &client, executor.as_ref()).await {
                    Ok(report) => print_report(&report),
                    Err(e) => error!("Sync cycle failed: {:#}", e),
                }
                tokio::select! {
                    _ = tokio::time::sleep(tokio::time::Duration::from_secs(secs)) => {}
                    _ = tokio::signal::ctrl_c() => {
                        info!("Ctrl+C received, stopping");
                        break;
                    }
                }
            }
        }
    }

    Ok(())
}

fn print_report(report: &engine::SyncReport) {
    println!(
        "\nSync complete: {} statements in {} ms ({} conversations seen)",
        report.statements, report.duration_ms, report.conversations
    );
    for (table, count) in &report.table_counts {
        println!("  {:<28} {:>6}", table, count);
    }
    if !report.errors.is_empty() {
        println!("\nSkipped endpoints:");
        for err in &report.errors {
            println!("  {}", err);
        }
    }
}

// ============================================================================
// Render command — batch script only, nothing executed
// ============================================================================

async fn cmd_render(out: &PathBuf, config: SyncConfig) -> anyhow::Result<()> {
    info!("Arena Sync v{} render", APP_VERSION);

    let client = engine::Nof1Client::new(&config.base_url, config.timeout_secs);
    let (batch, cached_at, _, errors) = pipeline::generate_batch(&client, &config).await;

    std::fs::write(out, batch.to_script())?;
    println!(
        "Rendered {} statements (cached_at {}) to {}",
        batch.len(),
        cached_at,
        out.display()
    );
    for err in &errors {
        println!("  skipped: {}", err);
    }

    Ok(())
}

// ============================================================================
// Verify command — row counts per destination table
// ============================================================================

async fn cmd_verify(db_path: &str) -> anyhow::Result<()> {
    let db = Database::new(db_path)
        .await
        .map_err(|e| anyhow::anyhow!("Database initialization failed: {}", e))?;

    println!("Database: {}", db_path);
    for table in persistence::schema::TABLES {
        let count = db
            .count_rows(table)
            .await
            .map_err(|e| anyhow::anyhow!("Count failed for {}: {}", table, e))?;
        println!("  {:<28} {:>6}", table, count);
    }

    Ok(())
}
