//! mysql-pg-sync CLI - MySQL to PostgreSQL migration and reconciliation.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use mysql_pg_sync::error::EXIT_TRANSFER_ERROR;
use mysql_pg_sync::{Config, Orchestrator, SyncError};
use tracing::info;

#[derive(Parser)]
#[command(name = "mysql-pg-sync")]
#[command(about = "MySQL to PostgreSQL table migration and reconciliation")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Output JSON result to stdout
    #[arg(long)]
    output_json: bool,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Migrate table schema and data from MySQL to PostgreSQL
    Migrate {
        /// Table to migrate
        #[arg(long, required_unless_present = "all", conflicts_with = "all")]
        table: Option<String>,

        /// Migrate every base table in the source database
        #[arg(long)]
        all: bool,

        /// Drop the target table first if it exists
        #[arg(long)]
        drop: bool,

        /// Override rows per transfer chunk
        #[arg(long)]
        chunk_size: Option<usize>,
    },

    /// Compare row counts for one table between source and target
    CompareCounts {
        /// Table to compare
        #[arg(long)]
        table: String,
    },

    /// Compare row counts across all tables on both endpoints
    CompareTables,

    /// Insert rows missing from the target, addressed by key column
    Reconcile {
        /// Table to reconcile
        #[arg(long)]
        table: String,

        /// Override the key column from the config
        #[arg(long)]
        key: Option<String>,
    },

    /// Test database connections
    HealthCheck,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<ExitCode, SyncError> {
    let cli = Cli::parse();

    setup_logging(&cli.verbosity, &cli.log_format)
        .map_err(SyncError::Config)?;

    let config = Config::load(&cli.config)?;
    info!("Loaded configuration from {:?}", cli.config);

    let orchestrator = Orchestrator::connect(config).await?;

    match cli.command {
        Commands::Migrate {
            table,
            all,
            drop,
            chunk_size,
        } => {
            if all {
                let summary = orchestrator.migrate_all_tables(drop, chunk_size).await?;

                if cli.output_json {
                    println!("{}", serde_json::to_string_pretty(&summary)?);
                } else {
                    println!("\nMigration completed:");
                    for s in &summary.migrated {
                        println!(
                            "  {}: {} rows in {} chunks",
                            s.table, s.stats.rows, s.stats.chunks
                        );
                    }
                    for f in &summary.failed {
                        println!("  {}: FAILED ({})", f.table, f.error);
                    }
                }

                if !summary.failed.is_empty() {
                    return Ok(ExitCode::from(EXIT_TRANSFER_ERROR));
                }
            } else {
                // clap guarantees the table is present when --all is absent.
                let table = table.ok_or_else(|| SyncError::Config("--table is required".into()))?;
                let summary = orchestrator.migrate_table(&table, drop, chunk_size).await?;

                if cli.output_json {
                    println!("{}", serde_json::to_string_pretty(&summary)?);
                } else {
                    println!("\nMigration completed for '{}':", summary.table);
                    println!("  Columns: {}", summary.columns);
                    println!("  Rows: {}", summary.stats.rows);
                    println!("  Chunks: {}", summary.stats.chunks);
                }
            }
        }

        Commands::CompareCounts { table } => {
            let cmp = orchestrator.compare_counts(&table).await?;

            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&cmp)?);
            } else {
                println!("Row counts for '{}':", cmp.table);
                println!("  MySQL:      {}", cmp.source_rows);
                println!("  PostgreSQL: {}", cmp.target_rows);
                if cmp.matches() {
                    println!("  Counts match.");
                } else {
                    println!("  Difference: {} (source - target)", cmp.difference);
                }
            }
        }

        Commands::CompareTables => {
            let report = orchestrator.compare_all_tables().await?;

            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{:<40} {:>14} {:>16}", "Table", "MySQL rows", "PostgreSQL rows");
                for entry in &report.entries {
                    println!(
                        "{:<40} {:>14} {:>16}",
                        entry.table,
                        fmt_count(entry.source_rows),
                        fmt_count(entry.target_rows)
                    );
                }
            }
        }

        Commands::Reconcile { table, key } => {
            let report = orchestrator.reconcile_table(&table, key.as_deref()).await?;

            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("Reconciliation completed for '{}':", report.table);
                println!("  Source keys:  {}", report.source_keys);
                println!("  Target keys:  {}", report.target_keys);
                println!("  Missing:      {}", report.missing);
                println!("  Inserted:     {}", report.inserted);
                if report.failed > 0 {
                    println!("  Failed:       {} (skipped, see log)", report.failed);
                }
            }
        }

        Commands::HealthCheck => {
            // Connecting already probes both endpoints with SELECT 1.
            println!("Source and target connections OK");
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn fmt_count(count: Option<i64>) -> String {
    match count {
        Some(n) => n.to_string(),
        None => "N/A".to_string(),
    }
}

fn setup_logging(verbosity: &str, format: &str) -> Result<(), String> {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_new(verbosity).map_err(|e| e.to_string())?;

    match format {
        "json" => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .init(),
        _ => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init(),
    }

    Ok(())
}
