use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use schemadelta_catalog::{MemoryReader, PostgresReader, SchemaReader};
use schemadelta_core::{
    verify_kind_tables, CanonicalKind, Config, DatabaseConfig, DatabaseDialect, DeltaOutcome,
    DeltaReport, DeltaResult, Mode, ModelSchema,
};
use schemadelta_engine::{DeltaEngine, EngineOptions};

const DEFAULT_CONFIG: &str = "schemadelta.toml";

/// schemadelta - Compute the schema changes a set of models needs
#[derive(Parser)]
#[command(name = "schemadelta")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file (default: schemadelta.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Diff model declarations against the live database
    Diff {
        /// JSON file with the model declarations
        #[arg(short, long)]
        models: PathBuf,

        /// Output file for the delta report
        #[arg(short, long, default_value = "delta.json")]
        output: PathBuf,

        /// Which changes to compute: create or alter (overrides config)
        #[arg(long)]
        mode: Option<Mode>,

        /// Maximum concurrent table probes (overrides config)
        #[arg(long)]
        concurrency: Option<usize>,

        /// Read the database structure from a JSON snapshot instead of connecting
        #[arg(long)]
        snapshot: Option<PathBuf>,

        /// Exit with the outcome code (1 no change, 2 changes, 3 changes with conflict)
        #[arg(long)]
        exit_code: bool,
    },

    /// Check the kind tables and list every canonical kind
    Kinds,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);
    dotenvy::dotenv().ok();

    let config = load_config(cli.config.as_deref(), cli.verbose)?;

    match cli.command {
        Commands::Diff {
            models,
            output,
            mode,
            concurrency,
            snapshot,
            exit_code,
        } => {
            let mut options = EngineOptions::from_config(&config);
            if let Some(mode) = mode {
                options = options.with_mode(mode);
            }
            if let Some(concurrency) = concurrency {
                options = options.with_concurrency(concurrency);
            }

            let result = diff_command(
                &config,
                options,
                &models,
                &output,
                snapshot.as_deref(),
                cli.verbose,
            )
            .await?;

            if exit_code {
                std::process::exit(result.outcome.code());
            }
            Ok(())
        }
        Commands::Kinds => kinds_command(),
    }
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn load_config(path: Option<&Path>, verbose: bool) -> Result<Config> {
    if let Some(path) = path {
        return Config::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()));
    }

    let default_path = Path::new(DEFAULT_CONFIG);
    if default_path.exists() {
        return Config::from_file(default_path)
            .with_context(|| format!("Failed to load config from {}", DEFAULT_CONFIG));
    }

    if verbose {
        eprintln!("{}", "No config file found, using defaults".yellow());
    }
    Ok(Config::default())
}

/// Diff command - compute the delta and write the report
async fn diff_command(
    config: &Config,
    options: EngineOptions,
    models_path: &Path,
    output: &Path,
    snapshot: Option<&Path>,
    verbose: bool,
) -> Result<DeltaResult> {
    let models_json = std::fs::read_to_string(models_path)
        .with_context(|| format!("Failed to read models from {}", models_path.display()))?;
    let models: Vec<ModelSchema> = serde_json::from_str(&models_json)
        .with_context(|| format!("Invalid model declarations in {}", models_path.display()))?;

    if verbose {
        eprintln!(
            "{} {} models from {}",
            "Loaded".cyan(),
            models.len(),
            models_path.display()
        );
    }

    let reader = build_reader(config, snapshot, verbose).await?;

    if verbose {
        eprintln!("{} {} connection...", "Testing".cyan(), reader.name());
    }
    reader
        .test_connection()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to connect to database: {}", e))?;

    let mode = options.mode;
    let engine = DeltaEngine::new(reader, options)?;
    let result = engine.compute(&models).await?;

    let report = DeltaReport::from_result(mode, &result)?;
    report
        .save_to_file(output)
        .with_context(|| format!("Failed to write report to {}", output.display()))?;

    if verbose {
        eprintln!("{} {}", "Delta report saved to:".green(), output.display());
    }

    print_delta_summary(&report);

    Ok(result)
}

/// Pick the schema reader: an explicit snapshot, then the config, then DATABASE_URL
async fn build_reader(
    config: &Config,
    snapshot: Option<&Path>,
    verbose: bool,
) -> Result<Arc<dyn SchemaReader>> {
    if let Some(path) = snapshot {
        return load_snapshot(path, verbose).await;
    }

    let database = config.database.clone().unwrap_or_default();
    tracing::debug!(dialect = ?database.dialect, "selecting schema reader");

    match database.dialect {
        DatabaseDialect::Snapshot => {
            let path = database.snapshot.as_ref().ok_or_else(|| {
                anyhow::anyhow!(
                    "The snapshot dialect requires 'snapshot' in the [database] section of {}",
                    DEFAULT_CONFIG
                )
            })?;
            load_snapshot(&config.resolve_path(path), verbose).await
        }
        DatabaseDialect::Postgres => connect_postgres(&database, verbose).await,
    }
}

async fn load_snapshot(path: &Path, verbose: bool) -> Result<Arc<dyn SchemaReader>> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read snapshot from {}", path.display()))?;
    let reader = MemoryReader::from_snapshot_json(&json)
        .with_context(|| format!("Invalid snapshot in {}", path.display()))?;

    if verbose {
        eprintln!(
            "{} {} tables from snapshot {}",
            "Loaded".cyan(),
            reader.table_count().await,
            path.display()
        );
    }
    Ok(Arc::new(reader))
}

async fn connect_postgres(database: &DatabaseConfig, verbose: bool) -> Result<Arc<dyn SchemaReader>> {
    let url = match &database.url {
        Some(url) => url.clone(),
        None => std::env::var("DATABASE_URL").map_err(|_| {
            anyhow::anyhow!(
                "No database configured. Set 'url' in the [database] section of {}, \
                 set DATABASE_URL, or pass --snapshot.",
                DEFAULT_CONFIG
            )
        })?,
    };

    if verbose {
        eprintln!("{} PostgreSQL...", "Connecting to".cyan());
    }

    let reader = if database.tls {
        PostgresReader::from_connection_string_with_tls(&url).await?
    } else {
        PostgresReader::from_connection_string(&url).await?
    };

    let reader = reader.with_schema(database.schema.clone());
    if verbose {
        eprintln!(
            "{} {}:{}/{} (schema {})",
            "Connected to".green(),
            reader.host(),
            reader.port(),
            reader.database(),
            reader.schema()
        );
    }

    Ok(Arc::new(reader))
}

fn print_delta_summary(report: &DeltaReport) {
    println!("\n{}", "=".repeat(60).bright_blue());
    println!("{}", "Schema Delta Report".bold().bright_blue());
    println!("{}", "=".repeat(60).bright_blue());
    println!();

    println!("Mode: {}", report.mode);
    let outcome = match report.outcome {
        DeltaOutcome::NoChange => report.outcome.to_string().green().bold(),
        DeltaOutcome::Changes => report.outcome.to_string().yellow().bold(),
        DeltaOutcome::ChangesWithConflict => report.outcome.to_string().red().bold(),
    };
    println!("Outcome: {} ({})", outcome, report.code);
    println!();

    let delta = &report.delta;
    if delta.is_empty() {
        println!("{}", "✓ Database matches the models".green().bold());
    } else {
        println!("{}", "Changes:".bold());
        for table in &delta.tables.create {
            println!("  {} table {}", "+".green(), table);
        }
        for table in &delta.join_tables.create {
            println!("  {} join table {}", "+".green(), table);
        }
        for columns in &delta.columns {
            for column in &columns.create {
                println!("  {} {}.{}", "+".green(), columns.table_name, column);
            }
            for (column, change) in &columns.alter {
                println!(
                    "  {} {}.{}: {} -> {}",
                    "~".yellow(),
                    columns.table_name,
                    column,
                    change.from(),
                    change.to()
                );
            }
            for dropped in &columns.drop {
                println!(
                    "  {} {}.{} ({})",
                    "-".red(),
                    columns.table_name,
                    dropped.column_name,
                    dropped.column_type
                );
            }
        }
    }

    if !report.skipped_columns.is_empty() {
        println!();
        println!("{}", "Skipped columns (unsupported types):".bold());
        for skipped in &report.skipped_columns {
            let marker = if skipped.schema_conflict {
                "CONFLICT".red().bold()
            } else {
                "SKIPPED".yellow()
            };
            println!(
                "  [{}] {}.{} ({})",
                marker, skipped.table_name, skipped.column, skipped.native_type
            );
        }
    }

    println!();
    println!("Fingerprint: {}", report.fingerprint.dimmed());
}

/// Kinds command - run the consistency check and print the kind tables
fn kinds_command() -> Result<()> {
    verify_kind_tables().context("Kind tables are inconsistent")?;

    println!("{}", "Canonical kinds".bold().bright_blue());
    println!();
    for kind in CanonicalKind::ALL {
        println!(
            "  {:<10} {:<12} {}",
            kind.as_str().bold(),
            kind.to_intermediate().as_str(),
            kind.aliases().join(", ").dimmed()
        );
    }
    println!();
    println!("{}", "✓ Kind tables are consistent".green());

    Ok(())
}
