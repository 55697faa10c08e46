use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use seedorder_catalog::{
    DbError, JsonFileRegistry, PostgresDatabase, SeedDatabase, SeedTransaction,
};
use seedorder_core::{Config, SeedKind, SeedReport, TableAction};
use seedorder_engine::{FileBinding, Seeder};

const DEFAULT_CONFIG: &str = "seedorder.toml";

/// seedorder - Dependency-ordered seeding of relational test data
#[derive(Parser)]
#[command(name = "seedorder")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file (default: seedorder.toml)
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
    /// Show the global seeding order, or the scope of one table
    Order {
        /// Table whose ancestors to show
        table: Option<String>,
    },

    /// Seed a table and everything it depends on
    Seed {
        /// Target table
        table: String,

        /// Dataset kind (pre or post)
        #[arg(short, long, default_value = "pre")]
        kind: SeedKind,

        /// Bind a table to a seed file: TABLE=FILE (repeatable)
        #[arg(short, long = "file", value_parser = parse_binding)]
        files: Vec<FileBinding>,

        /// Bind every table without an explicit binding to this file, if it exists
        #[arg(short, long)]
        default_file: Option<String>,

        /// Output file for the seed report
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List the seed files of a table
    Files {
        table: String,

        #[arg(short, long, default_value = "pre")]
        kind: SeedKind,
    },

    /// Delete a seed file
    Delete {
        table: String,
        file: String,

        #[arg(short, long, default_value = "pre")]
        kind: SeedKind,
    },

    /// List declared tables and which seed data they have
    Tables,

    /// Print the contents of a seed file
    Preview {
        table: String,
        file: String,

        #[arg(short, long, default_value = "pre")]
        kind: SeedKind,
    },

    /// Store a CSV file as seed data for a table
    Upload {
        table: String,

        /// CSV file to copy into the seed directory
        source: PathBuf,

        /// Name to store it under (default: the source file name)
        #[arg(short, long)]
        name: Option<String>,

        #[arg(short, long, default_value = "pre")]
        kind: SeedKind,
    },
}

fn parse_binding(value: &str) -> Result<FileBinding, String> {
    match value.split_once('=') {
        Some((table, file)) if !table.trim().is_empty() && !file.trim().is_empty() => {
            Ok(FileBinding::new(table.trim(), file.trim()))
        }
        _ => Err(format!("expected TABLE=FILE, got '{}'", value)),
    }
}

/// Database for commands that never open a transaction
struct Offline;

#[async_trait::async_trait]
impl SeedDatabase for Offline {
    fn name(&self) -> &'static str {
        "Offline"
    }

    async fn begin<'a>(&'a self) -> Result<Box<dyn SeedTransaction + 'a>, DbError> {
        Err(DbError::ConfigError(
            "this command does not use the database".to_string(),
        ))
    }

    async fn test_connection(&self) -> Result<(), DbError> {
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    dotenvy::dotenv().ok();

    let mut config = if let Some(config_path) = &cli.config {
        Config::from_file(config_path)?
    } else if Path::new(DEFAULT_CONFIG).exists() {
        Config::from_file(Path::new(DEFAULT_CONFIG))?
    } else {
        if cli.verbose {
            eprintln!("{}", "No config file found, using defaults".yellow());
        }
        Config::default()
    };

    if let Ok(url) = std::env::var("DATABASE_URL") {
        config.database.url = Some(url);
    }

    if cli.verbose {
        eprintln!("{} {}", "Seed directory:".cyan(), config.seed_root().display());
    }

    match cli.command {
        Commands::Order { table } => order_command(&config, table.as_deref()),
        Commands::Seed {
            table,
            kind,
            files,
            default_file,
            output,
        } => {
            seed_command(
                &config,
                &table,
                kind,
                files,
                default_file.as_deref(),
                output.as_deref(),
                cli.verbose,
            )
            .await
        }
        Commands::Files { table, kind } => files_command(&config, &table, kind).await,
        Commands::Delete { table, file, kind } => {
            delete_command(&config, &table, &file, kind).await
        }
        Commands::Tables => tables_command(&config),
        Commands::Preview { table, file, kind } => {
            preview_command(&config, &table, &file, kind).await
        }
        Commands::Upload {
            table,
            source,
            name,
            kind,
        } => upload_command(&config, &table, &source, name.as_deref(), kind),
    }
}

fn offline_seeder(config: &Config) -> Result<Seeder<Offline, JsonFileRegistry>> {
    let registry = JsonFileRegistry::new(config.registry_path());
    Ok(Seeder::from_config(config, Offline, registry)?)
}

/// Order command - print the global order or one table's scope
fn order_command(config: &Config, table: Option<&str>) -> Result<()> {
    let seeder = offline_seeder(config)?;

    let order = match table {
        Some(table) => {
            let scope = seeder.compute_scope_for_table(table)?;
            println!("{} {}", "Scope of".bold(), table.green());
            scope.insertion_order
        }
        None => {
            println!("{}", "Global seeding order".bold());
            seeder.compute_global_order()?
        }
    };

    for (position, name) in order.iter().enumerate() {
        println!("  {:>3}. {}", position + 1, name);
    }

    Ok(())
}

/// Seed command - run a partial seed against the configured database
async fn seed_command(
    config: &Config,
    table: &str,
    kind: SeedKind,
    mut bindings: Vec<FileBinding>,
    default_file: Option<&str>,
    output: Option<&Path>,
    verbose: bool,
) -> Result<()> {
    if verbose {
        eprintln!("{} {} ({})...", "Seeding".cyan(), table, kind);
    }

    // Validate the request before connecting
    let offline = offline_seeder(config)?;
    let scope = offline.compute_scope_for_table(table)?;

    if let Some(default_file) = default_file {
        for scoped in &scope.insertion_order {
            let bound = bindings.iter().any(|b| &b.table == scoped);
            let exists = offline
                .store()
                .locate(kind, scoped, default_file)
                .is_ok();
            if !bound && exists {
                bindings.push(FileBinding::new(scoped.as_str(), default_file));
            }
        }
    }

    if verbose {
        for binding in &bindings {
            eprintln!("  {} {} -> {}", "Binding".cyan(), binding.table, binding.file_name);
        }
        eprintln!("{}", "Connecting to database...".cyan());
    }

    let database = PostgresDatabase::from_config(&config.database)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to connect to database: {}", e))?;
    database
        .test_connection()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to connect to database: {}", e))?;

    if verbose {
        eprintln!("{} {}", "✓ Connected to".green(), database.endpoint());
    }

    let registry = JsonFileRegistry::new(config.registry_path());
    let seeder = Seeder::from_config(config, database, registry)?;

    let outcome = seeder.seed_table(table, &bindings, kind).await?;

    print_seed_report(&outcome.report);
    println!();
    if outcome.report.is_noop() {
        println!("{}", outcome.message.yellow());
    } else {
        println!("{}", outcome.message.green().bold());
    }

    if let Some(output) = output {
        outcome.report.save_to_file(output)?;
        eprintln!("{} {}", "Report saved to:".green(), output.display());
    }

    Ok(())
}

fn print_seed_report(report: &SeedReport) {
    println!();
    println!("{}", "Seed Summary".bold());
    println!("{}", "============".bold());
    println!("  Target:    {} ({})", report.target, report.kind);
    println!("  Skipped:   {}", report.summary.tables_skipped);
    println!("  Truncated: {}", report.summary.tables_truncated);
    println!("  Reseeded:  {}", report.summary.tables_reseeded);
    println!("  Rows:      {}", report.summary.rows_inserted);

    if report.tables.is_empty() {
        return;
    }

    println!();
    for outcome in &report.tables {
        let action = match outcome.action {
            TableAction::Skipped => "SKIPPED ".dimmed(),
            TableAction::Reseeded => "RESEEDED".green().bold(),
            TableAction::Cleared => "CLEARED ".yellow().bold(),
        };
        let detail = match (&outcome.file_name, outcome.action) {
            (Some(file), TableAction::Reseeded) => {
                format!("{} rows from {}.csv", outcome.rows_inserted, file)
            }
            (Some(file), _) => format!("{}.csv", file),
            (None, _) => String::new(),
        };
        println!("  [{}] {} {}", action, outcome.table, detail.dimmed());
    }
}

/// Files command - list candidate files with liveness
async fn files_command(config: &Config, table: &str, kind: SeedKind) -> Result<()> {
    let seeder = offline_seeder(config)?;
    let files = seeder.list_candidate_files(table, kind).await?;

    if files.is_empty() {
        println!("{}", format!("No {} seed files for '{}'", kind, table).yellow());
        return Ok(());
    }

    println!("{} {} ({})", "Seed files for".bold(), table.green(), kind);
    for file in files {
        let marker = if file.is_live {
            "● live".green().bold()
        } else {
            "      ".normal()
        };
        println!("  {} {:<32} {}", marker, file.name, file.hash.get(..12).unwrap_or(&file.hash).dimmed());
    }

    Ok(())
}

/// Delete command - remove a seed file
async fn delete_command(config: &Config, table: &str, file: &str, kind: SeedKind) -> Result<()> {
    let seeder = offline_seeder(config)?;
    seeder.delete_seed_file(kind, table, file).await?;
    println!("{} {}/{}/{}", "✓ Deleted".green(), kind, table, file);
    Ok(())
}

/// Tables command - list declared tables and available data
fn tables_command(config: &Config) -> Result<()> {
    let seeder = offline_seeder(config)?;

    println!("{:<40} {:<5} {:<5}", "Table".bold(), "pre".bold(), "post".bold());
    for table in seeder.table_inventory() {
        let mark = |present: bool| {
            if present {
                "✓".green()
            } else {
                "-".dimmed()
            }
        };
        println!("{:<40} {:<5} {:<5}", table.name, mark(table.pre), mark(table.post));
    }

    Ok(())
}

/// Preview command - print a seed file as a table
async fn preview_command(config: &Config, table: &str, file: &str, kind: SeedKind) -> Result<()> {
    let seeder = offline_seeder(config)?;
    let preview = seeder.preview_file(kind, table, file).await?;

    println!("{}", preview.headers.join(" | ").bold());
    for row in &preview.rows {
        println!("{}", row.join(" | "));
    }
    eprintln!("{}", format!("{} rows", preview.rows.len()).dimmed());

    Ok(())
}

/// Upload command - copy a CSV file into the seed directory
fn upload_command(
    config: &Config,
    table: &str,
    source: &Path,
    name: Option<&str>,
    kind: SeedKind,
) -> Result<()> {
    let seeder = offline_seeder(config)?;

    let name = match name {
        Some(name) => name.to_string(),
        None => source
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .ok_or_else(|| anyhow::anyhow!("Cannot derive a file name from {}", source.display()))?,
    };

    let contents = std::fs::read(source)
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", source.display(), e))?;
    let path = seeder.save_seed_file(kind, table, &name, &contents)?;

    println!("{} {}", "✓ Stored".green(), path.display());
    Ok(())
}
