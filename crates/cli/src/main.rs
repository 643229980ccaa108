use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Datelike;
use clap::{Parser, Subcommand};
use liasse_core::Exercice;
use liasse_import::{ImportConfig, ImportFormat};
use liasse_storage::{BalanceRepository, ImportService, KeyValueStore, MemoryStore, SqliteStore};
use rust_decimal::Decimal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod output;

/// Trial balance import and reconciliation for SYSCOHADA ledgers
#[derive(Parser)]
#[command(name = "liasse", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import a trial balance file and print the import report
    Import {
        /// Balance file (xlsx, xls, ods, csv, xml, json)
        file: PathBuf,
        /// Declared format; guessed from the extension or content otherwise
        #[arg(long, value_parser = parse_format)]
        format: Option<ImportFormat>,
        /// CSV field separator
        #[arg(long)]
        separator: Option<char>,
        /// CSV text encoding (utf-8, iso-8859-1, windows-1252)
        #[arg(long)]
        encoding: Option<String>,
        /// Equilibrium tolerance
        #[arg(long)]
        tolerance: Option<Decimal>,
        /// TOML configuration file
        #[arg(long)]
        config: Option<PathBuf>,
        /// SQLite database; without it nothing is persisted
        #[arg(long)]
        db: Option<PathBuf>,
        /// Organization the balance belongs to
        #[arg(long, default_value = "default")]
        tenant: String,
        /// Closing year of the balance (defaults to last year)
        #[arg(long)]
        exercice: Option<Exercice>,
        /// Accept every pending mapping suggestion before committing
        #[arg(long)]
        accept_all: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List committed imports
    History {
        /// SQLite database
        #[arg(long)]
        db: PathBuf,
        #[arg(long, default_value = "default")]
        tenant: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn parse_format(s: &str) -> Result<ImportFormat, String> {
    s.parse().map_err(|e: liasse_import::ImportError| e.to_string())
}

struct ImportArgs {
    file: PathBuf,
    config: ImportConfig,
    db: Option<PathBuf>,
    tenant: String,
    exercice: Exercice,
    accept_all: bool,
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,liasse=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Import {
            file,
            format,
            separator,
            encoding,
            tolerance,
            config,
            db,
            tenant,
            exercice,
            accept_all,
            json,
        } => {
            let mut import_config = match config {
                Some(path) => ImportConfig::from_file(&path)
                    .with_context(|| format!("Failed to load config {}", path.display()))?,
                None => ImportConfig::default(),
            };
            import_config.format = format.or(import_config.format);
            import_config.separator = separator.or(import_config.separator);
            import_config.encoding = encoding.or(import_config.encoding);
            if let Some(tolerance) = tolerance {
                import_config.tolerance = tolerance;
            }
            let exercice = exercice
                .unwrap_or_else(|| Exercice::new((chrono::Local::now().year() - 1) as u16));

            run_import(ImportArgs {
                file,
                config: import_config,
                db,
                tenant,
                exercice,
                accept_all,
                json,
            })
            .await
        }
        Commands::History { db, tenant, json } => {
            let store = SqliteStore::open(&db)
                .await
                .with_context(|| format!("Failed to open database {}", db.display()))?;
            let repository = BalanceRepository::new(store, &tenant);
            let records = repository.import_history().await?;
            output::print_history(&records, json)
        }
    }
}

async fn run_import(args: ImportArgs) -> Result<()> {
    let store: Arc<dyn KeyValueStore> = match &args.db {
        Some(path) => Arc::new(
            SqliteStore::open(path)
                .await
                .with_context(|| format!("Failed to open database {}", path.display()))?,
        ),
        None => Arc::new(MemoryStore::new()),
    };
    let service = ImportService::new(args.config, BalanceRepository::new(store, &args.tenant));

    let mut outcome = service
        .import_file(&args.file, args.exercice)
        .await
        .with_context(|| format!("Failed to import {}", args.file.display()))?;

    if args.accept_all {
        let accepted = outcome.mapping.accept_all();
        outcome.refresh_report(service.config());
        tracing::info!(accepted, "pending suggestions accepted");
    }

    let version = if args.db.is_some() {
        Some(service.commit(args.exercice, &outcome).await?)
    } else {
        None
    };

    output::print_outcome(&outcome, args.exercice, version, args.json)
}
