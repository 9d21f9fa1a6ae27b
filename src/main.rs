// ABOUTME: CLI entry point for cardstore
// ABOUTME: Parses commands and routes them to the library's database operations

use anyhow::{Context, Result};
use cardstore::config::load_config_from_file;
use cardstore::{Database, StoreConfig};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "cardstore")]
#[command(about = "Trading card catalog backing store maintenance", long_about = None)]
struct Cli {
    /// TOML file overriding connection and import settings
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export every card into <output>/card/<cardid>.json
    Export {
        #[arg(long)]
        database: PathBuf,
        #[arg(long)]
        output: PathBuf,
    },
    /// Build a new database from a previous export
    Import {
        /// Export root containing the card directory
        #[arg(long)]
        source: PathBuf,
        /// Database file to create (replaced if it exists)
        #[arg(long)]
        output: PathBuf,
    },
    /// Compact the database file
    Vacuum {
        #[arg(long)]
        database: PathBuf,
    },
    /// Show schema version, card count and size
    Info {
        #[arg(long)]
        database: PathBuf,
    },
}

fn main() -> Result<()> {
    // Initialize logging - default to INFO level if RUST_LOG not set
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config_from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => StoreConfig::default(),
    };

    match cli.command {
        Commands::Export { database, output } => {
            let db = Database::open_with_config(&database, &config)
                .with_context(|| format!("Failed to open {}", database.display()))?;
            let written = db
                .export(&output)
                .with_context(|| format!("Failed to export to {}", output.display()))?;
            println!("Exported {} cards to {}", written, output.display());
        }
        Commands::Import { source, output } => {
            let db = Database::import_with_config(&source, &output, &config)
                .with_context(|| format!("Failed to import {}", source.display()))?;
            println!(
                "Imported {} cards into {}",
                db.card_count()?,
                db.path().display()
            );
        }
        Commands::Vacuum { database } => {
            let mut db = Database::open_with_config(&database, &config)
                .with_context(|| format!("Failed to open {}", database.display()))?;
            let stats = db.vacuum_with_old_size().context("Vacuum failed")?;
            println!(
                "Vacuumed {}: {} -> {} bytes ({} reclaimed)",
                database.display(),
                stats.old_size,
                stats.new_size,
                stats.reclaimed()
            );
        }
        Commands::Info { database } => {
            let db = Database::open_with_config(&database, &config)
                .with_context(|| format!("Failed to open {}", database.display()))?;
            println!("Database:       {}", db.path().display());
            println!("Schema version: {}", db.schema_version()?);
            println!("Cards:          {}", db.card_count()?);
            println!("Size:           {} bytes", db.size()?);
        }
    }

    Ok(())
}
