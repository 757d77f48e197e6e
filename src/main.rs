// src/main.rs

//! Bookcase: book catalog scraper and REST API CLI.

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use bookcase::catalog::{DatasetLoader, SnapshotSource};
use bookcase::error::Result;
use bookcase::models::Config;
use bookcase::scraper::BookScraper;
use bookcase::server;
use bookcase::storage::DatasetStore;

#[derive(Parser, Debug)]
#[command(
    name = "bookcase",
    version,
    about = "Book catalog scraper and REST API"
)]

/// CLI Arguments
struct Cli {
    #[arg(short, long, default_value = "data/config.toml")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

/// CLI Commands
#[derive(Subcommand, Debug)]
enum Command {
    /// Run the REST API server
    Serve {
        /// Override the configured port
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Scrape the catalog once and persist the dataset
    Scrape {
        /// Listing pages to walk (defaults to the configured value)
        #[arg(long)]
        max_pages: Option<usize>,
    },
    /// Validate configuration and dataset
    Validate,
}

/// Main entry point
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = Config::load_or_default(&cli.config);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Command::Serve { port } => {
            if let Some(port) = port {
                config.server.port = port;
            }
            config.validate()?;
            server::serve(config).await?;
        }
        Command::Scrape { max_pages } => {
            config.validate()?;
            run_scrape(&config, max_pages).await?;
        }
        Command::Validate => run_validate(&config).await?,
    }

    Ok(())
}

/// Run the scraper once and persist the dataset.
async fn run_scrape(config: &Config, max_pages: Option<usize>) -> Result<()> {
    let max_pages = max_pages.unwrap_or(config.scraper.max_pages);
    let scraper = BookScraper::new(&config.scraper)?;

    let outcome = scraper.scrape_all(max_pages).await?;
    if outcome.books.is_empty() {
        tracing::warn!("No books scraped; dataset left unchanged");
        return Ok(());
    }

    let store = DatasetStore::from_config(&config.catalog);
    store.save_rows(outcome.books).await?;
    tracing::info!("Dataset written to {}", store.dataset_path().display());
    Ok(())
}

/// Check the configuration and report on the current dataset.
async fn run_validate(config: &Config) -> Result<()> {
    config.validate()?;
    tracing::info!("Configuration OK");

    let store = DatasetStore::from_config(&config.catalog);
    let loader = DatasetLoader::new(store.clone());
    let snapshot = loader.load().await;
    if snapshot.is_empty() {
        tracing::warn!(
            "Dataset {} is missing or empty; run `bookcase scrape` first",
            store.dataset_path().display()
        );
    } else {
        tracing::info!("Dataset OK: {} books", snapshot.len());
    }
    Ok(())
}
