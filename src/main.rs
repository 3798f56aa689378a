use anyhow::Context;
use autos_prep::apis::auto_data::AutoDataResolver;
use autos_prep::config::PipelineConfig;
use autos_prep::logging::{init_logging, stage_span};
use autos_prep::pipeline::{run_scrape, DataIngestion, FeatureEngineer};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::error;

#[derive(Parser)]
#[command(name = "autos_prep")]
#[command(about = "Used-car dataset preparation: body-type scraping, train/test split, feature engineering")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to a TOML configuration file (defaults to ./autos.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fill missing vehicle types from auto-data.net
    Scrape,
    /// Write the raw snapshot and the train/test split
    Ingest,
    /// Run the feature engineering transforms
    Features,
    /// Scrape, then ingest
    Run,
}

impl Commands {
    fn stage(&self) -> &'static str {
        match self {
            Commands::Scrape => "data_scraping",
            Commands::Ingest => "data_ingestion",
            Commands::Features => "feature_engineering",
            Commands::Run => "pipeline",
        }
    }
}

async fn scrape(config: &PipelineConfig) -> anyhow::Result<()> {
    let span = stage_span("data_scraping");
    let resolver = AutoDataResolver::from_config(&config.scraper)?;
    let outcome = run_scrape(&config.scraper, Arc::new(resolver), span).await?;
    println!(
        "✅ Scraping done: {} models found, {} not found, {} rows filled",
        outcome.found.len(),
        outcome.not_found.len(),
        outcome.rows_updated
    );
    println!("💾 Saved to {}", config.scraper.data_path.display());
    Ok(())
}

fn ingest(config: &PipelineConfig) -> anyhow::Result<()> {
    let ingestion = DataIngestion::new(config.ingestion.clone(), stage_span("data_ingestion"));
    let output = ingestion.run()?;
    println!(
        "✅ Ingestion done: {} train rows -> {}, {} test rows -> {}",
        output.train.len(),
        output.train_path.display(),
        output.test.len(),
        output.test_path.display()
    );
    Ok(())
}

fn features(config: &PipelineConfig) -> anyhow::Result<()> {
    let engineer = FeatureEngineer::new(config.features.clone(), stage_span("feature_engineering"));
    let table = engineer.run()?;
    println!(
        "✅ Feature engineering done: {} rows -> {}",
        table.len(),
        config.features.data_path.display()
    );
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    let _guard = init_logging(cli.command.stage());
    autos_prep::metrics::init_metrics();

    let config = PipelineConfig::load(cli.config.as_deref()).context("loading configuration")?;

    let result = match cli.command {
        Commands::Scrape => scrape(&config).await,
        Commands::Ingest => ingest(&config),
        Commands::Features => features(&config),
        Commands::Run => {
            println!("📡 Step 1: scraping vehicle types...");
            scrape(&config).await?;
            println!("📥 Step 2: ingesting...");
            ingest(&config)
        }
    };

    if let Err(e) = &result {
        error!("{:#}", e);
        println!("❌ {:#}", e);
    }
    result
}
