//! Multi-source BTC/USD ticker service
//!
//! Polls several market data feeds, persists normalized ticks, and
//! serves the stored series over a small HTTP API.

use clap::{Parser, Subcommand};
use std::sync::Arc;
use std::time::Duration;
use tickstore::{
    api,
    config::Config,
    poller::PollSupervisor,
    source::{bitstamp::BitstampSource, brti::BrtiSource, coinbase::CoinbaseSource, TickerSource},
    storage::TickerStore,
    types::Source,
};
use tokio::sync::broadcast;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "tickstore")]
#[command(about = "Multi-source BTC/USD ticker ingestion and query service")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path (built-in defaults apply when absent)
    #[arg(short, long)]
    config: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the polling loops and the query API
    Run,
    /// Fetch one quote from a source and print it, without persisting
    Fetch {
        /// Source to poll (brti, bitstamp, coinbase)
        source: String,
    },
    /// Show the most recent stored ticks for a source
    Latest {
        /// Source to read (brti, bitstamp, coinbase)
        source: String,
        /// Number of rows to show
        #[arg(short = 'n', long, default_value = "10")]
        count: u32,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    // Load configuration
    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::load_default()?,
    };

    match cli.command {
        Commands::Run => run_service(config).await,
        Commands::Fetch { source } => fetch_once(&source).await,
        Commands::Latest { source, count } => show_latest(config, &source, count).await,
    }
}

async fn run_service(config: Config) -> anyhow::Result<()> {
    tracing::info!("Starting ticker service");

    // Schema setup failure is the one unrecoverable error
    let store = Arc::new(TickerStore::connect(&config.database.path).await?);

    let (shutdown_tx, _) = broadcast::channel(1);
    let supervisor = PollSupervisor::new(
        Arc::clone(&store),
        config.sources.clone(),
        shutdown_tx.clone(),
    );
    let handles = supervisor.spawn()?;

    let api_store = Arc::clone(&store);
    let bind = config.api.bind.clone();
    let api_handle = tokio::spawn(async move {
        if let Err(e) = api::serve(api_store, &bind).await {
            tracing::error!("[Api] server stopped: {}", e);
        }
    });

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received, stopping polling loops");
    let _ = shutdown_tx.send(());

    for handle in handles {
        if tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .is_err()
        {
            tracing::warn!("[Poller] a loop did not stop in time");
        }
    }
    api_handle.abort();

    tracing::info!("Service stopped");
    Ok(())
}

async fn fetch_once(source_name: &str) -> anyhow::Result<()> {
    let source: Source = source_name.parse()?;
    let tick = match source {
        Source::Brti => BrtiSource::new()?.fetch_ticker().await?,
        Source::Bitstamp => BitstampSource::new()?.fetch_ticker().await?,
        Source::Coinbase => CoinbaseSource::new()?.fetch_ticker().await?,
    };

    println!("\n📈 {} BTC/USD\n", tick.source);
    println!("timestamp: {}", tick.timestamp);
    println!("price:     {}", tick.price);
    if let Some(low) = tick.low {
        println!("low:       {}", low);
    }
    if let Some(high) = tick.high {
        println!("high:      {}", high);
    }

    Ok(())
}

async fn show_latest(config: Config, source_name: &str, count: u32) -> anyhow::Result<()> {
    let source: Source = source_name.parse()?;
    let store = TickerStore::connect(&config.database.path).await?;
    let ticks = store.find_latest_ticks(source, count).await?;

    if ticks.is_empty() {
        println!("No stored {} ticks yet", source);
        return Ok(());
    }

    println!("\n📊 Latest {} {} ticks:\n", ticks.len(), source);
    println!(
        "{:<12} {:>12} {:>10} {:>10}",
        "timestamp", "price", "low", "high"
    );
    println!("{}", "-".repeat(48));

    for tick in ticks {
        println!(
            "{:<12} {:>12.2} {:>10} {:>10}",
            tick.timestamp,
            tick.price,
            tick.low
                .map(|v| format!("{v:.2}"))
                .unwrap_or_else(|| "-".to_string()),
            tick.high
                .map(|v| format!("{v:.2}"))
                .unwrap_or_else(|| "-".to_string()),
        );
    }

    Ok(())
}
