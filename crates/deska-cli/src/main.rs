use anyhow::{Context, Result};
use clap::Parser;
use deska_core::{cutoff_days_before, today_utc};
use deska_scraper::{ScrapeConfig, Scraper};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "deska-cli")]
#[command(about = "Lists recent notices from the Drásov municipal notice board")]
struct Cli {
    /// Show notices published in the last N days
    #[arg(long, default_value_t = 30)]
    days: i64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let since = cutoff_days_before(today_utc(), cli.days);
    let scraper = Scraper::new(ScrapeConfig::default()).context("setting up http client")?;
    let notices = match scraper.run().await {
        Ok(notices) => notices,
        Err(err) => {
            let stage = err.stage();
            return Err(err).with_context(|| format!("{stage} stage failed"));
        }
    };

    tracing::info!(%since, total = notices.len(), "filtering notices");
    println!("{}", notices.since_including(since));
    Ok(())
}
