use clap::Parser;
use rss_notifier::{Config, NewsPipeline};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "rss-notifier", about = "Feed-to-Discord notification pipeline")]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = "config/config.toml")]
    config: PathBuf,

    /// Lookback window in hours; items published earlier are skipped.
    #[arg(long, default_value_t = 1)]
    offset: i64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let config = Config::load(&args.config)?;
    let pipeline = NewsPipeline::from_config(&config, args.offset)?;

    let summary = pipeline.run().await?;
    info!(
        records = summary.records,
        notifications = summary.notifications,
        delivered = summary.delivered(),
        "run complete"
    );

    Ok(())
}
