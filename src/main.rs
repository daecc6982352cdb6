use std::{sync::Arc, time::Duration};

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;
use crate::crawler::Crawler;
use crate::gate::Gate;
use crate::settings::Settings;
use crate::spiders::summary::SummarySpider;

mod cli;
mod crawler;
mod error;
mod gate;
mod seed;
mod settings;
mod spiders;

#[tokio::main]
async fn main() {
    if let Err(err) = try_main().await {
        eprintln!("Error: {:?}", err);
        std::process::exit(1);
    }
}

async fn try_main() -> anyhow::Result<()> {
    // construct a subscriber that prints formatted traces to stdout
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new("fetch_summaries=info,warn"))?,
        )
        .finish();
    // use that subscriber to process traces emitted after this point
    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();
    let settings = Settings::load(&cli)?;
    tracing::debug!("loaded settings: {:?}", settings);

    let gate = Gate::with_requested(settings.max_concurrent);
    let spider = Arc::new(SummarySpider::new(settings.spider_options())?);
    tracing::debug!("writing to {:?}", spider.output_path());
    let seeds = seed::load(&settings.seed_path)?;

    let crawler = Crawler::new(Duration::from_secs(settings.interval_secs), gate);
    let report = crawler.run(spider, seeds).await;
    tracing::debug!(
        dispatched = report.dispatched,
        succeeded = report.succeeded,
        failed = report.failed,
        "crawl finished"
    );

    Ok(())
}

// == Client ==
// Name your user agent after your app?
pub static APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
