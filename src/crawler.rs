use std::{sync::Arc, time::Duration};

use tokio::task::JoinSet;

use crate::error::Error;
use crate::gate::Gate;
use crate::seed::Seed;
use crate::spiders::Spider;

pub struct Crawler {
    delay: Duration,
    gate: Gate,
}

/// What happened to the dispatched seeds.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CrawlReport {
    pub dispatched: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl Crawler {
    pub fn new(delay: Duration, gate: Gate) -> Self {
        Self { delay, gate }
    }

    /// Runs one pipeline per seed, in seed order, never more than the gate's
    /// capacity at once. Returns after every pipeline has finished.
    pub async fn run<S>(&self, spider: Arc<S>, seeds: Vec<Seed>) -> CrawlReport
    where
        S: Spider + 'static,
    {
        let total = seeds.len();
        let mut report = CrawlReport::default();
        let mut pipelines = JoinSet::new();
        tracing::debug!(
            spider = spider.name(),
            capacity = self.gate.capacity(),
            "starting {} seeds",
            total
        );

        for (index, seed) in seeds.into_iter().enumerate() {
            if index > 0 && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            let permit = match self.gate.acquire().await {
                Ok(permit) => permit,
                Err(err) => {
                    tracing::error!("failure: {}: {}", seed.name, err);
                    report.failed += 1;
                    continue;
                }
            };
            tracing::info!("Download: {} ({} of {})", seed.name, index + 1, total);
            tracing::trace!(in_flight = self.gate.in_flight(), "slot acquired");
            report.dispatched += 1;

            let spider = spider.clone();
            pipelines.spawn(async move {
                let _permit = permit;
                match run_pipeline(spider.as_ref(), &seed).await {
                    Ok(()) => true,
                    Err(err) => {
                        tracing::error!("failure: {}: {}", seed.name, err);
                        false
                    }
                }
            });
        }

        while let Some(joined) = pipelines.join_next().await {
            match joined {
                Ok(true) => report.succeeded += 1,
                Ok(false) => report.failed += 1,
                Err(err) => {
                    tracing::error!("pipeline aborted: {}", err);
                    report.failed += 1;
                }
            }
        }

        report
    }
}

async fn run_pipeline<S: Spider>(spider: &S, seed: &Seed) -> Result<(), Error> {
    let item = spider.scrape(seed).await?;
    spider.process(item).await
}
