use async_trait::async_trait;

use crate::error::Error;
use crate::seed::Seed;

pub mod summary;

/// One resolve-then-fetch pipeline, run once per seed.
#[async_trait]
pub trait Spider: Send + Sync {
    type Item: Send;

    fn name(&self) -> String;

    /// Visits the seed's page and works out what to download.
    async fn scrape(&self, seed: &Seed) -> Result<Self::Item, Error>;

    /// Downloads what `scrape` found.
    async fn process(&self, item: Self::Item) -> Result<(), Error>;
}
