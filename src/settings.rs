use std::path::PathBuf;

use anyhow::Context;
use config::{Config, Environment, File};
use serde::Deserialize;
use serde_json::Value as JsonValue;

use crate::cli::Cli;
use crate::spiders::summary::SummarySpiderOptions;

pub const ENV_PREFIX: &str = "FETCH_SUMMARIES";
pub const DEFAULT_MAX_CONCURRENT: i64 = 4;

/// Effective run settings: defaults, then the settings file, then
/// `FETCH_SUMMARIES_*` environment variables, then command-line flags.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct Settings {
    pub seed_path: PathBuf,
    pub output_path: PathBuf,
    #[serde(deserialize_with = "lenient_max_concurrent")]
    pub max_concurrent: i64,
    pub interval_secs: u64,
    pub request_timeout_secs: u64,
    pub user_agent: Option<String>,
    pub accept_error_status: bool,
}

impl Settings {
    pub fn load(cli: &Cli) -> anyhow::Result<Self> {
        Self::load_with(cli, Environment::with_prefix(ENV_PREFIX).try_parsing(true))
    }

    fn load_with(cli: &Cli, environment: Environment) -> anyhow::Result<Self> {
        let mut builder = Config::builder()
            .set_default("seed_path", "seed.json")?
            .set_default("output_path", "chemicals")?
            .set_default("max_concurrent", DEFAULT_MAX_CONCURRENT)?
            .set_default("interval_secs", 0_i64)?
            .set_default("request_timeout_secs", 120_i64)?
            .set_default("accept_error_status", false)?
            .add_source(File::from(cli.config.clone()).required(false))
            .add_source(environment);

        if let Some(seed) = &cli.seed {
            builder = builder.set_override("seed_path", seed.to_string_lossy().into_owned())?;
        }
        if let Some(output) = &cli.output {
            builder = builder.set_override("output_path", output.to_string_lossy().into_owned())?;
        }
        if let Some(concurrency) = &cli.concurrency {
            builder = builder.set_override("max_concurrent", concurrency.as_str())?;
        }
        if let Some(interval) = cli.interval {
            builder = builder.set_override("interval_secs", interval as i64)?;
        }
        if let Some(timeout) = cli.timeout {
            builder = builder.set_override("request_timeout_secs", timeout as i64)?;
        }
        if let Some(user_agent) = &cli.user_agent {
            builder = builder.set_override("user_agent", user_agent.as_str())?;
        }
        if cli.accept_error_status {
            builder = builder.set_override("accept_error_status", true)?;
        }

        builder
            .build()
            .context("reading settings")?
            .try_deserialize()
            .context("invalid settings")
    }

    pub fn spider_options(&self) -> SummarySpiderOptions {
        SummarySpiderOptions {
            user_agent: self.user_agent.clone(),
            output_path: self.output_path.clone(),
            request_timeout_secs: self.request_timeout_secs,
            accept_error_status: self.accept_error_status,
        }
    }
}

/// An unusable concurrency value is not fatal, it falls back to the default.
fn lenient_max_concurrent<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = JsonValue::deserialize(deserializer)?;
    let parsed = match &value {
        JsonValue::Number(number) => number.as_i64(),
        JsonValue::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    Ok(parsed.unwrap_or_else(|| {
        tracing::warn!(
            "invalid max_concurrent {}, using {}",
            value,
            DEFAULT_MAX_CONCURRENT
        );
        DEFAULT_MAX_CONCURRENT
    }))
}
