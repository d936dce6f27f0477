//! Run-to-completion entry point: build the configured sources, aggregate,
//! and write the combined document.

use std::time::Duration;

use anyhow::{Context, Result};
use log::info;
use reqwest::Client;

use social_sync::aggregator;
use social_sync::config::Config;
use social_sync::sources::{GoodreadsSource, LetterboxdSource, SourceAdapter, StravaSource};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_env();
    let client = Client::builder()
        .timeout(Duration::from_secs(30))
        .user_agent("social-sync/0.1")
        .build()
        .context("failed to construct HTTP client")?;

    let sources: Vec<Box<dyn SourceAdapter>> = vec![
        Box::new(LetterboxdSource::new(
            client.clone(),
            config.letterboxd_user.clone(),
            config.letterboxd_fixture.clone(),
        )),
        Box::new(GoodreadsSource::new(
            client.clone(),
            config.goodreads_user.clone(),
            config.goodreads_fixture.clone(),
        )),
        Box::new(StravaSource::new(
            config.credentials.clone(),
            client,
            config.token_url.clone(),
            config.api_base.clone(),
            config.checkpoint_path.clone(),
            config.per_page,
            config.max_pages,
        )),
    ];

    let document = aggregator::aggregate(&sources)
        .await
        .context("aggregation run failed")?;
    aggregator::write_document(&config.output_path, &document)
        .context("could not write the aggregate document")?;
    info!("run complete: {}", config.output_path.display());
    Ok(())
}
