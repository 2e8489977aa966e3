use anyhow::{Context, Result};
use clap::Parser;
use gleaner_common::observability::init_logging;
use gleaner_config::{FetchSettings, GleanerConfig, GleanerConfigLoader};
use gleaner_extract::Page;
use gleaner_http::{FetchError, FetchOptions, FetchRequest, Fetcher};
use std::path::Path;

mod cli;
mod report;

use cli::Cli;

const APP_NAME: &str = "gleaner";
const DEFAULT_CONFIG_FILE: &str = "gleaner.yaml";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1) Load config (env wins)
    let cfg = load_config(cli.config.as_deref())?;
    let log_path = init_logging(cfg.logging.to_log_config(APP_NAME))?;
    tracing::debug!(log_path=%log_path.display(), url=%cli.url, "gleaner.start");

    // 2) Fetch
    println!("{}", report::fetching_line(&cli.url));
    let req = FetchRequest::with_options(&cli.url, fetch_options(&cfg.fetch)?)?;
    let html = build_fetcher(&cfg.fetch)?.fetch(req).await?;

    // 3) Extract + report
    let page = Page::from_markup(&html);
    print!("{}", report::render(&page, cfg.preview_chars));
    Ok(())
}

fn load_config(explicit: Option<&Path>) -> Result<GleanerConfig> {
    let loader = match explicit {
        Some(path) => GleanerConfigLoader::new().with_file(path),
        None => GleanerConfigLoader::new().with_optional_file(DEFAULT_CONFIG_FILE),
    };
    loader.load().context("failed to load configuration")
}

fn fetch_options(settings: &FetchSettings) -> Result<FetchOptions, FetchError> {
    let mut opts = FetchOptions::default();
    if let Some(user_agent) = &settings.user_agent {
        opts = opts.with_user_agent(user_agent)?;
    }
    if let Some(timeout) = settings.timeout() {
        opts = opts.with_timeout(timeout);
    }
    Ok(opts)
}

fn build_fetcher(settings: &FetchSettings) -> Result<Fetcher, FetchError> {
    let fetcher = Fetcher::new()?;
    Ok(match settings.max_body_bytes {
        Some(limit) => fetcher.with_max_body_bytes(limit),
        None => fetcher,
    })
}
