use anyhow::Result;
use clap::Parser;
use std::io::{self, Write};
use tracing_subscriber::EnvFilter;

mod collector;
mod config;
mod github;
mod output;
mod types;

use collector::find_org_releases;
use config::Config;
use github::GitHubClient;
use output::{OutputFormat, ReleaseReport, Renderer, print_json_output};

#[tokio::main]
async fn main() -> Result<()> {
    let cli_config = Config::parse();
    init_logging(cli_config.verbose);

    let config = match &cli_config.config_file {
        Some(path) => {
            let file_config = Config::from_toml(path)?;
            cli_config.merge(file_config)
        }
        None => cli_config,
    }
    .with_defaults();
    config.validate()?;

    let filter = config.release_filter()?;
    let client = GitHubClient::new(config.token.as_deref(), config.get_api_url())?;
    let renderer = Renderer::new(config.detailed);
    let format = config.get_format();

    // JSON output keeps stdout free of progress text
    let mut progress: Box<dyn Write> = match format {
        OutputFormat::Text => Box::new(io::stdout()),
        OutputFormat::Json => Box::new(io::sink()),
    };
    let matched = find_org_releases(&client, config.get_org(), &filter, &renderer, progress.as_mut()).await?;
    progress.flush()?;

    let report = ReleaseReport::new(
        config.get_org(),
        filter.from,
        filter.to,
        filter.author.as_deref(),
        matched,
    );
    let mut out = io::stdout().lock();
    match format {
        OutputFormat::Text => renderer.render_report(&mut out, &report)?,
        OutputFormat::Json => print_json_output(&mut out, &report)?,
    }
    out.flush()?;
    Ok(())
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "warn,github_releases=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}
