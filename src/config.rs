use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::str::FromStr;
use tracing::warn;

use crate::collector::ReleaseFilter;
use crate::github::DEFAULT_API_URL;
use crate::output::OutputFormat;

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Parser, Deserialize, Serialize, Debug, Clone, Default)]
#[command(name = "github-releases")]
#[command(about = "List GitHub releases across an organization's repositories within a date range")]
#[command(version)]
pub struct Config {
    /// The start date in YYYY-MM-DD format (inclusive)
    #[arg(long, value_parser = parse_date)]
    #[serde(skip)]
    pub from_date: Option<NaiveDate>,

    /// The end date in YYYY-MM-DD format (inclusive)
    #[arg(long, value_parser = parse_date)]
    #[serde(skip)]
    pub to_date: Option<NaiveDate>,

    /// The org to search in
    #[arg(long)]
    #[serde(default)]
    pub org: Option<String>,

    /// Only include releases authored by this login
    #[arg(long)]
    #[serde(default)]
    pub author: Option<String>,

    /// Print detailed information about every release
    #[arg(long, default_value_t = false)]
    #[serde(default)]
    pub detailed: bool,

    /// GitHub API token
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    #[serde(skip)]
    pub token: Option<String>,

    /// Base URL of the GitHub API
    #[arg(long)]
    #[serde(default)]
    pub api_url: Option<String>,

    /// Output format of the final report
    #[arg(long, value_parser = OutputFormat::from_str)]
    #[serde(default)]
    pub format: Option<OutputFormat>,

    /// Configuration file path
    #[arg(short, long)]
    #[serde(skip)]
    pub config_file: Option<String>,

    /// Enable verbose logging on stderr
    #[arg(long, default_value_t = false)]
    #[serde(skip)]
    pub verbose: bool,
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, DATE_FORMAT)
        .with_context(|| format!("Invalid date '{s}', expected YYYY-MM-DD"))
}

impl Config {
    pub fn from_toml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)
            .context("Failed to read configuration file")?;

        let config: Config = toml::from_str(&content)
            .context("Failed to parse TOML configuration file")?;

        Ok(config)
    }

    pub fn merge(mut self, file_config: Config) -> Self {
        // CLI has precedence, if None, take from file_config
        self.org = self.org.or(file_config.org);
        self.author = self.author.or(file_config.author);
        self.detailed = self.detailed || file_config.detailed;
        self.api_url = self.api_url.or(file_config.api_url);
        self.format = self.format.or(file_config.format);
        self
    }

    pub fn with_defaults(mut self) -> Self {
        self.api_url = self.api_url.or(Some(DEFAULT_API_URL.to_string()));
        self.format = self.format.or(Some(OutputFormat::Text));
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.from_date.is_none() {
            anyhow::bail!("--from-date is required");
        }
        if self.to_date.is_none() {
            anyhow::bail!("--to-date is required");
        }
        if self.org.as_deref().is_none_or(str::is_empty) {
            anyhow::bail!("--org is required");
        }
        if self.from_date > self.to_date {
            warn!("--from-date is after --to-date, no release can match");
        }
        Ok(())
    }

    pub fn get_org(&self) -> &str {
        self.org.as_deref().unwrap_or_default()
    }

    pub fn get_api_url(&self) -> &str {
        self.api_url.as_deref().unwrap_or(DEFAULT_API_URL)
    }

    pub fn get_format(&self) -> OutputFormat {
        self.format.clone().unwrap_or_default()
    }

    /// Filter built from the validated date range and author.
    pub fn release_filter(&self) -> Result<ReleaseFilter> {
        Ok(ReleaseFilter {
            from: self.from_date.context("--from-date is required")?,
            to: self.to_date.context("--to-date is required")?,
            author: self.author.clone(),
        })
    }
}
