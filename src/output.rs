use std::io::Write;
use std::str::FromStr;

use anyhow::Result;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::collector::RepoReleases;
use crate::types::Release;

/// Width of the repository banner and of the divider under detailed releases.
const REPORT_WIDTH: usize = 120;

const UNKNOWN_AUTHOR: &str = "unknown";

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => anyhow::bail!("Invalid format '{}'. Use 'text' or 'json'", s),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReleaseReport {
    pub org: String,
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
    pub author: Option<String>,
    pub total_releases: usize,
    pub repositories: Vec<RepoReleases>,
}

impl ReleaseReport {
    pub fn new(
        org: &str,
        from_date: NaiveDate,
        to_date: NaiveDate,
        author: Option<&str>,
        repositories: Vec<RepoReleases>,
    ) -> Self {
        let total_releases = repositories.iter().map(|r| r.releases.len()).sum();
        ReleaseReport {
            org: org.to_string(),
            from_date,
            to_date,
            author: author.map(str::to_string),
            total_releases,
            repositories,
        }
    }
}

/// Text renderer for release listings, compact or detailed.
#[derive(Debug, Clone, Copy)]
pub struct Renderer {
    detailed: bool,
}

impl Renderer {
    pub fn new(detailed: bool) -> Self {
        Renderer { detailed }
    }

    /// Writes one repository's releases.
    ///
    /// Detailed mode always opens with a `=` banner around the repository name.
    /// In compact mode `print_repo_name` adds a plain name line instead; without
    /// it only the release lines are written (the inline section).
    pub fn render_releases(
        &self,
        out: &mut dyn Write,
        repo_name: &str,
        releases: &[Release],
        print_repo_name: bool,
    ) -> Result<()> {
        let with_header = print_repo_name || self.detailed;
        if self.detailed {
            let fill = "=".repeat(banner_fill(repo_name));
            writeln!(out, "\n{fill} {repo_name} {fill}")?;
        } else if print_repo_name {
            writeln!(out, "{repo_name}")?;
        }

        for release in releases {
            let created = format_created(release);
            let name = release.name.as_deref().unwrap_or_default();
            let login = release.author_login().unwrap_or(UNKNOWN_AUTHOR);
            if self.detailed {
                writeln!(out, "      Name: {name}")?;
                writeln!(out, "    Author: {login}")?;
                writeln!(out, "   Created: {created}")?;
                writeln!(out, "Repository: {repo_name}")?;
                writeln!(out)?;
                writeln!(out, "{}", release.body.as_deref().unwrap_or_default())?;
                writeln!(out, "{}", "-".repeat(REPORT_WIDTH))?;
            } else {
                writeln!(out, "    {created}: {name} by {login}")?;
            }
        }

        if with_header {
            writeln!(out, "\n")?;
        }
        Ok(())
    }

    /// Totals line and per-repository counts.
    pub fn render_summary(&self, out: &mut dyn Write, report: &ReleaseReport) -> Result<()> {
        writeln!(
            out,
            "\n\n\nFound {} release(s) in {} repo(s) in org {} between {} and {} (both inclusive).",
            report.total_releases,
            report.repositories.len(),
            report.org,
            report.from_date,
            report.to_date
        )?;
        for repo in &report.repositories {
            writeln!(out, "    - {} releases in {}", repo.releases.len(), repo.repository)?;
        }
        Ok(())
    }

    /// Summary followed by every repository rendered with its header.
    pub fn render_report(&self, out: &mut dyn Write, report: &ReleaseReport) -> Result<()> {
        self.render_summary(out, report)?;
        writeln!(out, "\n\n\n")?;
        for repo in &report.repositories {
            self.render_releases(out, &repo.repository, &repo.releases, true)?;
        }
        Ok(())
    }
}

pub fn print_json_output(out: &mut dyn Write, report: &ReleaseReport) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    writeln!(out, "{json}")?;
    Ok(())
}

fn banner_fill(repo_name: &str) -> usize {
    let half = repo_name.chars().count() as f64 / 2.0;
    ((REPORT_WIDTH / 2) as f64 - half).max(0.0) as usize
}

fn format_created(release: &Release) -> String {
    release.created_at.format("%Y-%m-%d %H:%M").to_string()
}
