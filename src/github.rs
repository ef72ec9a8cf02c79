use std::marker::PhantomData;

use anyhow::{Context, Result};
use reqwest::{Client, header};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::types::{Release, Repository};

pub static DEFAULT_API_URL: &str = "https://api.github.com";

/// Page size requested from every listing endpoint (GitHub's maximum).
const PER_PAGE: u32 = 100;

pub struct GitHubClient {
    client: Client,
    base: String,
}

impl GitHubClient {
    pub fn new(token: Option<&str>, base: &str) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::USER_AGENT,
            header::HeaderValue::from_static("github-releases/0.1"),
        );
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/vnd.github+json"),
        );
        match token {
            Some(t) => {
                let mut value = header::HeaderValue::from_str(&format!("token {t}"))
                    .context("GITHUB_TOKEN contains characters not allowed in a header")?;
                value.set_sensitive(true);
                headers.insert(header::AUTHORIZATION, value);
            }
            None => warn!("No GitHub token provided, requests are sent unauthenticated"),
        }
        let client = Client::builder().default_headers(headers).build()?;
        Ok(GitHubClient {
            client,
            base: base.trim_end_matches('/').to_string(),
        })
    }

    /// Lazy page sequence over the organization's repositories.
    pub fn org_repo_pages(&self, org: &str) -> Pages<'_, Repository> {
        Pages::new(self, format!("{}/orgs/{org}/repos", self.base))
    }

    /// Lazy page sequence over a repository's releases.
    pub fn release_pages(&self, repo: &Repository) -> Pages<'_, Release> {
        Pages::new(self, repo.releases_endpoint())
    }

    /// All repositories of `org`, sorted by name.
    pub async fn list_org_repos(&self, org: &str) -> Result<Vec<Repository>> {
        let mut repos = self
            .org_repo_pages(org)
            .collect_all()
            .await
            .with_context(|| format!("Failed to list repositories of org {org}"))?;
        repos.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(repos)
    }

    pub async fn list_releases(&self, repo: &Repository) -> Result<Vec<Release>> {
        self.release_pages(repo)
            .collect_all()
            .await
            .with_context(|| format!("Failed to list releases of repository {}", repo.name))
    }

    async fn fetch_page<T: DeserializeOwned>(&self, url: &str, page: u32) -> Result<Vec<T>> {
        debug!(url, page, "GET");
        let resp = self
            .client
            .get(url)
            .query(&[("per_page", PER_PAGE), ("page", page)])
            .send()
            .await
            .with_context(|| format!("Failed to fetch page {page} from {url}"))?
            .error_for_status()
            .with_context(|| format!("GitHub API error for {url}"))?;
        resp.json()
            .await
            .with_context(|| format!("Failed to parse page {page} from {url} as JSON"))
    }
}

/// Paged listing that is pulled one batch at a time until an empty page.
pub struct Pages<'a, T> {
    client: &'a GitHubClient,
    url: String,
    next_page: u32,
    exhausted: bool,
    _item: PhantomData<T>,
}

impl<'a, T: DeserializeOwned> Pages<'a, T> {
    fn new(client: &'a GitHubClient, url: String) -> Self {
        Pages {
            client,
            url,
            next_page: 1,
            exhausted: false,
            _item: PhantomData,
        }
    }

    /// Next non-empty batch, or `None` once the listing is exhausted.
    pub async fn next_batch(&mut self) -> Result<Option<Vec<T>>> {
        if self.exhausted {
            return Ok(None);
        }
        let items: Vec<T> = self.client.fetch_page(&self.url, self.next_page).await?;
        if items.is_empty() {
            debug!(url = %self.url, pages = self.next_page - 1, "listing exhausted");
            self.exhausted = true;
            return Ok(None);
        }
        self.next_page += 1;
        Ok(Some(items))
    }

    /// Rewind to the first page.
    pub fn restart(&mut self) {
        self.next_page = 1;
        self.exhausted = false;
    }

    pub async fn collect_all(mut self) -> Result<Vec<T>> {
        let mut all = Vec::new();
        while let Some(batch) = self.next_batch().await? {
            all.extend(batch);
        }
        Ok(all)
    }
}
