use std::io::Write;

use anyhow::Result;
use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info};

use crate::github::GitHubClient;
use crate::output::Renderer;
use crate::types::{Release, Repository};

/// Date range (inclusive, by calendar date) and optional author a release must match.
#[derive(Debug, Clone)]
pub struct ReleaseFilter {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub author: Option<String>,
}

impl ReleaseFilter {
    pub fn matches(&self, release: &Release) -> bool {
        let day = release.created_at.date_naive();
        let valid_date = self.from <= day && day <= self.to;
        let valid_author = match self.author.as_deref() {
            None | Some("") => true,
            Some(wanted) => release.author_login() == Some(wanted),
        };
        valid_date && valid_author
    }

    /// Sorts by creation time and keeps the matching releases.
    pub fn select(&self, mut releases: Vec<Release>) -> Vec<Release> {
        releases.sort_by_key(|r| r.created_at);
        releases.retain(|r| self.matches(r));
        releases
    }
}

/// Matching releases of one repository. Never empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RepoReleases {
    pub repository: String,
    pub releases: Vec<Release>,
}

/// Walks `repos` in order, fetching and filtering each one's releases.
///
/// Progress lines and the inline section of every repository with matches are
/// written to `out` as they are produced. Repositories without matches are left
/// out of the result. The first failed request aborts the whole walk.
pub async fn collect_releases(
    client: &GitHubClient,
    repos: &[Repository],
    filter: &ReleaseFilter,
    renderer: &Renderer,
    out: &mut dyn Write,
) -> Result<Vec<RepoReleases>> {
    let mut matched = Vec::new();
    for (idx, repo) in repos.iter().enumerate() {
        writeln!(out, "{idx}/{}: {}", repos.len(), repo.name)?;
        let releases = client.list_releases(repo).await?;
        let fetched = releases.len();
        let releases = filter.select(releases);
        debug!(repo = %repo.name, fetched, matched = releases.len(), "filtered releases");
        if releases.is_empty() {
            continue;
        }
        renderer.render_releases(out, &repo.name, &releases, false)?;
        matched.push(RepoReleases {
            repository: repo.name.clone(),
            releases,
        });
    }
    Ok(matched)
}

/// Enumerates the organization and collects its matching releases.
pub async fn find_org_releases(
    client: &GitHubClient,
    org: &str,
    filter: &ReleaseFilter,
    renderer: &Renderer,
    out: &mut dyn Write,
) -> Result<Vec<RepoReleases>> {
    let repos = client.list_org_repos(org).await?;
    writeln!(out, "Found {} repos", repos.len())?;
    info!(org, repos = repos.len(), "enumerated organization");

    writeln!(
        out,
        "Will start looking for releases in org {org} between {} and {} (both inclusive)\n",
        filter.from, filter.to
    )?;
    collect_releases(client, repos.as_slice(), filter, renderer, out).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::tests::{page_query, repo_json};
    use crate::types::Author;
    use chrono::{DateTime, Utc};
    use mockito::{Server, ServerGuard};
    use pretty_assertions::assert_eq;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn release(name: &str, created_at: &str, login: Option<&str>) -> Release {
        Release {
            name: Some(name.to_string()),
            tag_name: None,
            created_at: created_at.parse::<DateTime<Utc>>().unwrap(),
            author: login.map(|l| Author { login: l.to_string() }),
            body: None,
            html_url: None,
        }
    }

    fn filter(from: &str, to: &str, author: Option<&str>) -> ReleaseFilter {
        ReleaseFilter {
            from: date(from),
            to: date(to),
            author: author.map(str::to_string),
        }
    }

    #[test]
    fn test_upper_bound_is_inclusive_by_date() {
        let f = filter("2024-01-01", "2024-06-01", None);
        assert!(f.matches(&release("v1", "2024-06-01T23:59:00Z", None)));
        assert!(f.matches(&release("v0", "2024-01-01T00:00:00Z", None)));
        assert!(!f.matches(&release("v2", "2024-06-02T00:00:00Z", None)));
        assert!(!f.matches(&release("v-1", "2023-12-31T23:59:59Z", None)));
    }

    #[test]
    fn test_author_is_exact_match() {
        let f = filter("2024-01-01", "2024-12-31", Some("jesper"));
        assert!(f.matches(&release("v1", "2024-03-01T10:00:00Z", Some("jesper"))));
        assert!(!f.matches(&release("v1", "2024-03-01T10:00:00Z", Some("Jesper"))));
        assert!(!f.matches(&release("v1", "2024-03-01T10:00:00Z", Some("jesper-budbee"))));
        assert!(!f.matches(&release("v1", "2024-03-01T10:00:00Z", None)));
    }

    #[test]
    fn test_empty_author_filter_matches_everyone() {
        let f = filter("2024-01-01", "2024-12-31", Some(""));
        assert!(f.matches(&release("v1", "2024-03-01T10:00:00Z", None)));
    }

    #[test]
    fn test_select_sorts_by_creation_time() {
        let f = filter("2024-01-01", "2024-12-31", None);
        let selected = f.select(vec![
            release("late", "2024-09-01T00:00:00Z", None),
            release("outside", "2025-01-01T00:00:00Z", None),
            release("early", "2024-02-01T00:00:00Z", None),
        ]);
        let names: Vec<_> = selected.iter().map(|r| r.name.clone().unwrap()).collect();
        assert_eq!(names, vec!["early", "late"]);
    }

    async fn mock_releases(server: &mut ServerGuard, repo: &str, body: &str) {
        let path = format!("/repos/acme/{repo}/releases");
        server
            .mock("GET", path.as_str())
            .match_query(page_query(1))
            .with_body(body)
            .create_async()
            .await;
        server
            .mock("GET", path.as_str())
            .match_query(page_query(2))
            .with_body("[]")
            .create_async()
            .await;
    }

    async fn mock_org(server: &mut ServerGuard, names: &[&str]) {
        let items: Vec<String> = names.iter().map(|n| repo_json(server, n)).collect();
        server
            .mock("GET", "/orgs/acme/repos")
            .match_query(page_query(1))
            .with_body(format!("[{}]", items.join(", ")))
            .create_async()
            .await;
        server
            .mock("GET", "/orgs/acme/repos")
            .match_query(page_query(2))
            .with_body("[]")
            .create_async()
            .await;
    }

    #[tokio::test]
    async fn test_repositories_ordered_by_name() {
        let mut server = Server::new_async().await;
        mock_org(&mut server, &["beta", "alpha"]).await;
        mock_releases(
            &mut server,
            "alpha",
            r#"[{"name": "a1", "created_at": "2024-03-01T09:00:00Z", "author": {"login": "jesper"}}]"#,
        )
        .await;
        mock_releases(
            &mut server,
            "beta",
            r#"[{"name": "b1", "created_at": "2024-06-01T09:00:00Z", "author": {"login": "jesper"}}]"#,
        )
        .await;

        let client = GitHubClient::new(Some("secret"), &server.url()).unwrap();
        let mut out = Vec::new();
        let matched = find_org_releases(
            &client,
            "acme",
            &filter("2024-01-01", "2024-12-31", None),
            &Renderer::new(false),
            &mut out,
        )
        .await
        .unwrap();

        let repos: Vec<_> = matched.iter().map(|m| m.repository.as_str()).collect();
        assert_eq!(repos, vec!["alpha", "beta"]);

        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "Found 2 repos\n\
             Will start looking for releases in org acme between 2024-01-01 and 2024-12-31 (both inclusive)\n\
             \n\
             0/2: alpha\n    2024-03-01 09:00: a1 by jesper\n\
             1/2: beta\n    2024-06-01 09:00: b1 by jesper\n"
        );
    }

    #[tokio::test]
    async fn test_repository_without_matches_is_omitted() {
        let mut server = Server::new_async().await;
        mock_org(&mut server, &["api", "web"]).await;
        mock_releases(
            &mut server,
            "api",
            r#"[{"name": "v1", "created_at": "2024-03-01T09:00:00Z", "author": {"login": "someone-else"}}]"#,
        )
        .await;
        mock_releases(
            &mut server,
            "web",
            r#"[{"name": "v2", "created_at": "2024-04-01T09:00:00Z", "author": {"login": "jesper"}},
                {"name": "v1", "created_at": "2024-03-01T09:00:00Z", "author": null}]"#,
        )
        .await;

        let client = GitHubClient::new(Some("secret"), &server.url()).unwrap();
        let f = filter("2024-01-01", "2024-12-31", Some("jesper"));
        let matched = find_org_releases(&client, "acme", &f, &Renderer::new(false), &mut std::io::sink())
            .await
            .unwrap();

        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].repository, "web");
        assert_eq!(matched[0].releases.len(), 1);
        assert_eq!(matched[0].releases[0].author_login(), Some("jesper"));

        let again = find_org_releases(&client, "acme", &f, &Renderer::new(false), &mut std::io::sink())
            .await
            .unwrap();
        assert_eq!(matched, again);
    }

    #[tokio::test]
    async fn test_release_fetch_failure_aborts() {
        let mut server = Server::new_async().await;
        mock_org(&mut server, &["api"]).await;
        server
            .mock("GET", "/repos/acme/api/releases")
            .match_query(page_query(1))
            .with_status(500)
            .create_async()
            .await;

        let client = GitHubClient::new(Some("secret"), &server.url()).unwrap();
        let result = find_org_releases(
            &client,
            "acme",
            &filter("2024-01-01", "2024-12-31", None),
            &Renderer::new(false),
            &mut std::io::sink(),
        )
        .await;

        let err = result.unwrap_err();
        assert!(format!("{err:#}").contains("repository api"));
    }
}
