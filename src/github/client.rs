use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use super::rate_limit::RateLimiter;
use super::{
    Commit, GitHubUser, LanguageBytes, LineStats, PullRequest, Repository, SourceClient,
};
use crate::error::{SourceError, SourceResult};
use crate::util::{truncate_chars, SecretString};

const PER_PAGE: usize = 100;

/// Repository listing stops after this many pages
const MAX_REPO_PAGES: usize = 10;

const CLIENT_UA: &str = concat!("gitskills/", env!("CARGO_PKG_VERSION"));

pub struct GitHubClient {
    client: Client,
    base_url: String,
    token: SecretString,
    rate_limiter: RateLimiter,
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Deserialize)]
struct UserPayload {
    login: String,
    name: Option<String>,
    #[serde(default)]
    public_repos: u64,
}

#[derive(Debug, Deserialize)]
struct OwnerPayload {
    login: String,
}

#[derive(Debug, Deserialize)]
struct RepoPayload {
    name: String,
    full_name: String,
    owner: OwnerPayload,
    html_url: String,
    description: Option<String>,
    language: Option<String>,
    #[serde(default)]
    fork: bool,
    #[serde(default)]
    stargazers_count: u64,
    #[serde(default)]
    forks_count: u64,
    pushed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct CommitPayload {
    sha: String,
    commit: CommitDetail,
    #[serde(default)]
    html_url: String,
    stats: Option<StatsPayload>,
}

#[derive(Debug, Deserialize)]
struct CommitDetail {
    #[serde(default)]
    message: String,
    author: Option<CommitAuthor>,
}

#[derive(Debug, Deserialize)]
struct CommitAuthor {
    name: Option<String>,
    date: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct StatsPayload {
    #[serde(default)]
    additions: u64,
    #[serde(default)]
    deletions: u64,
}

#[derive(Debug, Deserialize)]
struct PullPayload {
    number: u64,
    #[serde(default)]
    title: String,
    #[serde(default)]
    state: String,
    #[serde(default)]
    html_url: String,
    user: Option<OwnerPayload>,
    merged_at: Option<DateTime<Utc>>,
    // only present on the single-PR endpoint
    additions: Option<u64>,
    deletions: Option<u64>,
}

impl From<RepoPayload> for Repository {
    fn from(p: RepoPayload) -> Self {
        Self {
            name: p.name,
            owner: p.owner.login,
            full_name: p.full_name,
            html_url: p.html_url,
            description: p.description,
            language: p.language,
            fork: p.fork,
            stargazers_count: p.stargazers_count,
            forks_count: p.forks_count,
            pushed_at: p.pushed_at,
        }
    }
}

impl From<CommitPayload> for Commit {
    fn from(p: CommitPayload) -> Self {
        let (author, date) = match p.commit.author {
            Some(a) => (a.name.unwrap_or_else(|| "Unknown".to_string()), a.date),
            None => ("Unknown".to_string(), None),
        };
        Self {
            sha: p.sha,
            message: p.commit.message,
            author,
            date,
            html_url: p.html_url,
            stats: p.stats.map(|s| LineStats::new(s.additions, s.deletions)),
        }
    }
}

impl PullPayload {
    fn stats(&self) -> Option<LineStats> {
        match (self.additions, self.deletions) {
            (None, None) => None,
            (a, d) => Some(LineStats::new(a.unwrap_or(0), d.unwrap_or(0))),
        }
    }
}

impl From<PullPayload> for PullRequest {
    fn from(p: PullPayload) -> Self {
        let stats = p.stats();
        Self {
            number: p.number,
            title: p.title,
            state: p.state,
            author: p
                .user
                .map(|u| u.login)
                .unwrap_or_else(|| "Unknown".to_string()),
            html_url: p.html_url,
            merged_at: p.merged_at,
            stats,
        }
    }
}

// ============================================================================
// Client
// ============================================================================

impl GitHubClient {
    pub fn new(
        base_url: String,
        token: SecretString,
        timeout_secs: u64,
        rate_limit_floor: u32,
    ) -> Result<Self> {
        Ok(Self {
            client: Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                .build()
                .context("failed to build HTTP client")?,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            rate_limiter: RateLimiter::new(rate_limit_floor),
        })
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> SourceResult<T> {
        self.rate_limiter.wait_if_needed().await;

        let url = format!("{}{}", self.base_url, path);
        debug!("GET {}", url);

        let mut request = self
            .client
            .get(&url)
            .query(query)
            .header(ACCEPT, "application/vnd.github+json")
            .header(USER_AGENT, CLIENT_UA)
            .header("X-GitHub-Api-Version", "2022-11-28");
        if !self.token.is_blank() {
            request = request.header(AUTHORIZATION, format!("Bearer {}", self.token.expose()));
        }

        let response = request.send().await?;
        self.rate_limiter.record(response.headers());

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_failure(status, path, body, &self.rate_limiter));
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Fetch pages of `per_page` items until `limit` is reached, a short page
    /// arrives, or `max_pages` is exhausted. A failure after the first page
    /// keeps what was already collected.
    async fn paginate<P, T>(
        &self,
        path: &str,
        base_query: &[(&str, String)],
        limit: usize,
        max_pages: usize,
    ) -> SourceResult<Vec<T>>
    where
        P: DeserializeOwned + Into<T>,
    {
        let per_page = limit.clamp(1, PER_PAGE);
        let mut items = Vec::new();

        for page in 1..=max_pages {
            if items.len() >= limit {
                break;
            }
            let mut query = base_query.to_vec();
            query.push(("per_page", per_page.to_string()));
            query.push(("page", page.to_string()));

            let batch: Vec<P> = match self.get_json(path, &query).await {
                Ok(batch) => batch,
                Err(e) if page == 1 => return Err(e),
                Err(e) => {
                    warn!("{}: stopping pagination at page {}: {}", path, page, e);
                    break;
                }
            };

            let short_page = batch.len() < per_page;
            let room = limit - items.len();
            items.extend(batch.into_iter().take(room).map(Into::into));
            if short_page {
                break;
            }
        }

        Ok(items)
    }
}

fn classify_failure(
    status: StatusCode,
    path: &str,
    body: String,
    limiter: &RateLimiter,
) -> SourceError {
    let exhausted = limiter.remaining() == Some(0);
    match status.as_u16() {
        404 => SourceError::NotFound(path.to_string()),
        403 | 429 if exhausted || body.to_lowercase().contains("rate limit") => {
            SourceError::RateLimited {
                reset: limiter.reset_epoch().unwrap_or(0),
            }
        }
        code => SourceError::Status {
            status: code,
            body: truncate_chars(&body, 300),
        },
    }
}

#[async_trait]
impl SourceClient for GitHubClient {
    async fn authenticated_user(&self) -> SourceResult<GitHubUser> {
        let user: UserPayload = self.get_json("/user", &[]).await?;
        Ok(GitHubUser {
            login: user.login,
            name: user.name,
            public_repos: user.public_repos,
        })
    }

    async fn list_repositories(&self, user: Option<&str>) -> SourceResult<Vec<Repository>> {
        let (path, query) = match user {
            Some(login) => (
                format!("/users/{}/repos", login),
                vec![("sort", "updated".to_string()), ("type", "owner".to_string())],
            ),
            None => (
                "/user/repos".to_string(),
                vec![
                    ("sort", "updated".to_string()),
                    ("affiliation", "owner".to_string()),
                ],
            ),
        };
        self.paginate::<RepoPayload, Repository>(
            &path,
            &query,
            PER_PAGE * MAX_REPO_PAGES,
            MAX_REPO_PAGES,
        )
        .await
    }

    async fn language_bytes(&self, owner: &str, repo: &str) -> SourceResult<LanguageBytes> {
        self.get_json(&format!("/repos/{}/{}/languages", owner, repo), &[])
            .await
    }

    async fn list_commits(
        &self,
        owner: &str,
        repo: &str,
        limit: usize,
    ) -> SourceResult<Vec<Commit>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        self.paginate::<CommitPayload, Commit>(
            &format!("/repos/{}/{}/commits", owner, repo),
            &[],
            limit,
            limit.div_ceil(PER_PAGE),
        )
        .await
    }

    async fn list_pull_requests(
        &self,
        owner: &str,
        repo: &str,
        limit: usize,
    ) -> SourceResult<Vec<PullRequest>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        self.paginate::<PullPayload, PullRequest>(
            &format!("/repos/{}/{}/pulls", owner, repo),
            &[("state", "all".to_string())],
            limit,
            limit.div_ceil(PER_PAGE),
        )
        .await
    }

    async fn commit_stats(
        &self,
        owner: &str,
        repo: &str,
        sha: &str,
    ) -> SourceResult<Option<LineStats>> {
        let commit: CommitPayload = self
            .get_json(&format!("/repos/{}/{}/commits/{}", owner, repo, sha), &[])
            .await?;
        Ok(commit
            .stats
            .map(|s| LineStats::new(s.additions, s.deletions)))
    }

    async fn pull_request_stats(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> SourceResult<Option<LineStats>> {
        let pull: PullPayload = self
            .get_json(&format!("/repos/{}/{}/pulls/{}", owner, repo, number), &[])
            .await?;
        Ok(pull.stats())
    }

    fn api_calls(&self) -> u64 {
        self.rate_limiter.calls()
    }

    fn rate_limit_remaining(&self) -> Option<u32> {
        self.rate_limiter.remaining()
    }
}
