//! Repository-hosting source: domain types and the client seam.
//!
//! The analysis core only ever sees the types in this module. Wire formats
//! stay private to `client`.

pub mod client;
pub mod rate_limit;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::SourceResult;

pub use client::GitHubClient;
pub use rate_limit::RateLimiter;

/// Language label → byte count for one repository, in the order the source reported it.
pub type LanguageBytes = IndexMap<String, u64>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitHubUser {
    pub login: String,
    pub name: Option<String>,
    pub public_repos: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    pub name: String,
    pub owner: String,
    pub full_name: String,
    pub html_url: String,
    pub description: Option<String>,
    /// Primary language tag as declared by the host
    pub language: Option<String>,
    pub fork: bool,
    pub stargazers_count: u64,
    pub forks_count: u64,
    pub pushed_at: Option<DateTime<Utc>>,
}

impl Repository {
    /// Minimal repository for tests and fixtures
    pub fn new(owner: &str, name: &str, language: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            owner: owner.to_string(),
            full_name: format!("{}/{}", owner, name),
            html_url: format!("https://github.com/{}/{}", owner, name),
            description: None,
            language: language.map(str::to_string),
            fork: false,
            stargazers_count: 0,
            forks_count: 0,
            pushed_at: None,
        }
    }
}

/// Added and deleted line counts for a commit or pull request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineStats {
    pub additions: u64,
    pub deletions: u64,
}

impl LineStats {
    pub fn new(additions: u64, deletions: u64) -> Self {
        Self {
            additions,
            deletions,
        }
    }

    pub fn total(&self) -> u64 {
        self.additions.saturating_add(self.deletions)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    pub sha: String,
    pub message: String,
    pub author: String,
    pub date: Option<DateTime<Utc>>,
    pub html_url: String,
    pub stats: Option<LineStats>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    pub title: String,
    pub state: String,
    pub author: String,
    pub html_url: String,
    pub merged_at: Option<DateTime<Utc>>,
    pub stats: Option<LineStats>,
}

/// Everything the pipeline needs from a repository host.
///
/// Implementations report failures; the collector decides to degrade them.
#[async_trait]
pub trait SourceClient: Send + Sync {
    async fn authenticated_user(&self) -> SourceResult<GitHubUser>;

    /// Repositories for `user`, or for the authenticated user when `None`.
    /// Most recently updated first.
    async fn list_repositories(&self, user: Option<&str>) -> SourceResult<Vec<Repository>>;

    async fn language_bytes(&self, owner: &str, repo: &str) -> SourceResult<LanguageBytes>;

    async fn list_commits(&self, owner: &str, repo: &str, limit: usize)
        -> SourceResult<Vec<Commit>>;

    async fn list_pull_requests(
        &self,
        owner: &str,
        repo: &str,
        limit: usize,
    ) -> SourceResult<Vec<PullRequest>>;

    /// Line stats for one commit. `None` when the host has none for it.
    async fn commit_stats(&self, owner: &str, repo: &str, sha: &str)
        -> SourceResult<Option<LineStats>>;

    async fn pull_request_stats(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> SourceResult<Option<LineStats>>;

    /// Outbound calls made so far
    fn api_calls(&self) -> u64;

    /// Remaining quota as last reported by the host
    fn rate_limit_remaining(&self) -> Option<u32>;
}
