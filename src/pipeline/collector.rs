use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::analysis::RepositoryActivity;
use crate::config::GitHubConfig;
use crate::error::SourceResult;
use crate::github::{Repository, SourceClient};

/// Everything fetched for one user, ready for analysis
#[derive(Debug, Clone)]
pub struct CollectedData {
    pub login: String,
    /// Repositories the host listed, before fork filtering and the cap
    pub repositories_found: usize,
    pub activities: Vec<RepositoryActivity>,
}

/// Walks a user's repositories one at a time and gathers their activity.
///
/// Per-repository calls never fail the run: an error becomes an empty
/// result for that call plus one log line naming the repository.
pub struct Collector<'a> {
    source: &'a dyn SourceClient,
    config: &'a GitHubConfig,
}

impl<'a> Collector<'a> {
    pub fn new(source: &'a dyn SourceClient, config: &'a GitHubConfig) -> Self {
        Self { source, config }
    }

    /// Resolve the login to analyze. Without an explicit user this asks the
    /// host who the token belongs to, which is fatal on failure.
    pub async fn resolve_login(&self, user: Option<&str>) -> Result<String> {
        match user.map(str::trim).filter(|u| !u.is_empty()) {
            Some(login) => Ok(login.to_string()),
            None => {
                let me = self
                    .source
                    .authenticated_user()
                    .await
                    .context("failed to resolve the authenticated GitHub user")?;
                info!(
                    "Authenticated as {}{}",
                    me.login,
                    me.name
                        .as_deref()
                        .map(|n| format!(" ({})", n))
                        .unwrap_or_default()
                );
                Ok(me.login)
            }
        }
    }

    /// Drop forks unless configured otherwise, then keep the first
    /// `max_repos` in the order the host returned them.
    pub fn select_repositories(&self, repositories: Vec<Repository>) -> Vec<Repository> {
        repositories
            .into_iter()
            .filter(|r| self.config.include_forks || !r.fork)
            .take(self.config.max_repos)
            .collect()
    }

    pub async fn collect(&self, user: Option<&str>) -> Result<CollectedData> {
        let login = self.resolve_login(user).await?;

        // An explicit user goes through /users/{login}/repos; the token
        // owner goes through /user/repos so private repos are included.
        let listing_user = user.map(|_| login.as_str());
        let listed = match self.source.list_repositories(listing_user).await {
            Ok(repos) => repos,
            Err(e) => {
                warn!("Failed to list repositories for {}: {}", login, e);
                Vec::new()
            }
        };
        let repositories_found = listed.len();
        let selected = self.select_repositories(listed);
        info!(
            "Found {} repositories for {}, analyzing {}",
            repositories_found,
            login,
            selected.len()
        );

        let total = selected.len();
        let mut activities = Vec::with_capacity(total);
        for (i, repository) in selected.into_iter().enumerate() {
            info!("[{}/{}] Analyzing {}", i + 1, total, repository.full_name);
            activities.push(self.collect_repository(repository).await);
        }

        Ok(CollectedData {
            login,
            repositories_found,
            activities,
        })
    }

    /// Fetch languages, commits and pull requests for one repository, plus
    /// line stats when configured. Never fails.
    pub async fn collect_repository(&self, repository: Repository) -> RepositoryActivity {
        let owner = repository.owner.clone();
        let name = repository.name.clone();
        let mut activity = RepositoryActivity::empty(repository);

        activity.languages = degrade(
            self.source.language_bytes(&owner, &name).await,
            &owner,
            &name,
            "languages",
        );
        activity.commits = degrade(
            self.source
                .list_commits(&owner, &name, self.config.max_commits_per_repo)
                .await,
            &owner,
            &name,
            "commits",
        );
        activity.pull_requests = degrade(
            self.source
                .list_pull_requests(&owner, &name, self.config.max_pull_requests_per_repo)
                .await,
            &owner,
            &name,
            "pull requests",
        );

        if self.config.fetch_commit_stats {
            for commit in activity.commits.iter_mut().filter(|c| c.stats.is_none()) {
                commit.stats = degrade(
                    self.source.commit_stats(&owner, &name, &commit.sha).await,
                    &owner,
                    &name,
                    "commit stats",
                );
            }
        }

        if self.config.fetch_pull_request_stats {
            for pr in activity.pull_requests.iter_mut().filter(|p| p.stats.is_none()) {
                pr.stats = degrade(
                    self.source
                        .pull_request_stats(&owner, &name, pr.number)
                        .await,
                    &owner,
                    &name,
                    "pull request stats",
                );
            }
        }

        debug!(
            "{}/{}: {} languages, {} commits, {} pull requests",
            owner,
            name,
            activity.languages.len(),
            activity.commits.len(),
            activity.pull_requests.len()
        );
        activity
    }
}

/// Turn a failed source call into an empty result with exactly one log line.
fn degrade<T: Default>(result: SourceResult<T>, owner: &str, repo: &str, operation: &str) -> T {
    match result {
        Ok(value) => value,
        Err(e) if e.is_expected_absence() => {
            debug!("No {} for {}/{}: {}", operation, owner, repo, e);
            T::default()
        }
        Err(e) => {
            warn!("Failed to fetch {} for {}/{}: {}", operation, owner, repo, e);
            T::default()
        }
    }
}
