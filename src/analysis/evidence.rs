use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::metrics::ContributionMetrics;
use crate::github::Repository;

/// Repository entries per recommendation
pub const MAX_REPOSITORY_EVIDENCE: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceKind {
    Repository,
    Commits,
    PullRequests,
    Language,
}

/// A presentable fact backing a recommendation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    pub kind: EvidenceKind,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<IndexMap<String, u64>>,
}

impl Evidence {
    fn repository(repo: &Repository) -> Self {
        let mut metrics = IndexMap::new();
        metrics.insert("stars".to_string(), repo.stargazers_count);
        metrics.insert("forks".to_string(), repo.forks_count);
        Self {
            kind: EvidenceKind::Repository,
            description: format!("Repository: {}", repo.name),
            url: Some(repo.html_url.clone()),
            metrics: Some(metrics),
        }
    }

    fn commits(language: &str, count: u64) -> Self {
        let mut metrics = IndexMap::new();
        metrics.insert("count".to_string(), count);
        Self {
            kind: EvidenceKind::Commits,
            description: format!("{} commits in {}", count, language),
            url: None,
            metrics: Some(metrics),
        }
    }
}

/// Evidence for one language: up to [`MAX_REPOSITORY_EVIDENCE`] repositories
/// whose declared primary language is exactly `language` (source order),
/// then one commit total when there are commits.
///
/// Filtering uses the primary language tag, not the byte distribution used
/// for metric allocation; the two groupings are kept independent.
pub fn build_evidence(
    language: &str,
    repositories: &[Repository],
    metrics: &ContributionMetrics,
) -> Vec<Evidence> {
    let mut evidence: Vec<Evidence> = repositories
        .iter()
        .filter(|r| r.language.as_deref() == Some(language))
        .take(MAX_REPOSITORY_EVIDENCE)
        .map(Evidence::repository)
        .collect();

    if metrics.commit_count > 0 {
        evidence.push(Evidence::commits(language, metrics.commit_count));
    }

    evidence
}
