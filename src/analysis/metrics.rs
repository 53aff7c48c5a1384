use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Contribution totals for one language.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributionMetrics {
    pub commit_count: u64,
    pub pull_request_count: u64,
    /// Added + deleted lines, or language bytes under [`VolumeBasis::ByteProxy`]
    pub code_volume: u64,
    pub repository_count: u64,
    /// 0 when unknown
    pub days_since_last_activity: u64,
}

impl ContributionMetrics {
    /// Add another repository's counts. Recency is not additive and is
    /// handled by the aggregator.
    pub fn add_counts(&mut self, other: &ContributionMetrics) {
        self.commit_count = self.commit_count.saturating_add(other.commit_count);
        self.pull_request_count = self
            .pull_request_count
            .saturating_add(other.pull_request_count);
        self.code_volume = self.code_volume.saturating_add(other.code_volume);
        self.repository_count = self.repository_count.saturating_add(other.repository_count);
    }
}

/// How `code_volume` was measured for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolumeBasis {
    /// Commit additions + deletions; repositories without any line stats
    /// fall back to byte counts and are reported as proxied
    LineDeltas,
    /// Language byte counts stand in for changed lines everywhere
    ByteProxy,
}

/// Per-language metrics keyed by the source's language label, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct LanguageMetrics(IndexMap<String, ContributionMetrics>);

impl LanguageMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, language: &str) -> Option<&ContributionMetrics> {
        self.0.get(language)
    }

    pub fn entry_mut(&mut self, language: &str) -> &mut ContributionMetrics {
        self.0.entry(language.to_string()).or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ContributionMetrics)> {
        self.0.iter()
    }

    pub fn languages(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, ContributionMetrics)> for LanguageMetrics {
    fn from_iter<I: IntoIterator<Item = (String, ContributionMetrics)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
