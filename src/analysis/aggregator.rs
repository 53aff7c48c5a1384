//! Language-volume aggregation across repositories.
//!
//! Each repository's commit, pull-request and code-volume totals are split
//! across its languages by byte share, then summed per language label.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;
use tracing::debug;

use super::metrics::{ContributionMetrics, LanguageMetrics, VolumeBasis};
use super::RepositoryActivity;

/// One repository's contribution, split by language.
#[derive(Debug, Clone, PartialEq)]
pub struct RepositoryAllocation {
    pub per_language: IndexMap<String, ContributionMetrics>,
    /// Code volume came from byte counts rather than line stats
    pub used_byte_proxy: bool,
    pub days_since_push: Option<u64>,
}

/// Result of aggregating one run.
#[derive(Debug, Clone, Serialize)]
pub struct AggregateReport {
    pub metrics: LanguageMetrics,
    pub volume_basis: VolumeBasis,
    pub repositories_analyzed: usize,
    /// Repositories whose code volume fell back to byte counts under `LineDeltas`
    pub proxied_repositories: usize,
    pub commits_analyzed: usize,
    pub pull_requests_analyzed: usize,
}

fn scaled(total: u64, share: f64) -> u64 {
    (total as f64 * share).round() as u64
}

/// Proportional count that never rounds a real contribution away
fn scaled_count(total: u64, share: f64) -> u64 {
    let allocated = scaled(total, share);
    if allocated == 0 && total > 0 && share > 0.0 {
        1
    } else {
        allocated
    }
}

/// Split a single repository's activity across its languages.
///
/// Languages with zero bytes and repositories with an empty or zero-byte
/// language map produce no entries.
pub fn allocate_repository(
    activity: &RepositoryActivity,
    basis: VolumeBasis,
    now: DateTime<Utc>,
) -> RepositoryAllocation {
    let days_since_push = activity
        .repository
        .pushed_at
        .map(|pushed| (now - pushed).num_days().max(0) as u64);

    let total_bytes = activity
        .languages
        .values()
        .fold(0u64, |acc, b| acc.saturating_add(*b));
    if total_bytes == 0 {
        return RepositoryAllocation {
            per_language: IndexMap::new(),
            used_byte_proxy: false,
            days_since_push,
        };
    }

    let total_commits = activity.commits.len() as u64;
    let total_pulls = activity.pull_requests.len() as u64;

    let commit_volume = activity
        .commits
        .iter()
        .filter_map(|c| c.stats)
        .fold(0u64, |acc, s| acc.saturating_add(s.total()));
    let pull_volume = activity
        .pull_requests
        .iter()
        .filter_map(|p| p.stats)
        .fold(0u64, |acc, s| acc.saturating_add(s.total()));

    let used_byte_proxy = match basis {
        VolumeBasis::ByteProxy => true,
        VolumeBasis::LineDeltas => commit_volume == 0,
    };

    let mut per_language = IndexMap::new();
    for (language, &bytes) in &activity.languages {
        if bytes == 0 {
            continue;
        }
        let share = bytes as f64 / total_bytes as f64;

        let commit_share_volume = if used_byte_proxy {
            bytes
        } else {
            scaled(commit_volume, share)
        };

        per_language.insert(
            language.clone(),
            ContributionMetrics {
                commit_count: scaled_count(total_commits, share),
                pull_request_count: scaled_count(total_pulls, share),
                code_volume: commit_share_volume.saturating_add(scaled(pull_volume, share)),
                repository_count: 1,
                days_since_last_activity: days_since_push.unwrap_or(0),
            },
        );
    }

    RepositoryAllocation {
        per_language,
        used_byte_proxy,
        days_since_push,
    }
}

/// Accumulates repositories one at a time, in processing order.
#[derive(Debug)]
pub struct Aggregator {
    basis: VolumeBasis,
    now: DateTime<Utc>,
    metrics: LanguageMetrics,
    // most recent activity per language; absent when no repository had a timestamp
    recency: IndexMap<String, u64>,
    repositories: usize,
    proxied: usize,
    commits: usize,
    pull_requests: usize,
}

impl Aggregator {
    pub fn new(basis: VolumeBasis, now: DateTime<Utc>) -> Self {
        Self {
            basis,
            now,
            metrics: LanguageMetrics::new(),
            recency: IndexMap::new(),
            repositories: 0,
            proxied: 0,
            commits: 0,
            pull_requests: 0,
        }
    }

    pub fn add_repository(&mut self, activity: &RepositoryActivity) {
        self.repositories += 1;
        self.commits += activity.commits.len();
        self.pull_requests += activity.pull_requests.len();

        let allocation = allocate_repository(activity, self.basis, self.now);
        if allocation.per_language.is_empty() {
            debug!(
                "{}: no language bytes, contributes nothing",
                activity.repository.full_name
            );
            return;
        }
        if allocation.used_byte_proxy && self.basis == VolumeBasis::LineDeltas {
            debug!(
                "{}: no commit line stats, using byte counts for code volume",
                activity.repository.full_name
            );
            self.proxied += 1;
        }

        for (language, metrics) in &allocation.per_language {
            self.metrics.entry_mut(language).add_counts(metrics);
            if let Some(days) = allocation.days_since_push {
                self.recency
                    .entry(language.clone())
                    .and_modify(|d| *d = (*d).min(days))
                    .or_insert(days);
            }
        }
    }

    pub fn finish(mut self) -> AggregateReport {
        for (language, days) in &self.recency {
            self.metrics.entry_mut(language).days_since_last_activity = *days;
        }
        AggregateReport {
            metrics: self.metrics,
            volume_basis: self.basis,
            repositories_analyzed: self.repositories,
            proxied_repositories: self.proxied,
            commits_analyzed: self.commits,
            pull_requests_analyzed: self.pull_requests,
        }
    }
}

/// Aggregate a whole run in order.
pub fn aggregate(
    activities: &[RepositoryActivity],
    basis: VolumeBasis,
    now: DateTime<Utc>,
) -> AggregateReport {
    let mut aggregator = Aggregator::new(basis, now);
    for activity in activities {
        aggregator.add_repository(activity);
    }
    aggregator.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::test_support::{activity, commits_with_stats, languages};
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_typescript_javascript_split() {
        let repo = activity("x", &[("TypeScript", 800), ("JavaScript", 200)], 10, 2);
        let allocation = allocate_repository(&repo, VolumeBasis::ByteProxy, now());

        let ts = allocation.per_language["TypeScript"];
        let js = allocation.per_language["JavaScript"];
        assert_eq!(ts.commit_count, 8);
        assert_eq!(js.commit_count, 2);
        assert_eq!(ts.commit_count + js.commit_count, 10);
        // round(1.6) = 2, round(0.4) = 0 floored to 1
        assert_eq!(ts.pull_request_count, 2);
        assert_eq!(js.pull_request_count, 1);
        assert_eq!(ts.code_volume, 800);
        assert_eq!(js.code_volume, 200);
        assert_eq!(ts.repository_count, 1);
        assert!(allocation.used_byte_proxy);
    }

    #[test]
    fn test_single_language_gets_everything() {
        let repo = activity("x", &[("Rust", 12345)], 7, 3);
        let allocation = allocate_repository(&repo, VolumeBasis::ByteProxy, now());
        let rust = allocation.per_language["Rust"];
        assert_eq!(rust.commit_count, 7);
        assert_eq!(rust.pull_request_count, 3);
        assert_eq!(rust.code_volume, 12345);
    }

    #[test]
    fn test_empty_language_map_contributes_nothing() {
        let repo = activity("x", &[], 10, 2);
        let report = aggregate(&[repo], VolumeBasis::ByteProxy, now());
        assert!(report.metrics.is_empty());
        assert_eq!(report.repositories_analyzed, 1);
        assert_eq!(report.commits_analyzed, 10);
    }

    #[test]
    fn test_zero_byte_languages_are_skipped() {
        let zero_total = activity("x", &[("C", 0), ("Shell", 0)], 4, 0);
        assert!(allocate_repository(&zero_total, VolumeBasis::ByteProxy, now())
            .per_language
            .is_empty());

        let partial = activity("y", &[("C", 0), ("Go", 10)], 4, 0);
        let allocation = allocate_repository(&partial, VolumeBasis::ByteProxy, now());
        assert_eq!(allocation.per_language.len(), 1);
        assert_eq!(allocation.per_language["Go"].commit_count, 4);
    }

    #[test]
    fn test_no_commits_means_no_floor() {
        let repo = activity("x", &[("Go", 99), ("Makefile", 1)], 0, 0);
        let allocation = allocate_repository(&repo, VolumeBasis::ByteProxy, now());
        assert_eq!(allocation.per_language["Makefile"].commit_count, 0);
        assert_eq!(allocation.per_language["Makefile"].pull_request_count, 0);
        // still counted as a repository for the language
        assert_eq!(allocation.per_language["Makefile"].repository_count, 1);
    }

    #[test]
    fn test_line_deltas_use_commit_stats() {
        let mut repo = activity("x", &[("Python", 750), ("HTML", 250)], 0, 0);
        repo.commits = commits_with_stats(&[(30, 10), (50, 10)]);
        let allocation = allocate_repository(&repo, VolumeBasis::LineDeltas, now());

        assert!(!allocation.used_byte_proxy);
        assert_eq!(allocation.per_language["Python"].code_volume, 75);
        assert_eq!(allocation.per_language["HTML"].code_volume, 25);
        assert_eq!(allocation.per_language["Python"].commit_count, 2);
        assert_eq!(allocation.per_language["HTML"].commit_count, 1);
    }

    #[test]
    fn test_line_deltas_fall_back_to_bytes_without_stats() {
        let with_stats = {
            let mut a = activity("x", &[("Python", 100)], 0, 0);
            a.commits = commits_with_stats(&[(5, 5)]);
            a
        };
        let without_stats = activity("y", &[("Python", 400)], 3, 0);

        let report = aggregate(
            &[with_stats, without_stats],
            VolumeBasis::LineDeltas,
            now(),
        );
        assert_eq!(report.proxied_repositories, 1);
        assert_eq!(report.metrics.get("Python").unwrap().code_volume, 10 + 400);
    }

    #[test]
    fn test_pull_request_volume_is_added_by_share() {
        let mut repo = activity("x", &[("Go", 500), ("Shell", 500)], 0, 2);
        repo.pull_requests[0].stats = Some(crate::github::LineStats::new(100, 20));
        let allocation = allocate_repository(&repo, VolumeBasis::ByteProxy, now());
        assert_eq!(allocation.per_language["Go"].code_volume, 500 + 60);
        assert_eq!(allocation.per_language["Go"].pull_request_count, 1);
    }

    #[test]
    fn test_merge_sums_across_repositories() {
        let a = activity("a", &[("Rust", 100)], 10, 1);
        let b = activity("b", &[("Rust", 50), ("Python", 50)], 4, 0);
        let report = aggregate(&[a, b], VolumeBasis::ByteProxy, now());

        let rust = report.metrics.get("Rust").unwrap();
        assert_eq!(rust.commit_count, 12);
        assert_eq!(rust.pull_request_count, 1);
        assert_eq!(rust.code_volume, 150);
        assert_eq!(rust.repository_count, 2);
        assert_eq!(report.metrics.get("Python").unwrap().repository_count, 1);
        let order: Vec<&str> = report.metrics.languages().collect();
        assert_eq!(order, vec!["Rust", "Python"]);
    }

    #[test]
    fn test_language_labels_are_case_sensitive() {
        let a = activity("a", &[("Vue", 100)], 2, 0);
        let b = activity("b", &[("vue", 100)], 2, 0);
        let report = aggregate(&[a, b], VolumeBasis::ByteProxy, now());
        assert_eq!(report.metrics.len(), 2);
    }

    #[test]
    fn test_single_repository_idempotence() {
        let repo = activity("x", &[("TypeScript", 800), ("JavaScript", 200)], 10, 2);
        let allocation = allocate_repository(&repo, VolumeBasis::ByteProxy, now());
        let report = aggregate(std::slice::from_ref(&repo), VolumeBasis::ByteProxy, now());

        for (language, metrics) in &allocation.per_language {
            assert_eq!(report.metrics.get(language), Some(metrics));
        }
        assert_eq!(report.metrics.len(), allocation.per_language.len());
    }

    #[test]
    fn test_recency_is_most_recent_push() {
        let mut old = activity("old", &[("Java", 10)], 1, 0);
        old.repository.pushed_at = Some(now() - Duration::days(400));
        let mut fresh = activity("fresh", &[("Java", 10), ("Kotlin", 10)], 1, 0);
        fresh.repository.pushed_at = Some(now() - Duration::days(30));
        let undated = activity("undated", &[("Groovy", 10)], 1, 0);

        let report = aggregate(&[old, fresh, undated], VolumeBasis::ByteProxy, now());
        assert_eq!(report.metrics.get("Java").unwrap().days_since_last_activity, 30);
        assert_eq!(report.metrics.get("Kotlin").unwrap().days_since_last_activity, 30);
        assert_eq!(report.metrics.get("Groovy").unwrap().days_since_last_activity, 0);
    }

    #[test]
    fn test_future_push_clamps_to_zero_days() {
        let mut repo = activity("x", &[("Go", 1)], 1, 0);
        repo.repository.pushed_at = Some(now() + Duration::days(3));
        let allocation = allocate_repository(&repo, VolumeBasis::ByteProxy, now());
        assert_eq!(allocation.days_since_push, Some(0));
    }

    #[test]
    fn test_allocation_sum_within_tolerance() {
        let langs = languages(&[("A", 333), ("B", 333), ("C", 334)]);
        for commits in 0..40u64 {
            let mut repo = activity("x", &[], commits as usize, 0);
            repo.languages = langs.clone();
            let allocation = allocate_repository(&repo, VolumeBasis::ByteProxy, now());
            let sum: u64 = allocation.per_language.values().map(|m| m.commit_count).sum();
            let tolerance = (allocation.per_language.len() - 1) as u64;
            assert!(
                sum.abs_diff(commits) <= tolerance,
                "commits={} sum={}",
                commits,
                sum
            );
        }
    }
}
