//! Bucketed confidence scoring.
//!
//! Each metric earns a fixed number of points from a step table; recency
//! subtracts a small penalty. The point total is normalized against the
//! best achievable score, so fully saturated metrics give exactly 1.0.

use serde::Serialize;

use super::metrics::ContributionMetrics;

/// (threshold, points), highest threshold first
const COMMIT_BUCKETS: &[(u64, u32)] = &[(100, 40), (50, 30), (20, 20), (5, 10)];
const PULL_REQUEST_BUCKETS: &[(u64, u32)] = &[(20, 25), (10, 20), (5, 15), (1, 10)];
const VOLUME_BUCKETS: &[(u64, u32)] = &[(10_000, 20), (5_000, 15), (1_000, 10), (100, 5)];
const REPOSITORY_BUCKETS: &[(u64, u32)] = &[(10, 10), (5, 7), (2, 5), (1, 3)];

/// (days strictly greater than, penalty)
const RECENCY_PENALTIES: &[(u64, u32)] = &[(365, 5), (180, 3), (90, 1)];

/// Sum of the top bucket of every table
pub const MAX_POINTS: u32 = 40 + 25 + 20 + 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScoreBreakdown {
    pub commits: u32,
    pub pull_requests: u32,
    pub code_volume: u32,
    pub repositories: u32,
    pub recency_penalty: u32,
}

impl ScoreBreakdown {
    /// Points after the penalty, clamped to `0..=MAX_POINTS`
    pub fn points(&self) -> u32 {
        let earned = self.commits + self.pull_requests + self.code_volume + self.repositories;
        earned.saturating_sub(self.recency_penalty).min(MAX_POINTS)
    }

    pub fn confidence(&self) -> f64 {
        (self.points() as f64 / MAX_POINTS as f64).clamp(0.0, 1.0)
    }
}

fn bucket(value: u64, table: &[(u64, u32)]) -> u32 {
    table
        .iter()
        .find(|(threshold, _)| value >= *threshold)
        .map(|(_, points)| *points)
        .unwrap_or(0)
}

fn recency_penalty(days: u64) -> u32 {
    RECENCY_PENALTIES
        .iter()
        .find(|(limit, _)| days > *limit)
        .map(|(_, penalty)| *penalty)
        .unwrap_or(0)
}

pub fn breakdown(metrics: &ContributionMetrics) -> ScoreBreakdown {
    ScoreBreakdown {
        commits: bucket(metrics.commit_count, COMMIT_BUCKETS),
        pull_requests: bucket(metrics.pull_request_count, PULL_REQUEST_BUCKETS),
        code_volume: bucket(metrics.code_volume, VOLUME_BUCKETS),
        repositories: bucket(metrics.repository_count, REPOSITORY_BUCKETS),
        recency_penalty: recency_penalty(metrics.days_since_last_activity),
    }
}

/// Confidence in `[0, 1]`. Deterministic in its input.
pub fn score(metrics: &ContributionMetrics) -> f64 {
    breakdown(metrics).confidence()
}

/// Presentation form: whole percent
pub fn to_percent(confidence: f64) -> u32 {
    (confidence.clamp(0.0, 1.0) * 100.0).round() as u32
}
