//! Contribution-to-skill scoring.
//!
//! Pure and synchronous over already-fetched data: aggregation of
//! per-repository activity into per-language metrics, bucketed confidence
//! scoring, evidence assembly and catalog matching. Only the optional
//! verifier talks to the network.

pub mod aggregator;
pub mod confidence;
pub mod evidence;
pub mod matcher;
pub mod metrics;
pub mod verifier;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::catalog::{SkillLookup, SkillRecord};
use crate::github::{Commit, LanguageBytes, PullRequest, Repository};

pub use aggregator::{aggregate, AggregateReport, Aggregator};
pub use confidence::ScoreBreakdown;
pub use evidence::{Evidence, EvidenceKind};
pub use matcher::{match_skills, MatchStrategy};
pub use metrics::{ContributionMetrics, LanguageMetrics, VolumeBasis};

/// Everything fetched for one repository
#[derive(Debug, Clone)]
pub struct RepositoryActivity {
    pub repository: Repository,
    pub languages: LanguageBytes,
    pub commits: Vec<Commit>,
    pub pull_requests: Vec<PullRequest>,
}

impl RepositoryActivity {
    /// Activity with nothing fetched; what a fully failed repository degrades to
    pub fn empty(repository: Repository) -> Self {
        Self {
            repository,
            languages: LanguageBytes::new(),
            commits: Vec::new(),
            pull_requests: Vec::new(),
        }
    }
}

/// Result attached by the AI verifier. Never alters base confidence or evidence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Verification {
    pub verified: bool,
    pub confidence: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SkillRecommendation {
    pub skill: SkillRecord,
    /// Source language label this recommendation came from
    pub language: String,
    pub match_strategy: MatchStrategy,
    /// Canonical scale `[0, 1]`
    pub confidence: f64,
    pub score: ScoreBreakdown,
    pub evidence: Vec<Evidence>,
    pub metrics: ContributionMetrics,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification: Option<Verification>,
}

impl SkillRecommendation {
    pub fn confidence_percent(&self) -> u32 {
        confidence::to_percent(self.confidence)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AnalysisOptions {
    pub volume_basis: VolumeBasis,
    /// Reference time for recency; fixed once per run
    pub now: DateTime<Utc>,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            volume_basis: VolumeBasis::ByteProxy,
            now: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Analysis {
    pub aggregate: AggregateReport,
    pub recommendations: Vec<SkillRecommendation>,
}

/// Aggregate, score and match one run's fetched data.
pub fn analyze(
    activities: &[RepositoryActivity],
    catalog: &dyn SkillLookup,
    options: AnalysisOptions,
) -> Analysis {
    let aggregate = aggregate(activities, options.volume_basis, options.now);
    let repositories: Vec<Repository> =
        activities.iter().map(|a| a.repository.clone()).collect();
    let recommendations = match_skills(&aggregate.metrics, &repositories, catalog);
    Analysis {
        aggregate,
        recommendations,
    }
}

/// Ranked recommendations for one run's fetched data.
pub fn run_analysis(
    activities: &[RepositoryActivity],
    catalog: &dyn SkillLookup,
    options: AnalysisOptions,
) -> Vec<SkillRecommendation> {
    analyze(activities, catalog, options).recommendations
}
