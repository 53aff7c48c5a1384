use serde::{Deserialize, Serialize};
use tracing::debug;

use super::confidence;
use super::evidence::build_evidence;
use super::metrics::LanguageMetrics;
use super::SkillRecommendation;
use crate::catalog::{SkillLookup, SkillRecord};
use crate::github::Repository;

/// How a language label was resolved to a catalog skill
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    /// Case-insensitive name equality
    Exact,
    /// Catalog name contains the language name, case-insensitive
    Substring,
}

/// Two-tier lookup: exact name first, then the first catalog skill (in
/// catalog order) whose name contains the language.
pub fn resolve_skill<'a>(
    language: &str,
    catalog: &'a dyn SkillLookup,
) -> Option<(&'a SkillRecord, MatchStrategy)> {
    let language = language.trim();
    if language.is_empty() {
        return None;
    }

    if let Some(skill) = catalog.find_skill_by_name(language) {
        return Some((skill, MatchStrategy::Exact));
    }

    let needle = language.to_lowercase();
    catalog
        .list_all_skills()
        .iter()
        .find(|s| s.name.to_lowercase().contains(&needle))
        .map(|skill| (skill, MatchStrategy::Substring))
}

/// Join per-language metrics against the catalog and rank the result.
///
/// Ordering is descending confidence; equal confidences keep the
/// language's first-seen order in `metrics`. Languages with no catalog
/// match are dropped, so an empty catalog yields an empty list.
pub fn match_skills(
    metrics: &LanguageMetrics,
    repositories: &[Repository],
    catalog: &dyn SkillLookup,
) -> Vec<SkillRecommendation> {
    let mut recommendations = Vec::new();

    for (language, language_metrics) in metrics.iter() {
        let Some((skill, strategy)) = resolve_skill(language, catalog) else {
            debug!("No catalog skill for language {}", language);
            continue;
        };

        let breakdown = confidence::breakdown(language_metrics);
        recommendations.push(SkillRecommendation {
            skill: skill.clone(),
            language: language.clone(),
            match_strategy: strategy,
            confidence: breakdown.confidence(),
            score: breakdown,
            evidence: build_evidence(language, repositories, language_metrics),
            metrics: *language_metrics,
            verification: None,
        });
    }

    // sort_by is stable, which gives the first-seen tiebreak
    recommendations.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    recommendations
}
