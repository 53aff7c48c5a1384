//! Terminal and JSON rendering of an analysis run.

use anyhow::{Context, Result};
use serde::Serialize;
use std::fmt::Write as _;

use crate::analysis::{Analysis, SkillRecommendation, VolumeBasis};
use crate::catalog::CatalogOrigin;

/// Run-level facts printed after the recommendations
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub user: String,
    pub repositories_found: usize,
    pub repositories_analyzed: usize,
    pub commits_analyzed: usize,
    pub pull_requests_analyzed: usize,
    pub volume_basis: VolumeBasis,
    pub proxied_repositories: usize,
    pub catalog_origin: CatalogOrigin,
    pub catalog_skills: usize,
    pub skills_identified: usize,
    pub verified: usize,
    pub api_calls: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate_limit_remaining: Option<u32>,
    pub elapsed_secs: f64,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    summary: &'a RunSummary,
    recommendations: &'a [SkillRecommendation],
}

fn top(analysis: &Analysis, n: usize) -> &[SkillRecommendation] {
    let shown = n.min(analysis.recommendations.len());
    &analysis.recommendations[..shown]
}

pub fn render_json(analysis: &Analysis, summary: &RunSummary, top_n: usize) -> Result<String> {
    let report = JsonReport {
        summary,
        recommendations: top(analysis, top_n),
    };
    serde_json::to_string_pretty(&report).context("failed to serialize report")
}

pub fn render_text(analysis: &Analysis, summary: &RunSummary, top_n: usize) -> String {
    let mut out = String::new();
    let shown = top(analysis, top_n);

    let _ = writeln!(out, "Skill recommendations for {}", summary.user);
    let _ = writeln!(out);

    if shown.is_empty() {
        let _ = writeln!(out, "  No skills identified.");
    }

    for (i, rec) in shown.iter().enumerate() {
        let _ = writeln!(
            out,
            "{:>2}. {} ({}%)",
            i + 1,
            rec.skill.name,
            rec.confidence_percent()
        );
        if !rec.language.eq_ignore_ascii_case(&rec.skill.name) {
            let _ = writeln!(out, "    from language: {}", rec.language);
        }
        let _ = writeln!(
            out,
            "    commits: {}, pull requests: {}, code volume: {}, repositories: {}",
            rec.metrics.commit_count,
            rec.metrics.pull_request_count,
            rec.metrics.code_volume,
            rec.metrics.repository_count
        );
        for evidence in &rec.evidence {
            match evidence.url {
                Some(ref url) => {
                    let _ = writeln!(out, "    - {} ({})", evidence.description, url);
                }
                None => {
                    let _ = writeln!(out, "    - {}", evidence.description);
                }
            }
        }
        if let Some(ref v) = rec.verification {
            let verdict = if v.verified { "verified" } else { "not verified" };
            let _ = write!(
                out,
                "    AI: {} ({}%)",
                verdict,
                (v.confidence * 100.0).round() as u32
            );
            match v.reasoning {
                Some(ref reason) => {
                    let _ = writeln!(out, ": {}", reason);
                }
                None => {
                    let _ = writeln!(out);
                }
            }
        }
    }

    if analysis.recommendations.len() > shown.len() {
        let _ = writeln!(
            out,
            "    ... and {} more",
            analysis.recommendations.len() - shown.len()
        );
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "Summary");
    let _ = writeln!(out, "  User: {}", summary.user);
    let _ = writeln!(
        out,
        "  Repositories: {} analyzed of {} found",
        summary.repositories_analyzed, summary.repositories_found
    );
    let _ = writeln!(
        out,
        "  Commits: {}, pull requests: {}",
        summary.commits_analyzed, summary.pull_requests_analyzed
    );
    match summary.volume_basis {
        VolumeBasis::ByteProxy => {
            let _ = writeln!(out, "  Code volume: language byte counts");
        }
        VolumeBasis::LineDeltas => {
            let _ = writeln!(
                out,
                "  Code volume: changed lines ({} repositories fell back to byte counts)",
                summary.proxied_repositories
            );
        }
    }
    let origin = match summary.catalog_origin {
        CatalogOrigin::Remote => "remote",
        CatalogOrigin::BuiltinFallback => "built-in fallback",
        CatalogOrigin::Empty => "unavailable",
    };
    let _ = writeln!(
        out,
        "  Catalog: {} skills ({})",
        summary.catalog_skills, origin
    );
    let _ = writeln!(out, "  Skills identified: {}", summary.skills_identified);
    if summary.verified > 0 {
        let _ = writeln!(out, "  AI verified: {}", summary.verified);
    }
    match summary.rate_limit_remaining {
        Some(remaining) => {
            let _ = writeln!(
                out,
                "  API calls: {} ({} remaining)",
                summary.api_calls, remaining
            );
        }
        None => {
            let _ = writeln!(out, "  API calls: {}", summary.api_calls);
        }
    }
    let _ = writeln!(out, "  Time: {:.1}s", summary.elapsed_secs);

    out
}
