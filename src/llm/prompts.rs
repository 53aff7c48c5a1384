// Prompt templates for the AI verifier

use crate::analysis::SkillRecommendation;

pub fn verification_prompt(rec: &SkillRecommendation) -> String {
    let mut evidence = String::new();
    for item in &rec.evidence {
        evidence.push_str("- ");
        evidence.push_str(&item.description);
        if let Some(ref url) = item.url {
            evidence.push_str(&format!(" ({})", url));
        }
        evidence.push('\n');
    }
    if evidence.is_empty() {
        evidence.push_str("- (none)\n");
    }

    format!(
        r#"You are verifying a skill claim derived from a developer's GitHub activity.

Skill: {skill}
Detected from language: {language}
Heuristic confidence: {percent}%

Contribution metrics:
- commits attributed: {commits}
- pull requests attributed: {pulls}
- code volume: {volume}
- repositories: {repos}

Evidence:
{evidence}
Decide whether this evidence supports the developer having practical {skill} skill.
Counts are estimates split across languages by byte share, so judge the overall
picture rather than exact numbers.

Respond with ONLY a JSON object:
{{"verified": true|false, "confidence": <number between 0 and 1>, "reasoning": "<one sentence>"}}"#,
        skill = rec.skill.name,
        language = rec.language,
        percent = rec.confidence_percent(),
        commits = rec.metrics.commit_count,
        pulls = rec.metrics.pull_request_count,
        volume = rec.metrics.code_volume,
        repos = rec.metrics.repository_count,
        evidence = evidence,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::test_support::activity;
    use crate::analysis::{run_analysis, AnalysisOptions};
    use crate::catalog::{SkillCatalog, SkillRecord};

    #[test]
    fn test_prompt_lists_metrics_and_evidence() {
        let catalog = SkillCatalog::from_skills(vec![SkillRecord::new("1", "Python")]);
        let recs = run_analysis(
            &[activity("tool", &[("Python", 10)], 12, 1)],
            &catalog,
            AnalysisOptions::default(),
        );
        let prompt = verification_prompt(&recs[0]);

        assert!(prompt.contains("verifying a skill claim"));
        assert!(prompt.contains("Skill: Python"));
        assert!(prompt.contains("commits attributed: 12"));
        assert!(prompt.contains("- Repository: tool (https://github.com/a/tool)"));
        assert!(prompt.contains("- 12 commits in Python"));
        assert!(prompt.contains(r#"{"verified": true|false"#));
    }
}
