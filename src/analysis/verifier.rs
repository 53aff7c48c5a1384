//! Optional LLM second opinion on recommendations.
//!
//! The verifier only attaches a [`Verification`]; base confidence and
//! evidence are left exactly as the scorer produced them.

use anyhow::{Context, Result};
use tracing::{debug, warn};

use super::{SkillRecommendation, Verification};
use crate::llm::client::LlmClient;
use crate::llm::prompts;

/// Returned when the model answers but not in the expected shape
const NEUTRAL_CONFIDENCE: f64 = 0.5;

pub struct AiVerifier<'a> {
    client: &'a dyn LlmClient,
}

impl<'a> AiVerifier<'a> {
    pub fn new(client: &'a dyn LlmClient) -> Self {
        Self { client }
    }

    pub async fn verify(&self, recommendation: &SkillRecommendation) -> Result<Verification> {
        let prompt = prompts::verification_prompt(recommendation);
        let response = self
            .client
            .complete(&prompt)
            .await
            .context("verification LLM call failed")?;
        debug!(
            "verifier: {} -> {} bytes",
            recommendation.skill.name,
            response.len()
        );
        Ok(parse_verdict(&response))
    }

    /// Verify each recommendation in order. A failed call leaves that
    /// recommendation unverified and moves on. Returns how many were verified.
    pub async fn verify_all(&self, recommendations: &mut [SkillRecommendation]) -> usize {
        let mut verified = 0;
        for rec in recommendations.iter_mut() {
            match self.verify(rec).await {
                Ok(verification) => {
                    rec.verification = Some(verification);
                    verified += 1;
                }
                Err(e) => warn!("AI verification failed for {}: {:#}", rec.skill.name, e),
            }
        }
        verified
    }
}

/// Parse `{"verified": bool, "confidence": number, "reasoning": string}`.
/// Anything unparseable becomes an unverified neutral verdict.
fn parse_verdict(response: &str) -> Verification {
    let json_str = extract_json_block(response);
    let parsed: serde_json::Value = match serde_json::from_str(&json_str) {
        Ok(v) => v,
        Err(e) => {
            warn!("verifier: failed to parse verdict JSON: {}", e);
            return Verification {
                verified: false,
                confidence: NEUTRAL_CONFIDENCE,
                reasoning: Some("unparseable verifier response".to_string()),
            };
        }
    };

    let verified = parsed
        .get("verified")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);
    let confidence = parsed
        .get("confidence")
        .and_then(|v| v.as_f64())
        // some models answer in percent
        .map(|c| if c > 1.0 { c / 100.0 } else { c })
        .unwrap_or(NEUTRAL_CONFIDENCE)
        .clamp(0.0, 1.0);
    let reasoning = parsed
        .get("reasoning")
        .and_then(|v| v.as_str())
        .map(str::to_string);

    Verification {
        verified,
        confidence,
        reasoning,
    }
}

/// Extract a JSON object from a string that may have markdown fences or preamble text.
fn extract_json_block(text: &str) -> String {
    let trimmed = text.trim();

    if let Some(start) = trimmed.find("```json") {
        if let Some(end) = trimmed[start + 7..].find("```") {
            return trimmed[start + 7..start + 7 + end].trim().to_string();
        }
    }

    if let Some(start) = trimmed.find('{') {
        if let Some(end) = trimmed.rfind('}') {
            if end > start {
                return trimmed[start..=end].to_string();
            }
        }
    }

    trimmed.to_string()
}
