use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::{CatalogSource, SkillRecord};
use crate::error::{SourceError, SourceResult};
use crate::util::truncate_chars;

/// Client for the Topcoder standardized-skills endpoint.
pub struct TopcoderCatalogClient {
    client: Client,
    api_url: String,
}

// Deployed catalog versions disagree on the envelope and on field shapes,
// so every variant seen in the wild deserializes here.

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SkillsEnvelope {
    Wrapped { result: ResultBody },
    Content { content: Vec<SkillPayload> },
    Bare(Vec<SkillPayload>),
}

#[derive(Debug, Deserialize)]
struct ResultBody {
    #[serde(default)]
    content: Vec<SkillPayload>,
}

#[derive(Debug, Deserialize)]
struct SkillPayload {
    id: serde_json::Value,
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    category: Option<CategoryPayload>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CategoryPayload {
    Named { name: String },
    Plain(String),
}

impl SkillsEnvelope {
    fn into_skills(self) -> Vec<SkillPayload> {
        match self {
            SkillsEnvelope::Wrapped { result } => result.content,
            SkillsEnvelope::Content { content } => content,
            SkillsEnvelope::Bare(skills) => skills,
        }
    }
}

impl From<SkillPayload> for SkillRecord {
    fn from(p: SkillPayload) -> Self {
        let id = match p.id {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        };
        Self {
            id,
            name: p.name.trim().to_string(),
            category: p.category.map(|c| match c {
                CategoryPayload::Named { name } => name,
                CategoryPayload::Plain(name) => name,
            }),
            description: p.description,
        }
    }
}

impl TopcoderCatalogClient {
    pub fn new(api_url: String, timeout_secs: u64) -> Result<Self> {
        Ok(Self {
            client: Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                .build()
                .context("failed to build HTTP client")?,
            api_url: api_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl CatalogSource for TopcoderCatalogClient {
    async fn fetch_skills(&self) -> SourceResult<Vec<SkillRecord>> {
        let url = format!("{}/standardized-skills", self.api_url);
        debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .header(ACCEPT, "application/json")
            .header(USER_AGENT, concat!("gitskills/", env!("CARGO_PKG_VERSION")))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Status {
                status: status.as_u16(),
                body: truncate_chars(&body, 300),
            });
        }

        let body = response.text().await?;
        let envelope: SkillsEnvelope = serde_json::from_str(&body)?;
        Ok(envelope
            .into_skills()
            .into_iter()
            .map(SkillRecord::from)
            .filter(|s| !s.name.is_empty())
            .collect())
    }
}
