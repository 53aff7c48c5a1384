use anyhow::Result;
use chrono::Utc;
use std::time::Instant;
use tracing::{info, warn};

use crate::analysis::verifier::AiVerifier;
use crate::analysis::{analyze, Analysis, AnalysisOptions, VolumeBasis};
use crate::catalog::{CatalogSource, SkillCatalog, TopcoderCatalogClient};
use crate::cli::report::{self, RunSummary};
use crate::config::Config;
use crate::github::{GitHubClient, SourceClient};
use crate::llm::client::LlmClient;
use crate::llm::factory;
use crate::pipeline::Collector;

#[allow(clippy::too_many_arguments)]
pub async fn run(
    user: Option<String>,
    config_path: Option<String>,
    max_repos_override: Option<usize>,
    ai: bool,
    include_forks: bool,
    json: bool,
    top: usize,
    dry_run: bool,
) -> Result<()> {
    if let Some(ref cfg) = config_path {
        info!("Config: {}", cfg);
    }

    let mut config = Config::load_with_path(config_path)?;
    apply_overrides(&mut config, max_repos_override, ai, include_forks);

    // A missing token is the one fatal configuration error
    let token = config.get_github_token()?;
    let github = GitHubClient::new(
        config.github.api_base_url.clone(),
        token,
        config.github.timeout_secs,
        config.github.rate_limit_floor,
    )?;
    let catalog_client =
        TopcoderCatalogClient::new(config.catalog.api_url.clone(), config.catalog.timeout_secs)?;
    let llm_client = verification_client(&config, dry_run)?;

    let (analysis, summary) = analyze_user(
        &config,
        &github,
        &catalog_client,
        llm_client.as_deref(),
        user.as_deref(),
    )
    .await?;

    if json {
        println!("{}", report::render_json(&analysis, &summary, top)?);
    } else {
        print!("{}", report::render_text(&analysis, &summary, top));
    }

    Ok(())
}

/// CLI flags win over file and environment settings
pub(crate) fn apply_overrides(
    config: &mut Config,
    max_repos: Option<usize>,
    ai: bool,
    include_forks: bool,
) {
    if let Some(max_repos) = max_repos {
        info!("CLI override: max_repos = {}", max_repos);
        config.github.max_repos = max_repos;
    }
    if ai {
        info!("CLI override: AI verification enabled");
        config.verification.enabled = true;
    }
    if include_forks {
        info!("CLI override: include_forks = true");
        config.github.include_forks = true;
    }
}

/// Build the verifier's LLM client. A missing API key turns verification
/// off with a warning; an unknown provider is an error.
fn verification_client(config: &Config, dry_run: bool) -> Result<Option<Box<dyn LlmClient>>> {
    if !config.verification.enabled {
        return Ok(None);
    }
    if dry_run {
        info!("Dry run: using mock LLM client for verification");
        return Ok(Some(factory::create_client(config, true)?));
    }
    if let Err(e) = config.get_llm_api_key() {
        warn!("{}; AI verification disabled", e);
        return Ok(None);
    }
    Ok(Some(factory::create_client(config, false)?))
}

/// Collect, score, match and optionally verify one user's activity.
pub async fn analyze_user(
    config: &Config,
    source: &dyn SourceClient,
    catalog_source: &dyn CatalogSource,
    llm_client: Option<&dyn LlmClient>,
    user: Option<&str>,
) -> Result<(Analysis, RunSummary)> {
    let started = Instant::now();
    // Recency is measured against one instant for the whole run
    let now = Utc::now();

    let collected = Collector::new(source, &config.github).collect(user).await?;
    let catalog = SkillCatalog::load(catalog_source, config.catalog.use_builtin_fallback).await;

    let volume_basis = if config.github.fetch_commit_stats {
        VolumeBasis::LineDeltas
    } else {
        VolumeBasis::ByteProxy
    };
    let mut analysis = analyze(
        &collected.activities,
        &catalog,
        AnalysisOptions { volume_basis, now },
    );
    info!(
        "Identified {} skills for {}",
        analysis.recommendations.len(),
        collected.login
    );

    let verified = match llm_client {
        Some(client) if !analysis.recommendations.is_empty() => {
            info!(
                "Verifying {} recommendations with AI",
                analysis.recommendations.len()
            );
            AiVerifier::new(client)
                .verify_all(&mut analysis.recommendations)
                .await
        }
        _ => 0,
    };

    let summary = RunSummary {
        user: collected.login,
        repositories_found: collected.repositories_found,
        repositories_analyzed: analysis.aggregate.repositories_analyzed,
        commits_analyzed: analysis.aggregate.commits_analyzed,
        pull_requests_analyzed: analysis.aggregate.pull_requests_analyzed,
        volume_basis: analysis.aggregate.volume_basis,
        proxied_repositories: analysis.aggregate.proxied_repositories,
        catalog_origin: catalog.origin(),
        catalog_skills: catalog.len(),
        skills_identified: analysis.recommendations.len(),
        verified,
        api_calls: source.api_calls(),
        rate_limit_remaining: source.rate_limit_remaining(),
        elapsed_secs: started.elapsed().as_secs_f64(),
    };

    Ok((analysis, summary))
}
