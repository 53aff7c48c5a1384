//! End-to-end runs against mock GitHub and catalog servers.

use gitskills::catalog::{CatalogOrigin, TopcoderCatalogClient};
use gitskills::cli::analyze::analyze_user;
use gitskills::cli::report;
use gitskills::config::Config;
use gitskills::github::GitHubClient;
use gitskills::llm::client::{LlmClient, MockLlmClient};
use gitskills::util::SecretString;
use mockito::{Matcher, Mock, ServerGuard};
use serde_json::json;

// ============================================================================
// Test Utilities
// ============================================================================

fn repo_json(name: &str, language: &str, fork: bool) -> serde_json::Value {
    json!({
        "name": name,
        "full_name": format!("mona/{}", name),
        "owner": {"login": "mona"},
        "html_url": format!("https://github.com/mona/{}", name),
        "description": null,
        "language": language,
        "fork": fork,
        "stargazers_count": 12,
        "forks_count": 2,
        "pushed_at": "2024-11-20T08:00:00Z"
    })
}

fn commits_json(n: usize) -> serde_json::Value {
    let commits: Vec<serde_json::Value> = (0..n)
        .map(|i| {
            json!({
                "sha": format!("sha{}", i),
                "html_url": format!("https://github.com/mona/engine/commit/sha{}", i),
                "commit": {
                    "message": "work",
                    "author": {"name": "Mona", "date": "2024-11-19T08:00:00Z"}
                }
            })
        })
        .collect();
    json!(commits)
}

async fn github_json(
    server: &mut ServerGuard,
    path: &str,
    body: serde_json::Value,
    paginated: bool,
) -> Mock {
    let mut mock = server
        .mock("GET", path)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_header("x-ratelimit-remaining", "4990")
        .with_header("x-ratelimit-reset", "1900000000")
        .with_body(body.to_string());
    if paginated {
        mock = mock.match_query(Matcher::Any);
    }
    mock.create_async().await
}

/// Token owner "mona" with one own repository and one fork
async fn mock_github(server: &mut ServerGuard) {
    github_json(
        server,
        "/user",
        json!({"login": "mona", "name": "Mona Lisa", "public_repos": 2}),
        false,
    )
    .await;
    github_json(
        server,
        "/user/repos",
        json!([repo_json("engine", "Rust", false), repo_json("upstream", "Go", true)]),
        true,
    )
    .await;
    github_json(
        server,
        "/repos/mona/engine/commits",
        commits_json(24),
        true,
    )
    .await;
    github_json(
        server,
        "/repos/mona/engine/pulls",
        json!([{
            "number": 7,
            "title": "Add parser",
            "state": "closed",
            "html_url": "https://github.com/mona/engine/pull/7",
            "user": {"login": "mona"},
            "merged_at": "2024-11-18T08:00:00Z"
        }]),
        true,
    )
    .await;
}

async fn mock_catalog(server: &mut ServerGuard) -> Mock {
    server
        .mock("GET", "/v5/standardized-skills")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({"result": {"content": [
                {"id": "s-rust", "name": "Rust"},
                {"id": "s-shell", "name": "Bash Shell Scripting"},
                {"id": "s-go", "name": "Go"}
            ]}})
            .to_string(),
        )
        .create_async()
        .await
}

fn config_for(github: &ServerGuard, catalog: &ServerGuard) -> Config {
    let mut config = Config::default();
    config.github.api_base_url = github.url();
    config.catalog.api_url = format!("{}/v5", catalog.url());
    config
}

fn clients(config: &Config) -> (GitHubClient, TopcoderCatalogClient) {
    let github = GitHubClient::new(
        config.github.api_base_url.clone(),
        SecretString::new("ghp_test".to_string()),
        5,
        config.github.rate_limit_floor,
    )
    .unwrap();
    let catalog = TopcoderCatalogClient::new(config.catalog.api_url.clone(), 5).unwrap();
    (github, catalog)
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_full_run_for_token_owner() {
    let mut github_server = mockito::Server::new_async().await;
    let mut catalog_server = mockito::Server::new_async().await;
    mock_github(&mut github_server).await;
    github_json(
        &mut github_server,
        "/repos/mona/engine/languages",
        json!({"Rust": 9000, "Shell": 1000}),
        false,
    )
    .await;
    let catalog_mock = mock_catalog(&mut catalog_server).await;

    let config = config_for(&github_server, &catalog_server);
    let (github, catalog) = clients(&config);
    let (analysis, summary) = analyze_user(&config, &github, &catalog, None, None)
        .await
        .unwrap();
    catalog_mock.assert_async().await;

    assert_eq!(summary.user, "mona");
    assert_eq!(summary.repositories_found, 2);
    assert_eq!(summary.repositories_analyzed, 1, "fork is skipped");
    assert_eq!(summary.commits_analyzed, 24);
    assert_eq!(summary.pull_requests_analyzed, 1);
    assert_eq!(summary.catalog_origin, CatalogOrigin::Remote);
    // user, repos, languages, commits, pulls
    assert_eq!(summary.api_calls, 5);
    assert_eq!(summary.rate_limit_remaining, Some(4990));

    let recs = &analysis.recommendations;
    assert_eq!(recs.len(), 2);
    assert_eq!(recs[0].skill.id, "s-rust");
    assert_eq!(recs[0].metrics.commit_count, 22);
    assert_eq!(recs[0].metrics.code_volume, 9000);
    assert_eq!(recs[0].evidence[0].description, "Repository: engine");
    assert_eq!(
        recs[0].evidence[0].url.as_deref(),
        Some("https://github.com/mona/engine")
    );
    assert_eq!(recs[1].skill.id, "s-shell");
    assert_eq!(recs[1].metrics.commit_count, 2);
    assert!(recs.iter().all(|r| r.verification.is_none()));
}

#[tokio::test]
async fn test_verification_attaches_without_changing_scores() {
    let mut github_server = mockito::Server::new_async().await;
    let mut catalog_server = mockito::Server::new_async().await;
    mock_github(&mut github_server).await;
    github_json(
        &mut github_server,
        "/repos/mona/engine/languages",
        json!({"Rust": 9000, "Shell": 1000}),
        false,
    )
    .await;
    mock_catalog(&mut catalog_server).await;

    let config = config_for(&github_server, &catalog_server);
    let (github, catalog) = clients(&config);
    let unverified = analyze_user(&config, &github, &catalog, None, None)
        .await
        .unwrap()
        .0;

    let llm = MockLlmClient::new();
    let (verified, summary) = analyze_user(
        &config,
        &github,
        &catalog,
        Some(&llm as &dyn LlmClient),
        None,
    )
    .await
    .unwrap();

    assert_eq!(summary.verified, 2);
    for (before, after) in unverified
        .recommendations
        .iter()
        .zip(&verified.recommendations)
    {
        assert_eq!(before.confidence, after.confidence);
        assert_eq!(before.evidence, after.evidence);
        let verification = after.verification.as_ref().unwrap();
        assert!(verification.verified);
    }

    let json = report::render_json(&verified, &summary, 15).unwrap();
    assert!(json.contains("\"verification\""));
}

#[tokio::test]
async fn test_source_failures_degrade_instead_of_failing() {
    let mut github_server = mockito::Server::new_async().await;
    let mut catalog_server = mockito::Server::new_async().await;
    mock_github(&mut github_server).await;
    github_server
        .mock("GET", "/repos/mona/engine/languages")
        .with_status(500)
        .with_body("internal error")
        .create_async()
        .await;
    catalog_server
        .mock("GET", "/v5/standardized-skills")
        .with_status(503)
        .create_async()
        .await;

    let config = config_for(&github_server, &catalog_server);
    let (github, catalog) = clients(&config);
    let (analysis, summary) = analyze_user(&config, &github, &catalog, None, None)
        .await
        .unwrap();

    assert!(analysis.recommendations.is_empty());
    assert_eq!(summary.repositories_analyzed, 1);
    assert_eq!(summary.commits_analyzed, 24);
    assert_eq!(summary.catalog_origin, CatalogOrigin::Empty);
    assert_eq!(summary.catalog_skills, 0);
}

#[tokio::test]
async fn test_builtin_catalog_fallback_for_explicit_user() {
    let mut github_server = mockito::Server::new_async().await;
    let mut catalog_server = mockito::Server::new_async().await;
    github_json(
        &mut github_server,
        "/users/octocat/repos",
        json!([repo_json("engine", "Rust", false)]),
        true,
    )
    .await;
    github_json(
        &mut github_server,
        "/repos/mona/engine/languages",
        json!({"Rust": 400}),
        false,
    )
    .await;
    github_json(&mut github_server, "/repos/mona/engine/commits", json!([]), true).await;
    github_json(&mut github_server, "/repos/mona/engine/pulls", json!([]), true).await;
    catalog_server
        .mock("GET", "/v5/standardized-skills")
        .with_status(500)
        .create_async()
        .await;

    let mut config = config_for(&github_server, &catalog_server);
    config.catalog.use_builtin_fallback = true;
    let (github, catalog) = clients(&config);
    let (analysis, summary) = analyze_user(&config, &github, &catalog, None, Some("octocat"))
        .await
        .unwrap();

    assert_eq!(summary.user, "octocat");
    assert_eq!(summary.catalog_origin, CatalogOrigin::BuiltinFallback);
    assert_eq!(analysis.recommendations.len(), 1);
    assert_eq!(analysis.recommendations[0].skill.id, "builtin:rust");
    // no commits: only the repository entry
    assert_eq!(analysis.recommendations[0].evidence.len(), 1);
}
