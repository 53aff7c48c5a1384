use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::util::SecretString;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub github: GitHubConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub verification: VerificationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubConfig {
    #[serde(default = "default_github_api")]
    pub api_base_url: String,

    /// Environment variable holding the personal access token
    #[serde(default = "default_token_env")]
    pub token_env: String,

    /// Repositories analyzed per run, after fork filtering
    #[serde(default = "default_max_repos")]
    pub max_repos: usize,

    #[serde(default = "default_max_commits")]
    pub max_commits_per_repo: usize,

    #[serde(default = "default_max_prs")]
    pub max_pull_requests_per_repo: usize,

    #[serde(default)]
    pub include_forks: bool,

    /// Fetch each commit individually to get additions/deletions.
    /// Costs one extra API call per commit; when off, code volume is
    /// approximated by language byte counts.
    #[serde(default)]
    pub fetch_commit_stats: bool,

    /// Fetch each pull request individually to get additions/deletions
    #[serde(default)]
    pub fetch_pull_request_stats: bool,

    #[serde(default = "default_github_timeout")]
    pub timeout_secs: u64,

    /// Wait for the quota window to reset once remaining calls drop to this value
    #[serde(default = "default_rate_limit_floor")]
    pub rate_limit_floor: u32,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_github_api(),
            token_env: default_token_env(),
            max_repos: default_max_repos(),
            max_commits_per_repo: default_max_commits(),
            max_pull_requests_per_repo: default_max_prs(),
            include_forks: false,
            fetch_commit_stats: false,
            fetch_pull_request_stats: false,
            timeout_secs: default_github_timeout(),
            rate_limit_floor: default_rate_limit_floor(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default = "default_catalog_api")]
    pub api_url: String,

    #[serde(default = "default_catalog_timeout")]
    pub timeout_secs: u64,

    /// Use the built-in list of common languages when the catalog is unreachable
    #[serde(default)]
    pub use_builtin_fallback: bool,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            api_url: default_catalog_api(),
            timeout_secs: default_catalog_timeout(),
            use_builtin_fallback: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub provider: String,
    pub model: String,
    pub api_key_env: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>, // For OpenAI-compatible APIs

    /// Optional: Override max_tokens for verification requests.
    /// Verdicts are short, so provider defaults are small.
    #[serde(default)]
    pub max_tokens: Option<u32>,

    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
}

impl LlmConfig {
    /// Get max_tokens value, using provider-specific default if not specified
    pub fn get_max_tokens(&self) -> u32 {
        if let Some(tokens) = self.max_tokens {
            return tokens;
        }

        match self.provider.as_str() {
            "anthropic" => 1024,
            "openai" => 1024,
            "openai-compatible" => 2048, // local models tend to ramble before the JSON
            _ => 1024,
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key_env: Some("OPENAI_API_KEY".to_string()),
            base_url: None,
            max_tokens: None,
            timeout_secs: default_llm_timeout(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VerificationConfig {
    /// Run the AI verifier over recommendations (also enabled by `--ai` or AI_ENABLED=true)
    #[serde(default)]
    pub enabled: bool,
}

fn default_github_api() -> String {
    "https://api.github.com".to_string()
}

fn default_token_env() -> String {
    "GITHUB_TOKEN".to_string()
}

fn default_max_repos() -> usize {
    20
}

fn default_max_commits() -> usize {
    50
}

fn default_max_prs() -> usize {
    30
}

fn default_github_timeout() -> u64 {
    30
}

fn default_rate_limit_floor() -> u32 {
    1
}

fn default_catalog_api() -> String {
    "https://api.topcoder-dev.com/v5".to_string()
}

fn default_catalog_timeout() -> u64 {
    10
}

fn default_llm_timeout() -> u64 {
    60
}

pub const KNOWN_PROVIDERS: &[&str] = &["anthropic", "openai", "openai-compatible"];

impl Config {
    /// Load config from repo root or user config directory
    pub fn load() -> Result<Self> {
        Self::load_with_path(None)
    }

    /// Load configuration from a specific path, or use default search paths.
    /// Environment overrides are applied on top of whichever source wins.
    pub fn load_with_path(path: Option<String>) -> Result<Self> {
        let mut config = Self::load_file(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    fn load_file(path: Option<String>) -> Result<Self> {
        // An explicit path must exist and parse
        if let Some(config_path) = path {
            debug!("Loading config from explicit path: {}", config_path);
            return Self::load_from_path(&config_path)
                .with_context(|| format!("failed to load config from {}", config_path));
        }

        if let Ok(config) = Self::load_from_path("gitskills.toml") {
            debug!("Loaded config from ./gitskills.toml");
            return Ok(config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let config_path = config_dir.join("gitskills").join("config.toml");
            if let Ok(config) = Self::load_from_path(&config_path) {
                debug!("Loaded config from {:?}", config_path);
                return Ok(config);
            }
        }

        debug!("Using default config");
        Ok(Self::default())
    }

    fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// GITHUB_API_BASE_URL, TOPCODER_API_URL and AI_ENABLED take precedence over the file
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = env::var("GITHUB_API_BASE_URL") {
            if !url.trim().is_empty() {
                debug!("Env override: github.api_base_url = {}", url);
                self.github.api_base_url = url.trim().to_string();
            }
        }
        if let Ok(url) = env::var("TOPCODER_API_URL") {
            if !url.trim().is_empty() {
                debug!("Env override: catalog.api_url = {}", url);
                self.catalog.api_url = url.trim().to_string();
            }
        }
        if let Ok(flag) = env::var("AI_ENABLED") {
            self.verification.enabled = flag.trim().eq_ignore_ascii_case("true");
        }
    }

    /// Read the GitHub token. A missing token is fatal for `analyze`.
    pub fn get_github_token(&self) -> Result<SecretString> {
        let raw = env::var(&self.github.token_env).map_err(|_| {
            anyhow::anyhow!(
                "GitHub token not found in environment variable: {}",
                self.github.token_env
            )
        })?;
        let token = raw.trim();
        if token.is_empty() {
            anyhow::bail!(
                "GitHub token in environment variable {} is empty",
                self.github.token_env
            );
        }
        Ok(SecretString::new(token.to_string()))
    }

    /// Get the LLM API key from the environment variable named in config.
    /// Returns an empty secret when the provider needs none.
    pub fn get_llm_api_key(&self) -> Result<SecretString> {
        match &self.llm.api_key_env {
            Some(env_var) => {
                if env_var.eq_ignore_ascii_case("none") {
                    return Ok(SecretString::default());
                }

                // local OpenAI-compatible servers usually run without a key
                if self.llm.provider == "openai-compatible" {
                    return Ok(env::var(env_var).unwrap_or_default().into());
                }

                env::var(env_var).map(SecretString::new).map_err(|_| {
                    anyhow::anyhow!("API key not found in environment variable: {}", env_var)
                })
            }
            None => Ok(SecretString::default()),
        }
    }

    /// Static checks for `config-check`. Returns human-readable problems.
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();

        for (name, url) in [
            ("github.api_base_url", &self.github.api_base_url),
            ("catalog.api_url", &self.catalog.api_url),
        ] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                problems.push(format!("{} must be an http(s) URL, got '{}'", name, url));
            }
        }

        if self.github.max_repos == 0 {
            problems.push("github.max_repos must be at least 1".to_string());
        }
        if self.github.timeout_secs == 0 || self.catalog.timeout_secs == 0 {
            problems.push("timeouts must be at least 1 second".to_string());
        }
        if self.verification.enabled && !KNOWN_PROVIDERS.contains(&self.llm.provider.as_str()) {
            problems.push(format!(
                "llm.provider '{}' is not one of {}",
                self.llm.provider,
                KNOWN_PROVIDERS.join(", ")
            ));
        }

        problems
    }
}
