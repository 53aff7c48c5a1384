//! Skills taxonomy: canonical skill records and the run-scoped catalog cache.

pub mod client;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::SourceResult;

pub use client::TopcoderCatalogClient;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillRecord {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl SkillRecord {
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            category: None,
            description: None,
        }
    }
}

/// A remote catalog that can list every skill it knows.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn fetch_skills(&self) -> SourceResult<Vec<SkillRecord>>;
}

/// Read-only lookups the matcher needs. Synchronous: the catalog is
/// fetched before matching starts.
pub trait SkillLookup {
    /// Exact, case-insensitive name match
    fn find_skill_by_name(&self, name: &str) -> Option<&SkillRecord>;

    fn list_all_skills(&self) -> &[SkillRecord];
}

/// Where the cached skills came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogOrigin {
    Remote,
    BuiltinFallback,
    Empty,
}

/// Skill list fetched once per run. Constructed by [`SkillCatalog::load`]
/// and passed by reference to the matcher; never refreshed.
#[derive(Debug, Clone)]
pub struct SkillCatalog {
    skills: Vec<SkillRecord>,
    origin: CatalogOrigin,
}

/// Languages offered when the remote catalog is unreachable
const BUILTIN_SKILLS: &[&str] = &[
    "JavaScript",
    "TypeScript",
    "Python",
    "Java",
    "Go",
    "Rust",
    "C++",
    "C#",
    "Ruby",
    "PHP",
    "Swift",
    "Kotlin",
];

impl SkillCatalog {
    pub fn from_skills(skills: Vec<SkillRecord>) -> Self {
        let origin = if skills.is_empty() {
            CatalogOrigin::Empty
        } else {
            CatalogOrigin::Remote
        };
        Self { skills, origin }
    }

    pub fn empty() -> Self {
        Self::from_skills(Vec::new())
    }

    pub fn builtin() -> Self {
        let skills = BUILTIN_SKILLS
            .iter()
            .map(|name| {
                let mut skill = SkillRecord::new(
                    &format!("builtin:{}", name.to_lowercase()),
                    name,
                );
                skill.category = Some("Programming Language".to_string());
                skill
            })
            .collect();
        Self {
            skills,
            origin: CatalogOrigin::BuiltinFallback,
        }
    }

    /// Fetch the catalog once. Never fails: an unreachable catalog becomes
    /// the built-in list (when allowed) or an empty catalog.
    pub async fn load(source: &dyn CatalogSource, use_builtin_fallback: bool) -> Self {
        match source.fetch_skills().await {
            Ok(skills) if !skills.is_empty() => {
                info!("Fetched {} skills from catalog", skills.len());
                Self::from_skills(skills)
            }
            Ok(_) => {
                warn!("Skill catalog returned no skills");
                Self::fallback(use_builtin_fallback)
            }
            Err(e) => {
                warn!("Failed to fetch skill catalog: {}", e);
                Self::fallback(use_builtin_fallback)
            }
        }
    }

    fn fallback(use_builtin_fallback: bool) -> Self {
        if use_builtin_fallback {
            info!("Using built-in skill list");
            Self::builtin()
        } else {
            Self::empty()
        }
    }

    pub fn origin(&self) -> CatalogOrigin {
        self.origin
    }

    pub fn len(&self) -> usize {
        self.skills.len()
    }

    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }
}

impl SkillLookup for SkillCatalog {
    fn find_skill_by_name(&self, name: &str) -> Option<&SkillRecord> {
        let needle = name.to_lowercase();
        self.skills.iter().find(|s| s.name.to_lowercase() == needle)
    }

    fn list_all_skills(&self) -> &[SkillRecord] {
        &self.skills
    }
}
