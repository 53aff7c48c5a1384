//! gitskills - Infer skills from GitHub contribution history
//!
//! Collects a user's repositories, language byte counts, commits and pull
//! requests, aggregates them into per-language contribution metrics, scores
//! each language with a bucketed confidence model and matches it against a
//! standardized skills catalog. An optional LLM pass can second-guess each
//! recommendation without changing its score.

pub mod analysis;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;
pub mod github;
pub mod llm;
pub mod pipeline;
pub mod util;
