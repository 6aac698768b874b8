// src/ingest/config.rs
//! Community list and finance vocabulary used by the discussion fetcher.
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const ENV_SOURCES_PATH: &str = "MARKET_SOURCES_PATH";
const DEFAULT_SOURCES_PATH: &str = "config/sources.toml";
const BUILTIN_SOURCES: &str = include_str!("../../config/sources.toml");

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourcesCatalog {
    /// Searched in order; duplicates are kept and searched twice.
    pub communities: Vec<String>,
    #[serde(default)]
    pub core_communities: Vec<String>,
    #[serde(default)]
    pub finance_terms: Vec<String>,
}

impl SourcesCatalog {
    /// Catalog compiled into the binary.
    pub fn builtin() -> Self {
        parse_catalog(BUILTIN_SOURCES, "toml").expect("valid built-in sources catalog")
    }

    pub fn is_core(&self, community: &str) -> bool {
        self.core_communities.iter().any(|c| c == community)
    }

    /// True if `lower_text` (already lowercase) contains any finance term.
    pub fn has_finance_term(&self, lower_text: &str) -> bool {
        self.finance_terms
            .iter()
            .any(|t| lower_text.contains(t.as_str()))
    }
}

/// Load a catalog from an explicit path. Supports TOML or JSON formats.
pub fn load_catalog_from(path: &Path) -> Result<SourcesCatalog> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading sources catalog from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_catalog(&content, ext.as_str())
}

/// Load the catalog using env var + fallbacks:
/// 1) $MARKET_SOURCES_PATH
/// 2) config/sources.toml
/// 3) the built-in copy
pub fn load_catalog_default() -> Result<SourcesCatalog> {
    if let Ok(p) = std::env::var(ENV_SOURCES_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_catalog_from(&pb);
        }
        return Err(anyhow!("{ENV_SOURCES_PATH} points to non-existent path"));
    }
    let toml_p = PathBuf::from(DEFAULT_SOURCES_PATH);
    if toml_p.exists() {
        return load_catalog_from(&toml_p);
    }
    Ok(SourcesCatalog::builtin())
}

fn parse_catalog(s: &str, hint_ext: &str) -> Result<SourcesCatalog> {
    let parsed = if hint_ext == "json" {
        serde_json::from_str::<SourcesCatalog>(s).map_err(anyhow::Error::from)
    } else {
        toml::from_str::<SourcesCatalog>(s)
            .map_err(anyhow::Error::from)
            .or_else(|_| serde_json::from_str::<SourcesCatalog>(s).map_err(anyhow::Error::from))
    };
    let mut cat = parsed.context("unsupported sources catalog format")?;
    cat.communities = clean_list(cat.communities);
    cat.core_communities = clean_list(cat.core_communities);
    cat.finance_terms = clean_list(cat.finance_terms)
        .into_iter()
        .map(|t| t.to_lowercase())
        .collect();
    if cat.communities.is_empty() {
        return Err(anyhow!("sources catalog lists no communities"));
    }
    Ok(cat)
}

/// Trim and drop blanks, keeping order.
fn clean_list(items: Vec<String>) -> Vec<String> {
    items
        .into_iter()
        .map(|it| it.trim().to_string())
        .filter(|it| !it.is_empty())
        .collect()
}
