// src/collect/config.rs
//
// Optional operator allowlist restricting which sources a run may touch.
// Missing file means no filter (all configured sources run).

use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::collect::types::SourceName;

const ENV_PATH: &str = "BRIEF_SOURCES_PATH";

/// Load the source filter from an explicit path. Supports TOML or JSON.
pub fn load_source_filter_from(path: &Path) -> Result<Vec<SourceName>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading source filter from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_filter(&content, ext.as_str())
}

/// Load the source filter using env var + fallbacks:
/// 1) $BRIEF_SOURCES_PATH
/// 2) config/sources.toml
/// 3) config/sources.json
///
/// Returns `None` when no filter is present.
pub fn load_source_filter_default() -> Result<Option<Vec<SourceName>>> {
    if let Ok(p) = std::env::var(ENV_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_source_filter_from(&pb).map(Some);
        }
        return Err(anyhow!("BRIEF_SOURCES_PATH points to non-existent path"));
    }
    let toml_p = PathBuf::from("config/sources.toml");
    if toml_p.exists() {
        return load_source_filter_from(&toml_p).map(Some);
    }
    let json_p = PathBuf::from("config/sources.json");
    if json_p.exists() {
        return load_source_filter_from(&json_p).map(Some);
    }
    Ok(None)
}

fn parse_filter(s: &str, hint_ext: &str) -> Result<Vec<SourceName>> {
    let try_toml = hint_ext == "toml" || s.contains("sources");
    if try_toml {
        if let Ok(v) = parse_toml(s) {
            return resolve_names(v);
        }
    }
    if let Ok(v) = parse_json(s) {
        return resolve_names(v);
    }
    if !try_toml {
        if let Ok(v) = parse_toml(s) {
            return resolve_names(v);
        }
    }
    Err(anyhow!("unsupported source filter format"))
}

fn parse_toml(s: &str) -> Result<Vec<String>> {
    #[derive(serde::Deserialize)]
    struct TomlFilter {
        sources: Vec<String>,
    }
    let v: TomlFilter = toml::from_str(s)?;
    Ok(v.sources)
}

fn parse_json(s: &str) -> Result<Vec<String>> {
    let v: Vec<String> = serde_json::from_str(s)?;
    Ok(v)
}

/// Trim, drop empties, dedup, and reject names no client answers to.
fn resolve_names(items: Vec<String>) -> Result<Vec<SourceName>> {
    use std::collections::BTreeSet;
    let mut set = BTreeSet::new();
    for it in items {
        let t = it.trim();
        if t.is_empty() {
            continue;
        }
        let name = SourceName::parse(t)
            .ok_or_else(|| anyhow!("unknown source name in filter: {t:?}"))?;
        set.insert(name);
    }
    Ok(set.into_iter().collect())
}
