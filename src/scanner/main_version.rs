//! Picks the project's own version out of a file that may also mention
//! dependency versions.
//!
//! These are line-based heuristics, not JSON or TOML parsers.

use super::{VersionMatch, VersionPattern, find_versions};
use anyhow::{Context, Result};
use log::debug;
use std::path::Path;

/// How far above a TOML match to look for its section header.
const SECTION_LOOKBACK: usize = 9;
const MAX_TOP_LEVEL_INDENT: usize = 2;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FileFormat {
    Json,
    Toml,
    Other,
}

impl FileFormat {
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let name = path.as_ref().to_string_lossy();
        if name.ends_with(".json") {
            FileFormat::Json
        } else if name.ends_with(".toml") {
            FileFormat::Toml
        } else {
            FileFormat::Other
        }
    }
}

/// Anchored patterns for declarations that are almost always the main version.
pub fn root_patterns() -> Result<Vec<VersionPattern>> {
    Ok(vec![
        VersionPattern::new("root JSON version field", r#"^([ \t]{0,2}"version"\s*:\s*")({VERSION})(")"#)?,
        VersionPattern::new("root TOML version field", r#"^([ \t]{0,2}version\s*=\s*")({VERSION})(")"#)?,
        VersionPattern::new(
            "root VERSION assignment",
            r#"(?i)^([ \t]{0,2}VERSION\s*[:=]\s*["']?)({VERSION})(["']?)"#,
        )?,
    ])
}

/// Returns the main version of `content`, or `None` when it has no version at all.
pub fn find_main_version(content: &str, format: FileFormat) -> Result<Option<VersionMatch>> {
    let roots = root_patterns()?;
    for (index, line) in content.split('\n').enumerate() {
        for pattern in &roots {
            if let Some(captures) = pattern.regex.captures(line) {
                if let Some(found) = VersionMatch::from_captures(pattern, index + 1, line, &captures) {
                    debug!("Main version {} matched '{}' on line {}", found.version, pattern.name, found.line);
                    return Ok(Some(found));
                }
            }
        }
    }

    let matches = find_versions(content)?;
    if matches.is_empty() {
        return Ok(None);
    }
    let lines: Vec<&str> = content.split('\n').collect();

    let preferred = match format {
        FileFormat::Json => top_level_json(&matches, &lines),
        FileFormat::Toml => package_section_toml(&matches, &lines),
        FileFormat::Other => None,
    };

    Ok(Some(preferred.unwrap_or(&matches[0]).clone()))
}

pub fn find_main_version_in_file(path: impl AsRef<Path>) -> Result<Option<VersionMatch>> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read file {:?}", path))?;
    find_main_version(&contents, FileFormat::from_path(path))
}

/// A `"version"` key indented by at most two characters is taken as top level.
fn top_level_json<'a>(matches: &'a [VersionMatch], lines: &[&str]) -> Option<&'a VersionMatch> {
    matches.iter().find(|m| {
        let Some(line) = lines.get(m.line - 1) else {
            return false;
        };
        let trimmed = line.trim_start_matches([' ', '\t']);
        trimmed.starts_with("\"version\"") && line.len() - trimmed.len() <= MAX_TOP_LEVEL_INDENT
    })
}

/// The first match whose nearest section header above it is `[package]`.
fn package_section_toml<'a>(matches: &'a [VersionMatch], lines: &[&str]) -> Option<&'a VersionMatch> {
    matches.iter().find(|m| {
        let lowest = m.line.saturating_sub(SECTION_LOOKBACK).max(1);
        for number in (lowest..m.line).rev() {
            let line = lines[number - 1];
            if line.contains("[package]") {
                return true;
            }
            let trimmed = line.trim();
            if trimmed.starts_with('[') && trimmed.ends_with(']') {
                return false;
            }
        }
        false
    })
}
