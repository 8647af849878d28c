//! Heuristic search for version strings in arbitrary text files.
//!
//! Every registered pattern has exactly three capture groups: the text leading
//! up to the version, the version itself (optionally tagged with `v`), and the
//! text following it. Keeping the surrounding text lets the rewriter restore
//! the original formatting byte for byte.

use anyhow::{Context, Result};
use log::debug;
use regex::Regex;
use std::collections::HashSet;
use std::path::Path;

pub mod main_version;
pub mod rewriter;

/// Dotted-numeric version with an optional tag and prerelease.
pub(crate) const VERSION: &str = r"v?[0-9]+\.[0-9]+\.[0-9]+(?:-[a-zA-Z0-9.-]+)?";

#[derive(Debug, Clone)]
pub struct VersionPattern {
    pub regex: Regex,
    pub name: &'static str,
}

impl VersionPattern {
    /// Builds a pattern from a template in which `{VERSION}` stands for the version group.
    pub(crate) fn new(name: &'static str, template: &str) -> Result<Self> {
        let regex = Regex::new(&template.replace("{VERSION}", VERSION))
            .with_context(|| format!("Invalid version pattern '{}'", name))?;
        Ok(VersionPattern { regex, name })
    }
}

/// The registered patterns, in priority order.
pub fn common_patterns() -> Result<Vec<VersionPattern>> {
    Ok(vec![
        VersionPattern::new("JSON version field", r#"("version"\s*:\s*")({VERSION})(")"#)?,
        VersionPattern::new("VERSION assignment", r#"(?i)(VERSION\s*[:=]\s*["']?)({VERSION})(["']?)"#)?,
        VersionPattern::new("doc comment version", r"(@version\s+)({VERSION})()")?,
        VersionPattern::new("XML version tag", r"(<version>)({VERSION})(</version>)")?,
        VersionPattern::new("version assignment", r#"(?i)(version\s*[:=]\s*["']?)({VERSION})(["']?)"#)?,
        VersionPattern::new("markdown version header", r"(?i)(#\s*version\s+)({VERSION})()")?,
        VersionPattern::new("current version text", r"(?i)(current\s+version.*?)({VERSION})()")?,
        VersionPattern::new("at version", r"(@)({VERSION})(\s|$)")?,
        VersionPattern::new("install version text", r"(?i)(install\s+version\s+)({VERSION})()")?,
        VersionPattern::new("TOML version field", r#"(version\s*=\s*")({VERSION})(")"#)?,
    ])
}

/// A version string located on a single line.
///
/// `start` and `end` are byte offsets of the whole match within the line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionMatch {
    /// 1-based line number.
    pub line: usize,
    pub start: usize,
    pub end: usize,
    pub full_match: String,
    /// The version with its tag removed.
    pub version: String,
    /// The tag character that preceded the version, if any.
    pub tag: Option<char>,
    pub pattern: &'static str,
    pub prefix: String,
    pub suffix: String,
}

impl VersionMatch {
    pub(crate) fn from_captures(
        pattern: &VersionPattern,
        line_number: usize,
        line: &str,
        captures: &regex::Captures,
    ) -> Option<Self> {
        let whole = captures.get(0)?;
        let raw_version = captures.get(2)?.as_str();
        let (tag, version) = split_tag(raw_version);

        Some(VersionMatch {
            line: line_number,
            start: whole.start(),
            end: whole.end(),
            full_match: line[whole.range()].to_string(),
            version: version.to_string(),
            tag,
            pattern: pattern.name,
            prefix: captures.get(1).map_or("", |m| m.as_str()).to_string(),
            suffix: captures.get(3).map_or("", |m| m.as_str()).to_string(),
        })
    }
}

fn split_tag(raw: &str) -> (Option<char>, &str) {
    match raw.chars().next() {
        Some(c @ ('v' | 'V')) => (Some(c), &raw[1..]),
        _ => (None, raw),
    }
}

/// Finds every version-like span in `content`.
///
/// Matches are reported line by line, then in pattern order. When two
/// patterns match the exact same span only the first one is kept; different
/// spans carrying the same version are all reported.
pub fn find_versions(content: &str) -> Result<Vec<VersionMatch>> {
    let patterns = common_patterns()?;
    let mut seen: HashSet<(usize, usize, usize)> = HashSet::new();
    let mut matches = Vec::new();

    for (index, line) in content.split('\n').enumerate() {
        let line_number = index + 1;
        for pattern in &patterns {
            for captures in pattern.regex.captures_iter(line) {
                let Some(found) = VersionMatch::from_captures(pattern, line_number, line, &captures)
                else {
                    continue;
                };
                if !seen.insert((line_number, found.start, found.end)) {
                    continue;
                }
                matches.push(found);
            }
        }
    }

    Ok(matches)
}

pub fn find_versions_in_file(path: impl AsRef<Path>) -> Result<Vec<VersionMatch>> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read file {:?}", path))?;
    let matches = find_versions(&contents)?;
    debug!("Found {} version(s) in '{}'", matches.len(), path.display());
    Ok(matches)
}

/// Read-only scan, for previewing what a bump would touch.
pub fn scan_versions_in_file(path: impl AsRef<Path>) -> Result<Vec<VersionMatch>> {
    find_versions_in_file(path)
}
