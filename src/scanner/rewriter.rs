use super::VersionMatch;
use super::main_version::find_main_version_in_file;
use crate::version::strip_tag;
use anyhow::{Context, Result};
use log::{debug, info};
use std::collections::BTreeMap;
use std::path::Path;

/// Rewrites the version span of each match, keeping its prefix, suffix and tag.
///
/// Matches sharing a line are applied right to left so earlier offsets stay
/// valid. A match overlapping a span that was already rewritten is skipped.
pub fn replace_versions(content: &str, new_version: &str, matches: &[VersionMatch]) -> String {
    let new_version = strip_tag(new_version);
    let mut by_line: BTreeMap<usize, Vec<&VersionMatch>> = BTreeMap::new();
    for m in matches {
        by_line.entry(m.line).or_default().push(m);
    }

    let mut lines: Vec<String> = content.split('\n').map(str::to_string).collect();
    for (line_number, mut line_matches) in by_line {
        let Some(line) = line_number.checked_sub(1).and_then(|i| lines.get_mut(i)) else {
            continue;
        };
        line_matches.sort_by(|a, b| b.start.cmp(&a.start));

        let mut applied_from = usize::MAX;
        for m in line_matches {
            if m.start >= m.end || m.end > line.len() || m.end > applied_from {
                debug!("Skipping match '{}' on line {}", m.full_match, line_number);
                continue;
            }
            let tag = m.tag.map(String::from).unwrap_or_default();
            let replacement = format!("{}{}{}{}", m.prefix, tag, new_version, m.suffix);
            line.replace_range(m.start..m.end, &replacement);
            applied_from = m.start;
        }
    }

    lines.join("\n")
}

pub fn replace_versions_in_file(
    path: impl AsRef<Path>,
    new_version: &str,
    matches: &[VersionMatch],
) -> Result<()> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read file {:?}", path))?;
    let new_contents = replace_versions(&contents, new_version, matches);
    std::fs::write(path, new_contents)
        .with_context(|| format!("Failed to write file {:?}", path))?;
    Ok(())
}

/// Replaces only the main version of a file. Returns `false` when the file
/// holds no version, leaving it untouched.
pub fn bump_version_in_file(path: impl AsRef<Path>, new_version: &str) -> Result<bool> {
    let path = path.as_ref();
    let Some(main) = find_main_version_in_file(path)? else {
        return Ok(false);
    };
    info!("Updating {} -> {} in '{}'", main.version, strip_tag(new_version), path.display());
    replace_versions_in_file(path, new_version, std::slice::from_ref(&main))?;
    Ok(true)
}

/// Replaces every version the scanner finds in a file.
pub fn bump_all_versions_in_file(path: impl AsRef<Path>, new_version: &str) -> Result<bool> {
    let path = path.as_ref();
    let matches = super::find_versions_in_file(path)?;
    if matches.is_empty() {
        return Ok(false);
    }
    replace_versions_in_file(path, new_version, &matches)?;
    Ok(true)
}
