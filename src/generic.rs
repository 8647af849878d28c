//! Strict semver search used for `--bump-file` targets.
//!
//! Unlike the heuristic scanner this works on raw bytes across the whole file
//! and only ever touches the first version that is not tagged with `v`/`V`.

use crate::error::BumpError;
use anyhow::{Context, Result};
use log::{debug, info};
use regex::bytes::Regex;
use std::ops::Range;
use std::path::Path;

/// The semver.org grammar without its anchors.
const SEMVER: &str = r"(?P<major>0|[1-9][0-9]*)\.(?P<minor>0|[1-9][0-9]*)\.(?P<patch>0|[1-9][0-9]*)(?:-(?P<prerelease>(?:0|[1-9][0-9]*|[0-9]*[a-zA-Z-][0-9a-zA-Z-]*)(?:\.(?:0|[1-9][0-9]*|[0-9]*[a-zA-Z-][0-9a-zA-Z-]*))*))?(?:\+(?P<buildmetadata>[0-9a-zA-Z-]+(?:\.[0-9a-zA-Z-]+)*))?";

fn semver_regex() -> Result<Regex> {
    Ok(Regex::new(SEMVER)?)
}

/// Byte range of the first untagged semver in `content`.
pub fn find_semver(content: &[u8]) -> Result<Option<Range<usize>>> {
    let regex = semver_regex()?;
    let found = regex
        .find_iter(content)
        .find(|m| !matches!(m.start().checked_sub(1).map(|i| content[i]), Some(b'v' | b'V')))
        .map(|m| m.range());
    Ok(found)
}

/// Returns `content` with its first untagged semver replaced, or `None` if there is none.
pub fn replace_first_semver(content: &[u8], new_version: &str) -> Result<Option<Vec<u8>>> {
    let Some(range) = find_semver(content)? else {
        return Ok(None);
    };
    debug!(
        "Replacing '{}' at byte {}",
        String::from_utf8_lossy(&content[range.clone()]),
        range.start
    );
    let mut replaced = Vec::with_capacity(content.len() + new_version.len());
    replaced.extend_from_slice(&content[..range.start]);
    replaced.extend_from_slice(new_version.as_bytes());
    replaced.extend_from_slice(&content[range.end..]);
    Ok(Some(replaced))
}

/// Whether [`find_and_replace_semver`] would change the file.
pub fn has_semver(path: impl AsRef<Path>) -> Result<bool> {
    let path = path.as_ref();
    let contents = std::fs::read(path).with_context(|| format!("Failed to read file {:?}", path))?;
    Ok(find_semver(&contents)?.is_some())
}

pub fn find_and_replace_semver(path: impl AsRef<Path>, new_version: &str) -> Result<()> {
    let path = path.as_ref();
    let contents = std::fs::read(path).with_context(|| format!("Failed to read file {:?}", path))?;
    let Some(new_contents) = replace_first_semver(&contents, new_version)? else {
        return Err(BumpError::NoVersionFound(path.to_path_buf()).into());
    };
    std::fs::write(path, new_contents).with_context(|| format!("Failed to write file {:?}", path))?;
    info!("Bumped version in '{}' to {}", path.display(), new_version);
    Ok(())
}
