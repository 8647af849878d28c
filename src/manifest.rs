//! The `module` line of `go.mod`, which carries a `/vN` suffix for majors of two and up.

use crate::version::{self, strip_tag};
use anyhow::{Context, Result, anyhow};
use log::{debug, info};
use regex::Regex;
use std::path::{Path, PathBuf};

pub const MANIFEST_FILE: &str = "go.mod";

fn module_regex() -> Result<Regex> {
    Ok(Regex::new(r#"(?m)^(\s*module\s+"?)([^\s"]+)"#)?)
}

/// Walks up from `start` to the first directory holding a `go.mod`.
pub fn locate_manifest_dir(start: impl AsRef<Path>) -> Option<PathBuf> {
    let start = std::path::absolute(start.as_ref()).ok()?;
    start
        .ancestors()
        .find(|dir| dir.join(MANIFEST_FILE).is_file())
        .map(Path::to_path_buf)
}

pub fn manifest_path(dir: impl AsRef<Path>) -> PathBuf {
    dir.as_ref().join(MANIFEST_FILE)
}

pub fn parse_module_path(contents: &str) -> Result<String> {
    module_regex()?
        .captures(contents)
        .map(|c| c[2].to_string())
        .ok_or_else(|| anyhow!("module directive not found"))
}

pub fn read_module_path(dir: impl AsRef<Path>) -> Result<String> {
    let path = manifest_path(dir);
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {:?}", path))?;
    parse_module_path(&contents).with_context(|| format!("Failed to parse {:?}", path))
}

/// Splits `example.com/m/v2` into `("example.com/m", Some("v2"))`.
pub fn split_path_version(module_path: &str) -> (&str, Option<&str>) {
    if let Some((base, last)) = module_path.rsplit_once('/') {
        let is_major = last
            .strip_prefix('v')
            .and_then(|n| n.parse::<u64>().ok())
            .is_some_and(|n| n >= 2 && !last[1..].starts_with('0'));
        if is_major {
            return (base, Some(last));
        }
    }
    (module_path, None)
}

/// The module path for `new_version`: bare for majors 0 and 1, `/vN` otherwise.
pub fn module_path_for(module_path: &str, new_version: &str) -> Result<String> {
    let (base, _) = split_path_version(module_path);
    let major = version::parse(&version::normalize(strip_tag(new_version)))?.major;
    Ok(match major {
        0 | 1 => base.to_string(),
        n => format!("{base}/v{n}"),
    })
}

/// Rewrites the module line of `dir/go.mod` for `new_version` and returns the new path.
pub fn update_manifest(dir: impl AsRef<Path>, new_version: &str) -> Result<String> {
    let path = manifest_path(dir);
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {:?}", path))?;
    let regex = module_regex()?;
    let captures = regex
        .captures(&contents)
        .ok_or_else(|| anyhow!("module directive not found in {:?}", path))?;

    let old_path = &captures[2];
    let new_path = module_path_for(old_path, new_version)?;
    let span = captures.get(2).map(|m| m.range()).unwrap_or_default();

    let mut updated = contents.clone();
    updated.replace_range(span, &new_path);
    std::fs::write(&path, updated).with_context(|| format!("Failed to write {:?}", path))?;

    if old_path == new_path {
        debug!("Module path {} unchanged", new_path);
    } else {
        info!("Module path {} -> {}", old_path, new_path);
    }
    Ok(new_path)
}
