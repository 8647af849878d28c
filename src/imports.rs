//! Rewrites imports of the module's own packages after its path changes.
//!
//! Only the string literals of `import` declarations are replaced, so the
//! rest of every file stays byte for byte the same.

use anyhow::{Context, Result};
use log::{debug, info};
use regex::Regex;
use std::ops::Range;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

const SKIPPED_DIRS: [&str; 2] = ["vendor", ".git"];

fn single_import_regex() -> Result<Regex> {
    Ok(Regex::new(r#"(?m)^[ \t]*import[ \t]+(?:[\w.]+[ \t]+)?"([^"\n]*)""#)?)
}

fn import_block_open_regex() -> Result<Regex> {
    Ok(Regex::new(r"(?m)^[ \t]*import[ \t]*\(")?)
}

/// One spec inside an import block: optional name, then the quoted path.
fn block_spec_regex() -> Result<Regex> {
    Ok(Regex::new(r#"^[ \t]*(?:[\w.]+[ \t]+)?"([^"\n]*)""#)?)
}

/// Whether `import_path` is `module_path` itself or one of its packages.
pub fn is_self_import(import_path: &str, module_path: &str) -> bool {
    import_path
        .strip_prefix(module_path)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

/// Byte ranges of every import path literal (without quotes) in a Go source file.
fn import_path_ranges(source: &str) -> Result<Vec<Range<usize>>> {
    let mut ranges = Vec::new();
    for captures in single_import_regex()?.captures_iter(source) {
        if let Some(path) = captures.get(1) {
            ranges.push(path.range());
        }
    }
    let spec = block_spec_regex()?;
    for open in import_block_open_regex()?.find_iter(source) {
        let mut offset = open.end();
        for line in source[open.end()..].split_inclusive('\n') {
            let mut rest = line;
            if let Some(path) = spec.captures(line).and_then(|c| c.get(1)) {
                ranges.push(offset + path.start()..offset + path.end());
                rest = &line[path.end() + 1..];
            }
            let code = rest.find("//").map_or(rest, |i| &rest[..i]);
            if code.contains(')') {
                break;
            }
            offset += line.len();
        }
    }
    ranges.sort_by_key(|r| r.start);
    Ok(ranges)
}

/// Returns the rewritten source, or `None` if no import refers to `old_module`.
pub fn rewrite_imports(source: &str, old_module: &str, new_module: &str) -> Result<Option<String>> {
    let targets: Vec<Range<usize>> = import_path_ranges(source)?
        .into_iter()
        .filter(|r| is_self_import(&source[r.clone()], old_module))
        .collect();
    if targets.is_empty() {
        return Ok(None);
    }

    let mut rewritten = source.to_string();
    for range in targets.into_iter().rev() {
        let new_path = format!("{}{}", new_module, &source[range.start + old_module.len()..range.end]);
        rewritten.replace_range(range, &new_path);
    }
    Ok(Some(rewritten))
}

fn is_skipped(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && SKIPPED_DIRS.iter().any(|name| entry.file_name() == *name)
}

fn go_sources(root: &Path) -> impl Iterator<Item = Result<PathBuf>> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !is_skipped(entry))
        .filter_map(|entry| match entry {
            Ok(entry) => {
                let is_go = entry.file_type().is_file()
                    && entry.path().extension().is_some_and(|ext| ext == "go");
                is_go.then(|| Ok(entry.into_path()))
            }
            Err(err) => Some(Err(err.into())),
        })
}

/// Lists the `.go` files under `root` that [`update_self_imports`] would rewrite.
pub fn scan_self_imports(root: impl AsRef<Path>, old_module: &str, new_module: &str) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for file in go_sources(root.as_ref()) {
        let file = file?;
        let source = std::fs::read_to_string(&file)
            .with_context(|| format!("Failed to read {:?}", file))?;
        if rewrite_imports(&source, old_module, new_module)?.is_some() {
            files.push(file);
        }
    }
    debug!("{} file(s) import {}", files.len(), old_module);
    Ok(files)
}

/// Rewrites self-imports under `root` from `old_module` to `new_module`.
/// Returns the files that changed.
pub fn update_self_imports(root: impl AsRef<Path>, old_module: &str, new_module: &str) -> Result<Vec<PathBuf>> {
    let mut modified = Vec::new();
    for file in go_sources(root.as_ref()) {
        let file = file?;
        let source = std::fs::read_to_string(&file)
            .with_context(|| format!("Failed to read {:?}", file))?;
        let Some(rewritten) = rewrite_imports(&source, old_module, new_module)? else {
            continue;
        };
        std::fs::write(&file, rewritten).with_context(|| format!("Failed to write {:?}", file))?;
        debug!("Rewrote imports in '{}'", file.display());
        modified.push(file);
    }
    info!("Rewrote self-imports in {} file(s)", modified.len());
    Ok(modified)
}
