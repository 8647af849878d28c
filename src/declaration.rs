//! The Go source file that declares the project version:
//!
//! ```text
//! package version
//!
//! var (
//! 	Version = "1.2.3"
//! )
//! ```

use crate::error::BumpError;
use anyhow::{Context, Result};
use log::debug;
use regex::Regex;
use std::path::Path;

const DEFAULT_PACKAGE: &str = "version";

fn version_regex() -> Result<Regex> {
    Ok(Regex::new(r#"Version\s*=\s*"([^"]+)""#)?)
}

fn package_regex() -> Result<Regex> {
    Ok(Regex::new(r"(?m)^package\s+(\w+)")?)
}

/// Reads the declared version. `Ok(None)` means the file does not exist yet.
pub fn read_version(path: impl AsRef<Path>) -> Result<Option<String>> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(None);
    }
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read version file {:?}", path))?;
    let captures = version_regex()?
        .captures(&contents)
        .ok_or_else(|| BumpError::NoVersionFound(path.to_path_buf()))?;
    let version = captures[1].to_string();
    debug!("Found current version: {}", version);
    Ok(Some(version))
}

pub fn render(package: &str, version: &str) -> String {
    format!("package {package}\n\nvar (\n\tVersion = \"{version}\"\n)\n")
}

/// The package clause to write: the file's own, else that of a sibling
/// non-test `.go` file, else `version`.
pub fn package_name(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    let regex = package_regex()?;
    let package_of = |file: &Path| -> Option<String> {
        let contents = std::fs::read_to_string(file).ok()?;
        regex.captures(&contents).map(|c| c[1].to_string())
    };

    if let Some(name) = package_of(path) {
        return Ok(name);
    }

    let dir = parent_dir(path);
    if dir.is_dir() {
        let mut siblings: Vec<_> = std::fs::read_dir(dir)
            .with_context(|| format!("Failed to read directory {:?}", dir))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| {
                let name = p.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();
                p.is_file() && name.ends_with(".go") && !name.ends_with("_test.go")
            })
            .collect();
        siblings.sort();
        if let Some(name) = siblings.iter().find_map(|p| package_of(p)) {
            return Ok(name);
        }
    }

    Ok(DEFAULT_PACKAGE.to_string())
}

pub fn write_version(path: impl AsRef<Path>, version: &str) -> Result<()> {
    let path = path.as_ref();
    let package = package_name(path)?;
    let dir = parent_dir(path);
    std::fs::create_dir_all(dir).with_context(|| format!("Failed to create directory {:?}", dir))?;
    std::fs::write(path, render(&package, version))
        .with_context(|| format!("Failed to write version file {:?}", path))?;
    debug!("Wrote version {} to '{}'", version, path.display());
    Ok(())
}

/// `Path::parent` that treats a bare file name as living in `.`.
pub fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_render_template() {
        assert_eq!(
            render("mypkg", "1.2.3"),
            "package mypkg\n\nvar (\n\tVersion = \"1.2.3\"\n)\n"
        );
    }

    #[test]
    fn test_read_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        assert_eq!(read_version(temp_dir.path().join("version.go")).unwrap(), None);
    }

    #[test]
    fn test_write_then_read() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("version.go");
        write_version(&path, "0.4.0-rc.1").unwrap();
        assert_eq!(read_version(&path).unwrap().as_deref(), Some("0.4.0-rc.1"));
        assert!(fs::read_to_string(&path).unwrap().starts_with("package version\n"));
    }

    #[test]
    fn test_read_hand_written_declaration() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("version.go");
        fs::write(&path, "package main\n\nconst Version = \"2.3.4\" // release\n").unwrap();
        assert_eq!(read_version(&path).unwrap().as_deref(), Some("2.3.4"));
    }

    #[test]
    fn test_read_without_declaration_fails() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("version.go");
        fs::write(&path, "package main\n").unwrap();
        let err = read_version(&path).unwrap_err();
        assert_eq!(
            err.downcast_ref::<BumpError>(),
            Some(&BumpError::NoVersionFound(path.clone()))
        );
    }

    #[test]
    fn test_package_name_is_kept_on_rewrite() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("version.go");
        fs::write(&path, render("goversion", "1.0.0")).unwrap();
        write_version(&path, "1.1.0").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), render("goversion", "1.1.0"));
    }

    #[test]
    fn test_package_name_from_sibling() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("a_test.go"), "package tests_only\n").unwrap();
        fs::write(temp_dir.path().join("b.go"), "// doc\npackage cli\n").unwrap();
        assert_eq!(package_name(temp_dir.path().join("version.go")).unwrap(), "cli");
    }

    #[test]
    fn test_package_name_default() {
        let temp_dir = TempDir::new().unwrap();
        assert_eq!(package_name(temp_dir.path().join("version.go")).unwrap(), "version");
    }

    #[test]
    fn test_parent_dir_of_bare_file() {
        assert_eq!(parent_dir(Path::new("version.go")), Path::new("."));
        assert_eq!(parent_dir(Path::new("pkg/version.go")), Path::new("pkg"));
    }
}
